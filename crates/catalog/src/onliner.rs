use std::time::Duration;

use async_trait::async_trait;
use select::{
    document::Document,
    predicate::{Class, Name, Predicate},
};

use crate::{FetchError, Listing, Price, PriceFetcher};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Scraper for `catalog.onliner.by` product pages.
#[derive(Clone, Debug)]
pub struct OnlinerFetcher {
    client: reqwest::Client,
}

impl OnlinerFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PriceFetcher for OnlinerFetcher {
    async fn fetch(&self, link: &str) -> Result<Option<Listing>, FetchError> {
        let html = self
            .client
            .get(link)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let listing = parse_listing(&html);
        if listing.is_none() {
            tracing::warn!(link, "product page without title");
        }
        Ok(listing)
    }
}

/// Reads the product title and the lowest offer out of a product page.
///
/// Returns `None` when the title is missing. A missing or unreadable price
/// yields [`Price::ZERO`].
pub fn parse_listing(html: &str) -> Option<Listing> {
    let document = Document::from(html);

    let name = document
        .find(Name("h1").and(Class("catalog-masthead__title")))
        .map(|node| node.text().trim().to_string())
        .find(|text| !text.is_empty())?;

    let price = document
        .find(Name("a").and(Class("js-description-price-link")))
        .next()
        .map(|node| node.text())
        .and_then(|text| match text.parse::<Price>() {
            Ok(price) => Some(price),
            Err(err) => {
                tracing::debug!("unreadable price {text:?}: {err}");
                None
            }
        })
        .unwrap_or(Price::ZERO);

    Some(Listing { name, price })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1 class="catalog-masthead__title js-nav-header">
            Ноутбук Apple MacBook Air 13" M2 2022
          </h1>
          <div class="offers-description__price">
            <a class="offers-description__link offers-description__link_nodecor js-description-price-link"
               href="/prices">3 499,00 р.</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn reads_name_and_price() {
        let listing = parse_listing(PAGE).unwrap();
        assert_eq!(listing.name, "Ноутбук Apple MacBook Air 13\" M2 2022");
        assert_eq!(listing.price, Price::new(349_900));
    }

    #[test]
    fn missing_offers_mean_zero_price() {
        let page = r#"<h1 class="catalog-masthead__title">Телевизор LG OLED55C3</h1>"#;
        let listing = parse_listing(page).unwrap();
        assert_eq!(listing.name, "Телевизор LG OLED55C3");
        assert!(listing.price.is_zero());
    }

    #[test]
    fn page_without_title_is_not_a_listing() {
        let page = r#"<a class="js-description-price-link">10,00 р.</a>"#;
        assert_eq!(parse_listing(page), None);
    }
}
