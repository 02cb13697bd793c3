//! Catalog access for the price tracker.
//!
//! The tracker follows a single catalog (`catalog.onliner.by`). This crate
//! owns everything that depends on that site: which links are accepted and
//! how a product page is turned into a [`Listing`].

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

pub use onliner::{OnlinerFetcher, parse_listing};
pub use price::{Price, PriceError};

mod onliner;
mod price;

static CATALOG_LINK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^https://catalog\.onliner\.by/.+").expect("catalog link regex")
});

/// Returns `true` when `link` points into the followed catalog.
pub fn is_catalog_link(link: &str) -> bool {
    CATALOG_LINK.is_match(link.trim())
}

/// Name and price read from a product page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    /// Lowest offer; [`Price::ZERO`] when the product has no offers.
    pub price: Price,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http client: {0}")]
    Client(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Source of product listings.
///
/// `Ok(None)` means the page was reachable but did not look like a product
/// page (no title).
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self, link: &str) -> Result<Option<Listing>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_links_are_recognised() {
        assert!(is_catalog_link(
            "https://catalog.onliner.by/notebook/apple/mba13m2"
        ));
        assert!(is_catalog_link(" https://catalog.onliner.by/tv/lg/oled55c3 "));
    }

    #[test]
    fn foreign_links_are_rejected() {
        assert!(!is_catalog_link("https://catalog.onliner.by/"));
        assert!(!is_catalog_link("http://catalog.onliner.by/tv/lg/oled55c3"));
        assert!(!is_catalog_link("https://shop.by/tv/lg/oled55c3"));
        assert!(!is_catalog_link("just some text"));
    }
}
