//! Periodic price check.
//!
//! Every tracked product is fetched again; a stored change whose size
//! reaches the threshold is sent to each of its trackers. Failures of one
//! product or one chat never stop the round.

use std::time::Duration;

use catalog::PriceFetcher;
use engine::{Engine, Price, PriceChange};
use teloxide::prelude::*;

pub(crate) async fn run(
    api: &Bot,
    engine: &Engine,
    fetcher: &dyn PriceFetcher,
    every: Duration,
    threshold: Price,
) {
    tracing::info!(every = every.as_secs(), %threshold, "Starting price notifier...");
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let changes = sweep(engine, fetcher, threshold).await;
        tracing::info!(changed = changes.len(), "price check done");
        for change in &changes {
            deliver(api, change).await;
        }
    }
}

/// Refreshes every product and returns the notable changes.
pub(crate) async fn sweep(
    engine: &Engine,
    fetcher: &dyn PriceFetcher,
    threshold: Price,
) -> Vec<PriceChange> {
    let products = match engine.products().await {
        Ok(products) => products,
        Err(err) => {
            tracing::error!("products not loaded: {err}");
            return Vec::new();
        }
    };

    let mut changes = Vec::new();
    for product in products {
        let listing = match fetcher.fetch(&product.product_link).await {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                tracing::warn!(product_id = product.id, "product page has no title");
                continue;
            }
            Err(err) => {
                tracing::error!(product_id = product.id, "price not fetched: {err}");
                continue;
            }
        };

        match engine.update_price(product.id, &listing).await {
            Ok(Some(change)) if change.is_notable(threshold) => changes.push(change),
            Ok(Some(change)) => {
                tracing::debug!(product_id = product.id, delta = %change.delta(), "change below threshold");
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(product_id = product.id, "price not stored: {err}");
            }
        }
    }
    changes
}

async fn deliver(api: &Bot, change: &PriceChange) {
    let text = change.message();
    for &chat_id in &change.subscribers {
        if let Err(err) = api.send_message(ChatId(chat_id), text.clone()).await {
            tracing::error!(chat_id, product_id = change.product_id, "notification not sent: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;
    use catalog::{FetchError, Listing};
    use migration::MigratorTrait;
    use sea_orm::Database;

    use super::*;

    const KEY: &str = "s3cret";
    const TV: &str = "https://catalog.onliner.by/tv/lg/oled55c3";
    const LAPTOP: &str = "https://catalog.onliner.by/notebook/apple/mba13m2";

    #[derive(Default)]
    struct FakeFetcher {
        pages: Mutex<HashMap<String, Option<i64>>>,
    }

    impl FakeFetcher {
        fn set(&self, link: &str, price: Option<i64>) {
            self.pages.lock().unwrap().insert(link.to_string(), price);
        }
    }

    #[async_trait]
    impl PriceFetcher for FakeFetcher {
        async fn fetch(&self, link: &str) -> Result<Option<Listing>, FetchError> {
            match self.pages.lock().unwrap().get(link) {
                Some(Some(minor)) => Ok(Some(Listing {
                    name: "Товар".to_string(),
                    price: Price::new(*minor),
                })),
                Some(None) => Ok(None),
                None => Err(FetchError::Client(format!("no page for {link}"))),
            }
        }
    }

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Engine::builder()
            .database(db)
            .admin_key(KEY)
            .panel_password("panel")
            .build()
            .await
            .unwrap()
    }

    async fn tracked(engine: &Engine, chat_id: i64, link: &str, minor: i64) {
        if engine.user_by_chat(chat_id).await.unwrap().is_none() {
            engine.register_user(chat_id, None, KEY).await.unwrap();
        }
        let listing = Listing {
            name: "Товар".to_string(),
            price: Price::new(minor),
        };
        engine.track(chat_id, link, &listing).await.unwrap();
    }

    #[tokio::test]
    async fn changed_price_is_reported_to_every_tracker() {
        let engine = engine().await;
        tracked(&engine, 1, TV, 100_000).await;
        tracked(&engine, 2, TV, 100_000).await;
        let fetcher = FakeFetcher::default();
        fetcher.set(TV, Some(95_000));

        let changes = sweep(&engine, &fetcher, Price::new(100)).await;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, Price::new(100_000));
        assert_eq!(changes[0].current, Price::new(95_000));
        let mut subscribers = changes[0].subscribers.clone();
        subscribers.sort();
        assert_eq!(subscribers, vec![1, 2]);
    }

    #[tokio::test]
    async fn unchanged_price_is_not_reported() {
        let engine = engine().await;
        tracked(&engine, 1, TV, 100_000).await;
        let fetcher = FakeFetcher::default();
        fetcher.set(TV, Some(100_000));

        assert!(sweep(&engine, &fetcher, Price::new(100)).await.is_empty());
    }

    #[tokio::test]
    async fn small_change_is_stored_but_not_reported() {
        let engine = engine().await;
        tracked(&engine, 1, TV, 100_000).await;
        let fetcher = FakeFetcher::default();
        fetcher.set(TV, Some(100_050));

        assert!(sweep(&engine, &fetcher, Price::new(100)).await.is_empty());

        let product = engine.products().await.unwrap().remove(0);
        assert_eq!(product.current(), Price::new(100_050));
        assert_eq!(product.previous(), Price::new(100_000));
    }

    #[tokio::test]
    async fn failing_product_does_not_stop_the_round() {
        let engine = engine().await;
        tracked(&engine, 1, TV, 100_000).await;
        tracked(&engine, 1, LAPTOP, 200_000).await;
        let fetcher = FakeFetcher::default();
        fetcher.set(LAPTOP, Some(180_000));

        let changes = sweep(&engine, &fetcher, Price::new(100)).await;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].link, LAPTOP);
    }

    #[tokio::test]
    async fn page_without_title_is_skipped() {
        let engine = engine().await;
        tracked(&engine, 1, TV, 100_000).await;
        let fetcher = FakeFetcher::default();
        fetcher.set(TV, None);

        assert!(sweep(&engine, &fetcher, Price::new(100)).await.is_empty());
        let product = engine.products().await.unwrap().remove(0);
        assert_eq!(product.current(), Price::new(100_000));
    }
}
