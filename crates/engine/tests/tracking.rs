mod common;

use common::{LAPTOP, TV, engine_with_db, listing, member};
use engine::{EngineError, Price, Tracked, Untracked, products, users_products};
use pretty_assertions::assert_eq;
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn first_tracker_creates_the_product() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;

    let tracked = engine
        .track(100, TV, &listing("Телевизор LG", 329_900))
        .await
        .unwrap();

    let Tracked::Created(product) = tracked else {
        panic!("expected a new product, got {tracked:?}");
    };
    assert_eq!(product.product_link, TV);
    assert_eq!(product.name.as_deref(), Some("Телевизор LG"));
    assert_eq!(product.current(), Price::new(329_900));
    assert_eq!(product.previous(), Price::new(329_900));
    assert!(product.updated_at.is_some());
}

#[tokio::test]
async fn tracking_twice_is_a_no_op() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    engine.track(100, TV, &listing("TV", 1_000)).await.unwrap();

    assert!(engine.is_tracking(100, TV).await.unwrap());
    let again = engine.track(100, TV, &listing("TV", 1_000)).await.unwrap();

    assert!(matches!(again, Tracked::AlreadyTracked(_)));
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(users_products::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn second_tracker_shares_the_product() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    engine.track(100, TV, &listing("TV", 1_000)).await.unwrap();

    let tracked = engine.track(200, TV, &listing("TV", 1_000)).await.unwrap();

    assert!(matches!(tracked, Tracked::Linked(_)));
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(users_products::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn foreign_links_are_rejected_before_any_write() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;

    let err = engine
        .track(100, "https://example.com/tv", &listing("TV", 1_000))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::InvalidLink("https://example.com/tv".to_string())
    );
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn unregistered_chat_cannot_track() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .track(999, TV, &listing("TV", 1_000))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn removing_last_tracker_deletes_the_product() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();

    let untracked = engine.untrack(100, product.id).await.unwrap();

    assert!(matches!(untracked, Untracked::Deleted(_)));
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn removing_one_of_several_trackers_keeps_the_product() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();
    engine.track(200, TV, &listing("TV", 1_000)).await.unwrap();

    let untracked = engine.untrack(100, product.id).await.unwrap();

    assert!(matches!(untracked, Untracked::Unlinked(_)));
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 1);
    assert!(engine.products_of(100).await.unwrap().is_empty());
    assert_eq!(engine.products_of(200).await.unwrap().len(), 1);
}

#[tokio::test]
async fn untracking_a_foreign_product_fails() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    let product = engine
        .track(200, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();

    let err = engine.untrack(100, product.id).await.unwrap_err();

    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(engine.products_of(200).await.unwrap().len(), 1);
}

#[tokio::test]
async fn products_of_lists_only_own_products() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    engine.track(100, TV, &listing("TV", 1_000)).await.unwrap();
    engine.track(100, LAPTOP, &listing("Laptop", 2_000)).await.unwrap();
    engine.track(200, LAPTOP, &listing("Laptop", 2_000)).await.unwrap();

    let links: Vec<String> = engine
        .products_of(100)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.product_link)
        .collect();

    assert_eq!(links, vec![TV.to_string(), LAPTOP.to_string()]);
}

#[tokio::test]
async fn unchanged_price_produces_no_change() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();

    let change = engine
        .update_price(product.id, &listing("TV", 1_000))
        .await
        .unwrap();

    assert_eq!(change, None);
    let stored = engine.product(product.id).await.unwrap();
    assert_eq!(stored.current_price, 1_000);
    assert_eq!(stored.previous_price, 1_000);
}

#[tokio::test]
async fn changed_price_moves_current_to_previous() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();
    engine.track(200, TV, &listing("TV", 1_000)).await.unwrap();

    let change = engine
        .update_price(product.id, &listing("TV 2024", 850))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(change.previous, Price::new(1_000));
    assert_eq!(change.current, Price::new(850));
    assert_eq!(change.subscribers, vec![100, 200]);

    let stored = engine.product(product.id).await.unwrap();
    assert_eq!(stored.previous_price, 1_000);
    assert_eq!(stored.current_price, 850);
    assert_eq!(stored.name.as_deref(), Some("TV 2024"));

    let second = engine
        .update_price(product.id, &listing("TV 2024", 900))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.previous, Price::new(850));
    assert_eq!(second.current, Price::new(900));
}

#[tokio::test]
async fn price_update_of_deleted_product_is_ignored() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();
    engine.untrack(100, product.id).await.unwrap();

    let change = engine
        .update_price(product.id, &listing("TV", 500))
        .await
        .unwrap();

    assert_eq!(change, None);
}

#[tokio::test]
async fn admin_can_rename_and_delete_products() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    let product = engine
        .track(100, TV, &listing("TV", 1_000))
        .await
        .unwrap()
        .product()
        .clone();

    let renamed = engine.rename_product(product.id, "  OLED  ").await.unwrap();
    assert_eq!(renamed.name.as_deref(), Some("OLED"));
    assert!(matches!(
        engine.rename_product(product.id, " ").await,
        Err(EngineError::InvalidName(_))
    ));

    engine.delete_product(product.id).await.unwrap();
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(users_products::Entity::find().count(&db).await.unwrap(), 0);
}
