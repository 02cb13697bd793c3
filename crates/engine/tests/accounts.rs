mod common;

use common::{ADMIN_KEY, PANEL_PASSWORD, TV, engine_with_db, listing, member};
use engine::{EngineError, JoinRequested, products, session_tokens, users};
use migration::MigratorTrait;
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn register_with_correct_key_creates_one_user() {
    let (engine, db) = engine_with_db().await;

    let user = engine
        .register_user(100, Some("alice"), ADMIN_KEY)
        .await
        .unwrap();

    assert_eq!(user.chat_id, 100);
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert!(!user.is_admin);
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn register_with_wrong_key_creates_nothing() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .register_user(100, Some("alice"), "guess")
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::WrongKey);
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn register_twice_is_rejected() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;

    let err = engine
        .register_user(100, Some("alice"), ADMIN_KEY)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn username_must_be_unique() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;

    let err = engine
        .register_user(200, Some("alice"), ADMIN_KEY)
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
}

#[tokio::test]
async fn unset_admin_key_refuses_everyone() {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .build()
        .await
        .unwrap();

    let err = engine.register_user(1, None, "").await.unwrap_err();
    assert_eq!(err, EngineError::WrongKey);
}

#[tokio::test]
async fn register_admin_promotes_existing_user() {
    let (engine, db) = engine_with_db().await;
    let alice = member(&engine, 100, "alice").await;

    let admin = engine
        .register_admin(100, Some("alice"), ADMIN_KEY)
        .await
        .unwrap();

    assert_eq!(admin.id, alice.id);
    assert!(admin.is_admin);
    assert!(engine.is_admin(100).await.unwrap());
    assert_eq!(engine.admin_chat_ids().await.unwrap(), vec![100]);
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_set_only_contains_admins() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    engine
        .register_admin(200, Some("bob"), ADMIN_KEY)
        .await
        .unwrap();

    assert!(!engine.is_admin(100).await.unwrap());
    assert!(engine.is_admin(200).await.unwrap());
    assert!(!engine.is_admin(300).await.unwrap());

    let regular: Vec<i64> = engine
        .regular_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.chat_id)
        .collect();
    assert_eq!(regular, vec![100]);
}

#[tokio::test]
async fn deleting_user_removes_token_and_orphan_products() {
    let (engine, db) = engine_with_db().await;
    let admin = engine
        .register_admin(100, Some("alice"), ADMIN_KEY)
        .await
        .unwrap();
    engine.track(100, TV, &listing("TV", 100_000)).await.unwrap();
    engine
        .issue_token("alice", PANEL_PASSWORD)
        .await
        .unwrap();

    engine.delete_user(admin.id).await.unwrap();

    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(session_tokens::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn self_removal_keeps_products_tracked_by_others() {
    let (engine, db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    member(&engine, 200, "bob").await;
    engine.track(100, TV, &listing("TV", 100_000)).await.unwrap();
    engine.track(200, TV, &listing("TV", 100_000)).await.unwrap();

    engine.delete_user_by_chat(100).await.unwrap();

    assert!(engine.user_by_chat(100).await.unwrap().is_none());
    assert_eq!(products::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(engine.products_of(200).await.unwrap().len(), 1);
}

#[tokio::test]
async fn join_request_lifecycle() {
    let (engine, db) = engine_with_db().await;

    let JoinRequested::Created(request) = engine.request_join(300, Some("carol")).await.unwrap()
    else {
        panic!("expected a new request");
    };
    assert!(matches!(
        engine.request_join(300, Some("carol")).await.unwrap(),
        JoinRequested::AlreadyPending(_)
    ));
    assert_eq!(engine.pending_join_count().await.unwrap(), 1);

    let user = engine.approve_join(request.id).await.unwrap();

    assert_eq!(user.chat_id, 300);
    assert_eq!(engine.pending_join_count().await.unwrap(), 0);
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(
        engine.request_join(300, Some("carol")).await.unwrap(),
        JoinRequested::AlreadyMember
    );
}

#[tokio::test]
async fn refused_join_request_is_deleted() {
    let (engine, db) = engine_with_db().await;
    let JoinRequested::Created(request) = engine.request_join(300, None).await.unwrap() else {
        panic!("expected a new request");
    };

    let refused = engine.refuse_join(request.id).await.unwrap();

    assert_eq!(refused.chat_id, 300);
    assert_eq!(engine.pending_join_count().await.unwrap(), 0);
    assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn approving_conflicting_request_still_deletes_it() {
    let (engine, _db) = engine_with_db().await;
    member(&engine, 100, "alice").await;
    let JoinRequested::Created(request) = engine.request_join(300, Some("alice")).await.unwrap()
    else {
        panic!("expected a new request");
    };

    let err = engine.approve_join(request.id).await.unwrap_err();

    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
    assert_eq!(engine.pending_join_count().await.unwrap(), 0);
}

#[tokio::test]
async fn registering_drops_pending_request() {
    let (engine, _db) = engine_with_db().await;
    engine.request_join(100, Some("alice")).await.unwrap();

    member(&engine, 100, "alice").await;

    assert!(engine.join_requests().await.unwrap().is_empty());
}
