use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, Listing, Price};
use migration::MigratorTrait;
use server::{ServerState, router};

const ADMIN_KEY: &str = "s3cret";
const PANEL_PASSWORD: &str = "panel-pass";
const TV: &str = "https://catalog.onliner.by/tv/lg/oled55c3";

async fn engine() -> Arc<Engine> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .admin_key(ADMIN_KEY)
        .panel_password(PANEL_PASSWORD)
        .build()
        .await
        .unwrap();
    Arc::new(engine)
}

async fn app_with_admin() -> (Router, Arc<Engine>, String) {
    let engine = engine().await;
    engine
        .register_admin(1, Some("boss"), ADMIN_KEY)
        .await
        .unwrap();
    let token = engine.issue_token("boss", PANEL_PASSWORD).await.unwrap();
    let app = router(
        ServerState {
            engine: engine.clone(),
        },
        None,
    );
    (app, engine, token)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_running() {
    let app = router(ServerState { engine: engine().await }, None);

    let response = app.oneshot(empty_request("GET", "/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"message": "Bot is running"}));
}

#[tokio::test]
async fn login_with_panel_password_returns_token() {
    let (app, engine, _) = app_with_admin().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/login",
            None,
            json!({"username": "boss", "password": PANEL_PASSWORD}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let owner = engine.token_owner(&token).await.unwrap().unwrap();
    assert_eq!(owner.chat_id, 1);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (app, _, _) = app_with_admin().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/admin/login",
            None,
            json!({"username": "boss", "password": "nope"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guarded_routes_need_a_token() {
    let (app, _, _) = app_with_admin().await;

    let missing = app
        .clone()
        .oneshot(empty_request("GET", "/admin/users", None))
        .await
        .unwrap();
    let unknown = app
        .oneshot(empty_request("GET", "/admin/users", Some("not-a-token")))
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_deleted_admin_stops_working() {
    let (app, engine, _) = app_with_admin().await;
    let helper = engine
        .register_admin(2, Some("helper"), ADMIN_KEY)
        .await
        .unwrap();
    let token = engine.issue_token("helper", PANEL_PASSWORD).await.unwrap();
    engine.delete_user(helper.id).await.unwrap();

    let response = app
        .oneshot(empty_request("GET", "/admin/users", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_users_and_deletes_one() {
    let (app, engine, token) = app_with_admin().await;
    let alice = engine
        .register_user(10, Some("alice"), ADMIN_KEY)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/admin/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert_eq!(users[1]["username"], "alice");
    assert_eq!(users[1]["is_admin"], false);

    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/admin/users/{}", alice.id),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(engine.user_by_chat(10).await.unwrap().is_none());
}

#[tokio::test]
async fn admin_cannot_delete_itself() {
    let (app, engine, token) = app_with_admin().await;
    let boss = engine.user_by_chat(1).await.unwrap().unwrap();

    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/admin/users/{}", boss.id),
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(engine.user_by_chat(1).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_missing_user_is_not_found() {
    let (app, _, token) = app_with_admin().await;

    let response = app
        .oneshot(empty_request("DELETE", "/admin/users/999", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn renames_and_deletes_products() {
    let (app, engine, token) = app_with_admin().await;
    let listing = Listing {
        name: "LG OLED55C3".to_string(),
        price: Price::new(329_900),
    };
    let product = engine.track(1, TV, &listing).await.unwrap().product().clone();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/admin/products", Some(&token)))
        .await
        .unwrap();
    let products = body_json(response).await;
    assert_eq!(products[0]["product_link"], TV);
    assert_eq!(products[0]["current_price_minor"], 329_900);

    let uri = format!("/admin/products/{}", product.id);
    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, Some(&token), json!({"name": "  TV  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "TV");

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, Some(&token), json!({"name": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(empty_request("DELETE", &uri, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(engine.products().await.unwrap().is_empty());
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let (app, engine, token) = app_with_admin().await;

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/admin/logout", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(engine.token_owner(&token).await.unwrap().is_none());

    let response = app
        .oneshot(empty_request("GET", "/admin/tokens", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_and_deletes_session_tokens() {
    let (app, engine, token) = app_with_admin().await;
    engine.register_admin(2, Some("helper"), ADMIN_KEY).await.unwrap();
    engine.issue_token("helper", PANEL_PASSWORD).await.unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/admin/tokens", Some(&token)))
        .await
        .unwrap();
    let tokens = body_json(response).await;
    assert_eq!(tokens.as_array().unwrap().len(), 2);
    let helper_token_id = tokens[1]["id"].as_i64().unwrap();

    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/admin/tokens/{helper_token_id}"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(engine.session_tokens().await.unwrap().len(), 1);
}

fn fake_updates() -> Router {
    Router::new().route("/telegram", post(|| async { StatusCode::OK }))
}

#[tokio::test]
async fn webhook_accepts_updates() {
    let app = router(ServerState { engine: engine().await }, Some(fake_updates()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/telegram",
            None,
            json!({"update_id": 42, "message": {"text": "/start"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_rejects_malformed_bodies() {
    let app = router(ServerState { engine: engine().await }, Some(fake_updates()));

    for body in ["not json", "[1, 2]", r#"{"message": {}}"#, r#"{"update_id": "x"}"#] {
        let request = Request::builder()
            .method("POST")
            .uri("/telegram")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}
