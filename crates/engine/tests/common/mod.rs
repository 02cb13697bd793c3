#![allow(dead_code)]

use std::path::Path;

use engine::{Engine, Listing, Price, users};
use sea_orm::{Database, DatabaseConnection};

use migration::MigratorTrait;

pub const ADMIN_KEY: &str = "s3cret";
pub const PANEL_PASSWORD: &str = "panel-pass";

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .admin_key(ADMIN_KEY)
        .panel_password(PANEL_PASSWORD)
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Engine over a SQLite file in `dir`, as deployed.
pub async fn engine_with_file_db(dir: &Path) -> (Engine, DatabaseConnection) {
    let path = dir.join("live.db");
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .admin_key(ADMIN_KEY)
        .panel_password(PANEL_PASSWORD)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn member(engine: &Engine, chat_id: i64, username: &str) -> users::Model {
    engine
        .register_user(chat_id, Some(username), ADMIN_KEY)
        .await
        .unwrap()
}

pub fn listing(name: &str, minor: i64) -> Listing {
    Listing {
        name: name.to_string(),
        price: Price::new(minor),
    }
}

pub const TV: &str = "https://catalog.onliner.by/tv/lg/oled55c3";
pub const LAPTOP: &str = "https://catalog.onliner.by/notebook/apple/mba13m2";
