use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE: &str = "price_tracker.db";
const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|refresh|status]";

/// Same SQLite file the bot uses: `DATABASE_URL`, then the app setting
/// `PRICE_TRACKER__DATABASE__SQLITE`, then `./price_tracker.db`.
fn database_url() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }
    let path = std::env::var("PRICE_TRACKER__DATABASE__SQLITE")
        .unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
    format!("sqlite:{path}?mode=rwc")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cmd = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db = Database::connect(database_url()).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        "down" => migration::Migrator::down(&db, Some(1)).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
