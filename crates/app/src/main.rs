use std::{net::SocketAddr, sync::Arc, time::Duration};

use engine::{Engine, Price};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

type AppError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "price_tracker={level},telegram_bot={level},server={level},engine={level},catalog={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(
        Engine::builder()
            .database(db)
            .admin_key(
                settings
                    .telegram
                    .as_ref()
                    .map(|t| t.admin_key.as_str())
                    .unwrap_or_default(),
            )
            .panel_password(
                settings
                    .server
                    .as_ref()
                    .map(|s| s.admin_password.as_str())
                    .unwrap_or_default(),
            )
            .build()
            .await?,
    );

    let address = match &settings.server {
        Some(server) => {
            let bind = server.bind.as_deref().unwrap_or("127.0.0.1");
            Some(format!("{bind}:{}", server.port).parse::<SocketAddr>()?)
        }
        None => None,
    };

    let mut webhook = None;
    if let Some(telegram) = settings.telegram {
        tracing::info!("Found telegram settings...");
        let fetcher = Arc::new(catalog::OnlinerFetcher::new()?);
        let bot = telegram_bot::Bot::builder()
            .token(&telegram.token)
            .engine(engine.clone())
            .fetcher(fetcher)
            .conversation_timeout(Duration::from_secs(telegram.conversation_timeout_secs))
            .notify_every(Duration::from_secs(settings.notifier.interval_secs))
            .threshold(Price::new(settings.notifier.threshold_minor))
            .build()?;

        match (&telegram.webhook_url, address) {
            (Some(url), Some(address)) => {
                let dispatch = bot.webhook(address, url).await?;
                webhook = Some(server::Webhook::new(dispatch.router, dispatch.stopped));
                tasks.spawn(dispatch.dispatch);
            }
            (Some(_), None) => {
                tracing::warn!("webhook url set without server settings, falling back to polling");
                let bot = bot.clone();
                tasks.spawn(async move { bot.run().await });
            }
            (None, _) => {
                let bot = bot.clone();
                tasks.spawn(async move { bot.run().await });
            }
        }

        let notifier = bot.clone();
        tasks.spawn(async move { notifier.run_notifier().await });
        tasks.spawn(async move { bot.run_session_sweeper().await });
    }

    if let Some(address) = address {
        tracing::info!("Found server settings...");
        let listener = tokio::net::TcpListener::bind(address).await?;
        let engine = engine.clone();
        tasks.spawn(async move {
            if let Err(err) = server::run_with_listener(engine, listener, webhook).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(config: &Database) -> Result<sea_orm::DatabaseConnection, AppError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
