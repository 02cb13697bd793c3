//! Telegram bot.
//!
//! The bot drives a menu conversation per chat on top of [`Engine`] and
//! pushes price change notifications to the trackers of a product.

use std::{future::Future, net::SocketAddr, pin::Pin, sync::Arc, time::Duration};

use catalog::PriceFetcher;
use engine::{Engine, EngineError, Price};
use teloxide::{
    dispatching::{DefaultKey, Dispatcher, UpdateHandler},
    prelude::*,
    update_listeners::webhooks,
};
use thiserror::Error;
use url::Url;

mod callback;
mod commands;
mod handlers;
mod notifications;
mod routing;
mod state;
mod ui;

pub use commands::Command;

const DEFAULT_CONVERSATION_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_NOTIFY_EVERY: Duration = Duration::from_secs(3600);
const DEFAULT_THRESHOLD: Price = Price::new(100);
const SWEEP_EVERY: Duration = Duration::from_secs(5);

/// Path the webhook is registered under, relative to the public base URL.
pub const WEBHOOK_PATH: &str = "telegram";

#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Request(#[from] teloxide::RequestError),
    #[error(transparent)]
    Download(#[from] teloxide::DownloadError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid webhook url: {0}")]
    WebhookUrl(String),
}

#[derive(Clone)]
pub struct ConfigParameters {
    engine: Arc<Engine>,
    fetcher: Arc<dyn PriceFetcher>,
    sessions: state::SessionStore,
}

/// The pieces needed to receive updates through a webhook.
pub struct WebhookDispatch {
    /// Router serving the update endpoint, to be mounted by the HTTP server.
    pub router: axum::Router,
    /// Resolves when the dispatcher stops listening.
    pub stopped: Pin<Box<dyn Future<Output = ()> + Send>>,
    /// The dispatcher itself, fed by `router`.
    pub dispatch: Pin<Box<dyn Future<Output = ()> + Send>>,
}

#[derive(Clone)]
pub struct Bot {
    api: teloxide::Bot,
    parameters: ConfigParameters,
    notify_every: Duration,
    threshold: Price,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    fn schema() -> UpdateHandler<BotError> {
        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(handlers::handle_command),
            )
            .branch(Update::filter_message().endpoint(handlers::handle_message))
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
    }

    fn dispatcher(&self) -> Dispatcher<teloxide::Bot, BotError, DefaultKey> {
        Dispatcher::builder(self.api.clone(), Self::schema())
            .dependencies(dptree::deps![self.parameters.clone()])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
    }

    /// Receives updates by long polling.
    pub async fn run(&self) {
        tracing::info!("Starting telegram bot (long polling)...");
        self.dispatcher().dispatch().await;
    }

    /// Registers `{base_url}/telegram` as the webhook and returns the router
    /// answering it along with the dispatcher consuming its updates.
    ///
    /// `address` is only recorded in the webhook options; serving the router
    /// is up to the caller.
    pub async fn webhook(
        &self,
        address: SocketAddr,
        base_url: &Url,
    ) -> Result<WebhookDispatch, BotError> {
        let url = Url::parse(&format!(
            "{}/{WEBHOOK_PATH}",
            base_url.as_str().trim_end_matches('/')
        ))
        .map_err(|err| BotError::WebhookUrl(err.to_string()))?;
        tracing::info!("Starting telegram bot (webhook at {url})...");

        let (listener, stopped, router) =
            webhooks::axum_to_router(self.api.clone(), webhooks::Options::new(address, url))
                .await?;

        let mut dispatcher = self.dispatcher();
        let dispatch = async move {
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        };

        Ok(WebhookDispatch {
            router,
            stopped: Box::pin(stopped),
            dispatch: Box::pin(dispatch),
        })
    }

    /// Re-reads every tracked product on a fixed interval and notifies the
    /// trackers of changed prices.
    pub async fn run_notifier(&self) {
        notifications::run(
            &self.api,
            &self.parameters.engine,
            self.parameters.fetcher.as_ref(),
            self.notify_every,
            self.threshold,
        )
        .await;
    }

    /// Ends idle conversations and tells their chats.
    pub async fn run_session_sweeper(&self) {
        let mut ticker = tokio::time::interval(SWEEP_EVERY);
        loop {
            ticker.tick().await;
            for (chat_id, _) in self.parameters.sessions.take_expired().await {
                tracing::debug!(chat_id = chat_id.0, "conversation timed out");
                if let Err(err) = self.api.send_message(chat_id, ui::SESSION_TIMEOUT).await {
                    tracing::warn!(chat_id = chat_id.0, "timeout notice not sent: {err}");
                }
            }
        }
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    engine: Option<Arc<Engine>>,
    fetcher: Option<Arc<dyn PriceFetcher>>,
    conversation_timeout: Option<Duration>,
    notify_every: Option<Duration>,
    threshold: Option<Price>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn engine(mut self, engine: Arc<Engine>) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PriceFetcher>) -> BotBuilder {
        self.fetcher = Some(fetcher);
        self
    }

    /// Idle time after which a conversation ends.
    pub fn conversation_timeout(mut self, timeout: Duration) -> BotBuilder {
        self.conversation_timeout = Some(timeout);
        self
    }

    pub fn notify_every(mut self, every: Duration) -> BotBuilder {
        self.notify_every = Some(every);
        self
    }

    /// Smallest absolute price change worth a notification.
    pub fn threshold(mut self, threshold: Price) -> BotBuilder {
        self.threshold = Some(threshold);
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("telegram token is not set".to_string());
        }
        let engine = self.engine.ok_or("engine is not set")?;
        let fetcher = self.fetcher.ok_or("price fetcher is not set")?;
        let notify_every = self.notify_every.unwrap_or(DEFAULT_NOTIFY_EVERY);
        if notify_every.is_zero() {
            return Err("notification interval must be positive".to_string());
        }
        let conversation_timeout = self
            .conversation_timeout
            .unwrap_or(DEFAULT_CONVERSATION_TIMEOUT);
        if conversation_timeout.is_zero() {
            return Err("conversation timeout must be positive".to_string());
        }

        Ok(Bot {
            api: teloxide::Bot::new(&self.token),
            parameters: ConfigParameters {
                engine,
                fetcher,
                sessions: state::SessionStore::new(conversation_timeout),
            },
            notify_every,
            threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
        })
    }
}
