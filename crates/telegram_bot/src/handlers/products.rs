use engine::{EngineError, Tracked};
use teloxide::{prelude::*, types::ChatId};

use crate::{
    BotError, ConfigParameters,
    state::{Conversation, MainState},
    ui,
};

use super::{Chat, delete_trigger, show};

/// Tracks the product behind a link typed in the add-product prompt.
///
/// Bad or duplicate links leave the chat in the prompt; everything else
/// returns to the main menu with the outcome as a notice.
pub(super) async fn submit_link(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    link: &str,
) -> Result<(), BotError> {
    delete_trigger(bot, chat).await;

    let (notice, next) = add_product(cfg, chat.id, link).await?;
    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Main(next)).await
}

/// Checks, fetches and tracks `link`. The page is fetched only for a valid
/// link the chat does not track yet.
async fn add_product(
    cfg: &ConfigParameters,
    chat_id: ChatId,
    link: &str,
) -> Result<(&'static str, MainState), BotError> {
    if let Some(problem) = check_link(cfg, chat_id, link).await? {
        return Ok((problem, MainState::AwaitingLink));
    }

    let notice = match cfg.fetcher.fetch(link).await {
        Ok(Some(listing)) => match cfg.engine.track(chat_id.0, link, &listing).await {
            Ok(Tracked::AlreadyTracked(_)) => ui::ALREADY_TRACKED,
            Ok(tracked) => {
                tracing::info!(
                    chat_id = chat_id.0,
                    product_id = tracked.product().id,
                    price = %listing.price,
                    "product added"
                );
                ui::PRODUCT_ADDED
            }
            Err(err) => {
                tracing::error!(chat_id = chat_id.0, "product not tracked: {err}");
                ui::PRODUCT_NOT_ADDED
            }
        },
        Ok(None) => {
            tracing::warn!(chat_id = chat_id.0, link, "page has no product title");
            ui::PRODUCT_NOT_ADDED
        }
        Err(err) => {
            tracing::error!(chat_id = chat_id.0, link, "product page not fetched: {err}");
            ui::PRODUCT_NOT_ADDED
        }
    };
    Ok((notice, MainState::Menu))
}

/// Returns the notice to show when `link` cannot be tracked by the chat.
async fn check_link(
    cfg: &ConfigParameters,
    chat_id: ChatId,
    link: &str,
) -> Result<Option<&'static str>, BotError> {
    if !catalog::is_catalog_link(link) {
        return Ok(Some(ui::INVALID_LINK));
    }
    match cfg.engine.is_tracking(chat_id.0, link).await {
        Ok(true) => Ok(Some(ui::ALREADY_TRACKED)),
        Ok(false) => Ok(None),
        Err(EngineError::KeyNotFound(_)) => Ok(Some(ui::PRODUCT_NOT_ADDED)),
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn remove(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    product_id: i32,
) -> Result<(), BotError> {
    let notice = match cfg.engine.untrack(chat.id.0, product_id).await {
        Ok(_) => ui::PRODUCT_REMOVED,
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, product_id, "product not removed: {err}");
            ui::PRODUCT_NOT_REMOVED
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Main(MainState::Menu)).await
}
