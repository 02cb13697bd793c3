use engine::{EngineError, JoinRequested};
use teloxide::prelude::*;

use crate::{
    BotError, ConfigParameters,
    state::{Conversation, RegistrationState},
    ui,
};

use super::{Chat, close_menu, delete_trigger, show};

/// `/join`: files a join request and tells every admin about it.
pub(super) async fn request_join(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
) -> Result<(), BotError> {
    let reply = match cfg
        .engine
        .request_join(chat.id.0, chat.username.as_deref())
        .await
    {
        Ok(JoinRequested::AlreadyMember) => ui::ALREADY_REGISTERED,
        Ok(JoinRequested::AlreadyPending(_)) => ui::JOIN_SENT,
        Ok(JoinRequested::Created(request)) => {
            notify_admins(bot, cfg, &ui::join_request_notice(&request)).await;
            ui::JOIN_SENT
        }
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, "join request not recorded: {err}");
            ui::JOIN_FAILED
        }
    };

    bot.send_message(chat.id, reply).await?;
    Ok(())
}

async fn notify_admins(bot: &Bot, cfg: &ConfigParameters, text: &str) {
    let admins = match cfg.engine.admin_chat_ids().await {
        Ok(admins) => admins,
        Err(err) => {
            tracing::error!("admins not loaded: {err}");
            return;
        }
    };
    for admin in admins {
        if let Err(err) = bot.send_message(ChatId(admin), text).await {
            tracing::warn!(chat_id = admin, "join notice not sent: {err}");
        }
    }
}

/// `/add_user`.
pub(super) async fn start(bot: &Bot, cfg: &ConfigParameters, chat: &Chat) -> Result<(), BotError> {
    cfg.sessions.end(chat.id).await;

    let state = match cfg.engine.user_by_chat(chat.id.0).await? {
        Some(_) => RegistrationState::AlreadyRegistered,
        None => RegistrationState::AwaitingKey,
    };
    show(bot, cfg, chat.id, Conversation::AddUser(state)).await
}

pub(super) async fn submit_key(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    key: &str,
) -> Result<(), BotError> {
    delete_trigger(bot, chat).await;

    let outcome = match cfg
        .engine
        .register_user(chat.id.0, chat.username.as_deref(), key)
        .await
    {
        Ok(_) => ui::USER_ADDED,
        Err(EngineError::WrongKey) => {
            tracing::warn!(chat_id = chat.id.0, "wrong registration key");
            ui::WRONG_KEY
        }
        Err(EngineError::ExistingKey(_)) => ui::ALREADY_REGISTERED,
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, "user not registered: {err}");
            ui::USER_NOT_ADDED
        }
    };
    finish(bot, cfg, chat, outcome).await
}

pub(super) async fn remove_myself(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
) -> Result<(), BotError> {
    let outcome = match cfg.engine.delete_user_by_chat(chat.id.0).await {
        Ok(_) => ui::REMOVED_MYSELF,
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, "user not removed: {err}");
            ui::NOT_REMOVED_MYSELF
        }
    };
    finish(bot, cfg, chat, outcome).await
}

/// Ends the registration dialog, leaving `outcome` in place of its menu.
pub(super) async fn finish(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    outcome: &str,
) -> Result<(), BotError> {
    let session = cfg.sessions.end(chat.id).await;
    close_menu(bot, chat.id, session, outcome).await
}
