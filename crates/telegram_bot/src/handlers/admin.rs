use engine::EngineError;
use teloxide::prelude::*;

use crate::{
    BotError, ConfigParameters,
    state::{AdminState, Conversation, MainState},
    ui,
};

use super::{Chat, delete_trigger, is_admin, show};

pub(super) async fn open(bot: &Bot, cfg: &ConfigParameters, chat: &Chat) -> Result<(), BotError> {
    cfg.sessions.end(chat.id).await;
    show(bot, cfg, chat.id, Conversation::Admin(AdminState::Menu)).await
}

pub(super) async fn submit_key(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    key: &str,
) -> Result<(), BotError> {
    delete_trigger(bot, chat).await;

    let notice = match cfg
        .engine
        .register_admin(chat.id.0, chat.username.as_deref(), key)
        .await
    {
        Ok(_) => ui::ADMIN_ADDED,
        Err(EngineError::WrongKey) => {
            tracing::warn!(chat_id = chat.id.0, "wrong admin key");
            ui::WRONG_KEY
        }
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, "admin not registered: {err}");
            ui::ADMIN_FAILED
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Admin(AdminState::Menu)).await
}

pub(super) async fn approve_join(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    request_id: i32,
) -> Result<(), BotError> {
    if !is_admin(cfg, chat).await? {
        return Ok(());
    }

    let approved = match cfg.engine.join_request(request_id).await {
        Ok(request) => cfg
            .engine
            .approve_join(request_id)
            .await
            .map(|_| request.display_name()),
        Err(err) => Err(err),
    };

    let notice = match approved {
        Ok(name) => format!("👍 {name} принят"),
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, request_id, "join request not approved: {err}");
            ui::APPROVE_FAILED.to_string()
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Main(MainState::Menu)).await
}

pub(super) async fn refuse_join(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    request_id: i32,
) -> Result<(), BotError> {
    if !is_admin(cfg, chat).await? {
        return Ok(());
    }

    let notice = match cfg.engine.refuse_join(request_id).await {
        Ok(request) => format!("🔴 {} отклонен", request.display_name()),
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, request_id, "join request not refused: {err}");
            ui::REFUSE_FAILED.to_string()
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Main(MainState::Menu)).await
}

pub(super) async fn delete_user(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    user_id: i32,
) -> Result<(), BotError> {
    if !is_admin(cfg, chat).await? {
        return Ok(());
    }

    let target = cfg.engine.user(user_id).await;
    let name = match &target {
        Ok(user) => user.display_name(),
        Err(_) => user_id.to_string(),
    };
    let deleted = match target {
        Ok(user) if user.is_admin => Err(EngineError::Forbidden(format!("admin {user_id}"))),
        Ok(_) => cfg.engine.delete_user(user_id).await,
        Err(err) => Err(err),
    };

    let notice = match deleted {
        Ok(_) => format!("Пользователь {name} удален"),
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, user_id, "user not deleted: {err}");
            format!("Не удалось удалить пользователя {name}")
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Admin(AdminState::Menu)).await
}
