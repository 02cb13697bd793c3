use std::path::Path;

use teloxide::{
    net::Download,
    prelude::*,
    types::{FileId, InputFile},
};

use crate::{
    BotError, ConfigParameters,
    state::{AdminState, Conversation},
    ui,
};

use super::{Chat, delete_trigger, is_admin, show};

const EXPORT_FILE_NAME: &str = "price_tracker.db";
const IMPORT_FILE_NAME: &str = "upload.db";

/// Sends a snapshot of the database to the admin as a protected document.
pub(super) async fn export(bot: &Bot, cfg: &ConfigParameters, chat: &Chat) -> Result<(), BotError> {
    if !is_admin(cfg, chat).await? {
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let path = dir.path().join(EXPORT_FILE_NAME);
    if let Err(err) = cfg.engine.export_to(&path).await {
        tracing::error!(chat_id = chat.id.0, "database not exported: {err}");
        bot.send_message(chat.id, ui::DATABASE_NOT_EXPORTED).await?;
        return Ok(());
    }

    bot.send_document(chat.id, InputFile::file(&path))
        .protect_content(true)
        .await?;
    tracing::info!(chat_id = chat.id.0, "database sent");
    show(bot, cfg, chat.id, Conversation::Admin(AdminState::Menu)).await
}

/// Replaces the database with the SQLite file the admin uploaded.
pub(super) async fn import(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    file_id: FileId,
) -> Result<(), BotError> {
    if !is_admin(cfg, chat).await? {
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let path = dir.path().join(IMPORT_FILE_NAME);
    let loaded = load(bot, cfg, file_id, &path).await;
    delete_trigger(bot, chat).await;
    let notice = match loaded {
        Ok(()) => ui::DATABASE_LOADED,
        Err(err) => {
            tracing::error!(chat_id = chat.id.0, "database not imported: {err}");
            ui::DATABASE_NOT_LOADED
        }
    };

    cfg.sessions.set_notice(chat.id, notice).await;
    show(bot, cfg, chat.id, Conversation::Admin(AdminState::Menu)).await
}

async fn load(
    bot: &Bot,
    cfg: &ConfigParameters,
    file_id: FileId,
    path: &Path,
) -> Result<(), BotError> {
    let file = bot.get_file(file_id).await?;
    let mut dst = tokio::fs::File::create(path).await?;
    bot.download_file(&file.path, &mut dst).await?;
    dst.sync_all().await?;
    drop(dst);

    let summary = cfg.engine.import_file(path).await?;
    tracing::info!(
        users = summary.users,
        products = summary.products,
        links = summary.links,
        join_requests = summary.join_requests,
        orphans_removed = summary.orphans_removed,
        "database imported"
    );
    Ok(())
}
