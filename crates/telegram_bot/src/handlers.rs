use engine::EngineError;
use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{CallbackQuery, ChatId, InlineKeyboardMarkup, MessageId},
};

use crate::{
    BotError, ConfigParameters,
    callback::Payload,
    commands::Command,
    routing::{self, Action, Event},
    state::{AdminState, Conversation, Lookup, MainState, RegistrationState, Session},
    ui,
};

mod admin;
mod database;
mod products;
mod registration;

/// The chat an event came from.
pub(crate) struct Chat {
    pub id: ChatId,
    pub username: Option<String>,
    /// The user message that triggered the event, if any.
    pub trigger: Option<MessageId>,
}

impl Chat {
    fn from_message(msg: &Message) -> Self {
        Self {
            id: msg.chat.id,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            trigger: Some(msg.id),
        }
    }
}

pub(crate) async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    cfg: ConfigParameters,
) -> Result<(), BotError> {
    process(&bot, &cfg, Chat::from_message(&msg), Event::Command(cmd)).await
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
) -> Result<(), BotError> {
    let event = if let Some(document) = msg.document() {
        Event::Document(document.file.id.clone())
    } else if let Some(text) = msg.text() {
        Event::Text(text.to_string())
    } else {
        return Ok(());
    };

    process(&bot, &cfg, Chat::from_message(&msg), event).await
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cfg: ConfigParameters,
) -> Result<(), BotError> {
    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        tracing::debug!("callback not answered: {err}");
    }

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let Some(payload) = q.data.as_deref().and_then(Payload::parse) else {
        tracing::debug!(data = ?q.data, "unknown callback payload");
        return Ok(());
    };

    let chat = Chat {
        id: message.chat().id,
        username: q.from.username.clone(),
        trigger: None,
    };
    process(&bot, &cfg, chat, Event::Callback(payload)).await
}

async fn process(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: Chat,
    event: Event,
) -> Result<(), BotError> {
    let current = match cfg.sessions.lookup(chat.id).await {
        Lookup::Active(session) => session.conversation,
        Lookup::Expired(_) => {
            bot.send_message(chat.id, ui::SESSION_TIMEOUT).await?;
            if matches!(event, Event::Callback(_)) {
                return Ok(());
            }
            None
        }
        Lookup::Missing => None,
    };

    let Some(action) = routing::route(current.as_ref(), &event) else {
        tracing::debug!(chat_id = chat.id.0, state = ?current, "event ignored");
        return Ok(());
    };

    tracing::info!(
        chat_id = chat.id.0,
        username = chat.username.as_deref().unwrap_or("-"),
        action = action.name(),
        "chat action"
    );
    perform(bot, cfg, &chat, action).await
}

async fn perform(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat: &Chat,
    action: Action,
) -> Result<(), BotError> {
    match action {
        Action::Start => {
            cfg.sessions.end(chat.id).await;
            show(bot, cfg, chat.id, Conversation::Main(MainState::Menu)).await
        }
        Action::Help => {
            let timeout = cfg.sessions.timeout().as_secs();
            bot.send_message(chat.id, ui::help_text(timeout)).await?;
            Ok(())
        }
        Action::Stop => {
            let session = cfg.sessions.end(chat.id).await;
            close_menu(bot, chat.id, session, ui::MENU_CLOSED).await
        }
        Action::Show(conversation) => show(bot, cfg, chat.id, conversation).await,
        Action::SessionEnded => {
            bot.send_message(chat.id, ui::SESSION_ENDED).await?;
            Ok(())
        }
        Action::SubmitLink(link) => products::submit_link(bot, cfg, chat, &link).await,
        Action::RemoveProduct(product_id) => products::remove(bot, cfg, chat, product_id).await,
        Action::OpenAdmin => admin::open(bot, cfg, chat).await,
        Action::SubmitAdminKey(key) => admin::submit_key(bot, cfg, chat, &key).await,
        Action::ApproveJoin(request_id) => admin::approve_join(bot, cfg, chat, request_id).await,
        Action::RefuseJoin(request_id) => admin::refuse_join(bot, cfg, chat, request_id).await,
        Action::DeleteUser(user_id) => admin::delete_user(bot, cfg, chat, user_id).await,
        Action::ExportDatabase => database::export(bot, cfg, chat).await,
        Action::ImportDatabase(file_id) => database::import(bot, cfg, chat, file_id).await,
        Action::RequestJoin => registration::request_join(bot, cfg, chat).await,
        Action::StartRegistration => registration::start(bot, cfg, chat).await,
        Action::SubmitRegistrationKey(key) => {
            registration::submit_key(bot, cfg, chat, &key).await
        }
        Action::RemoveMyself => registration::remove_myself(bot, cfg, chat).await,
        Action::CancelRegistration => {
            registration::finish(bot, cfg, chat, ui::ACTION_CANCELLED).await
        }
    }
}

enum Screen {
    Render(Conversation, String, InlineKeyboardMarkup),
    /// Member-only screen asked by an unknown chat.
    Unregistered,
    /// Admin-only screen asked by a non admin.
    Refused,
}

/// Renders `conversation` in the menu message and makes it current.
///
/// A screen whose item went away falls back to its list.
pub(crate) async fn show(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat_id: ChatId,
    conversation: Conversation,
) -> Result<(), BotError> {
    match render(cfg, chat_id, conversation).await? {
        Screen::Render(conversation, text, kb) => {
            let notice = cfg.sessions.take_notice(chat_id).await;
            edit_or_send(bot, cfg, chat_id, ui::with_notice(notice.as_deref(), text), kb).await?;
            cfg.sessions.enter(chat_id, conversation).await;
        }
        Screen::Unregistered => {
            cfg.sessions.end(chat_id).await;
            bot.send_message(chat_id, ui::NOT_REGISTERED).await?;
        }
        Screen::Refused => {
            tracing::warn!(chat_id = chat_id.0, state = ?conversation, "admin screen refused");
        }
    }
    Ok(())
}

async fn render(
    cfg: &ConfigParameters,
    chat_id: ChatId,
    conversation: Conversation,
) -> Result<Screen, BotError> {
    let user = cfg.engine.user_by_chat(chat_id.0).await?;
    let is_admin = user.as_ref().is_some_and(|u| u.is_admin);

    let screen = match conversation {
        Conversation::Main(_) if user.is_none() => Screen::Unregistered,
        Conversation::Main(MainState::JoinRequests | MainState::JoinRequestActions { .. })
            if !is_admin =>
        {
            Screen::Refused
        }
        Conversation::Main(state) => render_main(cfg, chat_id, state, is_admin).await?,
        Conversation::Admin(AdminState::Menu) => {
            let (text, kb) = ui::render_admin_menu(is_admin);
            Screen::Render(conversation, text, kb)
        }
        Conversation::Admin(AdminState::AwaitingKey) if is_admin => {
            cfg.sessions.set_notice(chat_id, ui::ALREADY_ADMIN).await;
            let (text, kb) = ui::render_admin_menu(true);
            Screen::Render(Conversation::Admin(AdminState::Menu), text, kb)
        }
        Conversation::Admin(AdminState::AwaitingKey) => {
            let (text, kb) = ui::render_key_prompt();
            Screen::Render(conversation, text, kb)
        }
        Conversation::Admin(_) if !is_admin => Screen::Refused,
        Conversation::Admin(state) => render_admin(cfg, state).await?,
        Conversation::AddUser(RegistrationState::AwaitingKey) => {
            let (text, kb) = ui::render_key_prompt();
            Screen::Render(conversation, text, kb)
        }
        Conversation::AddUser(RegistrationState::AlreadyRegistered) => {
            let (text, kb) = ui::render_already_registered();
            Screen::Render(conversation, text, kb)
        }
    };
    Ok(screen)
}

async fn render_main(
    cfg: &ConfigParameters,
    chat_id: ChatId,
    state: MainState,
    is_admin: bool,
) -> Result<Screen, BotError> {
    let (state, (text, kb)) = match state {
        MainState::Menu => {
            let pending = if is_admin {
                Some(cfg.engine.pending_join_count().await?)
            } else {
                None
            };
            (state, ui::render_main_menu(pending))
        }
        MainState::AwaitingLink => (state, ui::render_link_prompt()),
        MainState::ProductList => {
            let products = cfg.engine.products_of(chat_id.0).await?;
            (state, ui::render_product_list(&products))
        }
        MainState::ProductActions { product_id } => {
            let products = cfg.engine.products_of(chat_id.0).await?;
            match products.iter().find(|p| p.id == product_id) {
                Some(product) => (state, ui::render_product(product)),
                None => (MainState::ProductList, ui::render_product_list(&products)),
            }
        }
        MainState::JoinRequests => {
            let requests = cfg.engine.join_requests().await?;
            (state, ui::render_join_requests(&requests))
        }
        MainState::JoinRequestActions { request_id } => {
            match cfg.engine.join_request(request_id).await {
                Ok(request) => (state, ui::render_join_request(&request)),
                Err(EngineError::KeyNotFound(_)) => {
                    let requests = cfg.engine.join_requests().await?;
                    (MainState::JoinRequests, ui::render_join_requests(&requests))
                }
                Err(err) => return Err(err.into()),
            }
        }
    };
    Ok(Screen::Render(Conversation::Main(state), text, kb))
}

async fn render_admin(cfg: &ConfigParameters, state: AdminState) -> Result<Screen, BotError> {
    let (state, (text, kb)) = match state {
        AdminState::Menu => (state, ui::render_admin_menu(true)),
        AdminState::AwaitingKey => (AdminState::Menu, ui::render_admin_menu(true)),
        AdminState::Users => {
            let users = cfg.engine.regular_users().await?;
            (state, ui::render_users(&users))
        }
        AdminState::UserActions { user_id } => match cfg.engine.user(user_id).await {
            Ok(user) if !user.is_admin => (state, ui::render_user(&user)),
            Ok(_) | Err(EngineError::KeyNotFound(_)) => {
                let users = cfg.engine.regular_users().await?;
                (AdminState::Users, ui::render_users(&users))
            }
            Err(err) => return Err(err.into()),
        },
        AdminState::Database => (state, ui::render_database_menu()),
        AdminState::AwaitingFile => (state, ui::render_file_prompt()),
    };
    Ok(Screen::Render(Conversation::Admin(state), text, kb))
}

/// Edits the menu message of the chat, or sends a new one.
async fn edit_or_send(
    bot: &Bot,
    cfg: &ConfigParameters,
    chat_id: ChatId,
    text: String,
    kb: InlineKeyboardMarkup,
) -> Result<(), BotError> {
    let menu_message_id = cfg
        .sessions
        .get(chat_id)
        .await
        .and_then(|s| s.menu_message_id);
    if let Some(message_id) = menu_message_id {
        match bot
            .edit_message_text(chat_id, message_id, text.clone())
            .reply_markup(kb.clone())
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(()),
            Err(err) => tracing::debug!(chat_id = chat_id.0, "menu not edited: {err}"),
        }
    }

    let sent = bot.send_message(chat_id, text).reply_markup(kb).await?;
    cfg.sessions
        .update(chat_id, |s| s.menu_message_id = Some(sent.id))
        .await;
    Ok(())
}

/// Replaces the menu of an ended session with a closing line.
async fn close_menu(
    bot: &Bot,
    chat_id: ChatId,
    session: Option<Session>,
    text: &str,
) -> Result<(), BotError> {
    if let Some(message_id) = session.and_then(|s| s.menu_message_id)
        && bot
            .edit_message_text(chat_id, message_id, text)
            .await
            .is_ok()
    {
        return Ok(());
    }

    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Deletes the message that triggered the event, so typed secrets and links
/// do not stay in the chat.
async fn delete_trigger(bot: &Bot, chat: &Chat) {
    let Some(message_id) = chat.trigger else {
        return;
    };
    if let Err(err) = bot.delete_message(chat.id, message_id).await {
        tracing::debug!(chat_id = chat.id.0, "message not deleted: {err}");
    }
}

async fn is_admin(cfg: &ConfigParameters, chat: &Chat) -> Result<bool, BotError> {
    let is_admin = cfg.engine.is_admin(chat.id.0).await?;
    if !is_admin {
        tracing::warn!(chat_id = chat.id.0, "admin action refused");
    }
    Ok(is_admin)
}
