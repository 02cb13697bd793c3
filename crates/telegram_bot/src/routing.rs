//! Maps an incoming chat event to what the bot does next.
//!
//! [`route`] is pure: it only looks at the conversation the chat is in and
//! at the event. Permission checks and persistence happen in the handlers.

use std::sync::LazyLock;

use regex::Regex;
use teloxide::types::FileId;

use crate::{
    callback::{Code, Payload},
    commands::Command,
    state::{AdminState, Conversation, MainState, RegistrationState},
};

static ADD_PRODUCT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^Добавить товар для отслеживания$").expect("add product label regex")
});

static PRODUCT_LIST_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^Показать отслеживаемые товары$").expect("product list label regex")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Command(Command),
    Text(String),
    Callback(Payload),
    Document(FileId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// `/start`: a fresh main menu.
    Start,
    Help,
    /// Leaves the menu and clears the session.
    Stop,
    RequestJoin,
    /// `/add_user`.
    StartRegistration,
    /// `/admin`.
    OpenAdmin,
    /// Renders a screen and makes it the current conversation.
    Show(Conversation),
    SubmitLink(String),
    RemoveProduct(i32),
    ApproveJoin(i32),
    RefuseJoin(i32),
    SubmitAdminKey(String),
    DeleteUser(i32),
    ExportDatabase,
    ImportDatabase(FileId),
    SubmitRegistrationKey(String),
    RemoveMyself,
    CancelRegistration,
    /// A button pressed after the session went away.
    SessionEnded,
}

impl Action {
    /// Name used in logs. Typed text (keys, links) is left out.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Help => "help",
            Action::Stop => "stop",
            Action::RequestJoin => "request_join",
            Action::StartRegistration => "start_registration",
            Action::OpenAdmin => "open_admin",
            Action::Show(_) => "show",
            Action::SubmitLink(_) => "submit_link",
            Action::RemoveProduct(_) => "remove_product",
            Action::ApproveJoin(_) => "approve_join",
            Action::RefuseJoin(_) => "refuse_join",
            Action::SubmitAdminKey(_) => "submit_admin_key",
            Action::DeleteUser(_) => "delete_user",
            Action::ExportDatabase => "export_database",
            Action::ImportDatabase(_) => "import_database",
            Action::SubmitRegistrationKey(_) => "submit_registration_key",
            Action::RemoveMyself => "remove_myself",
            Action::CancelRegistration => "cancel_registration",
            Action::SessionEnded => "session_ended",
        }
    }
}

pub(crate) fn route(current: Option<&Conversation>, event: &Event) -> Option<Action> {
    match event {
        Event::Command(command) => Some(route_command(command)),
        Event::Text(text) => route_text(current, text),
        Event::Document(file_id) => match current {
            Some(Conversation::Admin(AdminState::AwaitingFile)) => {
                Some(Action::ImportDatabase(file_id.clone()))
            }
            _ => None,
        },
        Event::Callback(payload) => match current {
            Some(current) => route_callback(current, payload),
            None => Some(Action::SessionEnded),
        },
    }
}

fn route_command(command: &Command) -> Action {
    match command {
        Command::Start => Action::Start,
        Command::Help => Action::Help,
        Command::AddUser => Action::StartRegistration,
        Command::Admin => Action::OpenAdmin,
        Command::Join => Action::RequestJoin,
        Command::Stop => Action::Stop,
        Command::DownloadDb => Action::Show(Conversation::Admin(AdminState::AwaitingFile)),
        Command::UploadDb => Action::ExportDatabase,
    }
}

fn route_text(current: Option<&Conversation>, text: &str) -> Option<Action> {
    match current {
        Some(Conversation::Main(MainState::AwaitingLink)) => {
            return Some(Action::SubmitLink(text.trim().to_string()));
        }
        Some(Conversation::Admin(AdminState::AwaitingKey)) => {
            return Some(Action::SubmitAdminKey(text.trim().to_string()));
        }
        Some(Conversation::AddUser(RegistrationState::AwaitingKey)) => {
            return Some(Action::SubmitRegistrationKey(text.trim().to_string()));
        }
        _ => {}
    }

    let text = text.trim();
    if ADD_PRODUCT_LABEL.is_match(text) {
        Some(Action::Show(Conversation::Main(MainState::AwaitingLink)))
    } else if PRODUCT_LIST_LABEL.is_match(text) {
        Some(Action::Show(Conversation::Main(MainState::ProductList)))
    } else {
        None
    }
}

fn back_from(current: &Conversation) -> Action {
    match (current.parent(), current) {
        (Some(parent), _) => Action::Show(parent),
        (None, Conversation::AddUser(_)) => Action::CancelRegistration,
        (None, _) => Action::Stop,
    }
}

fn route_callback(current: &Conversation, payload: &Payload) -> Option<Action> {
    use Conversation::*;

    match payload.code {
        Code::Stop => return Some(Action::Stop),
        Code::Back | Code::Cancel => return Some(back_from(current)),
        _ => {}
    }

    let action = match (current, payload.code, payload.id) {
        (Main(MainState::Menu), Code::AddProduct, _) => {
            Action::Show(Main(MainState::AwaitingLink))
        }
        (Main(MainState::Menu), Code::ProductList, _) => {
            Action::Show(Main(MainState::ProductList))
        }
        (Main(MainState::Menu), Code::JoinRequests, _) => {
            Action::Show(Main(MainState::JoinRequests))
        }
        (Main(MainState::ProductList), Code::Product, Some(product_id)) => {
            Action::Show(Main(MainState::ProductActions { product_id }))
        }
        (Main(MainState::ProductActions { product_id }), Code::RemoveProduct, Some(id))
            if *product_id == id =>
        {
            Action::RemoveProduct(id)
        }
        (Main(MainState::JoinRequests), Code::JoinRequest, Some(request_id)) => {
            Action::Show(Main(MainState::JoinRequestActions { request_id }))
        }
        (Main(MainState::JoinRequestActions { request_id }), Code::ApproveJoin, Some(id))
            if *request_id == id =>
        {
            Action::ApproveJoin(id)
        }
        (Main(MainState::JoinRequestActions { request_id }), Code::RefuseJoin, Some(id))
            if *request_id == id =>
        {
            Action::RefuseJoin(id)
        }
        (Admin(AdminState::Menu), Code::CreateAdmin, _) => {
            Action::Show(Admin(AdminState::AwaitingKey))
        }
        (Admin(AdminState::Menu), Code::Users, _) => Action::Show(Admin(AdminState::Users)),
        (Admin(AdminState::Menu), Code::Database, _) => {
            Action::Show(Admin(AdminState::Database))
        }
        (Admin(AdminState::Users), Code::User, Some(user_id)) => {
            Action::Show(Admin(AdminState::UserActions { user_id }))
        }
        (Admin(AdminState::UserActions { user_id }), Code::DeleteUser, Some(id))
            if *user_id == id =>
        {
            Action::DeleteUser(id)
        }
        (Admin(AdminState::Database), Code::ImportDatabase, _) => {
            Action::Show(Admin(AdminState::AwaitingFile))
        }
        (Admin(AdminState::Database), Code::ExportDatabase, _) => Action::ExportDatabase,
        (AddUser(RegistrationState::AlreadyRegistered), Code::RemoveMyself, _) => {
            Action::RemoveMyself
        }
        _ => return None,
    };
    Some(action)
}
