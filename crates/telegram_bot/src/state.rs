use std::{collections::HashMap, sync::Arc, time::Duration};

use teloxide::types::{ChatId, MessageId};
use tokio::{sync::Mutex, time::Instant};

/// Screens reachable from `/start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MainState {
    Menu,
    AwaitingLink,
    ProductList,
    ProductActions { product_id: i32 },
    JoinRequests,
    JoinRequestActions { request_id: i32 },
}

/// Screens reachable from `/admin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AdminState {
    Menu,
    AwaitingKey,
    Users,
    UserActions { user_id: i32 },
    Database,
    AwaitingFile,
}

/// The `/add_user` dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegistrationState {
    AwaitingKey,
    AlreadyRegistered,
}

/// Where a chat currently is. A chat has at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Conversation {
    Main(MainState),
    Admin(AdminState),
    AddUser(RegistrationState),
}

impl Conversation {
    /// The screen a finished sub-dialog hands control back to.
    ///
    /// Menus and the registration dialog have no parent: leaving them ends
    /// the conversation.
    pub(crate) fn parent(&self) -> Option<Conversation> {
        use Conversation::*;

        match self {
            Main(MainState::Menu) | Admin(AdminState::Menu) | AddUser(_) => None,
            Main(MainState::ProductActions { .. }) => Some(Main(MainState::ProductList)),
            Main(MainState::JoinRequestActions { .. }) => Some(Main(MainState::JoinRequests)),
            Main(_) => Some(Main(MainState::Menu)),
            Admin(AdminState::UserActions { .. }) => Some(Admin(AdminState::Users)),
            Admin(AdminState::AwaitingFile) => Some(Admin(AdminState::Database)),
            Admin(_) => Some(Admin(AdminState::Menu)),
        }
    }
}

/// Per-chat scratch data, dropped when the conversation ends.
#[derive(Clone, Debug)]
pub(crate) struct Session {
    pub conversation: Option<Conversation>,
    /// The bot message holding the menu, edited in place.
    pub menu_message_id: Option<MessageId>,
    /// One-line outcome shown above the next rendered screen.
    pub notice: Option<String>,
    pub touched_at: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            conversation: None,
            menu_message_id: None,
            notice: None,
            touched_at: now,
        }
    }
}

pub(crate) enum Lookup {
    Active(Session),
    /// The session timed out; it has been removed.
    Expired(Session),
    Missing,
}

#[derive(Clone)]
pub(crate) struct SessionStore {
    timeout: Duration,
    inner: Arc<Mutex<HashMap<ChatId, Session>>>,
}

impl SessionStore {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the live session of the chat, expiring it if idle for too
    /// long.
    pub(crate) async fn lookup(&self, chat_id: ChatId) -> Lookup {
        let mut guard = self.inner.lock().await;
        let Some(session) = guard.get(&chat_id) else {
            return Lookup::Missing;
        };

        if session.touched_at.elapsed() >= self.timeout {
            return match guard.remove(&chat_id) {
                Some(session) => Lookup::Expired(session),
                None => Lookup::Missing,
            };
        }
        Lookup::Active(session.clone())
    }

    /// The session of the chat, idle or not.
    pub(crate) async fn get(&self, chat_id: ChatId) -> Option<Session> {
        self.inner.lock().await.get(&chat_id).cloned()
    }

    pub(crate) async fn update<F>(&self, chat_id: ChatId, f: F) -> Session
    where
        F: FnOnce(&mut Session),
    {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        let session = guard.entry(chat_id).or_insert_with(|| Session::new(now));
        f(session);
        session.touched_at = now;
        session.clone()
    }

    pub(crate) async fn enter(&self, chat_id: ChatId, conversation: Conversation) {
        self.update(chat_id, |s| s.conversation = Some(conversation))
            .await;
    }

    pub(crate) async fn set_notice(&self, chat_id: ChatId, notice: impl Into<String>) {
        let notice = notice.into();
        self.update(chat_id, |s| s.notice = Some(notice)).await;
    }

    pub(crate) async fn take_notice(&self, chat_id: ChatId) -> Option<String> {
        let mut guard = self.inner.lock().await;
        guard.get_mut(&chat_id).and_then(|s| s.notice.take())
    }

    /// Ends the conversation of the chat, returning what it held.
    pub(crate) async fn end(&self, chat_id: ChatId) -> Option<Session> {
        self.inner.lock().await.remove(&chat_id)
    }

    /// Removes every idle session.
    pub(crate) async fn take_expired(&self) -> Vec<(ChatId, Session)> {
        let mut guard = self.inner.lock().await;
        let expired: Vec<ChatId> = guard
            .iter()
            .filter(|(_, s)| s.touched_at.elapsed() >= self.timeout)
            .map(|(chat_id, _)| *chat_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|chat_id| guard.remove(&chat_id).map(|s| (chat_id, s)))
            .collect()
    }
}
