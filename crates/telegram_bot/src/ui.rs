use chrono_tz::Europe::Minsk;
use engine::{products, unregistered_users, users};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::callback::{Code, Payload};

pub(crate) const SESSION_TIMEOUT: &str = "Время ожидания истекло";
pub(crate) const SESSION_ENDED: &str = "Сессия завершена. Введите /start";
pub(crate) const MENU_CLOSED: &str = "Вы вышли из меню";
pub(crate) const NOT_REGISTERED: &str = "Вы не зарегистрированы.\n\n\
    Отправьте /join, чтобы попросить доступ у администратора, \
    или /add_user, если знаете секретный ключ.";

pub(crate) const INVALID_LINK: &str = "❗ Ваша ссылка некорректная";
pub(crate) const ALREADY_TRACKED: &str = "❗ Такая ссылка уже отслеживается";
pub(crate) const PRODUCT_ADDED: &str = "👍 Товар был добавлен для отслеживания";
pub(crate) const PRODUCT_NOT_ADDED: &str = "❗ Не удалось добавить товар";
pub(crate) const PRODUCT_REMOVED: &str = "🔴 Товар удален";
pub(crate) const PRODUCT_NOT_REMOVED: &str = "❗ Не удалось удалить товар";

pub(crate) const JOIN_SENT: &str = "Уведомление отправлено администратору";
pub(crate) const JOIN_FAILED: &str = "Не удалось отправить уведомление";
pub(crate) const ALREADY_REGISTERED: &str = "Вы уже зарегистрированы";
pub(crate) const APPROVE_FAILED: &str = "Ошибка при добавлении пользователя";
pub(crate) const REFUSE_FAILED: &str = "Ошибка при удалении пользователя";

pub(crate) const ALREADY_ADMIN: &str = "Вы уже добавлены как администратор";
pub(crate) const ADMIN_ADDED: &str = "👍 Вы добавлены как администратор";
pub(crate) const WRONG_KEY: &str = "👎 Неправильный ключ";
pub(crate) const ADMIN_FAILED: &str = "⁉ Не удалось добавить Вас как администратора";

pub(crate) const DATABASE_LOADED: &str = "👍 База данных загружена";
pub(crate) const DATABASE_NOT_LOADED: &str = "❗ Не удалось загрузить базу данных";
pub(crate) const DATABASE_NOT_EXPORTED: &str = "❗ Не удалось выгрузить базу данных";

pub(crate) const USER_ADDED: &str = "Пользователь добавлен";
pub(crate) const USER_NOT_ADDED: &str = "Не удалось добавить пользователя";
pub(crate) const REMOVED_MYSELF: &str = "Вы удалены из бота";
pub(crate) const NOT_REMOVED_MYSELF: &str = "Не удалось удалить Вас из бота";
pub(crate) const ACTION_CANCELLED: &str = "Действие отменено";

fn button(label: impl Into<String>, payload: Payload) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, payload.to_string())
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![button("Назад", Payload::new(Code::Back))]
}

fn exit_row() -> Vec<InlineKeyboardButton> {
    vec![button("❌ Выйти из меню", Payload::new(Code::Stop))]
}

/// Puts a pending notice line above a screen text.
pub(crate) fn with_notice(notice: Option<&str>, text: String) -> String {
    match notice {
        Some(notice) => format!("{notice}\n\n{text}"),
        None => text,
    }
}

pub(crate) fn help_text(timeout_secs: u64) -> String {
    format!(
        "Чтобы запустить бота введите команду /start.\n\
         После этого ваш диалог с ботом будет активен {timeout_secs} секунд.\n\
         Если бот перестал реагировать на нажатие кнопок или не отвечает на сообщения, \
         то снова введите команду /start"
    )
}

pub(crate) fn join_request_notice(request: &unregistered_users::Model) -> String {
    format!("Новая заявка на вступление от {}", request.display_name())
}

/// `pending_requests` is shown to admins only.
pub(crate) fn render_main_menu(pending_requests: Option<u64>) -> (String, InlineKeyboardMarkup) {
    let mut rows = vec![
        vec![button("Добавить товар", Payload::new(Code::AddProduct))],
        vec![button("Список товаров", Payload::new(Code::ProductList))],
    ];
    if let Some(pending) = pending_requests {
        rows.push(vec![button(
            format!("Уведомления ({pending})"),
            Payload::new(Code::JoinRequests),
        )]);
    }
    rows.push(exit_row());

    ("Действия:".to_string(), InlineKeyboardMarkup::new(rows))
}

pub(crate) fn render_link_prompt() -> (String, InlineKeyboardMarkup) {
    (
        "🟡 Вставьте URL-адрес товара для отслеживания".to_string(),
        InlineKeyboardMarkup::new(vec![back_row()]),
    )
}

pub(crate) fn render_product_list(products: &[products::Model]) -> (String, InlineKeyboardMarkup) {
    if products.is_empty() {
        return (
            "У вас нет отслеживаемых товаров".to_string(),
            InlineKeyboardMarkup::new(vec![back_row()]),
        );
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|product| {
            vec![button(
                product.display_name(),
                Payload::with_id(product.id, Code::Product),
            )]
        })
        .collect();
    rows.push(back_row());

    (
        "📜 Список отслеживаемых товаров".to_string(),
        InlineKeyboardMarkup::new(rows),
    )
}

pub(crate) fn render_product(product: &products::Model) -> (String, InlineKeyboardMarkup) {
    let updated = product
        .updated_at
        .map(|at| at.with_timezone(&Minsk).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let text = format!(
        "Выбран товар:\n\n🟢 {}\n\nТекущая цена: {} BYN\nОбновлено: {updated}",
        product.display_name(),
        product.current(),
    );

    let mut rows = Vec::new();
    match Url::parse(&product.product_link) {
        Ok(url) => rows.push(vec![InlineKeyboardButton::url("Ссылка на товар", url)]),
        Err(err) => tracing::warn!(product_id = product.id, "stored link is not a url: {err}"),
    }
    rows.push(vec![button(
        "Удалить",
        Payload::with_id(product.id, Code::RemoveProduct),
    )]);
    rows.push(back_row());

    (text, InlineKeyboardMarkup::new(rows))
}

pub(crate) fn render_join_requests(
    requests: &[unregistered_users::Model],
) -> (String, InlineKeyboardMarkup) {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = requests
        .iter()
        .map(|request| {
            vec![button(
                request.display_name(),
                Payload::with_id(request.id, Code::JoinRequest),
            )]
        })
        .collect();
    rows.push(back_row());

    ("Уведомления".to_string(), InlineKeyboardMarkup::new(rows))
}

pub(crate) fn render_join_request(
    request: &unregistered_users::Model,
) -> (String, InlineKeyboardMarkup) {
    (
        format!(
            "Выберите действие для пользователя {}",
            request.display_name()
        ),
        InlineKeyboardMarkup::new(vec![
            vec![
                button("Добавить", Payload::with_id(request.id, Code::ApproveJoin)),
                button("Отказать", Payload::with_id(request.id, Code::RefuseJoin)),
            ],
            back_row(),
        ]),
    )
}

pub(crate) fn render_admin_menu(is_admin: bool) -> (String, InlineKeyboardMarkup) {
    let mut rows = Vec::new();
    if is_admin {
        rows.push(vec![button("👦👧 Пользователи", Payload::new(Code::Users))]);
        rows.push(vec![button("📔 База данных", Payload::new(Code::Database))]);
    } else {
        rows.push(vec![button(
            "🅰 Создать администратора",
            Payload::new(Code::CreateAdmin),
        )]);
    }
    rows.push(exit_row());

    (
        "Меню администратора".to_string(),
        InlineKeyboardMarkup::new(rows),
    )
}

pub(crate) fn render_key_prompt() -> (String, InlineKeyboardMarkup) {
    (
        "Введите секретный ключ".to_string(),
        InlineKeyboardMarkup::new(vec![vec![button("Отмена", Payload::new(Code::Cancel))]]),
    )
}

pub(crate) fn render_users(users: &[users::Model]) -> (String, InlineKeyboardMarkup) {
    if users.is_empty() {
        return (
            "Вы еще не добавили пользователей".to_string(),
            InlineKeyboardMarkup::new(vec![back_row()]),
        );
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = users
        .iter()
        .map(|user| vec![button(user.display_name(), Payload::with_id(user.id, Code::User))])
        .collect();
    rows.push(back_row());

    ("👦👧 Пользователи".to_string(), InlineKeyboardMarkup::new(rows))
}

pub(crate) fn render_user(user: &users::Model) -> (String, InlineKeyboardMarkup) {
    (
        format!("Действия над пользователем '{}'", user.display_name()),
        InlineKeyboardMarkup::new(vec![
            vec![button("Удалить", Payload::with_id(user.id, Code::DeleteUser))],
            back_row(),
        ]),
    )
}

pub(crate) fn render_database_menu() -> (String, InlineKeyboardMarkup) {
    (
        "Действия с базой данных".to_string(),
        InlineKeyboardMarkup::new(vec![
            vec![button(
                "⬆ Загрузить базу данных",
                Payload::new(Code::ImportDatabase),
            )],
            vec![button(
                "⬇ Выгрузить базу данных",
                Payload::new(Code::ExportDatabase),
            )],
            back_row(),
        ]),
    )
}

pub(crate) fn render_file_prompt() -> (String, InlineKeyboardMarkup) {
    (
        "Загрузите файл формата 'db_name.db'".to_string(),
        InlineKeyboardMarkup::new(vec![back_row()]),
    )
}

pub(crate) fn render_already_registered() -> (String, InlineKeyboardMarkup) {
    (
        ALREADY_REGISTERED.to_string(),
        InlineKeyboardMarkup::new(vec![
            vec![button("Удалить себя", Payload::new(Code::RemoveMyself))],
            vec![button("Отмена", Payload::new(Code::Cancel))],
        ]),
    )
}
