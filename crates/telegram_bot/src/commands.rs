//! Chat commands

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Команды бота:")]
pub enum Command {
    #[command(description = "Открыть меню.")]
    Start,
    #[command(description = "Как пользоваться ботом.")]
    Help,
    #[command(description = "Зарегистрироваться по секретному ключу.")]
    AddUser,
    #[command(description = "Меню администратора.")]
    Admin,
    #[command(description = "Попросить доступ у администратора.")]
    Join,
    #[command(description = "Выйти из меню.")]
    Stop,
    #[command(description = "Загрузить базу данных в бота.")]
    DownloadDb,
    #[command(description = "Выгрузить базу данных из бота.")]
    UploadDb,
}
