//! Registered chats.
//!
//! A user is identified by its Telegram `chat_id`; the username is kept for
//! display and for the admin panel login, and may be missing.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: Option<String>,
    #[sea_orm(unique)]
    pub chat_id: i64,
    pub is_admin: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_products::Entity")]
    UsersProducts,
    #[sea_orm(has_one = "super::session_tokens::Entity")]
    SessionTokens,
}

impl Related<super::users_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersProducts.def()
    }
}

impl Related<super::session_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionTokens.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_products::Relation::Products.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_products::Relation::Users.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Username when known, chat id otherwise.
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), self.chat_id)
    }
}

pub(crate) fn display_name(username: Option<&str>, chat_id: i64) -> String {
    match username {
        Some(username) => username.to_string(),
        None => chat_id.to_string(),
    }
}
