use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, session_tokens, unregistered_users, users, users_products,
};

use super::{
    Engine, collect_orphans, normalize_optional_text, require_user_by_chat, with_tx,
};

impl Engine {
    /// Registers the chat as a regular user.
    ///
    /// `key` must match the admin key. A pending join request of the same
    /// chat is dropped since it is now satisfied.
    pub async fn register_user(
        &self,
        chat_id: i64,
        username: Option<&str>,
        key: &str,
    ) -> ResultEngine<users::Model> {
        self.check_admin_key(key)?;
        let username = normalize_optional_text(username);

        with_tx!(self, |db_tx| {
            if users::Entity::find()
                .filter(users::Column::ChatId.eq(chat_id))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(format!("user {chat_id}")));
            }
            ensure_username_free(&db_tx, username.as_deref(), None).await?;

            let user = users::ActiveModel {
                id: ActiveValue::NotSet,
                username: ActiveValue::Set(username),
                chat_id: ActiveValue::Set(chat_id),
                is_admin: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            drop_join_request(&db_tx, chat_id).await?;

            tracing::info!(chat_id, user_id = user.id, "registered user");
            Ok(user)
        })
    }

    /// Makes the chat an admin, registering it first when needed.
    pub async fn register_admin(
        &self,
        chat_id: i64,
        username: Option<&str>,
        key: &str,
    ) -> ResultEngine<users::Model> {
        self.check_admin_key(key)?;
        let username = normalize_optional_text(username);

        with_tx!(self, |db_tx| {
            let existing = users::Entity::find()
                .filter(users::Column::ChatId.eq(chat_id))
                .one(&db_tx)
                .await?;
            ensure_username_free(&db_tx, username.as_deref(), existing.as_ref().map(|u| u.id))
                .await?;

            let user = match existing {
                Some(user) => {
                    let mut user: users::ActiveModel = user.into();
                    user.is_admin = ActiveValue::Set(true);
                    if username.is_some() {
                        user.username = ActiveValue::Set(username);
                    }
                    user.update(&db_tx).await?
                }
                None => {
                    users::ActiveModel {
                        id: ActiveValue::NotSet,
                        username: ActiveValue::Set(username),
                        chat_id: ActiveValue::Set(chat_id),
                        is_admin: ActiveValue::Set(true),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            drop_join_request(&db_tx, chat_id).await?;

            tracing::info!(chat_id, user_id = user.id, "registered admin");
            Ok(user)
        })
    }

    pub async fn user_by_chat(&self, chat_id: i64) -> ResultEngine<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::ChatId.eq(chat_id))
            .one(&self.database)
            .await?)
    }

    pub async fn user(&self, user_id: i32) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    pub async fn is_admin(&self, chat_id: i64) -> ResultEngine<bool> {
        Ok(self
            .user_by_chat(chat_id)
            .await?
            .is_some_and(|user| user.is_admin))
    }

    pub async fn admin_chat_ids(&self) -> ResultEngine<Vec<i64>> {
        Ok(users::Entity::find()
            .filter(users::Column::IsAdmin.eq(true))
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|user| user.chat_id)
            .collect())
    }

    /// Every user, admins included.
    pub async fn users(&self) -> ResultEngine<Vec<users::Model>> {
        Ok(users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?)
    }

    /// Users without admin rights, the ones an admin can manage from chat.
    pub async fn regular_users(&self) -> ResultEngine<Vec<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::IsAdmin.eq(false))
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?)
    }

    /// Deletes a user with its links and session token.
    ///
    /// Products left without trackers are deleted too.
    pub async fn delete_user(&self, user_id: i32) -> ResultEngine<users::Model> {
        with_tx!(self, |db_tx| {
            let user = users::Entity::find_by_id(user_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))?;
            remove_user(&db_tx, &user).await?;
            Ok(user)
        })
    }

    /// Self-removal of a chat.
    pub async fn delete_user_by_chat(&self, chat_id: i64) -> ResultEngine<users::Model> {
        with_tx!(self, |db_tx| {
            let user = require_user_by_chat(&db_tx, chat_id).await?;
            remove_user(&db_tx, &user).await?;
            Ok(user)
        })
    }
}

async fn remove_user<C: ConnectionTrait>(db: &C, user: &users::Model) -> ResultEngine<()> {
    let product_ids: Vec<i32> = users_products::Entity::find()
        .filter(users_products::Column::UsersId.eq(user.id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.products_id)
        .collect();

    users_products::Entity::delete_many()
        .filter(users_products::Column::UsersId.eq(user.id))
        .exec(db)
        .await?;
    session_tokens::Entity::delete_many()
        .filter(session_tokens::Column::UserId.eq(user.id))
        .exec(db)
        .await?;
    users::Entity::delete_by_id(user.id).exec(db).await?;
    collect_orphans(db, product_ids).await?;

    tracing::info!(user_id = user.id, chat_id = user.chat_id, "deleted user");
    Ok(())
}

async fn ensure_username_free<C: ConnectionTrait>(
    db: &C,
    username: Option<&str>,
    except_user_id: Option<i32>,
) -> ResultEngine<()> {
    let Some(username) = username else {
        return Ok(());
    };
    let taken = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some_and(|user| Some(user.id) != except_user_id);
    if taken {
        return Err(EngineError::ExistingKey(username.to_string()));
    }
    Ok(())
}

async fn drop_join_request<C: ConnectionTrait>(db: &C, chat_id: i64) -> ResultEngine<()> {
    unregistered_users::Entity::delete_many()
        .filter(unregistered_users::Column::ChatId.eq(chat_id))
        .exec(db)
        .await?;
    Ok(())
}
