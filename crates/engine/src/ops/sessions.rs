use sea_orm::{ActiveValue, ModelTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, session_tokens, users};

use super::{Engine, with_tx};

impl Engine {
    /// Logs an admin into the panel and returns a fresh token.
    ///
    /// A previous token of the same user is replaced.
    pub async fn issue_token(&self, username: &str, password: &str) -> ResultEngine<String> {
        if self.panel_password.is_empty() || password != self.panel_password {
            return Err(EngineError::WrongKey);
        }

        with_tx!(self, |db_tx| {
            let user = users::Entity::find()
                .filter(users::Column::Username.eq(username.trim()))
                .filter(users::Column::IsAdmin.eq(true))
                .one(&db_tx)
                .await?
                .ok_or(EngineError::WrongKey)?;

            session_tokens::Entity::delete_many()
                .filter(session_tokens::Column::UserId.eq(user.id))
                .exec(&db_tx)
                .await?;
            let token = session_tokens::ActiveModel {
                id: ActiveValue::NotSet,
                token: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(user.id),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(user_id = user.id, "issued panel token");
            Ok(token.token)
        })
    }

    /// Returns the user owning `token`, if the token exists.
    pub async fn token_owner(&self, token: &str) -> ResultEngine<Option<users::Model>> {
        let Some(session) = session_tokens::Entity::find()
            .filter(session_tokens::Column::Token.eq(token))
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        Ok(session.find_related(users::Entity).one(&self.database).await?)
    }

    /// Deletes `token`. Returns `false` when it did not exist.
    pub async fn revoke_token(&self, token: &str) -> ResultEngine<bool> {
        let deleted = session_tokens::Entity::delete_many()
            .filter(session_tokens::Column::Token.eq(token))
            .exec(&self.database)
            .await?;
        Ok(deleted.rows_affected > 0)
    }

    pub async fn session_tokens(&self) -> ResultEngine<Vec<session_tokens::Model>> {
        Ok(session_tokens::Entity::find()
            .order_by_asc(session_tokens::Column::Id)
            .all(&self.database)
            .await?)
    }

    pub async fn delete_session_token(&self, token_id: i32) -> ResultEngine<session_tokens::Model> {
        let session = session_tokens::Entity::find_by_id(token_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("session token {token_id}")))?;
        session_tokens::Entity::delete_by_id(session.id)
            .exec(&self.database)
            .await?;
        Ok(session)
    }
}
