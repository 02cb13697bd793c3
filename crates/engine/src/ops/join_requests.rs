use sea_orm::{ActiveValue, Condition, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, unregistered_users, users};

use super::{Engine, normalize_optional_text, with_tx};

/// Outcome of [`Engine::request_join`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinRequested {
    Created(unregistered_users::Model),
    AlreadyPending(unregistered_users::Model),
    AlreadyMember,
}

impl Engine {
    /// Records that a chat asks to be let in.
    pub async fn request_join(
        &self,
        chat_id: i64,
        username: Option<&str>,
    ) -> ResultEngine<JoinRequested> {
        let username = normalize_optional_text(username);

        with_tx!(self, |db_tx| {
            if users::Entity::find()
                .filter(users::Column::ChatId.eq(chat_id))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Ok(JoinRequested::AlreadyMember);
            }

            if let Some(pending) = unregistered_users::Entity::find()
                .filter(unregistered_users::Column::ChatId.eq(chat_id))
                .one(&db_tx)
                .await?
            {
                return Ok(JoinRequested::AlreadyPending(pending));
            }

            let request = unregistered_users::ActiveModel {
                id: ActiveValue::NotSet,
                username: ActiveValue::Set(username),
                chat_id: ActiveValue::Set(chat_id),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(chat_id, request_id = request.id, "join requested");
            Ok(JoinRequested::Created(request))
        })
    }

    pub async fn join_requests(&self) -> ResultEngine<Vec<unregistered_users::Model>> {
        Ok(unregistered_users::Entity::find()
            .order_by_asc(unregistered_users::Column::Id)
            .all(&self.database)
            .await?)
    }

    pub async fn join_request(&self, request_id: i32) -> ResultEngine<unregistered_users::Model> {
        unregistered_users::Entity::find_by_id(request_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("join request {request_id}")))
    }

    pub async fn pending_join_count(&self) -> ResultEngine<u64> {
        Ok(unregistered_users::Entity::find()
            .count(&self.database)
            .await?)
    }

    /// Turns a join request into a regular user.
    ///
    /// The request is deleted even when the chat or the username is already
    /// taken by a user, in which case `ExistingKey` is returned.
    pub async fn approve_join(&self, request_id: i32) -> ResultEngine<users::Model> {
        let db_tx = self.database.begin().await?;
        let request = unregistered_users::Entity::find_by_id(request_id)
            .one(&db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("join request {request_id}")))?;
        unregistered_users::Entity::delete_by_id(request.id)
            .exec(&db_tx)
            .await?;

        let mut taken = Condition::any().add(users::Column::ChatId.eq(request.chat_id));
        if let Some(username) = &request.username {
            taken = taken.add(users::Column::Username.eq(username.as_str()));
        }
        let outcome = if users::Entity::find()
            .filter(taken)
            .one(&db_tx)
            .await?
            .is_some()
        {
            tracing::warn!(request_id, "join request dropped: user already exists");
            Err(EngineError::ExistingKey(request.display_name()))
        } else {
            let user = users::ActiveModel {
                id: ActiveValue::NotSet,
                username: ActiveValue::Set(request.username.clone()),
                chat_id: ActiveValue::Set(request.chat_id),
                is_admin: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(request_id, user_id = user.id, "join request approved");
            Ok(user)
        };

        // The request goes away in both cases.
        db_tx.commit().await?;
        outcome
    }

    /// Drops a join request without creating a user.
    pub async fn refuse_join(&self, request_id: i32) -> ResultEngine<unregistered_users::Model> {
        let request = self.join_request(request_id).await?;
        unregistered_users::Entity::delete_by_id(request.id)
            .exec(&self.database)
            .await?;
        tracing::info!(request_id, "join request refused");
        Ok(request)
    }
}
