use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DatabaseConnection, PaginatorTrait, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, products, users, users_products};

mod accounts;
mod database;
mod join_requests;
mod sessions;
mod tracking;

pub use database::ImportSummary;
pub use join_requests::JoinRequested;
pub use tracking::{Tracked, Untracked};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    admin_key: String,
    panel_password: String,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Checks a shared secret typed by a user against the admin key.
    ///
    /// An unset key never matches.
    fn check_admin_key(&self, key: &str) -> ResultEngine<()> {
        if self.admin_key.is_empty() || key.trim() != self.admin_key {
            return Err(EngineError::WrongKey);
        }
        Ok(())
    }
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

async fn require_user_by_chat<C: ConnectionTrait>(db: &C, chat_id: i64) -> ResultEngine<users::Model> {
    users::Entity::find()
        .filter(users::Column::ChatId.eq(chat_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("user {chat_id}")))
}

/// Deletes the products among `product_ids` nobody tracks anymore.
///
/// Returns the ids that were deleted.
async fn collect_orphans<C: ConnectionTrait>(
    db: &C,
    product_ids: impl IntoIterator<Item = i32>,
) -> ResultEngine<Vec<i32>> {
    let mut deleted = Vec::new();
    let candidates: HashSet<i32> = product_ids.into_iter().collect();
    for product_id in candidates {
        let trackers = users_products::Entity::find()
            .filter(users_products::Column::ProductsId.eq(product_id))
            .count(db)
            .await?;
        if trackers == 0 {
            products::Entity::delete_by_id(product_id).exec(db).await?;
            tracing::info!(product_id, "deleted product without trackers");
            deleted.push(product_id);
        }
    }
    deleted.sort_unstable();
    Ok(deleted)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    admin_key: String,
    panel_password: String,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Shared secret that lets a chat register itself or become admin.
    pub fn admin_key(mut self, key: &str) -> EngineBuilder {
        self.admin_key = key.trim().to_string();
        self
    }

    /// Password of the admin panel.
    pub fn panel_password(mut self, password: &str) -> EngineBuilder {
        self.panel_password = password.to_string();
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.admin_key.is_empty() {
            tracing::warn!("admin key is not set: registrations will be refused");
        }
        Ok(Engine {
            database: self.database,
            admin_key: self.admin_key,
            panel_password: self.panel_password,
        })
    }
}
