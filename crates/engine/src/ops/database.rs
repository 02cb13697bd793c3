use std::path::Path;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, ResultEngine, products, session_tokens, unregistered_users, users,
    users_products,
};

use super::{Engine, collect_orphans, with_tx};

/// Rows per `INSERT` while importing, well below SQLite's bound-parameter
/// limit for the widest table.
const IMPORT_CHUNK: usize = 500;

/// Rows copied by [`Engine::import_from`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub products: usize,
    pub links: usize,
    pub session_tokens: usize,
    pub join_requests: usize,
    /// Imported products nobody tracked, dropped on the way in.
    pub orphans_removed: usize,
}

impl Engine {
    /// Writes a consistent snapshot of the database to `path`.
    ///
    /// `path` must not exist yet. An in-memory database cannot be exported:
    /// SQLite keeps its `VACUUM INTO` copy in memory as well.
    pub async fn export_to(&self, path: &Path) -> ResultEngine<()> {
        let backend = self.database.get_database_backend();
        self.database
            .execute(Statement::from_sql_and_values(
                backend,
                "VACUUM INTO ?",
                vec![path.to_string_lossy().to_string().into()],
            ))
            .await?;
        if !path.is_file() {
            return Err(EngineError::Export(format!(
                "no snapshot written to {}",
                path.display()
            )));
        }
        tracing::info!(path = %path.display(), "database exported");
        Ok(())
    }

    /// Opens the SQLite file at `path` read-only and imports it.
    pub async fn import_file(&self, path: &Path) -> ResultEngine<ImportSummary> {
        let source = Database::connect(format!("sqlite:{}?mode=ro", path.display())).await?;
        let summary = self.import_from(&source).await;
        if let Err(err) = source.close().await {
            tracing::warn!("failed to close imported database: {err}");
        }
        summary
    }

    /// Replaces every row with the content of `source`.
    ///
    /// `source` must carry the same schema; a missing table fails the import
    /// before anything is touched. The replacement happens in one
    /// transaction.
    pub async fn import_from(&self, source: &DatabaseConnection) -> ResultEngine<ImportSummary> {
        let users = users::Entity::find().all(source).await?;
        let products = products::Entity::find().all(source).await?;
        let links = users_products::Entity::find().all(source).await?;
        let tokens = session_tokens::Entity::find().all(source).await?;
        let requests = unregistered_users::Entity::find().all(source).await?;

        let mut summary = ImportSummary {
            users: users.len(),
            products: products.len(),
            links: links.len(),
            session_tokens: tokens.len(),
            join_requests: requests.len(),
            orphans_removed: 0,
        };
        let product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();

        with_tx!(self, |db_tx| {
            users_products::Entity::delete_many().exec(&db_tx).await?;
            session_tokens::Entity::delete_many().exec(&db_tx).await?;
            unregistered_users::Entity::delete_many().exec(&db_tx).await?;
            products::Entity::delete_many().exec(&db_tx).await?;
            users::Entity::delete_many().exec(&db_tx).await?;

            insert_chunked(&db_tx, users.into_iter().map(users::ActiveModel::from)).await?;
            insert_chunked(&db_tx, products.into_iter().map(products::ActiveModel::from)).await?;
            insert_chunked(&db_tx, links.into_iter().map(users_products::ActiveModel::from))
                .await?;
            insert_chunked(&db_tx, tokens.into_iter().map(session_tokens::ActiveModel::from))
                .await?;
            insert_chunked(
                &db_tx,
                requests.into_iter().map(unregistered_users::ActiveModel::from),
            )
            .await?;

            summary.orphans_removed = collect_orphans(&db_tx, product_ids).await?.len();
            tracing::info!(?summary, "database imported");
            Ok(summary)
        })
    }
}

/// Inserts `rows` with their ids, [`IMPORT_CHUNK`] rows per statement.
async fn insert_chunked<A, C>(db: &C, rows: impl IntoIterator<Item = A>) -> ResultEngine<()>
where
    A: ActiveModelTrait + Send,
    C: ConnectionTrait,
{
    let mut rows = rows.into_iter().map(ActiveModelTrait::reset_all).peekable();
    while rows.peek().is_some() {
        let chunk: Vec<A> = rows.by_ref().take(IMPORT_CHUNK).collect();
        A::Entity::insert_many(chunk).exec(db).await?;
    }
    Ok(())
}
