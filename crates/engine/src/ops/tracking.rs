use chrono::Utc;
use sea_orm::{
    ActiveValue, ModelTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, Listing, Price, PriceChange, ResultEngine, products, users, users_products,
};

use super::{Engine, collect_orphans, require_user_by_chat, with_tx};

/// Outcome of [`Engine::track`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tracked {
    /// First tracker of this link: the product was created.
    Created(products::Model),
    /// The product already existed, the user is now one of its trackers.
    Linked(products::Model),
    /// The user already tracks this link; nothing changed.
    AlreadyTracked(products::Model),
}

impl Tracked {
    pub fn product(&self) -> &products::Model {
        match self {
            Tracked::Created(product) | Tracked::Linked(product) | Tracked::AlreadyTracked(product) => {
                product
            }
        }
    }
}

/// Outcome of [`Engine::untrack`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Untracked {
    /// Other users still track the product.
    Unlinked(products::Model),
    /// The user was the last tracker and the product is gone.
    Deleted(products::Model),
}

impl Engine {
    /// Returns `true` when the chat already tracks `link`.
    pub async fn is_tracking(&self, chat_id: i64, link: &str) -> ResultEngine<bool> {
        let user = require_user_by_chat(&self.database, chat_id).await?;
        let Some(product) = products::Entity::find()
            .filter(products::Column::ProductLink.eq(link.trim()))
            .one(&self.database)
            .await?
        else {
            return Ok(false);
        };

        Ok(users_products::Entity::find_by_id((user.id, product.id))
            .one(&self.database)
            .await?
            .is_some())
    }

    /// Starts tracking `link` for the chat.
    ///
    /// A product row is created on the first tracker only, with both prices
    /// set to the listing price.
    pub async fn track(&self, chat_id: i64, link: &str, listing: &Listing) -> ResultEngine<Tracked> {
        let link = link.trim();
        if !catalog::is_catalog_link(link) {
            return Err(EngineError::InvalidLink(link.to_string()));
        }

        with_tx!(self, |db_tx| {
            let user = require_user_by_chat(&db_tx, chat_id).await?;
            let existing = products::Entity::find()
                .filter(products::Column::ProductLink.eq(link))
                .one(&db_tx)
                .await?;

            let tracked = match existing {
                Some(product) => {
                    if users_products::Entity::find_by_id((user.id, product.id))
                        .one(&db_tx)
                        .await?
                        .is_some()
                    {
                        Tracked::AlreadyTracked(product)
                    } else {
                        link_user(&db_tx, user.id, product.id).await?;
                        Tracked::Linked(product)
                    }
                }
                None => {
                    let product = products::ActiveModel {
                        id: ActiveValue::NotSet,
                        product_link: ActiveValue::Set(link.to_string()),
                        name: ActiveValue::Set(Some(listing.name.clone())),
                        current_price: ActiveValue::Set(listing.price.minor()),
                        previous_price: ActiveValue::Set(listing.price.minor()),
                        updated_at: ActiveValue::Set(Some(Utc::now())),
                    }
                    .insert(&db_tx)
                    .await?;
                    link_user(&db_tx, user.id, product.id).await?;
                    Tracked::Created(product)
                }
            };

            tracing::info!(chat_id, product_id = tracked.product().id, "track product");
            Ok(tracked)
        })
    }

    /// Stops tracking a product for the chat, deleting it if nobody else
    /// tracks it.
    pub async fn untrack(&self, chat_id: i64, product_id: i32) -> ResultEngine<Untracked> {
        with_tx!(self, |db_tx| {
            let user = require_user_by_chat(&db_tx, chat_id).await?;
            let product = products::Entity::find_by_id(product_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("product {product_id}")))?;

            let removed = users_products::Entity::delete_by_id((user.id, product.id))
                .exec(&db_tx)
                .await?;
            if removed.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!("product {product_id}")));
            }

            let deleted = collect_orphans(&db_tx, [product.id]).await?;
            tracing::info!(chat_id, product_id, "untrack product");
            if deleted.contains(&product.id) {
                Ok(Untracked::Deleted(product))
            } else {
                Ok(Untracked::Unlinked(product))
            }
        })
    }

    /// Products tracked by the chat, oldest first.
    pub async fn products_of(&self, chat_id: i64) -> ResultEngine<Vec<products::Model>> {
        let user = require_user_by_chat(&self.database, chat_id).await?;
        Ok(user
            .find_related(products::Entity)
            .order_by_asc(products::Column::Id)
            .all(&self.database)
            .await?)
    }

    pub async fn product(&self, product_id: i32) -> ResultEngine<products::Model> {
        products::Entity::find_by_id(product_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("product {product_id}")))
    }

    pub async fn products(&self) -> ResultEngine<Vec<products::Model>> {
        Ok(products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.database)
            .await?)
    }

    /// Stores a freshly read listing.
    ///
    /// Nothing is written when the price did not change. Otherwise the stored
    /// current price becomes the previous one and the new price becomes
    /// current, in a single statement guarded on the current price read
    /// before: a concurrent update or delete turns this call into a no-op.
    pub async fn update_price(
        &self,
        product_id: i32,
        listing: &Listing,
    ) -> ResultEngine<Option<PriceChange>> {
        let Some(product) = products::Entity::find_by_id(product_id)
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        if product.current_price == listing.price.minor() {
            return Ok(None);
        }

        let updated = products::Entity::update_many()
            .col_expr(
                products::Column::PreviousPrice,
                Expr::value(product.current_price),
            )
            .col_expr(
                products::Column::CurrentPrice,
                Expr::value(listing.price.minor()),
            )
            .col_expr(products::Column::Name, Expr::value(listing.name.clone()))
            .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(products::Column::Id.eq(product.id))
            .filter(products::Column::CurrentPrice.eq(product.current_price))
            .exec(&self.database)
            .await?;
        if updated.rows_affected == 0 {
            tracing::debug!(product_id, "price changed concurrently, skipping");
            return Ok(None);
        }

        let subscribers = product
            .find_related(users::Entity)
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|user| user.chat_id)
            .collect();

        Ok(Some(PriceChange {
            product_id: product.id,
            name: listing.name.clone(),
            link: product.product_link,
            previous: Price::new(product.current_price),
            current: listing.price,
            subscribers,
        }))
    }

    /// Renames a product from the admin panel.
    pub async fn rename_product(&self, product_id: i32, name: &str) -> ResultEngine<products::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidName(
                "product name must not be empty".to_string(),
            ));
        }
        let product = self.product(product_id).await?;
        let mut product: products::ActiveModel = product.into();
        product.name = ActiveValue::Set(Some(name.to_string()));
        Ok(product.update(&self.database).await?)
    }

    /// Deletes a product and every link to it.
    pub async fn delete_product(&self, product_id: i32) -> ResultEngine<products::Model> {
        with_tx!(self, |db_tx| {
            let product = products::Entity::find_by_id(product_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("product {product_id}")))?;
            users_products::Entity::delete_many()
                .filter(users_products::Column::ProductsId.eq(product.id))
                .exec(&db_tx)
                .await?;
            products::Entity::delete_by_id(product.id).exec(&db_tx).await?;
            Ok(product)
        })
    }
}

async fn link_user<C: sea_orm::ConnectionTrait>(db: &C, user_id: i32, product_id: i32) -> ResultEngine<()> {
    users_products::ActiveModel {
        users_id: ActiveValue::Set(user_id),
        products_id: ActiveValue::Set(product_id),
    }
    .insert(db)
    .await?;
    Ok(())
}
