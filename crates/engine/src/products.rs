//! Tracked catalog products.
//!
//! Prices are stored in kopecks. `previous_price` and `current_price` are
//! always written together, see [`Engine::update_price`].
//!
//! [`Engine::update_price`]: crate::Engine::update_price

use catalog::Price;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub product_link: String,
    pub name: Option<String>,
    pub current_price: i64,
    pub previous_price: i64,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_products::Entity")]
    UsersProducts,
}

impl Related<super::users_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersProducts.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_products::Relation::Users.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_products::Relation::Products.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn current(&self) -> Price {
        Price::new(self.current_price)
    }

    pub fn previous(&self) -> Price {
        Price::new(self.previous_price)
    }

    /// Product name, or its link when the name was never read.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.product_link)
    }
}
