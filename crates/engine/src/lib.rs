//! Storage and rules of the price tracker.
//!
//! [`Engine`] is the only way the bot and the server touch the database. It
//! keeps the invariants the schema alone cannot express: a product without
//! trackers is deleted in the same transaction that removed its last tracker,
//! and the previous/current prices of a product move together.

pub use catalog::{Listing, Price};
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder, ImportSummary, JoinRequested, Tracked, Untracked};
pub use price_change::PriceChange;

pub mod products;
pub mod session_tokens;
pub mod unregistered_users;
pub mod users;
pub mod users_products;

mod error;
mod ops;
mod price_change;

type ResultEngine<T> = Result<T, EngineError>;
