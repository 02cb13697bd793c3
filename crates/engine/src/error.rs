//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when an item is not found.
//! - [`ExistingKey`] thrown when an item would be duplicated.
//! - [`InvalidLink`] thrown for links outside the followed catalog.
//! - [`WrongKey`] thrown when a shared secret or password does not match.
//! - [`Export`] thrown when a database snapshot could not be written.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`InvalidLink`]: EngineError::InvalidLink
//!  [`WrongKey`]: EngineError::WrongKey
//!  [`Export`]: EngineError::Export
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Wrong key")]
    WrongKey,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidLink(a), Self::InvalidLink(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::WrongKey, Self::WrongKey) => true,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Export(a), Self::Export(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
