//! JSON bodies exchanged with the HTTP server.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub message: String,
}

pub mod admin {
    use chrono::{DateTime, Utc};

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct UserView {
        pub id: i32,
        pub username: Option<String>,
        pub chat_id: i64,
        pub is_admin: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct ProductView {
        pub id: i32,
        pub product_link: String,
        pub name: Option<String>,
        /// Kopecks.
        pub current_price_minor: i64,
        /// Kopecks.
        pub previous_price_minor: i64,
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductUpdate {
        pub name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct SessionTokenView {
        pub id: i32,
        pub user_id: i32,
    }
}
