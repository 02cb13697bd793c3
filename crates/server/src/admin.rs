//! Admin panel handlers.
//!
//! Every route except `login` runs behind the bearer token middleware, which
//! stores the authenticated admin in the request extensions.

use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use engine::{EngineError, products, session_tokens, users};

use std::net::SocketAddr;

use crate::{
    ServerError, ServerState,
    types::{Login, LoginResponse, ProductUpdate, ProductView, SessionTokenView, UserView},
};

fn user_view(user: users::Model) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        chat_id: user.chat_id,
        is_admin: user.is_admin,
    }
}

fn product_view(product: products::Model) -> ProductView {
    ProductView {
        id: product.id,
        product_link: product.product_link,
        name: product.name,
        current_price_minor: product.current_price,
        previous_price_minor: product.previous_price,
        updated_at: product.updated_at,
    }
}

fn session_token_view(token: session_tokens::Model) -> SessionTokenView {
    SessionTokenView {
        id: token.id,
        user_id: token.user_id,
    }
}

pub async fn login(
    State(state): State<ServerState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    Json(payload): Json<Login>,
) -> Result<Json<LoginResponse>, ServerError> {
    match state.engine.issue_token(&payload.username, &payload.password).await {
        Ok(token) => Ok(Json(LoginResponse { token })),
        Err(EngineError::WrongKey) => {
            let peer = peer
                .map(|Extension(ConnectInfo(addr))| addr.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(username = %payload.username, %peer, "failed panel login");
            Err(EngineError::WrongKey.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.revoke_token(bearer.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn users(State(state): State<ServerState>) -> Result<Json<Vec<UserView>>, ServerError> {
    let users = state.engine.users().await?;
    Ok(Json(users.into_iter().map(user_view).collect()))
}

pub async fn delete_user(
    Extension(admin): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserView>, ServerError> {
    if admin.id == user_id {
        return Err(ServerError::Generic(
            "an admin cannot delete itself from the panel".to_string(),
        ));
    }
    let user = state.engine.delete_user(user_id).await?;
    tracing::info!(admin_id = admin.id, user_id, "user deleted from panel");
    Ok(Json(user_view(user)))
}

pub async fn products(
    State(state): State<ServerState>,
) -> Result<Json<Vec<ProductView>>, ServerError> {
    let products = state.engine.products().await?;
    Ok(Json(products.into_iter().map(product_view).collect()))
}

pub async fn rename_product(
    State(state): State<ServerState>,
    Path(product_id): Path<i32>,
    Json(payload): Json<ProductUpdate>,
) -> Result<Json<ProductView>, ServerError> {
    let product = state.engine.rename_product(product_id, &payload.name).await?;
    Ok(Json(product_view(product)))
}

pub async fn delete_product(
    State(state): State<ServerState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductView>, ServerError> {
    let product = state.engine.delete_product(product_id).await?;
    Ok(Json(product_view(product)))
}

pub async fn session_tokens(
    State(state): State<ServerState>,
) -> Result<Json<Vec<SessionTokenView>>, ServerError> {
    let tokens = state.engine.session_tokens().await?;
    Ok(Json(tokens.into_iter().map(session_token_view).collect()))
}

pub async fn delete_session_token(
    State(state): State<ServerState>,
    Path(token_id): Path<i32>,
) -> Result<Json<SessionTokenView>, ServerError> {
    let token = state.engine.delete_session_token(token_id).await?;
    Ok(Json(session_token_view(token)))
}
