use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use std::{net::SocketAddr, sync::Arc};

use crate::{Webhook, admin, types::Health, webhook};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves the bearer token to an admin and stores it in the request
/// extensions.
async fn auth(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>() else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let user = state
        .engine
        .token_owner(bearer.token())
        .await
        .map_err(|err| {
            tracing::error!("token lookup failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if !user.is_admin {
        return Err(StatusCode::FORBIDDEN);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        message: "Bot is running".to_string(),
    })
}

/// Builds the whole HTTP surface.
///
/// The webhook router, when present, is mounted next to the admin panel and
/// only sees well-formed updates.
pub fn router(state: ServerState, updates: Option<Router>) -> Router {
    let app = Router::new()
        .route("/admin/logout", post(admin::logout))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/products", get(admin::products))
        .route(
            "/admin/products/{id}",
            patch(admin::rename_product).delete(admin::delete_product),
        )
        .route("/admin/tokens", get(admin::session_tokens))
        .route("/admin/tokens/{id}", delete(admin::delete_session_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/admin/login", post(admin::login))
        .route("/", get(health))
        .with_state(state);

    match updates {
        Some(updates) => app.merge(webhook::guard(updates)),
        None => app,
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
    webhook: Option<Webhook>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };
    match webhook {
        Some(webhook) => {
            let (updates, shutdown) = webhook.into_parts();
            axum::serve(
                listener,
                router(state, Some(updates))
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown)
            .await
        }
        None => {
            axum::serve(
                listener,
                router(state, None).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
        }
    }
}
