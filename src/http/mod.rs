mod routes;
mod types;

use crate::caller::CallDispatcher;
use crate::composer::MessageComposer;
use crate::config::AppConfig;
use crate::http::routes::*;
use crate::http::types::HttpError;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::routing::{get, post};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::log::{debug, warn};

#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<AppConfig>,
    pub dispatcher: CallDispatcher,
    pub composer: Option<MessageComposer>,
}

async fn auth_middleware(
    axum::extract::State(expected_token): axum::extract::State<String>,
    headers: axum::http::HeaderMap,
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, HttpError> {
    let auth_header = headers.get("authorization").ok_or(HttpError {
        status: StatusCode::UNAUTHORIZED,
        message: "Missing authorization header".to_string(),
    })?;

    let auth_str = auth_header.to_str().map_err(|_| HttpError {
        status: StatusCode::BAD_REQUEST,
        message: "Invalid authorization header".to_string(),
    })?;

    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    if token != expected_token {
        return Err(HttpError {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid token".to_string(),
        });
    }

    Ok(next.run(request).await)
}

pub fn create_app(
    config: Arc<AppConfig>,
    dispatcher: CallDispatcher,
    composer: Option<MessageComposer>,
) -> axum::Router {
    let mut call_routes = axum::Router::new()
        .route("/call", post(call))
        .route("/call-now", get(call_now));

    // The health check stays public, only call routes are guarded.
    match config.http.auth_token.clone() {
        Some(token) => {
            debug!("Adding HTTP authentication middleware to call routes!");
            call_routes = call_routes
                .route_layer(axum::middleware::from_fn_with_state(token, auth_middleware));
        }
        None => {
            warn!("Serving call routes without authentication, as no auth token is configured!")
        }
    }

    let router = axum::Router::new()
        .route("/", get(health))
        .merge(call_routes)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-version"),
            HeaderValue::from_static(crate::VERSION),
        ))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let state = HttpState {
        config,
        dispatcher,
        composer,
    };
    router.with_state(state)
}
