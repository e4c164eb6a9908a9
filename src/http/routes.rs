use crate::caller::CallResult;
use crate::config::mask_phone_number;
use crate::http::types::{CallRequest, HealthConfig, HealthResponse, HttpError};
use crate::http::HttpState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::log::{debug, info};

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    let caller = &state.config.caller;
    Json(HealthResponse {
        status: "online",
        service: "AI Telegram Caller",
        ready: true,
        config: HealthConfig {
            username: caller.username.clone(),
            phone: mask_phone_number(&caller.phone_number),
        },
    })
}

pub async fn call(State(state): State<HttpState>, body: Bytes) -> Result<Response, HttpError> {
    let request = CallRequest::from_body(&body)?;
    let message = resolve_message(&state, &request).await;

    let result = state.dispatcher.place_call(&message).await;
    Ok(call_response(&state, result))
}

pub async fn call_now(State(state): State<HttpState>) -> Response {
    info!("Immediate call triggered via /call-now endpoint");
    let result = state.dispatcher.place_default_call().await;
    call_response(&state, result)
}

/// Request message or configured default, replaced by a composed message when one is produced.
async fn resolve_message(state: &HttpState, request: &CallRequest) -> String {
    let fallback = request
        .message()
        .unwrap_or(state.config.caller.message.as_str())
        .to_string();

    let (Some(prompt), Some(composer)) = (request.ai_prompt(), &state.composer) else {
        if request.ai_prompt().is_some() {
            debug!("AI message requested but no generation credential is configured");
        }
        return fallback;
    };

    composer.compose(prompt).await.unwrap_or(fallback)
}

fn call_response(state: &HttpState, result: CallResult) -> Response {
    let status = if !result.success && state.config.http.failure_status {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(result)).into_response()
}
