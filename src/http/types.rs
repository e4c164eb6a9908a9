use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub ready: bool,
    pub config: HealthConfig,
}

#[derive(Serialize)]
pub struct HealthConfig {
    pub username: String,
    pub phone: String,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, rename = "generateAI")]
    pub generate_ai: Option<bool>,

    #[serde(default)]
    pub ai_prompt: Option<String>,
}
impl CallRequest {
    /// An empty body is an empty request, anything else must be an object with correctly typed
    /// fields. Unknown fields are ignored.
    pub fn from_body(body: &[u8]) -> Result<Self, HttpError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body).map_err(|e| HttpError {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid call request: {e}"),
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }

    /// The prompt to compose from, only when AI generation was explicitly requested.
    pub fn ai_prompt(&self) -> Option<&str> {
        if self.generate_ai != Some(true) {
            return None;
        }
        self.ai_prompt.as_deref().filter(|prompt| !prompt.is_empty())
    }
}
