use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server rejected the session's token (401).
    #[error("session expired or invalid")]
    SessionExpired,

    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Api { status: 403, .. })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

/// Map a non-2xx response to an error, using the server's
/// `{"error", "message"}` body when it has one.
pub(crate) fn from_response(status: StatusCode, body: &str) -> ClientError {
    if status == StatusCode::UNAUTHORIZED {
        return ClientError::SessionExpired;
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Api {
            status: status.as_u16(),
            code: parsed.error,
            message: parsed.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "unknown".to_string(),
            message: body.to_string(),
        },
    }
}
