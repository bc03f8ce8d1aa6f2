use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{config::ConfigError, models::ResultBean};

/// Error
///
/// Crate-wide error type for handlers and startup. The gatekeeper itself never
/// produces one: an unauthenticated request is a redirect, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),
    #[error("login failed: wrong username or password")]
    LoginFailed,
    #[error("username {0:?} is already registered")]
    UsernameTaken(String),
    #[error("resource not found")]
    NotFound,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("order {id} cannot move from state {state}")]
    OrderState { id: i32, state: i32 },
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::LoginFailed | Error::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Error::UsernameTaken(_) | Error::OrderState { .. } => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Session(_) | Error::PasswordHash(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Renders the error as a failed `ResultBean`. Internal details are logged, not sent.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ResultBean::<()>::fail(message))).into_response()
    }
}
