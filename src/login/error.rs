use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

#[derive(Debug)]
pub enum LoginError {
    InvalidCredentials,
    InvalidUsername(String),
    DatabaseError(String),
    InternalError(String),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::InvalidCredentials => write!(f, "Invalid username or password"),
            LoginError::InvalidUsername(name) => write!(f, "Invalid username: {}", name),
            LoginError::DatabaseError(e) => write!(f, "Database error: {}", e),
            LoginError::InternalError(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<std::io::Error> for LoginError {
    fn from(e: std::io::Error) -> Self {
        LoginError::DatabaseError(e.to_string())
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            LoginError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            LoginError::InvalidUsername(_) => (StatusCode::BAD_REQUEST, "Invalid username"),
            LoginError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            LoginError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
