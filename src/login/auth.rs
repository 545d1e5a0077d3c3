use crate::api::{get_cookie_value, verify_signed_cookie};
use crate::rbac::Principal;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;

/// Name of the cookie carrying the signed username.
pub const AUTH_COOKIE: &str = "auth";

/// Check if the user is authenticated and return their username
pub fn get_authenticated_user(headers: &HeaderMap, secret: &str) -> Option<String> {
    get_cookie_value(headers, AUTH_COOKIE).and_then(|signed_value| {
        if verify_signed_cookie(secret, &signed_value) {
            // The username precedes the signature
            signed_value.split(':').next().map(|s| s.to_string())
        } else {
            None
        }
    })
}

pub fn principal_from_headers(headers: &HeaderMap, secret: &str) -> Principal {
    Principal {
        username: get_authenticated_user(headers, secret),
    }
}

/// Requests without a valid `auth` cookie act as the anonymous principal.
impl FromRequestParts<crate::AppState> for Principal {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(principal_from_headers(
            &parts.headers,
            &state.config.app.cookie_secret,
        ))
    }
}
