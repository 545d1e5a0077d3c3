use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Json},
};
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::login::{
    AUTH_COOKIE, LoginError, LoginRequest, LoginResponse, get_authenticated_user,
    is_valid_username,
};

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime of the `auth` cookie, in seconds.
const SESSION_MAX_AGE: u64 = 86400;

#[derive(Serialize)]
pub struct VerifyResponse {
    authorized: bool,
    username: Option<String>,
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

pub fn verify_signed_cookie(secret: &str, signed_value: &str) -> bool {
    if let Some((value, signature_b64)) = signed_value.split_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        return mac.verify_slice(&signature).is_ok();
    }
    false
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

pub async fn authenticate_handler(
    State(app_state): State<crate::AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, LoginError> {
    tracing::info!("Authentication attempt for {:?}", payload.username);

    if !is_valid_username(&payload.username) {
        return Err(LoginError::InvalidUsername(payload.username));
    }

    if !app_state
        .users
        .verify_password(&payload.username, &payload.password)
    {
        tracing::warn!("Authentication failed for {:?}", payload.username);
        return Err(LoginError::InvalidCredentials);
    }

    let signed_value = create_signed_cookie(&app_state.config.app.cookie_secret, &payload.username)
        .map_err(LoginError::InternalError)?;
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        AUTH_COOKIE, signed_value, SESSION_MAX_AGE
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| LoginError::InternalError(e.to_string()))?,
    );

    tracing::info!("Authentication successful for {:?}", payload.username);
    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            message: "Authentication successful".to_string(),
        }),
    ))
}

pub async fn logout_handler() -> impl IntoResponse {
    let cookie = format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        AUTH_COOKIE
    );
    (
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
}

pub async fn verify_handler(
    State(app_state): State<crate::AppState>,
    headers: HeaderMap,
) -> Json<VerifyResponse> {
    let username = get_authenticated_user(&headers, &app_state.config.app.cookie_secret);
    Json(VerifyResponse {
        authorized: username.is_some(),
        username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_cookie_roundtrip() {
        let signed = create_signed_cookie("secret", "alice").unwrap();
        assert!(signed.starts_with("alice:"));
        assert!(verify_signed_cookie("secret", &signed));
        assert!(!verify_signed_cookie("other", &signed));
        assert!(!verify_signed_cookie("secret", "alice"));
        assert!(!verify_signed_cookie("secret", "alice:not-base64!"));
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("a=1; auth = xyz ;b=2"));
        assert_eq!(get_cookie_value(&headers, "auth").as_deref(), Some("xyz"));
        assert_eq!(get_cookie_value(&headers, "b").as_deref(), Some("2"));
        assert!(get_cookie_value(&headers, "missing").is_none());
        assert!(get_cookie_value(&HeaderMap::new(), "auth").is_none());
    }
}
