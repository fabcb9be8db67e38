use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Extension, State},
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::web::{error::AppError, AppState};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's email, which doubles as the storage scope key
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

/// Resolved session owner, passed to handlers as a request extension.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: AuthenticatedUser,
}

pub fn issue_token(secret: &str, ttl_hours: i64, user: &AuthenticatedUser) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.id.clone(),
        name: user.name.clone(),
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("Token creation error: {e}")))
}

/// Credential pass-through: any non-empty email signs in, and becomes the
/// user id.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::InvalidInput("Email is required".to_string()));
    }

    let user = AuthenticatedUser {
        id: email.to_string(),
        name: payload
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string()),
    };
    let token = issue_token(&state.config.session_secret, state.config.session_ttl_hours, &user)?;
    info!(user_id = %user.id, "User signed in");

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    Ok((jar.add(cookie), Json(SignInResponse { token, user })))
}

pub async fn me(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthenticatedUser> {
    Json(user)
}

/// Rejects requests without a valid session before any handler (and so
/// any storage access) runs.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Try the Authorization header first, then fall back to the cookie
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.session_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "Session token rejected");
        AppError::Unauthorized("Invalid session".to_string())
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        id: token_data.claims.sub,
        name: token_data.claims.name,
    });
    Ok(next.run(req).await)
}
