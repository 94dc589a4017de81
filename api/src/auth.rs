use antisoup_shared::{
    seed, AuthProvider, AuthResponse, EmailProvider, LoginLinkRequest, LoginLinkResponse, Role,
    User, VerifyLink,
};
use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{db, error::AppError, mail, AppState};

const SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;
const LINK_TTL_SECS: i64 = 10 * 60;
const LOGIN_PURPOSE: &str = "login";

// ── JWT Claims ──

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: &str) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: expiry(SESSION_TTL_SECS),
        }
    }
}

/// Claims carried by a magic login link.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkClaims {
    pub email: String,
    pub purpose: String,
    pub exp: usize,
}

fn expiry(ttl_secs: i64) -> usize {
    (Utc::now().timestamp() + ttl_secs).max(0) as usize
}

pub fn issue_session(user_id: &str, jwt_secret: &str) -> Result<String, AppError> {
    Ok(encode(
        &Header::default(),
        &Claims::new(user_id),
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?)
}

pub fn issue_link_token(email: &str, jwt_secret: &str) -> Result<String, AppError> {
    let claims = LinkClaims {
        email: email.to_string(),
        purpose: LOGIN_PURPOSE.to_string(),
        exp: expiry(LINK_TTL_SECS),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?)
}

// ── Extract authenticated user from Authorization header ──

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn extract_user_id(headers: &HeaderMap, jwt_secret: &str) -> Result<String, AppError> {
    let token = bearer(headers).ok_or(AppError::Unauthorized)?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    Ok(data.claims.sub)
}

pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user_id = extract_user_id(headers, &state.config.jwt_secret)?;
    db::blocking(&state.db, move |conn| {
        db::fetch_user(conn, &user_id)?.ok_or(AppError::Unauthorized)
    })
    .await
}

/// The signed-in user, or `None` for anonymous visitors and stale tokens.
pub async fn optional_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    match current_user(state, headers).await {
        Ok(user) => Ok(Some(user)),
        Err(AppError::Unauthorized) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = current_user(state, headers).await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden("admin role required"));
    }
    Ok(user)
}

pub async fn require_super_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = current_user(state, headers).await?;
    if user.role != Role::SuperAdmin {
        return Err(AppError::Forbidden("super admin role required"));
    }
    Ok(user)
}

pub fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}

// ── Handlers ──

/// POST /api/auth/login-link
pub async fn request_login_link(
    State(state): State<AppState>,
    Json(payload): Json<LoginLinkRequest>,
) -> Result<Json<LoginLinkResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    if !valid_email(&email) {
        return Err(AppError::BadRequest(format!("invalid email address: {email}")));
    }

    let lookup = email.clone();
    let (provider, staff) = db::blocking(&state.db, move |conn| {
        let provider = db::load_config(conn)?.email_provider;
        let staff = db::fetch_user_by_email(conn, &lookup)?.is_some_and(|u| u.is_admin());
        Ok((provider, staff))
    })
    .await?;

    // A link handed back in the response would be a staff session for anyone.
    if staff && provider == EmailProvider::None {
        warn!("refused in-response login link for a staff account");
        return Ok(Json(mail::failure(
            "Staff accounts sign in by email; configure a mail provider first",
        )));
    }

    let token = issue_link_token(&email, &state.config.jwt_secret)?;
    let link = format!(
        "{}?token={}",
        state.config.public_url,
        urlencoding::encode(&token)
    );

    info!(provider = provider.as_str(), "issuing login link");
    let response =
        mail::send_login_link(&state.http, &state.config.mail, provider, &email, &link).await;
    Ok(Json(response))
}

/// POST /api/auth/verify — exchange a link token for a session
pub async fn verify_login_link(
    State(state): State<AppState>,
    Json(payload): Json<VerifyLink>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = decode::<LinkClaims>(
        &payload.token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    if claims.purpose != LOGIN_PURPOSE {
        return Err(AppError::Unauthorized);
    }

    let email = claims.email;
    let user = db::blocking(&state.db, move |conn| {
        if let Some(existing) = db::fetch_user_by_email(conn, &email)? {
            return Ok(existing);
        }
        let name = email.split('@').next().unwrap_or(&email).to_string();
        let user = User {
            id: db::new_id("u"),
            avatar: seed::avatar_for(&name),
            name,
            email: email.clone(),
            provider: AuthProvider::Email,
            role: Role::User,
            created_at: Utc::now(),
            daily_generations: 0,
            last_generation_date: None,
        };
        db::insert_user(conn, &user)?;
        info!(user = %user.id, "registered new user from login link");
        Ok(user)
    })
    .await?;

    let token = issue_session(&user.id, &state.config.jwt_secret)?;
    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/me — return current user
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, AppError> {
    Ok(Json(current_user(&state, &headers).await?))
}
