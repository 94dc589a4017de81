use antisoup_shared::{seed, AddAdmin, AuthProvider, Role, SystemConfig, SystemStatus, User};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use tracing::info;

use crate::{auth, db, error::AppError, AppState};

#[derive(Deserialize)]
pub struct UserFilter {
    role: Option<String>,
}

/// GET /api/users?role=admin — `admin` also matches super admins
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    auth::require_admin(&state, &headers).await?;
    let roles: Vec<&'static str> = match filter.role.as_deref() {
        None => vec![Role::User.as_str(), Role::Admin.as_str(), Role::SuperAdmin.as_str()],
        Some("admin") => vec![Role::Admin.as_str(), Role::SuperAdmin.as_str()],
        Some(other) => match Role::parse(other) {
            Some(role) => vec![role.as_str()],
            None => return Err(AppError::BadRequest(format!("unknown role {other:?}"))),
        },
    };

    let users = db::blocking(&state.db, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            db::USER_COLUMNS
        ))?;
        let users: Vec<User> = stmt
            .query_map([], db::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|u| roles.contains(&u.role.as_str()))
            .collect();
        Ok(users)
    })
    .await?;

    Ok(Json(users))
}

/// POST /api/users — grant admin to an email, creating the account if needed
pub async fn add_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddAdmin>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let root = auth::require_super_admin(&state, &headers).await?;
    let email = payload.email.trim().to_lowercase();
    if !auth::valid_email(&email) {
        return Err(AppError::BadRequest(format!("invalid email address: {email}")));
    }

    let user = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        let user = match db::fetch_user_by_email(&tx, &email)? {
            Some(mut existing) => {
                if existing.role == Role::User {
                    existing.role = Role::Admin;
                    tx.execute(
                        "UPDATE users SET role = ?2 WHERE id = ?1",
                        params![existing.id, existing.role.as_str()],
                    )?;
                }
                existing
            }
            None => {
                let name = payload
                    .name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "New Admin".to_string());
                let user = User {
                    id: db::new_id("u"),
                    avatar: seed::avatar_for(&name),
                    name,
                    email,
                    provider: AuthProvider::System,
                    role: Role::Admin,
                    created_at: Utc::now(),
                    daily_generations: 0,
                    last_generation_date: None,
                };
                db::insert_user(&tx, &user)?;
                user
            }
        };
        tx.commit()?;
        Ok(user)
    })
    .await?;

    info!(by = %root.id, admin = %user.id, "granted admin role");
    Ok((StatusCode::CREATED, Json(user)))
}

/// DELETE /api/users/{id} — revoke admin, the account itself stays
pub async fn revoke_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let root = auth::require_super_admin(&state, &headers).await?;

    let revoked = db::blocking(&state.db, move |conn| {
        let user = db::fetch_user(conn, &id)?.ok_or(AppError::NotFound("user"))?;
        if user.role == Role::SuperAdmin {
            return Err(AppError::Forbidden("super admins cannot be revoked"));
        }
        conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![user.id, Role::User.as_str()],
        )?;
        Ok(user.id)
    })
    .await?;

    info!(by = %root.id, user = %revoked, "revoked admin role");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/system/config
pub async fn get_config(State(state): State<AppState>) -> Result<Json<SystemConfig>, AppError> {
    let config = db::blocking(&state.db, |conn| Ok(db::load_config(conn)?)).await?;
    Ok(Json(config))
}

/// PUT /api/system/config
pub async fn update_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(config): Json<SystemConfig>,
) -> Result<Json<SystemConfig>, AppError> {
    let root = auth::require_super_admin(&state, &headers).await?;
    db::blocking(&state.db, move |conn| Ok(db::save_config(conn, &config)?)).await?;
    info!(
        by = %root.id,
        limit = config.daily_generation_limit,
        provider = config.email_provider.as_str(),
        "updated system config"
    );
    Ok(Json(config))
}

/// GET /api/system/status — "real" admins exclude the built-in root account
pub async fn system_status(State(state): State<AppState>) -> Result<Json<SystemStatus>, AppError> {
    let admins: i64 = db::blocking(&state.db, |conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role IN ('admin', 'super_admin') AND id != ?1",
            [seed::ROOT_ID],
            |row| row.get(0),
        )?)
    })
    .await?;

    Ok(Json(SystemStatus {
        is_db_configured: true,
        has_real_admins: admins > 0,
    }))
}
