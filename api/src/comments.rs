use antisoup_shared::{
    moderation, validation, Comment, CommentStatus, CreateComment, UpdateCommentStatus,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use tracing::info;

use crate::{auth, battles, db, error::AppError, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    battle_id: Option<String>,
}

/// GET /api/comments?battleId=...
pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Comment>>, AppError> {
    let viewer = auth::optional_user(&state, &headers).await?;
    let include_unreviewed = viewer.is_some_and(|u| u.is_admin());
    let battle_id = params.battle_id;

    let comments = db::blocking(&state.db, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comments
             WHERE (?1 IS NULL OR battle_id = ?1)
               AND (?2 OR status = 'approved')
             ORDER BY created_at DESC",
            db::COMMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![battle_id, include_unreviewed], db::comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await?;

    Ok(Json(comments))
}

/// POST /api/comments — new comments wait for review
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let user = auth::current_user(&state, &headers).await?;
    validation::comment_content(payload.content.trim())?;
    let content = battles::sanitize("comment", &payload.content)?;

    let comment = db::blocking(&state.db, move |conn| {
        if db::fetch_battle(conn, &payload.battle_id)?.is_none() {
            return Err(AppError::NotFound("battle"));
        }
        let comment = Comment {
            id: db::new_id("c"),
            battle_id: payload.battle_id,
            user_id: user.id,
            user_name: user.name,
            user_avatar: user.avatar,
            content,
            side: payload.side,
            created_at: Utc::now(),
            status: CommentStatus::Pending,
        };
        db::insert_comment(conn, &comment)?;
        Ok(comment)
    })
    .await?;

    info!(comment = %comment.id, battle = %comment.battle_id, "comment submitted for review");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/comments/{id}/status
pub async fn review_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCommentStatus>,
) -> Result<Json<Comment>, AppError> {
    let admin = auth::require_admin(&state, &headers).await?;

    let comment = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        let mut comment = db::fetch_comment(&tx, &id)?.ok_or(AppError::NotFound("comment"))?;
        comment.status = moderation::review_comment(comment.status, payload.status)?;
        tx.execute(
            "UPDATE comments SET status = ?2 WHERE id = ?1",
            params![comment.id, comment.status.as_str()],
        )?;
        tx.commit()?;
        Ok(comment)
    })
    .await?;

    info!(admin = %admin.id, comment = %comment.id, status = %comment.status, "reviewed comment");
    Ok(Json(comment))
}
