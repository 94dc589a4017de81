use antisoup_shared::{topics, CreateTopic, Topic, TopicStatus, TopicUpdate};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use rusqlite::{params, Connection};
use tracing::info;

use crate::{auth, db, error::AppError, AppState};

fn aggregated(conn: &Connection) -> Result<Vec<Topic>, AppError> {
    let known = db::list_topics(conn)?;
    let battles = db::list_battles(conn)?;
    Ok(topics::aggregate(&known, &battles))
}

fn ensure_unique(conn: &Connection, name: &str, except: Option<&str>) -> Result<(), AppError> {
    let known = db::list_topics(conn)?;
    match topics::find_by_name(&known, name) {
        Some(existing) if Some(existing.id.as_str()) != except => {
            Err(AppError::Conflict(format!("topic {name:?} already exists")))
        }
        _ => Ok(()),
    }
}

fn trimmed_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("topic name must not be empty".into()));
    }
    Ok(name.to_string())
}

/// GET /api/topics — with battle counts
pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, AppError> {
    let topics = db::blocking(&state.db, |conn| aggregated(conn)).await?;
    Ok(Json(topics))
}

/// GET /api/topics/suggestions — names only
pub async fn suggestions(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let all = db::blocking(&state.db, |conn| aggregated(conn)).await?;
    let picked = topics::suggest(&all, &mut rand::rng())
        .into_iter()
        .map(|t| t.name.clone())
        .collect();
    Ok(Json(picked))
}

/// POST /api/topics
pub async fn create_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTopic>,
) -> Result<(StatusCode, Json<Topic>), AppError> {
    let admin = auth::require_admin(&state, &headers).await?;
    let name = trimmed_name(&payload.name)?;

    let topic = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        ensure_unique(&tx, &name, None)?;
        let topic = Topic {
            id: db::new_id("t"),
            name,
            battle_count: 0,
            is_trending: None,
            status: TopicStatus::Active,
        };
        tx.execute(
            "INSERT INTO topics (id, name, is_trending, status) VALUES (?1, ?2, ?3, ?4)",
            params![topic.id, topic.name, topic.is_trending, topic.status.as_str()],
        )?;
        tx.commit()?;
        Ok(topic)
    })
    .await?;

    info!(admin = %admin.id, topic = %topic.name, "created topic");
    Ok((StatusCode::CREATED, Json(topic)))
}

/// PUT /api/topics/{id} — rename or enable/disable
pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<TopicUpdate>,
) -> Result<Json<Topic>, AppError> {
    let admin = auth::require_admin(&state, &headers).await?;
    let new_name = payload.name.as_deref().map(trimmed_name).transpose()?;

    let topic = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        let mut topic = db::fetch_topic(&tx, &id)?.ok_or(AppError::NotFound("topic"))?;
        if let Some(name) = new_name {
            ensure_unique(&tx, &name, Some(topic.id.as_str()))?;
            topic.name = name;
        }
        if let Some(status) = payload.status {
            topic.status = status;
        }
        tx.execute(
            "UPDATE topics SET name = ?2, status = ?3 WHERE id = ?1",
            params![topic.id, topic.name, topic.status.as_str()],
        )?;
        topic.battle_count =
            tx.query_row("SELECT COUNT(*) FROM battles WHERE topic = ?1", [&topic.name], |row| {
                row.get(0)
            })?;
        tx.commit()?;
        Ok(topic)
    })
    .await?;

    info!(admin = %admin.id, topic = %topic.id, status = topic.status.as_str(), "updated topic");
    Ok(Json(topic))
}
