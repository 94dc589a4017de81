use antisoup_shared::{
    moderation::{self, BattleAction},
    quota, ranking, topics, validation, Battle, BattleStatus, PublishBattle, ReactionCounts,
    RuleError, BATTLE_LIFETIME_DAYS,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use tracing::info;

use crate::{auth, db, error::AppError, AppState};

/// Strips markup from already length-checked text. Escaping may lengthen
/// the stored string, so limits apply to what the author typed.
pub(crate) fn sanitize(field: &'static str, raw: &str) -> Result<String, RuleError> {
    let clean = ammonia::clean(raw.trim());
    if clean.trim().is_empty() {
        return Err(RuleError::Empty { field });
    }
    Ok(clean)
}

/// GET /api/battles — admins see everything, visitors the ranked feed
pub async fn list_battles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Battle>>, AppError> {
    let viewer = auth::optional_user(&state, &headers).await?;
    let battles = db::blocking(&state.db, |conn| Ok(db::list_battles(conn)?)).await?;

    if viewer.is_some_and(|u| u.is_admin()) {
        return Ok(Json(battles));
    }
    Ok(Json(ranking::rank_owned(battles, Utc::now())))
}

/// GET /api/battles/{id}
pub async fn get_battle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Battle>, AppError> {
    let viewer = auth::optional_user(&state, &headers).await?;
    let battle = db::blocking(&state.db, move |conn| {
        db::fetch_battle(conn, &id)?.ok_or(AppError::NotFound("battle"))
    })
    .await?;

    let is_admin = viewer.is_some_and(|u| u.is_admin());
    if battle.status != BattleStatus::Approved && !is_admin {
        return Err(AppError::NotFound("battle"));
    }
    Ok(Json(battle))
}

/// POST /api/battles — new battles wait for review
pub async fn publish_battle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PublishBattle>,
) -> Result<(StatusCode, Json<Battle>), AppError> {
    let mut user = auth::current_user(&state, &headers).await?;
    validation::battle_content(payload.soup_content.trim(), payload.anti_content.trim())?;
    let soup = sanitize("soup content", &payload.soup_content)?;
    let anti = sanitize("anti content", &payload.anti_content)?;

    let battle = db::blocking(&state.db, move |conn| {
        let known = db::list_topics(conn)?;
        let topic = validation::submission_topic(&known, &payload.topic)?;
        let topic_id = topics::find_by_name(&known, &topic).map(|t| t.id.clone());

        let now = Utc::now();
        let battle = Battle {
            id: db::new_id("b"),
            topic,
            topic_id,
            soup_content: soup,
            soup_votes: 1,
            anti_content: anti,
            anti_votes: 1,
            reaction_counts: ReactionCounts::default(),
            author_id: user.id.clone(),
            created_at: now,
            expires_at: now + Duration::days(BATTLE_LIFETIME_DAYS),
            is_pinned: false,
            status: BattleStatus::Pending,
        };

        let tx = conn.transaction()?;
        db::insert_battle(&tx, &battle)?;
        if !user.is_admin() {
            quota::consume(&mut user, now.date_naive());
            db::save_quota(&tx, &user)?;
        }
        tx.commit()?;
        Ok(battle)
    })
    .await?;

    info!(battle = %battle.id, author = %battle.author_id, "battle submitted for review");
    Ok((StatusCode::CREATED, Json(battle)))
}

/// PUT /api/battles/{id} — apply one moderation action
pub async fn moderate_battle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(action): Json<BattleAction>,
) -> Result<Json<Battle>, AppError> {
    let admin = auth::require_admin(&state, &headers).await?;
    let action_name = action.name();

    let battle = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        let mut battle = db::fetch_battle(&tx, &id)?.ok_or(AppError::NotFound("battle"))?;
        let known = db::list_topics(&tx)?;
        let update = moderation::plan(&battle, &action, &known, Utc::now())?;
        battle.apply(&update);
        db::save_battle_fields(&tx, &battle)?;
        tx.commit()?;
        Ok(battle)
    })
    .await?;

    info!(admin = %admin.id, battle = %battle.id, action = action_name, "moderated battle");
    Ok(Json(battle))
}
