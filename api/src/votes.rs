use antisoup_shared::{
    ledger, CastReaction, CastVote, ReactionCounts, ReactionResponse, Side, VoteTally,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::{auth, db, error::AppError, AppState};

fn vote_column(side: Side) -> &'static str {
    match side {
        Side::Soup => "soup_votes",
        Side::Anti => "anti_votes",
    }
}

fn reaction_counts(conn: &Connection, battle_id: &str) -> Result<ReactionCounts, AppError> {
    conn.query_row(
        "SELECT like_count, clap_count, disagree_count, shock_count, neutral_count
         FROM battles WHERE id = ?1",
        [battle_id],
        |row| {
            Ok(ReactionCounts {
                like: row.get(0)?,
                clap: row.get(1)?,
                disagree: row.get(2)?,
                shock: row.get(3)?,
                neutral: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or(AppError::NotFound("battle"))
}

/// POST /api/battles/{id}/vote — increments happen in the store, never read-modify-write
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CastVote>,
) -> Result<Json<VoteTally>, AppError> {
    let side = payload.side;
    let tally = db::blocking(&state.db, move |conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE battles SET {col} = {col} + 1 WHERE id = ?1",
                col = vote_column(side)
            ),
            [&id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound("battle"));
        }

        let (soup_votes, anti_votes): (u32, u32) = conn.query_row(
            "SELECT soup_votes, anti_votes FROM battles WHERE id = ?1",
            [&id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(VoteTally {
            battle_id: id,
            soup_votes,
            anti_votes,
            split: ledger::split(soup_votes, anti_votes),
        })
    })
    .await?;

    debug!(battle = %tally.battle_id, %side, "vote recorded");
    Ok(Json(tally))
}

/// POST /api/battles/{id}/reaction — every reaction counts; the latest is "current"
pub async fn cast_reaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CastReaction>,
) -> Result<Json<ReactionResponse>, AppError> {
    let viewer = auth::optional_user(&state, &headers).await?;
    let reactor = ledger::reactor_id(viewer.as_ref()).to_string();
    let kind = payload.kind;

    let response = db::blocking(&state.db, move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
            &format!(
                "UPDATE battles SET {col} = {col} + 1 WHERE id = ?1",
                col = db::reaction_column(kind)
            ),
            [&id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound("battle"));
        }
        tx.execute(
            "INSERT INTO reactions (id, battle_id, user_id, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![db::new_id("r"), id, reactor, kind.as_str(), Utc::now()],
        )?;
        let reaction_counts = reaction_counts(&tx, &id)?;
        tx.commit()?;

        Ok(ReactionResponse {
            battle_id: id,
            reaction_counts,
            current: Some(kind),
        })
    })
    .await?;

    debug!(battle = %response.battle_id, kind = kind.as_str(), "reaction recorded");
    Ok(Json(response))
}

/// GET /api/battles/{id}/reaction
pub async fn current_reaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReactionResponse>, AppError> {
    let viewer = auth::optional_user(&state, &headers).await?;
    let reactor = ledger::reactor_id(viewer.as_ref()).to_string();

    let response = db::blocking(&state.db, move |conn| {
        let reaction_counts = reaction_counts(conn, &id)?;
        let current = db::latest_reaction(conn, &id, &reactor)?;
        Ok(ReactionResponse {
            battle_id: id,
            reaction_counts,
            current,
        })
    })
    .await?;

    Ok(Json(response))
}
