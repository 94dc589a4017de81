use antisoup_shared::{
    seed, AuthProvider, Battle, BattleStatus, Comment, CommentStatus, EmailProvider,
    ReactionCounts, ReactionKind, Role, Side, SystemConfig, ThemeMode, Topic, TopicStatus, User,
};
use chrono::Utc;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::DbPool;

pub fn run_migrations(pool: &DbPool, super_admin_email: &str) -> Result<(), AppError> {
    let mut conn = pool.get()?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                   TEXT PRIMARY KEY,
            name                 TEXT NOT NULL,
            avatar               TEXT NOT NULL DEFAULT '',
            email                TEXT UNIQUE NOT NULL,
            provider             TEXT NOT NULL,
            role                 TEXT NOT NULL DEFAULT 'user',
            created_at           TEXT NOT NULL,
            daily_generations    INTEGER NOT NULL DEFAULT 0,
            last_generation_date TEXT
        );

        CREATE TABLE IF NOT EXISTS topics (
            id          TEXT PRIMARY KEY,
            name        TEXT UNIQUE NOT NULL,
            is_trending INTEGER,
            status      TEXT NOT NULL DEFAULT 'active'
        );

        CREATE TABLE IF NOT EXISTS battles (
            id             TEXT PRIMARY KEY,
            topic          TEXT NOT NULL,
            topic_id       TEXT,
            soup_content   TEXT NOT NULL,
            soup_votes     INTEGER NOT NULL DEFAULT 0,
            anti_content   TEXT NOT NULL,
            anti_votes     INTEGER NOT NULL DEFAULT 0,
            like_count     INTEGER NOT NULL DEFAULT 0,
            clap_count     INTEGER NOT NULL DEFAULT 0,
            disagree_count INTEGER NOT NULL DEFAULT 0,
            shock_count    INTEGER NOT NULL DEFAULT 0,
            neutral_count  INTEGER NOT NULL DEFAULT 0,
            author_id      TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            expires_at     TEXT NOT NULL,
            is_pinned      INTEGER NOT NULL DEFAULT 0,
            status         TEXT NOT NULL DEFAULT 'pending'
        );
        CREATE INDEX IF NOT EXISTS idx_battles_topic ON battles(topic);

        -- Append-only; seq preserves arrival order for latest-wins lookups.
        CREATE TABLE IF NOT EXISTS reactions (
            seq        INTEGER PRIMARY KEY AUTOINCREMENT,
            id         TEXT UNIQUE NOT NULL,
            battle_id  TEXT NOT NULL REFERENCES battles(id),
            user_id    TEXT NOT NULL,
            kind       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reactions_owner ON reactions(battle_id, user_id);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            battle_id   TEXT NOT NULL REFERENCES battles(id),
            user_id     TEXT NOT NULL,
            user_name   TEXT NOT NULL,
            user_avatar TEXT NOT NULL DEFAULT '',
            content     TEXT NOT NULL,
            side        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending'
        );
        CREATE INDEX IF NOT EXISTS idx_comments_battle ON comments(battle_id);

        CREATE TABLE IF NOT EXISTS system_config (
            id                     INTEGER PRIMARY KEY CHECK (id = 1),
            daily_generation_limit INTEGER NOT NULL,
            email_provider         TEXT NOT NULL,
            default_theme          TEXT NOT NULL
        );
        ",
    )?;

    let now = Utc::now();
    let tx = conn.transaction()?;

    let config = seed::config();
    tx.execute(
        "INSERT OR IGNORE INTO system_config (id, daily_generation_limit, email_provider, default_theme)
         VALUES (1, ?1, ?2, ?3)",
        params![
            config.daily_generation_limit,
            config.email_provider.as_str(),
            config.default_theme.as_str()
        ],
    )?;

    for topic in seed::topics() {
        tx.execute(
            "INSERT OR IGNORE INTO topics (id, name, is_trending, status) VALUES (?1, ?2, ?3, ?4)",
            params![topic.id, topic.name, topic.is_trending, topic.status.as_str()],
        )?;
    }

    // Only the configured root account; moderators are added through the API.
    let root = seed::super_admin(super_admin_email, now);
    tx.execute(
        "INSERT OR IGNORE INTO users (id, name, avatar, email, provider, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            root.id,
            root.name,
            root.avatar,
            root.email,
            root.provider.as_str(),
            root.role.as_str(),
            root.created_at
        ],
    )?;

    let battle_count: i64 = tx.query_row("SELECT COUNT(*) FROM battles", [], |row| row.get(0))?;
    if battle_count == 0 {
        let battles = seed::battles(now);
        for battle in &battles {
            insert_battle(&tx, battle)?;
        }
        for comment in seed::comments(now) {
            insert_comment(&tx, &comment)?;
        }
        info!(battles = battles.len(), "seeded empty database");
    }

    tx.commit()?;
    Ok(())
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub async fn blocking<T, F>(pool: &DbPool, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

fn text_enum<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value {raw:?}").into(),
        )
    })
}

// ── Battles ──

pub const BATTLE_COLUMNS: &str = "id, topic, topic_id, soup_content, soup_votes, anti_content, anti_votes,
     like_count, clap_count, disagree_count, shock_count, neutral_count,
     author_id, created_at, expires_at, is_pinned, status";

pub fn battle_from_row(row: &Row) -> rusqlite::Result<Battle> {
    Ok(Battle {
        id: row.get(0)?,
        topic: row.get(1)?,
        topic_id: row.get(2)?,
        soup_content: row.get(3)?,
        soup_votes: row.get(4)?,
        anti_content: row.get(5)?,
        anti_votes: row.get(6)?,
        reaction_counts: ReactionCounts {
            like: row.get(7)?,
            clap: row.get(8)?,
            disagree: row.get(9)?,
            shock: row.get(10)?,
            neutral: row.get(11)?,
        },
        author_id: row.get(12)?,
        created_at: row.get(13)?,
        expires_at: row.get(14)?,
        is_pinned: row.get(15)?,
        status: text_enum(row, 16, BattleStatus::parse)?,
    })
}

pub fn insert_battle(conn: &Connection, battle: &Battle) -> rusqlite::Result<()> {
    let counts = &battle.reaction_counts;
    conn.execute(
        &format!(
            "INSERT INTO battles ({BATTLE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            battle.id,
            battle.topic,
            battle.topic_id,
            battle.soup_content,
            battle.soup_votes,
            battle.anti_content,
            battle.anti_votes,
            counts.like,
            counts.clap,
            counts.disagree,
            counts.shock,
            counts.neutral,
            battle.author_id,
            battle.created_at,
            battle.expires_at,
            battle.is_pinned,
            battle.status.as_str()
        ],
    )?;
    Ok(())
}

pub fn fetch_battle(conn: &Connection, id: &str) -> rusqlite::Result<Option<Battle>> {
    conn.query_row(
        &format!("SELECT {BATTLE_COLUMNS} FROM battles WHERE id = ?1"),
        [id],
        battle_from_row,
    )
    .optional()
}

pub fn list_battles(conn: &Connection) -> rusqlite::Result<Vec<Battle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BATTLE_COLUMNS} FROM battles ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], battle_from_row)?;
    rows.collect()
}

/// Writes back the moderator-editable fields. Counters are left alone.
pub fn save_battle_fields(conn: &Connection, battle: &Battle) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE battles
         SET topic = ?2, soup_content = ?3, anti_content = ?4,
             expires_at = ?5, is_pinned = ?6, status = ?7
         WHERE id = ?1",
        params![
            battle.id,
            battle.topic,
            battle.soup_content,
            battle.anti_content,
            battle.expires_at,
            battle.is_pinned,
            battle.status.as_str()
        ],
    )?;
    Ok(())
}

pub fn reaction_column(kind: ReactionKind) -> &'static str {
    match kind {
        ReactionKind::Like => "like_count",
        ReactionKind::Clap => "clap_count",
        ReactionKind::Disagree => "disagree_count",
        ReactionKind::Shock => "shock_count",
        ReactionKind::Neutral => "neutral_count",
    }
}

pub fn latest_reaction(
    conn: &Connection,
    battle_id: &str,
    user_id: &str,
) -> rusqlite::Result<Option<ReactionKind>> {
    conn.query_row(
        "SELECT kind FROM reactions
         WHERE battle_id = ?1 AND user_id = ?2
         ORDER BY seq DESC LIMIT 1",
        params![battle_id, user_id],
        |row| text_enum(row, 0, ReactionKind::parse),
    )
    .optional()
}

// ── Comments ──

pub const COMMENT_COLUMNS: &str =
    "id, battle_id, user_id, user_name, user_avatar, content, side, created_at, status";

pub fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        battle_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        user_avatar: row.get(4)?,
        content: row.get(5)?,
        side: text_enum(row, 6, Side::parse)?,
        created_at: row.get(7)?,
        status: text_enum(row, 8, CommentStatus::parse)?,
    })
}

pub fn insert_comment(conn: &Connection, comment: &Comment) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            comment.id,
            comment.battle_id,
            comment.user_id,
            comment.user_name,
            comment.user_avatar,
            comment.content,
            comment.side.as_str(),
            comment.created_at,
            comment.status.as_str()
        ],
    )?;
    Ok(())
}

pub fn fetch_comment(conn: &Connection, id: &str) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        [id],
        comment_from_row,
    )
    .optional()
}

// ── Topics ──

pub fn topic_from_row(row: &Row) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        battle_count: 0,
        is_trending: row.get(2)?,
        status: text_enum(row, 3, TopicStatus::parse)?,
    })
}

pub fn list_topics(conn: &Connection) -> rusqlite::Result<Vec<Topic>> {
    let mut stmt = conn.prepare("SELECT id, name, is_trending, status FROM topics ORDER BY rowid")?;
    let rows = stmt.query_map([], topic_from_row)?;
    rows.collect()
}

pub fn fetch_topic(conn: &Connection, id: &str) -> rusqlite::Result<Option<Topic>> {
    conn.query_row(
        "SELECT id, name, is_trending, status FROM topics WHERE id = ?1",
        [id],
        topic_from_row,
    )
    .optional()
}

// ── Users ──

pub const USER_COLUMNS: &str =
    "id, name, avatar, email, provider, role, created_at, daily_generations, last_generation_date";

pub fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        avatar: row.get(2)?,
        email: row.get(3)?,
        provider: text_enum(row, 4, AuthProvider::parse)?,
        role: text_enum(row, 5, Role::parse)?,
        created_at: row.get(6)?,
        daily_generations: row.get(7)?,
        last_generation_date: row.get(8)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            user.id,
            user.name,
            user.avatar,
            user.email,
            user.provider.as_str(),
            user.role.as_str(),
            user.created_at,
            user.daily_generations,
            user.last_generation_date
        ],
    )?;
    Ok(())
}

pub fn fetch_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .optional()
}

pub fn fetch_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
        [email],
        user_from_row,
    )
    .optional()
}

pub fn save_quota(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET daily_generations = ?2, last_generation_date = ?3 WHERE id = ?1",
        params![user.id, user.daily_generations, user.last_generation_date],
    )?;
    Ok(())
}

// ── System ──

pub fn load_config(conn: &Connection) -> rusqlite::Result<SystemConfig> {
    let stored = conn
        .query_row(
            "SELECT daily_generation_limit, email_provider, default_theme
             FROM system_config WHERE id = 1",
            [],
            |row| {
                Ok(SystemConfig {
                    daily_generation_limit: row.get(0)?,
                    email_provider: text_enum(row, 1, EmailProvider::parse)?,
                    default_theme: text_enum(row, 2, ThemeMode::parse)?,
                })
            },
        )
        .optional()?;
    Ok(stored.unwrap_or_default())
}

pub fn save_config(conn: &Connection, config: &SystemConfig) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO system_config (id, daily_generation_limit, email_provider, default_theme)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
             daily_generation_limit = ?1, email_provider = ?2, default_theme = ?3",
        params![
            config.daily_generation_limit,
            config.email_provider.as_str(),
            config.default_theme.as_str()
        ],
    )?;
    Ok(())
}
