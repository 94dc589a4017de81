use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod ledger;
pub mod moderation;
pub mod quota;
pub mod ranking;
pub mod seed;
pub mod topics;
pub mod validation;

pub use error::RuleError;

/// Character cap for either side of a battle.
pub const MAX_BATTLE_CONTENT: usize = 500;
/// Character cap for a comment.
pub const MAX_COMMENT_CONTENT: usize = 200;
/// How long a freshly published battle stays active.
pub const BATTLE_LIFETIME_DAYS: i64 = 30;
/// Identity shared by every visitor without a session.
pub const ANONYMOUS_REACTOR: &str = "anon_session";

// ── Users ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Github,
    Email,
    System,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
            AuthProvider::Email => "email",
            AuthProvider::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(AuthProvider::Google),
            "github" => Some(AuthProvider::Github),
            "email" => Some(AuthProvider::Email),
            "system" => Some(AuthProvider::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub email: String,
    pub provider: AuthProvider,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// Generations used on `last_generation_date`.
    #[serde(default)]
    pub daily_generations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generation_date: Option<NaiveDate>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLinkRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginLinkResponse {
    pub success: bool,
    pub message: String,
    /// Directly clickable link, only when no mail provider is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyLink {
    pub token: String,
}

// ── Battles ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Pending,
    Approved,
    Rejected,
}

impl BattleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BattleStatus::Pending => "pending",
            BattleStatus::Approved => "approved",
            BattleStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BattleStatus::Pending),
            "approved" => Some(BattleStatus::Approved),
            "rejected" => Some(BattleStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Soup,
    Anti,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Soup => "soup",
            Side::Anti => "anti",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "soup" => Some(Side::Soup),
            "anti" => Some(Side::Anti),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Clap,
    Disagree,
    Shock,
    Neutral,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Like,
        ReactionKind::Clap,
        ReactionKind::Disagree,
        ReactionKind::Shock,
        ReactionKind::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Clap => "clap",
            ReactionKind::Disagree => "disagree",
            ReactionKind::Shock => "shock",
            ReactionKind::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    #[serde(default)]
    pub like: u32,
    #[serde(default)]
    pub clap: u32,
    #[serde(default)]
    pub disagree: u32,
    #[serde(default)]
    pub shock: u32,
    #[serde(default)]
    pub neutral: u32,
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> u32 {
        match kind {
            ReactionKind::Like => self.like,
            ReactionKind::Clap => self.clap,
            ReactionKind::Disagree => self.disagree,
            ReactionKind::Shock => self.shock,
            ReactionKind::Neutral => self.neutral,
        }
    }

    pub fn bump(&mut self, kind: ReactionKind) {
        let slot = match kind {
            ReactionKind::Like => &mut self.like,
            ReactionKind::Clap => &mut self.clap,
            ReactionKind::Disagree => &mut self.disagree,
            ReactionKind::Shock => &mut self.shock,
            ReactionKind::Neutral => &mut self.neutral,
        };
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub soup_content: String,
    pub soup_votes: u32,
    pub anti_content: String,
    pub anti_votes: u32,
    #[serde(default)]
    pub reaction_counts: ReactionCounts,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub status: BattleStatus,
}

impl Battle {
    /// Past its expiry, independent of moderation status.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn votes(&self, side: Side) -> u32 {
        match side {
            Side::Soup => self.soup_votes,
            Side::Anti => self.anti_votes,
        }
    }

    pub fn split(&self) -> VoteSplit {
        ledger::split(self.soup_votes, self.anti_votes)
    }

    /// Merges every field the patch carries.
    pub fn apply(&mut self, update: &BattleUpdate) {
        if let Some(topic) = &update.topic {
            self.topic = topic.clone();
        }
        if let Some(soup) = &update.soup_content {
            self.soup_content = soup.clone();
        }
        if let Some(anti) = &update.anti_content {
            self.anti_content = anti.clone();
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(pinned) = update.is_pinned {
            self.is_pinned = pinned;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Partial battle update produced by a moderation action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soup_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BattleStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBattle {
    pub topic: String,
    pub soup_content: String,
    pub anti_content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CastVote {
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSplit {
    pub soup_percent: u8,
    pub anti_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub battle_id: String,
    pub soup_votes: u32,
    pub anti_votes: u32,
    #[serde(flatten)]
    pub split: VoteSplit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CastReaction {
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub battle_id: String,
    pub reaction_counts: ReactionCounts,
    /// The caller's latest reaction on this battle.
    pub current: Option<ReactionKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub id: String,
    pub battle_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

// ── Comments ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommentStatus::Pending),
            "approved" => Some(CommentStatus::Approved),
            "rejected" => Some(CommentStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub battle_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub content: String,
    /// The commenter's stance, equal to their vote on the battle.
    pub side: Side,
    pub created_at: DateTime<Utc>,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub battle_id: String,
    pub content: String,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateCommentStatus {
    pub status: CommentStatus,
}

// ── Topics ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    #[default]
    Active,
    Disabled,
}

impl TopicStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicStatus::Active => "active",
            TopicStatus::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TopicStatus::Active),
            "disabled" => Some(TopicStatus::Disabled),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TopicStatus::Active => TopicStatus::Disabled,
            TopicStatus::Disabled => TopicStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub name: String,
    /// Derived from the battle collection; never authoritative.
    #[serde(default)]
    pub battle_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trending: Option<bool>,
    pub status: TopicStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopic {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TopicStatus>,
}

// ── Admins & system ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    #[default]
    None,
    Emailjs,
    Mailgun,
}

impl EmailProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailProvider::None => "none",
            EmailProvider::Emailjs => "emailjs",
            EmailProvider::Mailgun => "mailgun",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(EmailProvider::None),
            "emailjs" => Some(EmailProvider::Emailjs),
            "mailgun" => Some(EmailProvider::Mailgun),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "system" => Some(ThemeMode::System),
            _ => None,
        }
    }

    /// light → dark → system → light
    pub fn next(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::System,
            ThemeMode::System => ThemeMode::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub daily_generation_limit: u32,
    pub email_provider: EmailProvider,
    pub default_theme: ThemeMode,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            daily_generation_limit: 2,
            email_provider: EmailProvider::None,
            default_theme: ThemeMode::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub is_db_configured: bool,
    pub has_real_admins: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddAdmin {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

// ── Generation ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub soup: String,
    pub anti: String,
}

impl GeneratedContent {
    /// Canned pair served whenever the model is unavailable.
    pub fn fallback() -> Self {
        Self {
            soup: "只要努力，梦想就会开花！".into(),
            anti: "努力不一定成功，但不努力真的很舒服。".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub content: GeneratedContent,
    /// `None` means unlimited.
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
