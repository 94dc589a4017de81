//! In-memory copy of the service's collections, used when the service
//! cannot be reached.

use antisoup_shared::{
    ledger, moderation::{self, BattleAction}, seed, topics, AddAdmin, AuthProvider, Battle,
    BattleStatus, Comment, CommentStatus, CreateComment, PublishBattle, ReactionCounts,
    ReactionKind, ReactionRecord, ReactionResponse, Role, Side, SystemConfig, SystemStatus, Topic,
    TopicStatus, TopicUpdate, User, VoteTally, BATTLE_LIFETIME_DAYS,
};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

/// Root account address used when no service tells us otherwise.
pub const DEFAULT_ROOT_EMAIL: &str = "admin@antisoup.com";

pub fn local_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Collections as the service last reported them.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub battles: &'a [Battle],
    pub comments: &'a [Comment],
    pub topics: &'a [Topic],
    pub admins: &'a [User],
    pub config: SystemConfig,
}

/// Replaces entries sharing an id with `fresh`, appends the rest.
fn upsert<T: Clone>(local: &mut Vec<T>, fresh: &[T], id: impl Fn(&T) -> &str) {
    for item in fresh {
        match local.iter_mut().find(|l| id(l) == id(item)) {
            Some(slot) => *slot = item.clone(),
            None => local.push(item.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mirror {
    pub battles: Vec<Battle>,
    pub comments: Vec<Comment>,
    pub reactions: Vec<ReactionRecord>,
    pub topics: Vec<Topic>,
    pub users: Vec<User>,
    pub config: SystemConfig,
}

impl Mirror {
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut users = seed::admins(now);
        users.push(seed::super_admin(DEFAULT_ROOT_EMAIL, now));
        Self {
            battles: seed::battles(now),
            comments: seed::comments(now),
            reactions: Vec::new(),
            topics: seed::topics(),
            users,
            config: seed::config(),
        }
    }

    /// Folds a read from the service into the mirror so later offline
    /// writes can target anything the user has seen. Local-only entries
    /// (offline writes not yet reconciled) are kept.
    pub fn absorb(&mut self, snapshot: Snapshot<'_>) {
        upsert(&mut self.battles, snapshot.battles, |b| b.id.as_str());
        upsert(&mut self.comments, snapshot.comments, |c| c.id.as_str());
        upsert(&mut self.topics, snapshot.topics, |t| t.id.as_str());
        upsert(&mut self.users, snapshot.admins, |u| u.id.as_str());
        self.config = snapshot.config;
    }

    pub fn admins(&self) -> Vec<User> {
        self.users.iter().filter(|u| u.is_admin()).cloned().collect()
    }

    /// A mirror never counts as a configured database.
    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            is_db_configured: false,
            has_real_admins: self
                .users
                .iter()
                .any(|u| u.is_admin() && u.id != seed::ROOT_ID),
        }
    }

    fn battle_mut(&mut self, id: &str) -> Option<&mut Battle> {
        self.battles.iter_mut().find(|b| b.id == id)
    }

    pub fn create_battle(
        &mut self,
        req: &PublishBattle,
        author_id: &str,
        now: DateTime<Utc>,
    ) -> Battle {
        let topic = req.topic.trim().to_string();
        let battle = Battle {
            id: local_id("b"),
            topic_id: topics::find_by_name(&self.topics, &topic).map(|t| t.id.clone()),
            topic,
            soup_content: req.soup_content.trim().to_string(),
            soup_votes: 1,
            anti_content: req.anti_content.trim().to_string(),
            anti_votes: 1,
            reaction_counts: ReactionCounts::default(),
            author_id: author_id.to_string(),
            created_at: now,
            expires_at: now + Duration::days(BATTLE_LIFETIME_DAYS),
            is_pinned: false,
            status: BattleStatus::Pending,
        };
        self.battles.insert(0, battle.clone());
        battle
    }

    pub fn moderate_battle(
        &mut self,
        id: &str,
        action: &BattleAction,
        now: DateTime<Utc>,
    ) -> Option<Battle> {
        let battle = self.battles.iter_mut().find(|b| b.id == id)?;
        match moderation::plan(battle, action, &self.topics, now) {
            Ok(update) => {
                battle.apply(&update);
                Some(battle.clone())
            }
            Err(e) => {
                warn!(battle = id, "mirror refused moderation: {e}");
                None
            }
        }
    }

    pub fn vote(&mut self, id: &str, side: Side) -> Option<VoteTally> {
        let battle = self.battle_mut(id)?;
        ledger::apply_vote(battle, side);
        Some(VoteTally {
            battle_id: battle.id.clone(),
            soup_votes: battle.soup_votes,
            anti_votes: battle.anti_votes,
            split: battle.split(),
        })
    }

    pub fn react(
        &mut self,
        id: &str,
        reactor: &str,
        kind: ReactionKind,
        now: DateTime<Utc>,
    ) -> Option<ReactionResponse> {
        let battle = self.battle_mut(id)?;
        ledger::apply_reaction(battle, kind);
        let reaction_counts = battle.reaction_counts;
        self.reactions.push(ReactionRecord {
            id: local_id("r"),
            battle_id: id.to_string(),
            user_id: reactor.to_string(),
            kind,
            created_at: now,
        });
        Some(ReactionResponse {
            battle_id: id.to_string(),
            reaction_counts,
            current: ledger::current_reaction(&self.reactions, id, reactor),
        })
    }

    /// Queued as pending. The battle may be one only the service knows.
    pub fn add_comment(
        &mut self,
        req: &CreateComment,
        author: &User,
        now: DateTime<Utc>,
    ) -> Comment {
        let comment = Comment {
            id: local_id("c"),
            battle_id: req.battle_id.clone(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            user_avatar: author.avatar.clone(),
            content: req.content.trim().to_string(),
            side: req.side,
            created_at: now,
            status: CommentStatus::Pending,
        };
        self.comments.push(comment.clone());
        comment
    }

    pub fn update_comment_status(&mut self, id: &str, status: CommentStatus) -> Option<Comment> {
        let comment = self.comments.iter_mut().find(|c| c.id == id)?;
        comment.status = moderation::review_comment(comment.status, status).ok()?;
        Some(comment.clone())
    }

    pub fn create_topic(&mut self, name: &str) -> Option<Topic> {
        let name = name.trim();
        if name.is_empty() || topics::find_by_name(&self.topics, name).is_some() {
            return None;
        }
        let topic = Topic {
            id: local_id("t"),
            name: name.to_string(),
            battle_count: 0,
            is_trending: None,
            status: TopicStatus::Active,
        };
        self.topics.push(topic.clone());
        Some(topic)
    }

    pub fn update_topic(&mut self, id: &str, update: &TopicUpdate) -> Option<Topic> {
        let topic = self.topics.iter_mut().find(|t| t.id == id)?;
        if let Some(name) = &update.name {
            topic.name = name.trim().to_string();
        }
        if let Some(status) = update.status {
            topic.status = status;
        }
        Some(topic.clone())
    }

    pub fn add_admin(&mut self, req: &AddAdmin, now: DateTime<Utc>) -> User {
        let email = req.email.trim().to_lowercase();
        if let Some(existing) = self.users.iter_mut().find(|u| u.email == email) {
            if existing.role == Role::User {
                existing.role = Role::Admin;
            }
            return existing.clone();
        }
        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("New Admin")
            .to_string();
        let user = User {
            id: local_id("u"),
            avatar: seed::avatar_for(&name),
            name,
            email,
            provider: AuthProvider::System,
            role: Role::Admin,
            created_at: now,
            daily_generations: 0,
            last_generation_date: None,
        };
        self.users.push(user.clone());
        user
    }

    /// Demotes an admin; super admins are left alone.
    pub fn remove_admin(&mut self, id: &str) -> bool {
        match self.users.iter_mut().find(|u| u.id == id) {
            Some(user) if user.role == Role::Admin => {
                user.role = Role::User;
                true
            }
            _ => false,
        }
    }

    pub fn update_config(&mut self, config: SystemConfig) -> SystemConfig {
        self.config = config;
        config
    }
}
