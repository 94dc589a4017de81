//! Remote-first data access with an in-memory fallback.
//!
//! Reads return the service's answer when it has one and a copy of the
//! mirror otherwise. Writes go to the service first; when that fails the
//! same change is applied to the mirror and the command stays in the
//! outbox as failed until [`DataProvider::reconcile`] re-sends it.
//! Confirmed commands leave the outbox as soon as they settle.

use antisoup_shared::{
    moderation::BattleAction, AddAdmin, AuthResponse, Battle, Comment, CommentStatus,
    CreateComment, GeneratedContent, LoginLinkResponse, PublishBattle, ReactionKind,
    ReactionResponse, Side, SystemConfig, SystemStatus, Topic, TopicUpdate, User, VoteTally,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::mirror::{Mirror, Snapshot};
use crate::outbox::{Command, CommandState, Outbox};
use crate::remote::Remote;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub confirmed: usize,
    pub failed: usize,
}

pub struct DataProvider<R> {
    remote: R,
    mirror: Mirror,
    outbox: Outbox,
    last_confirmed: bool,
}

fn fallback<T>(what: &str, result: Result<T, ClientError>, local: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("reading {what} from the local mirror: {e}");
            local()
        }
    }
}

async fn dispatch<R: Remote + ?Sized>(remote: &R, command: &Command) -> Result<(), ClientError> {
    match command {
        Command::CreateBattle(req) => remote.create_battle(req).await.map(drop),
        Command::ModerateBattle { id, action } => remote.moderate_battle(id, action).await.map(drop),
        Command::Vote { battle_id, side } => remote.vote(battle_id, *side).await.map(drop),
        Command::React { battle_id, kind } => remote.react(battle_id, *kind).await.map(drop),
        Command::AddComment(req) => remote.add_comment(req).await.map(drop),
        Command::UpdateCommentStatus { id, status } => {
            remote.update_comment_status(id, *status).await.map(drop)
        }
        Command::CreateTopic { name } => remote.create_topic(name).await.map(drop),
        Command::UpdateTopic { id, update } => remote.update_topic(id, update).await.map(drop),
        Command::AddAdmin(req) => remote.add_admin(req).await.map(drop),
        Command::RemoveAdmin { id } => remote.remove_admin(id).await,
        Command::UpdateSystemConfig(config) => remote.update_system_config(config).await.map(drop),
    }
}

impl<R: Remote> DataProvider<R> {
    pub fn new(remote: R, mirror: Mirror) -> Self {
        Self {
            remote,
            mirror,
            outbox: Outbox::default(),
            last_confirmed: false,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Keeps the mirror in step with what the service last returned.
    pub fn absorb(&mut self, snapshot: Snapshot<'_>) {
        self.mirror.absorb(snapshot);
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Whether the most recent write reached the service.
    pub fn last_write_confirmed(&self) -> bool {
        self.last_confirmed
    }

    /// Settles a write: confirmed entries are dropped, failed ones stay
    /// queued and yield `None`.
    fn settle<T>(&mut self, seq: u64, result: Result<T, ClientError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.outbox.mark(seq, CommandState::Confirmed);
                self.outbox.prune_confirmed();
                self.last_confirmed = true;
                Some(value)
            }
            Err(e) => {
                warn!(seq, "remote write failed, applied locally: {e}");
                self.outbox.mark(seq, CommandState::Failed(e.to_string()));
                self.last_confirmed = false;
                None
            }
        }
    }

    // ── Auth ──
    //
    // Sign-in needs the service; nothing here falls back to the mirror.

    pub fn set_token(&mut self, token: Option<String>) {
        self.remote.set_token(token);
    }

    pub async fn send_login_link(&self, email: &str) -> Result<LoginLinkResponse, ClientError> {
        self.remote.send_login_link(email).await
    }

    pub async fn verify_login_link(&self, token: &str) -> Result<AuthResponse, ClientError> {
        self.remote.verify_login_link(token).await
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.remote.me().await
    }

    // ── Reads ──

    pub async fn battles(&self) -> Vec<Battle> {
        fallback("battles", self.remote.battles().await, || {
            self.mirror.battles.clone()
        })
    }

    pub async fn comments(&self) -> Vec<Comment> {
        fallback("comments", self.remote.comments().await, || {
            self.mirror.comments.clone()
        })
    }

    pub async fn admins(&self) -> Vec<User> {
        fallback("admins", self.remote.admins().await, || self.mirror.admins())
    }

    pub async fn system_config(&self) -> SystemConfig {
        fallback("config", self.remote.system_config().await, || {
            self.mirror.config
        })
    }

    pub async fn topics(&self) -> Vec<Topic> {
        fallback("topics", self.remote.topics().await, || {
            self.mirror.topics.clone()
        })
    }

    /// A service that cannot be asked is reported as unconfigured.
    pub async fn system_status(&self) -> SystemStatus {
        fallback("status", self.remote.system_status().await, || {
            self.mirror.status()
        })
    }

    /// Canned content when the service cannot generate.
    pub async fn generate(&self, topic: &str) -> GeneratedContent {
        match self.remote.generate(topic).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!("generation unavailable, using canned content: {e}");
                GeneratedContent::fallback()
            }
        }
    }

    // ── Writes ──

    pub async fn create_battle(&mut self, req: &PublishBattle, author: &User) -> Battle {
        let seq = self.outbox.record(Command::CreateBattle(req.clone()));
        let result = self.remote.create_battle(req).await;
        match self.settle(seq, result) {
            Some(battle) => battle,
            None => self.mirror.create_battle(req, &author.id, Utc::now()),
        }
    }

    pub async fn moderate_battle(&mut self, id: &str, action: &BattleAction) -> Option<Battle> {
        let seq = self.outbox.record(Command::ModerateBattle {
            id: id.to_string(),
            action: action.clone(),
        });
        let result = self.remote.moderate_battle(id, action).await;
        match self.settle(seq, result) {
            Some(battle) => Some(battle),
            None => self.mirror.moderate_battle(id, action, Utc::now()),
        }
    }

    pub async fn vote(&mut self, battle_id: &str, side: Side) -> Option<VoteTally> {
        let seq = self.outbox.record(Command::Vote {
            battle_id: battle_id.to_string(),
            side,
        });
        let result = self.remote.vote(battle_id, side).await;
        match self.settle(seq, result) {
            Some(tally) => Some(tally),
            None => self.mirror.vote(battle_id, side),
        }
    }

    pub async fn react(
        &mut self,
        battle_id: &str,
        kind: ReactionKind,
        reactor: &str,
    ) -> Option<ReactionResponse> {
        let seq = self.outbox.record(Command::React {
            battle_id: battle_id.to_string(),
            kind,
        });
        let result = self.remote.react(battle_id, kind).await;
        match self.settle(seq, result) {
            Some(resp) => Some(resp),
            None => self.mirror.react(battle_id, reactor, kind, Utc::now()),
        }
    }

    pub async fn add_comment(&mut self, req: &CreateComment, author: &User) -> Comment {
        let seq = self.outbox.record(Command::AddComment(req.clone()));
        let result = self.remote.add_comment(req).await;
        match self.settle(seq, result) {
            Some(comment) => comment,
            None => self.mirror.add_comment(req, author, Utc::now()),
        }
    }

    pub async fn update_comment_status(
        &mut self,
        id: &str,
        status: CommentStatus,
    ) -> Option<Comment> {
        let seq = self.outbox.record(Command::UpdateCommentStatus {
            id: id.to_string(),
            status,
        });
        let result = self.remote.update_comment_status(id, status).await;
        match self.settle(seq, result) {
            Some(comment) => Some(comment),
            None => self.mirror.update_comment_status(id, status),
        }
    }

    pub async fn create_topic(&mut self, name: &str) -> Option<Topic> {
        let seq = self.outbox.record(Command::CreateTopic {
            name: name.to_string(),
        });
        let result = self.remote.create_topic(name).await;
        match self.settle(seq, result) {
            Some(topic) => Some(topic),
            None => self.mirror.create_topic(name),
        }
    }

    pub async fn update_topic(&mut self, id: &str, update: &TopicUpdate) -> Option<Topic> {
        let seq = self.outbox.record(Command::UpdateTopic {
            id: id.to_string(),
            update: update.clone(),
        });
        let result = self.remote.update_topic(id, update).await;
        match self.settle(seq, result) {
            Some(topic) => Some(topic),
            None => self.mirror.update_topic(id, update),
        }
    }

    pub async fn add_admin(&mut self, req: &AddAdmin) -> User {
        let seq = self.outbox.record(Command::AddAdmin(req.clone()));
        let result = self.remote.add_admin(req).await;
        match self.settle(seq, result) {
            Some(user) => user,
            None => self.mirror.add_admin(req, Utc::now()),
        }
    }

    pub async fn remove_admin(&mut self, id: &str) {
        let seq = self.outbox.record(Command::RemoveAdmin { id: id.to_string() });
        let result = self.remote.remove_admin(id).await;
        if self.settle(seq, result).is_none() {
            self.mirror.remove_admin(id);
        }
    }

    pub async fn update_system_config(&mut self, config: SystemConfig) -> SystemConfig {
        let seq = self.outbox.record(Command::UpdateSystemConfig(config));
        let result = self.remote.update_system_config(&config).await;
        match self.settle(seq, result) {
            Some(stored) => stored,
            None => self.mirror.update_config(config),
        }
    }

    /// Re-sends failed commands in issuance order. Nothing is retried
    /// automatically and nothing is rolled back.
    pub async fn reconcile(&mut self) -> Reconciled {
        let owed: Vec<(u64, Command)> = self
            .outbox
            .failed()
            .map(|e| (e.seq, e.command.clone()))
            .collect();

        let mut report = Reconciled::default();
        for (seq, command) in owed {
            self.outbox.mark(seq, CommandState::Pending);
            match dispatch(&self.remote, &command).await {
                Ok(()) => {
                    self.outbox.mark(seq, CommandState::Confirmed);
                    report.confirmed += 1;
                }
                Err(e) => {
                    warn!(seq, command = command.label(), "still failing: {e}");
                    self.outbox.mark(seq, CommandState::Failed(e.to_string()));
                    report.failed += 1;
                }
            }
        }
        self.outbox.prune_confirmed();

        info!(
            confirmed = report.confirmed,
            failed = report.failed,
            "reconciled outbox"
        );
        report
    }
}
