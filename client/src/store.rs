//! Application state: cached collections plus the signed-in session.
//!
//! Every action updates the local copy first and then goes through the
//! [`DataProvider`]. When the service confirms a write its answer replaces
//! the optimistic value; otherwise the local value stands.

use std::collections::HashMap;

use antisoup_shared::{
    ledger,
    moderation::{self, BattleAction},
    quota::{self, Remaining},
    ranking::{self, AdminBuckets},
    topics, validation, AddAdmin, AuthResponse, Battle, Comment, CommentStatus, CreateComment,
    GeneratedContent, LoginLinkResponse, PublishBattle, ReactionCounts, ReactionKind,
    ReactionRecord, Role, RuleError, Side, SystemConfig, SystemStatus, ThemeMode, Topic,
    TopicUpdate, User, VoteSplit,
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::deep_link::{self, DeepLink};
use crate::error::{ClientError, StoreError};
use crate::mirror::{local_id, Snapshot};
use crate::provider::{DataProvider, Reconciled};
use crate::remote::Remote;
use crate::session::{KeyValueStore, Session};

pub struct Store<R, K> {
    provider: DataProvider<R>,
    session: Session<K>,

    battles: Vec<Battle>,
    comments: Vec<Comment>,
    reactions: Vec<ReactionRecord>,
    topics: Vec<Topic>,
    admins: Vec<User>,
    config: SystemConfig,
    status: SystemStatus,

    user: Option<User>,
    theme: Option<ThemeMode>,
    /// One vote per battle for the life of this store.
    session_votes: HashMap<String, Side>,
    selected: Option<String>,
}

impl<R: Remote, K: KeyValueStore> Store<R, K> {
    /// Restores the saved user, token and theme; collections stay empty
    /// until [`Store::load`].
    pub fn new(mut provider: DataProvider<R>, session: Session<K>) -> Self {
        let user = session.user();
        let theme = session.theme();
        if let Some(token) = session.token() {
            provider.set_token(Some(token));
        }
        Self {
            provider,
            session,
            battles: Vec::new(),
            comments: Vec::new(),
            reactions: Vec::new(),
            topics: Vec::new(),
            admins: Vec::new(),
            config: SystemConfig::default(),
            status: SystemStatus {
                is_db_configured: false,
                has_real_admins: false,
            },
            user,
            theme,
            session_votes: HashMap::new(),
            selected: None,
        }
    }

    pub async fn load(&mut self) {
        let p = &self.provider;
        let (battles, comments, admins, config, topics, status) = tokio::join!(
            p.battles(),
            p.comments(),
            p.admins(),
            p.system_config(),
            p.topics(),
            p.system_status(),
        );
        info!(
            battles = battles.len(),
            comments = comments.len(),
            topics = topics.len(),
            db = status.is_db_configured,
            "store loaded"
        );
        self.battles = battles;
        self.comments = comments;
        self.admins = admins;
        self.config = config;
        self.topics = topics;
        self.status = status;
        self.provider.absorb(Snapshot {
            battles: &self.battles,
            comments: &self.comments,
            topics: &self.topics,
            admins: &self.admins,
            config: self.config,
        });
    }

    pub fn provider(&self) -> &DataProvider<R> {
        &self.provider
    }

    pub fn session(&self) -> &Session<K> {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn battles(&self) -> &[Battle] {
        &self.battles
    }

    pub fn battle(&self, id: &str) -> Option<&Battle> {
        self.battles.iter().find(|b| b.id == id)
    }

    pub fn admins(&self) -> &[User] {
        &self.admins
    }

    pub fn config(&self) -> SystemConfig {
        self.config
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    pub fn session_vote(&self, battle_id: &str) -> Option<Side> {
        self.session_votes.get(battle_id).copied()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn battle_mut(&mut self, id: &str) -> Result<&mut Battle, StoreError> {
        self.battles
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound("battle"))
    }

    fn signed_in(&self) -> Result<&User, StoreError> {
        self.user.as_ref().ok_or(StoreError::NotSignedIn)
    }

    fn require_admin(&self) -> Result<(), StoreError> {
        if self.signed_in()?.is_admin() {
            Ok(())
        } else {
            Err(StoreError::NotAdmin)
        }
    }

    fn require_super_admin(&self) -> Result<(), StoreError> {
        if self.signed_in()?.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(StoreError::NotSuperAdmin)
        }
    }

    fn persist_user(&mut self) {
        let result = match &self.user {
            Some(user) => self.session.save_user(user),
            None => self.session.clear_user(),
        };
        if let Err(e) = result {
            warn!("could not persist session: {e}");
        }
    }

    fn set_token(&mut self, token: Option<String>) {
        let result = match &token {
            Some(token) => self.session.save_token(token),
            None => self.session.clear_token(),
        };
        if let Err(e) = result {
            warn!("could not persist token: {e}");
        }
        self.provider.set_token(token);
    }

    // ── Listings ──

    pub fn ranked(&self, now: DateTime<Utc>) -> Vec<&Battle> {
        ranking::rank(&self.battles, now)
    }

    pub fn admin_buckets(&self, now: DateTime<Utc>) -> AdminBuckets<'_> {
        ranking::admin_buckets(&self.battles, now)
    }

    /// Topics with counts recomputed from the loaded battles.
    pub fn topics(&self) -> Vec<Topic> {
        topics::aggregate(&self.topics, &self.battles)
    }

    pub fn suggestions<G: Rng + ?Sized>(&self, rng: &mut G) -> Vec<String> {
        let counted = self.topics();
        topics::suggest(&counted, rng)
            .into_iter()
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn detail_comments(&self, battle_id: &str) -> Vec<&Comment> {
        ranking::detail_comments(&self.comments, battle_id)
    }

    // ── Voting & reactions ──

    pub async fn vote(&mut self, battle_id: &str, side: Side) -> Result<VoteSplit, StoreError> {
        if self.session_votes.contains_key(battle_id) {
            return Err(StoreError::AlreadyVoted);
        }
        ledger::apply_vote(self.battle_mut(battle_id)?, side);
        self.session_votes.insert(battle_id.to_string(), side);

        let tally = self.provider.vote(battle_id, side).await;
        let confirmed = self.provider.last_write_confirmed();
        let battle = self.battle_mut(battle_id)?;
        if let (true, Some(tally)) = (confirmed, tally) {
            battle.soup_votes = tally.soup_votes;
            battle.anti_votes = tally.anti_votes;
        }
        Ok(battle.split())
    }

    pub async fn react(
        &mut self,
        battle_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionCounts, StoreError> {
        ledger::apply_reaction(self.battle_mut(battle_id)?, kind);
        let reactor = ledger::reactor_id(self.user.as_ref()).to_string();
        self.reactions.push(ReactionRecord {
            id: local_id("r"),
            battle_id: battle_id.to_string(),
            user_id: reactor.clone(),
            kind,
            created_at: Utc::now(),
        });

        let resp = self.provider.react(battle_id, kind, &reactor).await;
        let confirmed = self.provider.last_write_confirmed();
        let battle = self.battle_mut(battle_id)?;
        if let (true, Some(resp)) = (confirmed, resp) {
            battle.reaction_counts = resp.reaction_counts;
        }
        Ok(battle.reaction_counts)
    }

    pub fn current_reaction(&self, battle_id: &str) -> Option<ReactionKind> {
        let reactor = ledger::reactor_id(self.user.as_ref());
        ledger::current_reaction(&self.reactions, battle_id, reactor)
    }

    // ── Generation & publishing ──

    /// `None` when nobody is signed in.
    pub fn generation_remaining(&self, today: NaiveDate) -> Option<Remaining> {
        let user = self.user.as_ref()?;
        Some(quota::remaining(user, self.config.daily_generation_limit, today))
    }

    pub async fn generate(
        &self,
        topic: &str,
        today: NaiveDate,
    ) -> Result<GeneratedContent, StoreError> {
        let user = self.signed_in()?;
        let topic = validation::submission_topic(&self.topics, topic)?;
        quota::ensure_available(user, self.config.daily_generation_limit, today)?;
        Ok(self.provider.generate(&topic).await)
    }

    pub async fn publish(
        &mut self,
        req: &PublishBattle,
        today: NaiveDate,
    ) -> Result<Battle, StoreError> {
        let author = self.signed_in()?.clone();
        let topic = validation::submission_topic(&self.topics, &req.topic)?;
        validation::battle_content(&req.soup_content, &req.anti_content)?;
        let req = PublishBattle {
            topic,
            soup_content: req.soup_content.trim().to_string(),
            anti_content: req.anti_content.trim().to_string(),
        };

        let battle = self.provider.create_battle(&req, &author).await;
        self.battles.insert(0, battle.clone());
        if let Some(user) = self.user.as_mut().filter(|u| !u.is_admin()) {
            quota::consume(user, today);
        }
        self.persist_user();
        info!(battle = %battle.id, "published battle for review");
        Ok(battle)
    }

    // ── Comments ──

    pub async fn add_comment(
        &mut self,
        battle_id: &str,
        content: &str,
        side: Side,
    ) -> Result<Comment, StoreError> {
        let author = self.signed_in()?.clone();
        if self.battle(battle_id).is_none() {
            return Err(StoreError::NotFound("battle"));
        }
        validation::comment(content, side, self.session_vote(battle_id))?;

        let req = CreateComment {
            battle_id: battle_id.to_string(),
            content: content.trim().to_string(),
            side,
        };
        let comment = self.provider.add_comment(&req, &author).await;
        self.comments.push(comment.clone());
        Ok(comment)
    }

    // ── Moderation ──

    pub async fn moderate_battle(
        &mut self,
        id: &str,
        action: &BattleAction,
        now: DateTime<Utc>,
    ) -> Result<Battle, StoreError> {
        self.require_admin()?;
        let battle = self
            .battles
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound("battle"))?;
        let update = moderation::plan(battle, action, &self.topics, now)?;
        battle.apply(&update);

        let stored = self.provider.moderate_battle(id, action).await;
        let confirmed = self.provider.last_write_confirmed();
        let battle = self.battle_mut(id)?;
        if let (true, Some(stored)) = (confirmed, stored) {
            *battle = stored;
        }
        Ok(battle.clone())
    }

    pub async fn set_comment_status(
        &mut self,
        id: &str,
        status: CommentStatus,
    ) -> Result<Comment, StoreError> {
        self.require_admin()?;
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound("comment"))?;
        comment.status = moderation::review_comment(comment.status, status)?;
        let reviewed = comment.clone();

        self.provider.update_comment_status(id, status).await;
        Ok(reviewed)
    }

    pub async fn create_topic(&mut self, name: &str) -> Result<Topic, StoreError> {
        self.require_admin()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::Empty { field: "topic" }.into());
        }
        if topics::find_by_name(&self.topics, name).is_some() {
            return Err(StoreError::DuplicateTopic(name.to_string()));
        }

        let topic = self
            .provider
            .create_topic(name)
            .await
            .ok_or_else(|| StoreError::DuplicateTopic(name.to_string()))?;
        self.topics.push(topic.clone());
        Ok(topic)
    }

    /// Flips a topic between active and disabled.
    pub async fn toggle_topic(&mut self, id: &str) -> Result<Topic, StoreError> {
        self.require_admin()?;
        let topic = self
            .topics
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound("topic"))?;
        topic.status = topic.status.toggled();
        let update = TopicUpdate {
            name: None,
            status: Some(topic.status),
        };
        let toggled = topic.clone();

        self.provider.update_topic(id, &update).await;
        Ok(toggled)
    }

    // ── Staff & system ──

    pub async fn add_admin(&mut self, name: Option<&str>, email: &str) -> Result<User, StoreError> {
        self.require_super_admin()?;
        let email = email.trim();
        if email.is_empty() {
            return Err(RuleError::Empty { field: "email" }.into());
        }
        let req = AddAdmin {
            name: name.map(str::to_string),
            email: email.to_string(),
        };

        let admin = self.provider.add_admin(&req).await;
        match self.admins.iter_mut().find(|u| u.id == admin.id) {
            Some(existing) => *existing = admin.clone(),
            None => self.admins.push(admin.clone()),
        }
        self.status.has_real_admins = true;
        Ok(admin)
    }

    pub async fn remove_admin(&mut self, id: &str) -> Result<(), StoreError> {
        self.require_super_admin()?;
        let target = self
            .admins
            .iter()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("admin"))?;
        if target.role == Role::SuperAdmin {
            return Err(StoreError::ProtectedAccount);
        }

        self.provider.remove_admin(id).await;
        self.admins.retain(|u| u.id != id);
        Ok(())
    }

    pub async fn update_config(&mut self, config: SystemConfig) -> Result<SystemConfig, StoreError> {
        self.require_super_admin()?;
        self.config = self.provider.update_system_config(config).await;
        Ok(self.config)
    }

    // ── Session ──

    /// Local sign-in with no service session, as the demo entry does.
    pub fn login(&mut self, user: User) {
        info!(user = %user.id, role = user.role.as_str(), "signed in locally");
        self.set_token(None);
        self.user = Some(user);
        self.persist_user();
    }

    /// Adopts a session issued by the service.
    pub fn sign_in(&mut self, auth: AuthResponse) {
        info!(user = %auth.user.id, role = auth.user.role.as_str(), "signed in");
        self.set_token(Some(auth.token));
        self.user = Some(auth.user);
        self.persist_user();
    }

    pub fn logout(&mut self) {
        self.set_token(None);
        self.user = None;
        self.persist_user();
    }

    /// Asks the service to send a login link. A refused request comes back
    /// as [`StoreError::SignIn`] with the service's message.
    pub async fn request_login_link(
        &self,
        email: &str,
    ) -> Result<LoginLinkResponse, StoreError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(RuleError::Empty { field: "email" }.into());
        }
        let resp = self
            .provider
            .send_login_link(email)
            .await
            .map_err(sign_in_error)?;
        if !resp.success {
            return Err(StoreError::SignIn(resp.message));
        }
        Ok(resp)
    }

    /// Signs in with the `token` parameter of a login link. Returns the
    /// query to show afterwards, or `None` when there was no token.
    pub async fn consume_login_token(
        &mut self,
        query: &str,
    ) -> Result<Option<String>, StoreError> {
        let Some(token) = deep_link::token_param(query) else {
            return Ok(None);
        };
        let auth = self
            .provider
            .verify_login_link(&token)
            .await
            .map_err(sign_in_error)?;
        self.sign_in(auth);
        Ok(Some(deep_link::strip_param(query, deep_link::TOKEN_PARAM)))
    }

    /// Re-reads the signed-in user from the service. A rejected token
    /// signs out; an unreachable service keeps the saved user.
    pub async fn refresh_user(&mut self) -> Option<&User> {
        if self.session.token().is_none() {
            return self.user.as_ref();
        }
        match self.provider.me().await {
            Ok(user) => {
                self.user = Some(user);
                self.persist_user();
            }
            Err(ClientError::Status { status: 401, .. }) => {
                warn!("saved session was rejected, signing out");
                self.logout();
            }
            Err(e) => debug!("keeping the saved user: {e}"),
        }
        self.user.as_ref()
    }

    /// The saved override, else the configured default.
    pub fn effective_theme(&self) -> ThemeMode {
        self.theme.unwrap_or(self.config.default_theme)
    }

    pub fn toggle_theme(&mut self) -> ThemeMode {
        let next = self.effective_theme().next();
        self.theme = Some(next);
        if let Err(e) = self.session.save_theme(next) {
            warn!("could not persist theme: {e}");
        }
        next
    }

    /// Selects the battle named by `query`, if it is loaded.
    pub fn open_deep_link(&mut self, query: &str) -> DeepLink {
        let link = deep_link::resolve(query, &self.battles);
        self.selected = match &link {
            DeepLink::Open(id) => Some(id.clone()),
            DeepLink::Clear(_) | DeepLink::None => None,
        };
        link
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
    }

    pub async fn reconcile(&mut self) -> Reconciled {
        self.provider.reconcile().await
    }
}

fn sign_in_error(e: ClientError) -> StoreError {
    match e {
        ClientError::Status { message, .. } => StoreError::SignIn(message),
        other => StoreError::SignIn(format!("service unavailable: {other}")),
    }
}
