//! In-process stand-in for the service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use antisoup_shared::{
    moderation::BattleAction, AddAdmin, AuthProvider, AuthResponse, Battle, Comment,
    CommentStatus, CreateComment, GenerateResponse, GeneratedContent, LoginLinkResponse,
    PublishBattle, ReactionKind, ReactionResponse, Role, Side, SystemConfig, SystemStatus, Topic,
    TopicUpdate, User, VoteTally, ANONYMOUS_REACTOR,
};
use async_trait::async_trait;
use chrono::Utc;

use crate::error::ClientError;
use crate::mirror::{local_id, Mirror};
use crate::remote::Remote;

/// Link tokens are `link-{email}`, session tokens `session-{user id}`.
pub struct FakeRemote {
    state: Mutex<Mirror>,
    online: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
    token: Option<String>,
}

fn status(code: u16, message: &str) -> ClientError {
    ClientError::Status {
        status: code,
        message: message.to_string(),
    }
}

impl FakeRemote {
    fn with(online: bool) -> Self {
        Self {
            state: Mutex::new(Mirror::seeded(Utc::now())),
            online: AtomicBool::new(online),
            calls: Mutex::new(Vec::new()),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn session_token(user_id: &str) -> String {
        format!("session-{user_id}")
    }

    pub fn online() -> Self {
        Self::with(true)
    }

    pub fn offline() -> Self {
        Self::with(false)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn state(&self) -> MutexGuard<'_, Mirror> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str) -> Result<MutexGuard<'_, Mirror>, ClientError> {
        self.calls.lock().unwrap().push(call);
        if self.online.load(Ordering::SeqCst) {
            Ok(self.state())
        } else {
            Err(status(503, "offline"))
        }
    }
}

#[async_trait]
impl Remote for FakeRemote {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn send_login_link(&self, email: &str) -> Result<LoginLinkResponse, ClientError> {
        self.enter("send_login_link")?;
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(status(400, "invalid email address"));
        }
        let token = format!("link-{email}");
        Ok(LoginLinkResponse {
            success: true,
            message: "No mail provider configured; use the link directly".into(),
            demo_link: Some(format!(
                "http://localhost:5173?token={}",
                urlencoding::encode(&token)
            )),
        })
    }

    async fn verify_login_link(&self, token: &str) -> Result<AuthResponse, ClientError> {
        let mut state = self.enter("verify_login_link")?;
        let email = token
            .strip_prefix("link-")
            .ok_or_else(|| status(401, "unauthorized"))?;
        let user = match state.users.iter().find(|u| u.email == email) {
            Some(existing) => existing.clone(),
            None => {
                let user = User {
                    id: local_id("u"),
                    name: email.split('@').next().unwrap_or(email).to_string(),
                    avatar: String::new(),
                    email: email.to_string(),
                    provider: AuthProvider::Email,
                    role: Role::User,
                    created_at: Utc::now(),
                    daily_generations: 0,
                    last_generation_date: None,
                };
                state.users.push(user.clone());
                user
            }
        };
        Ok(AuthResponse {
            token: Self::session_token(&user.id),
            user,
        })
    }

    async fn me(&self) -> Result<User, ClientError> {
        let state = self.enter("me")?;
        let id = self
            .token
            .as_deref()
            .and_then(|t| t.strip_prefix("session-"))
            .ok_or_else(|| status(401, "unauthorized"))?;
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| status(401, "unauthorized"))
    }

    async fn battles(&self) -> Result<Vec<Battle>, ClientError> {
        Ok(self.enter("battles")?.battles.clone())
    }

    async fn comments(&self) -> Result<Vec<Comment>, ClientError> {
        Ok(self.enter("comments")?.comments.clone())
    }

    async fn admins(&self) -> Result<Vec<User>, ClientError> {
        Ok(self.enter("admins")?.admins())
    }

    async fn system_config(&self) -> Result<SystemConfig, ClientError> {
        Ok(self.enter("system_config")?.config)
    }

    async fn topics(&self) -> Result<Vec<Topic>, ClientError> {
        Ok(self.enter("topics")?.topics.clone())
    }

    async fn system_status(&self) -> Result<SystemStatus, ClientError> {
        let state = self.enter("system_status")?;
        Ok(SystemStatus {
            is_db_configured: true,
            has_real_admins: state.status().has_real_admins,
        })
    }

    async fn create_battle(&self, battle: &PublishBattle) -> Result<Battle, ClientError> {
        Ok(self
            .enter("create_battle")?
            .create_battle(battle, "u_remote", Utc::now()))
    }

    async fn moderate_battle(
        &self,
        id: &str,
        action: &BattleAction,
    ) -> Result<Battle, ClientError> {
        self.enter("moderate_battle")?
            .moderate_battle(id, action, Utc::now())
            .ok_or_else(|| status(409, "refused"))
    }

    async fn vote(&self, battle_id: &str, side: Side) -> Result<VoteTally, ClientError> {
        self.enter("vote")?
            .vote(battle_id, side)
            .ok_or_else(|| status(404, "battle not found"))
    }

    async fn react(
        &self,
        battle_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionResponse, ClientError> {
        self.enter("react")?
            .react(battle_id, ANONYMOUS_REACTOR, kind, Utc::now())
            .ok_or_else(|| status(404, "battle not found"))
    }

    async fn add_comment(&self, comment: &CreateComment) -> Result<Comment, ClientError> {
        let author = User {
            id: "u_remote".into(),
            name: "remote".into(),
            avatar: String::new(),
            email: "remote@antisoup.test".into(),
            provider: AuthProvider::Email,
            role: Role::User,
            created_at: Utc::now(),
            daily_generations: 0,
            last_generation_date: None,
        };
        let mut state = self.enter("add_comment")?;
        if !state.battles.iter().any(|b| b.id == comment.battle_id) {
            return Err(status(404, "battle not found"));
        }
        Ok(state.add_comment(comment, &author, Utc::now()))
    }

    async fn update_comment_status(
        &self,
        id: &str,
        new_status: CommentStatus,
    ) -> Result<Comment, ClientError> {
        self.enter("update_comment_status")?
            .update_comment_status(id, new_status)
            .ok_or_else(|| status(409, "comment already reviewed"))
    }

    async fn create_topic(&self, name: &str) -> Result<Topic, ClientError> {
        self.enter("create_topic")?
            .create_topic(name)
            .ok_or_else(|| status(409, "topic exists"))
    }

    async fn update_topic(&self, id: &str, update: &TopicUpdate) -> Result<Topic, ClientError> {
        self.enter("update_topic")?
            .update_topic(id, update)
            .ok_or_else(|| status(404, "topic not found"))
    }

    async fn add_admin(&self, admin: &AddAdmin) -> Result<User, ClientError> {
        Ok(self.enter("add_admin")?.add_admin(admin, Utc::now()))
    }

    async fn remove_admin(&self, id: &str) -> Result<(), ClientError> {
        if self.enter("remove_admin")?.remove_admin(id) {
            Ok(())
        } else {
            Err(status(403, "cannot revoke"))
        }
    }

    async fn update_system_config(
        &self,
        config: &SystemConfig,
    ) -> Result<SystemConfig, ClientError> {
        Ok(self.enter("update_system_config")?.update_config(*config))
    }

    async fn generate(&self, topic: &str) -> Result<GenerateResponse, ClientError> {
        self.enter("generate")?;
        Ok(GenerateResponse {
            content: GeneratedContent {
                soup: format!("{topic}使人快乐"),
                anti: format!("{topic}使人破产"),
            },
            remaining: Some(1),
        })
    }
}
