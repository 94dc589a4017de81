use antisoup_shared::{
    moderation::BattleAction, AddAdmin, AuthResponse, Battle, CastReaction, CastVote, Comment,
    CommentStatus, CreateComment, CreateTopic, ErrorBody, GenerateRequest, GenerateResponse,
    LoginLinkRequest, LoginLinkResponse, PublishBattle, ReactionKind, ReactionResponse, Side,
    SystemConfig, SystemStatus, Topic, TopicUpdate, UpdateCommentStatus, User, VerifyLink,
    VoteTally,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// The service as seen by the client.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Bearer token sent with every later request; `None` signs out.
    fn set_token(&mut self, token: Option<String>);

    async fn send_login_link(&self, email: &str) -> Result<LoginLinkResponse, ClientError>;
    async fn verify_login_link(&self, token: &str) -> Result<AuthResponse, ClientError>;
    async fn me(&self) -> Result<User, ClientError>;

    async fn battles(&self) -> Result<Vec<Battle>, ClientError>;
    async fn comments(&self) -> Result<Vec<Comment>, ClientError>;
    async fn admins(&self) -> Result<Vec<User>, ClientError>;
    async fn system_config(&self) -> Result<SystemConfig, ClientError>;
    async fn topics(&self) -> Result<Vec<Topic>, ClientError>;
    async fn system_status(&self) -> Result<SystemStatus, ClientError>;

    async fn create_battle(&self, battle: &PublishBattle) -> Result<Battle, ClientError>;
    async fn moderate_battle(&self, id: &str, action: &BattleAction)
        -> Result<Battle, ClientError>;
    async fn vote(&self, battle_id: &str, side: Side) -> Result<VoteTally, ClientError>;
    async fn react(&self, battle_id: &str, kind: ReactionKind)
        -> Result<ReactionResponse, ClientError>;
    async fn add_comment(&self, comment: &CreateComment) -> Result<Comment, ClientError>;
    async fn update_comment_status(
        &self,
        id: &str,
        status: CommentStatus,
    ) -> Result<Comment, ClientError>;
    async fn create_topic(&self, name: &str) -> Result<Topic, ClientError>;
    async fn update_topic(&self, id: &str, update: &TopicUpdate) -> Result<Topic, ClientError>;
    async fn add_admin(&self, admin: &AddAdmin) -> Result<User, ClientError>;
    async fn remove_admin(&self, id: &str) -> Result<(), ClientError>;
    async fn update_system_config(&self, config: &SystemConfig)
        -> Result<SystemConfig, ClientError>;

    async fn generate(&self, topic: &str) -> Result<GenerateResponse, ClientError>;
}

/// [`Remote`] over the JSON API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let body = self.send(self.request(Method::GET, path)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = self.send(self.request(Method::PUT, path).json(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl Remote for HttpRemote {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn send_login_link(&self, email: &str) -> Result<LoginLinkResponse, ClientError> {
        self.post(
            "/api/auth/login-link",
            &LoginLinkRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    async fn verify_login_link(&self, token: &str) -> Result<AuthResponse, ClientError> {
        self.post(
            "/api/auth/verify",
            &VerifyLink {
                token: token.to_string(),
            },
        )
        .await
    }

    async fn me(&self) -> Result<User, ClientError> {
        self.get("/api/auth/me").await
    }

    async fn battles(&self) -> Result<Vec<Battle>, ClientError> {
        self.get("/api/battles").await
    }

    async fn comments(&self) -> Result<Vec<Comment>, ClientError> {
        self.get("/api/comments").await
    }

    async fn admins(&self) -> Result<Vec<User>, ClientError> {
        self.get("/api/users?role=admin").await
    }

    async fn system_config(&self) -> Result<SystemConfig, ClientError> {
        self.get("/api/system/config").await
    }

    async fn topics(&self) -> Result<Vec<Topic>, ClientError> {
        self.get("/api/topics").await
    }

    async fn system_status(&self) -> Result<SystemStatus, ClientError> {
        self.get("/api/system/status").await
    }

    async fn create_battle(&self, battle: &PublishBattle) -> Result<Battle, ClientError> {
        self.post("/api/battles", battle).await
    }

    async fn moderate_battle(
        &self,
        id: &str,
        action: &BattleAction,
    ) -> Result<Battle, ClientError> {
        self.put(&format!("/api/battles/{}", segment(id)), action).await
    }

    async fn vote(&self, battle_id: &str, side: Side) -> Result<VoteTally, ClientError> {
        self.post(
            &format!("/api/battles/{}/vote", segment(battle_id)),
            &CastVote { side },
        )
        .await
    }

    async fn react(
        &self,
        battle_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionResponse, ClientError> {
        self.post(
            &format!("/api/battles/{}/reaction", segment(battle_id)),
            &CastReaction { kind },
        )
        .await
    }

    async fn add_comment(&self, comment: &CreateComment) -> Result<Comment, ClientError> {
        self.post("/api/comments", comment).await
    }

    async fn update_comment_status(
        &self,
        id: &str,
        status: CommentStatus,
    ) -> Result<Comment, ClientError> {
        self.put(
            &format!("/api/comments/{}/status", segment(id)),
            &UpdateCommentStatus { status },
        )
        .await
    }

    async fn create_topic(&self, name: &str) -> Result<Topic, ClientError> {
        self.post(
            "/api/topics",
            &CreateTopic {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn update_topic(&self, id: &str, update: &TopicUpdate) -> Result<Topic, ClientError> {
        self.put(&format!("/api/topics/{}", segment(id)), update).await
    }

    async fn add_admin(&self, admin: &AddAdmin) -> Result<User, ClientError> {
        self.post("/api/users", admin).await
    }

    async fn remove_admin(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/users/{}", segment(id))).await
    }

    async fn update_system_config(
        &self,
        config: &SystemConfig,
    ) -> Result<SystemConfig, ClientError> {
        self.put("/api/system/config", config).await
    }

    async fn generate(&self, topic: &str) -> Result<GenerateResponse, ClientError> {
        self.post(
            "/api/generate",
            &GenerateRequest {
                topic: topic.to_string(),
            },
        )
        .await
    }
}
