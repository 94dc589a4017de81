use std::sync::Arc;

use antisoup_api::{
    auth, config::Config, db, generate::ContentGenerator, router, AppState, DbPool,
};
use antisoup_shared::{seed, AuthProvider, GeneratedContent, Role, User};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{json, Value};
use tower::ServiceExt;

const ROOT_EMAIL: &str = "root@antisoup.test";

struct Canned;

#[async_trait]
impl ContentGenerator for Canned {
    async fn generate(&self, topic: &str) -> anyhow::Result<GeneratedContent> {
        Ok(GeneratedContent {
            soup: format!("{topic}使人进步"),
            anti: format!("{topic}使人秃头"),
        })
    }
}

struct Harness {
    app: Router,
    pool: DbPool,
    secret: String,
}

impl Harness {
    /// Migrated database plus the demo moderator `u_admin1`.
    fn new() -> Self {
        let h = Self::bare();
        let conn = h.pool.get().unwrap();
        for admin in seed::admins(Utc::now()) {
            db::insert_user(&conn, &admin).unwrap();
        }
        drop(conn);
        h
    }

    /// Only what migrations create.
    fn bare() -> Self {
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .unwrap();
        db::run_migrations(&pool, ROOT_EMAIL).unwrap();
        let config = Config::default();
        let secret = config.jwt_secret.clone();
        let state = AppState::new(pool.clone(), config, reqwest::Client::new(), Arc::new(Canned));
        Self {
            app: router(state),
            pool,
            secret,
        }
    }

    fn token_for(&self, user_id: &str) -> String {
        auth::issue_session(user_id, &self.secret).unwrap()
    }

    fn root(&self) -> String {
        self.token_for(seed::ROOT_ID)
    }

    fn moderator(&self) -> String {
        self.token_for("u_admin1")
    }

    fn add_user(&self, id: &str, role: Role) -> String {
        let user = User {
            id: id.into(),
            name: id.into(),
            avatar: String::new(),
            email: format!("{id}@antisoup.test"),
            provider: AuthProvider::Email,
            role,
            created_at: Utc::now(),
            daily_generations: 0,
            last_generation_date: None,
        };
        let conn = self.pool.get().unwrap();
        db::insert_user(&conn, &user).unwrap();
        self.token_for(id)
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn publish(&self, token: &str, topic: &str) -> Value {
        let (status, battle) = self
            .send(
                "POST",
                "/api/battles",
                Some(token),
                Some(json!({
                    "topic": topic,
                    "soupContent": "今天也要元气满满",
                    "antiContent": "元气是留给有钱人的",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{battle}");
        battle
    }
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_check() {
    let h = Harness::new();
    let (status, _) = h.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn public_feed_is_ranked_and_approved_only() {
    let h = Harness::new();
    let user = h.add_user("u_writer", Role::User);
    let pending = h.publish(&user, "工作").await;

    let (status, feed) = h.send("GET", "/api/battles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let feed_ids = ids(&feed);
    assert_eq!(feed_ids[0], "b_1", "pinned battle leads");
    assert!(!feed_ids.contains(&pending["id"].as_str().unwrap().to_string()));

    let first_expired = feed
        .as_array()
        .unwrap()
        .iter()
        .position(|b| b["id"] == "b_3")
        .unwrap();
    assert!(first_expired > feed_ids.iter().position(|id| id == "b_4").unwrap());

    let (_, admin_view) = h.send("GET", "/api/battles", Some(&h.moderator()), None).await;
    assert!(ids(&admin_view).contains(&pending["id"].as_str().unwrap().to_string()));
}

#[tokio::test]
async fn publish_starts_pending_with_one_vote_each() {
    let h = Harness::new();
    let user = h.add_user("u_writer", Role::User);
    let battle = h.publish(&user, " 旅行 ").await;

    assert_eq!(battle["status"], "pending");
    assert_eq!(battle["soupVotes"], 1);
    assert_eq!(battle["antiVotes"], 1);
    assert_eq!(battle["topic"], "旅行");
    assert_eq!(battle["topicId"], "t_4");

    let uri = format!("/api/battles/{}", battle["id"].as_str().unwrap());
    let (status, _) = h.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, me) = h.send("GET", "/api/auth/me", Some(&user), None).await;
    assert_eq!(me["dailyGenerations"], 1);
}

#[tokio::test]
async fn publishing_requires_a_session() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            "POST",
            "/api/battles",
            None,
            Some(json!({ "topic": "工作", "soupContent": "a", "antiContent": "b" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generation_respects_quota_and_disabled_topics() {
    let h = Harness::new();
    let user = h.add_user("u_writer", Role::User);

    let (status, generated) = h
        .send("POST", "/api/generate", Some(&user), Some(json!({ "topic": "工作" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generated["soup"], "工作使人进步");
    assert_eq!(generated["remaining"], 2);

    h.publish(&user, "工作").await;
    h.publish(&user, "工作").await;
    let (status, body) = h
        .send("POST", "/api/generate", Some(&user), Some(json!({ "topic": "工作" })))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "{body}");

    let (status, generated) = h
        .send("POST", "/api/generate", Some(&h.moderator()), Some(json!({ "topic": "工作" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(generated["remaining"].is_null());

    let (status, _) = h
        .send(
            "PUT",
            "/api/topics/t_6",
            Some(&h.moderator()),
            Some(json!({ "status": "disabled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h
        .send("POST", "/api/generate", Some(&h.moderator()), Some(json!({ "topic": "金钱" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_votes_are_never_lost() {
    let h = Harness::new();
    let (_, before) = h.send("GET", "/api/battles/b_2", None, None).await;
    let soup_before = before["soupVotes"].as_u64().unwrap();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let app = h.app.clone();
        tasks.push(tokio::spawn(async move {
            let req = Request::builder()
                .method("POST")
                .uri("/api/battles/b_2/vote")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"side":"soup"}"#))
                .unwrap();
            app.oneshot(req).await.unwrap().status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, after) = h.send("GET", "/api/battles/b_2", None, None).await;
    assert_eq!(after["soupVotes"].as_u64().unwrap(), soup_before + 20);
    assert_eq!(after["antiVotes"], before["antiVotes"]);
}

#[tokio::test]
async fn vote_reports_rounded_split() {
    let h = Harness::new();
    let (status, tally) = h
        .send("POST", "/api/battles/b_1/vote", None, Some(json!({ "side": "anti" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["antiVotes"], 893);
    let soup = tally["soupPercent"].as_u64().unwrap();
    let anti = tally["antiPercent"].as_u64().unwrap();
    assert_eq!(soup + anti, 100);

    let (status, _) = h
        .send("POST", "/api/battles/nope/vote", None, Some(json!({ "side": "anti" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn latest_reaction_is_current_and_all_are_counted() {
    let h = Harness::new();
    let user = h.add_user("u_fan", Role::User);

    for kind in ["like", "shock"] {
        let (status, _) = h
            .send(
                "POST",
                "/api/battles/b_2/reaction",
                Some(&user),
                Some(json!({ "type": kind })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, mine) = h.send("GET", "/api/battles/b_2/reaction", Some(&user), None).await;
    assert_eq!(mine["current"], "shock");
    assert_eq!(mine["reactionCounts"]["like"], 57);
    assert_eq!(mine["reactionCounts"]["shock"], 34);

    let (_, anonymous) = h.send("GET", "/api/battles/b_2/reaction", None, None).await;
    assert!(anonymous["current"].is_null());
}

#[tokio::test]
async fn moderation_follows_the_status_table() {
    let h = Harness::new();
    let admin = h.moderator();
    let user = h.add_user("u_writer", Role::User);
    let battle = h.publish(&user, "工作").await;
    let uri = format!("/api/battles/{}", battle["id"].as_str().unwrap());

    let (status, _) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "toggle_pin" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = h
        .send("PUT", &uri, Some(&user), Some(json!({ "action": "toggle_shelf" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, edited) = h
        .send(
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({
                "action": "edit_content",
                "topic": "职场",
                "soupContent": "新鸡汤",
                "antiContent": "新毒鸡汤",
            })),
        )
        .await;
    assert_eq!(edited["topic"], "职场");

    let (_, shelved) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "toggle_shelf" })))
        .await;
    assert_eq!(shelved["status"], "approved");

    let (_, ended) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "end_now" })))
        .await;
    let (status, _) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "end_now" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "ended battles cannot end again: {ended}");

    let (_, trashed) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "trash" })))
        .await;
    assert_eq!(trashed["status"], "rejected");
    let (_, restored) = h
        .send("PUT", &uri, Some(&admin), Some(json!({ "action": "restore" })))
        .await;
    assert_eq!(restored["status"], "pending");
}

#[tokio::test]
async fn comments_are_reviewed_once_before_showing() {
    let h = Harness::new();
    let user = h.add_user("u_critic", Role::User);

    let (status, comment) = h
        .send(
            "POST",
            "/api/comments",
            Some(&user),
            Some(json!({ "battleId": "b_2", "content": "说得好", "side": "anti" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["status"], "pending");

    let (_, public) = h.send("GET", "/api/comments?battleId=b_2", None, None).await;
    assert!(public.as_array().unwrap().is_empty());

    let review = format!("/api/comments/{}/status", comment["id"].as_str().unwrap());
    let (status, _) = h
        .send("PUT", &review, Some(&user), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h
        .send("PUT", &review, Some(&h.moderator()), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h
        .send("PUT", &review, Some(&h.moderator()), Some(json!({ "status": "rejected" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, public) = h.send("GET", "/api/comments?battleId=b_2", None, None).await;
    assert_eq!(public[0]["content"], "说得好");
}

#[tokio::test]
async fn seeded_comments_are_newest_first() {
    let h = Harness::new();
    let (_, comments) = h.send("GET", "/api/comments?battleId=b_1", None, None).await;
    assert_eq!(ids(&comments), ["c_3", "c_1", "c_2"]);
}

#[tokio::test]
async fn oversized_comment_is_rejected() {
    let h = Harness::new();
    let user = h.add_user("u_critic", Role::User);
    let (status, _) = h
        .send(
            "POST",
            "/api/comments",
            Some(&user),
            Some(json!({ "battleId": "b_2", "content": "长".repeat(201), "side": "soup" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comment_limit_counts_what_was_typed() {
    let h = Harness::new();
    let user = h.add_user("u_critic", Role::User);

    // 200 characters typed; escaping each `&` makes the stored text longer.
    let typed = "甲 & 乙 ".repeat(33) + "甲 ";
    assert_eq!(typed.chars().count(), 200);
    let (status, comment) = h
        .send(
            "POST",
            "/api/comments",
            Some(&user),
            Some(json!({ "battleId": "b_2", "content": typed, "side": "soup" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{comment}");
    assert!(comment["content"].as_str().unwrap().contains("&amp;"));

    let (status, _) = h
        .send(
            "POST",
            "/api/comments",
            Some(&user),
            Some(json!({ "battleId": "b_2", "content": "<script>x()</script>", "side": "soup" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn content_edit_cannot_assign_a_disabled_topic() {
    let h = Harness::new();
    let admin = h.moderator();
    let user = h.add_user("u_writer", Role::User);
    let battle = h.publish(&user, "工作").await;
    let uri = format!("/api/battles/{}", battle["id"].as_str().unwrap());

    let (_, topics) = h.send("GET", "/api/topics", None, None).await;
    let money = topics
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "金钱")
        .unwrap();
    let toggle = format!("/api/topics/{}", money["id"].as_str().unwrap());
    let (status, _) = h
        .send("PUT", &toggle, Some(&admin), Some(json!({ "status": "disabled" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .send(
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({
                "action": "edit_content",
                "topic": "金钱",
                "soupContent": "新鸡汤",
                "antiContent": "新毒鸡汤",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("金钱"));
}

#[tokio::test]
async fn topics_are_unique_and_counted() {
    let h = Harness::new();
    let admin = h.moderator();

    let (status, _) = h
        .send("POST", "/api/topics", Some(&admin), Some(json!({ "name": "工作" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, created) = h
        .send("POST", "/api/topics", Some(&admin), Some(json!({ "name": "早起" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "active");

    let (_, topics) = h.send("GET", "/api/topics", None, None).await;
    let work = topics
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "工作")
        .unwrap();
    assert_eq!(work["battleCount"], 1);

    let (_, suggestions) = h.send("GET", "/api/topics/suggestions", None, None).await;
    assert_eq!(suggestions.as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn only_super_admin_manages_admins_and_config() {
    let h = Harness::new();
    let root = h.root();

    let (status, _) = h
        .send("POST", "/api/users", Some(&h.moderator()), Some(json!({ "email": "x@y.io" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, added) = h
        .send(
            "POST",
            "/api/users",
            Some(&root),
            Some(json!({ "email": "new@antisoup.test", "name": "小编" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["role"], "admin");

    let (_, admins) = h.send("GET", "/api/users?role=admin", Some(&root), None).await;
    assert_eq!(admins.as_array().unwrap().len(), 3);

    let revoke = format!("/api/users/{}", added["id"].as_str().unwrap());
    let (status, _) = h.send("DELETE", &revoke, Some(&root), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h
        .send("DELETE", &format!("/api/users/{}", seed::ROOT_ID), Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let config = json!({ "dailyGenerationLimit": 5, "emailProvider": "mailgun", "defaultTheme": "dark" });
    let (status, _) = h
        .send("PUT", "/api/system/config", Some(&h.moderator()), Some(config.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h.send("PUT", "/api/system/config", Some(&root), Some(config.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (_, stored) = h.send("GET", "/api/system/config", None, None).await;
    assert_eq!(stored, config);

    let (_, sys) = h.send("GET", "/api/system/status", None, None).await;
    assert_eq!(sys["isDbConfigured"], true);
    assert_eq!(sys["hasRealAdmins"], true);
}

#[tokio::test]
async fn fresh_database_has_only_the_root_account() {
    let h = Harness::bare();
    let root = h.root();

    let (_, admins) = h.send("GET", "/api/users?role=admin", Some(&root), None).await;
    let admins = admins.as_array().unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0]["id"], seed::ROOT_ID);

    let (_, sys) = h.send("GET", "/api/system/status", None, None).await;
    assert_eq!(sys["hasRealAdmins"], false);

    // Seeded content still arrives with the empty database.
    let (_, feed) = h.send("GET", "/api/battles", None, None).await;
    assert!(!feed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn magic_link_signs_in_and_registers() {
    let h = Harness::new();

    let (status, sent) = h
        .send(
            "POST",
            "/api/auth/login-link",
            None,
            Some(json!({ "email": "Reader@Antisoup.test" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["success"], true);
    let link = sent["demoLink"].as_str().unwrap();
    assert!(link.starts_with("http://localhost:5173?token="));
    let token = link.split("token=").nth(1).unwrap();

    let (status, auth) = h
        .send("POST", "/api/auth/verify", None, Some(json!({ "token": token })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(auth["user"]["email"], "reader@antisoup.test");
    assert_eq!(auth["user"]["role"], "user");

    let session = auth["token"].as_str().unwrap();
    let (_, me) = h.send("GET", "/api/auth/me", Some(session), None).await;
    assert_eq!(me["id"], auth["user"]["id"]);

    // A session token is not a login link.
    let (status, _) = h
        .send("POST", "/api/auth/verify", None, Some(json!({ "token": session })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_get_no_in_response_link_without_mail() {
    let h = Harness::new();

    for email in [ROOT_EMAIL, "MOD@antisoup.com"] {
        let (status, sent) = h
            .send("POST", "/api/auth/login-link", None, Some(json!({ "email": email })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["success"], false, "{email}");
        assert!(sent["demoLink"].is_null(), "{email}");
    }

    // Regular members still get the link back.
    let (_, sent) = h
        .send(
            "POST",
            "/api/auth/login-link",
            None,
            Some(json!({ "email": "reader@antisoup.test" })),
        )
        .await;
    assert!(sent["demoLink"].is_string());
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let h = Harness::new();
    let (status, body) = h
        .send("POST", "/api/auth/login-link", None, Some(json!({ "email": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}
