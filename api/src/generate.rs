use antisoup_shared::{quota, validation, GenerateRequest, GenerateResponse, GeneratedContent};
use async_trait::async_trait;
use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{auth, config::GeminiSettings, db, error::AppError, AppState};

/// Produces a soup/anti pair for a topic.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> anyhow::Result<GeneratedContent>;
}

pub async fn generate_or_fallback(generator: &dyn ContentGenerator, topic: &str) -> GeneratedContent {
    match generator.generate(topic).await {
        Ok(content) => content,
        Err(e) => {
            warn!("generation failed, serving fallback: {e:#}");
            GeneratedContent::fallback()
        }
    }
}

// ── Gemini ──

pub struct GeminiGenerator {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiGenerator {
    pub fn new(http: reqwest::Client, settings: GeminiSettings) -> Self {
        Self { http, settings }
    }

    fn prompt(topic: &str) -> String {
        format!(
            "Topic: \"{topic}\". Write one short, earnest, motivational line (\"chicken soup\") \
             about this topic, and one witty, cynical rebuttal (\"anti-soup\") that deflates it. \
             Both in Simplified Chinese, each under 60 characters."
        )
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(&self, topic: &str) -> anyhow::Result<GeneratedContent> {
        let Some(api_key) = &self.settings.api_key else {
            info!("GEMINI_API_KEY not set, using canned content");
            return Ok(GeneratedContent::fallback());
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.settings.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(topic) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "soup": { "type": "STRING", "description": "The motivational line" },
                        "anti": { "type": "STRING", "description": "The cynical rebuttal" }
                    },
                    "required": ["soup", "anti"]
                }
            }
        });

        let resp: GeminiResponse = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| anyhow::anyhow!("model returned no text"))?;

        let content: GeneratedContent = serde_json::from_str(&text)?;
        if content.soup.trim().is_empty() || content.anti.trim().is_empty() {
            anyhow::bail!("model returned an empty side");
        }
        Ok(content)
    }
}

// ── Handler ──

/// POST /api/generate — quota is checked here and consumed on publish
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let user = auth::current_user(&state, &headers).await?;

    let (known, config) = db::blocking(&state.db, |conn| {
        Ok((db::list_topics(conn)?, db::load_config(conn)?))
    })
    .await?;

    let topic = validation::submission_topic(&known, &payload.topic)?;
    let today = Utc::now().date_naive();
    let left = quota::ensure_available(&user, config.daily_generation_limit, today)?;

    info!(user = %user.id, %topic, "generating battle content");
    let content = generate_or_fallback(state.generator.as_ref(), &topic).await;

    Ok(Json(GenerateResponse {
        content,
        remaining: left.as_option(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl ContentGenerator for Broken {
        async fn generate(&self, _topic: &str) -> anyhow::Result<GeneratedContent> {
            anyhow::bail!("offline")
        }
    }

    #[tokio::test]
    async fn failures_fall_back_to_canned_pair() {
        let content = generate_or_fallback(&Broken, "工作").await;
        assert_eq!(content, GeneratedContent::fallback());
    }

    #[tokio::test]
    async fn missing_key_serves_canned_pair_without_network() {
        let generator = GeminiGenerator::new(
            reqwest::Client::new(),
            GeminiSettings {
                api_key: None,
                model: "gemini-2.5-flash".into(),
            },
        );
        assert_eq!(generator.generate("工作").await.unwrap(), GeneratedContent::fallback());
    }
}
