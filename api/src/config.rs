use std::env;

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub cors_origin: String,
    /// Front-end address that login links point at.
    pub public_url: String,
    pub jwt_secret: String,
    pub super_admin_email: String,
    pub gemini: GeminiSettings,
    pub mail: MailSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    pub emailjs: Option<EmailJsCredentials>,
    pub mailgun: Option<MailgunCredentials>,
}

#[derive(Debug, Clone)]
pub struct EmailJsCredentials {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub struct MailgunCredentials {
    pub api_key: String,
    pub domain: String,
}

impl Default for Config {
    fn default() -> Self {
        let cors_origin = "http://localhost:5173".to_string();
        Self {
            database_url: "antisoup.db".into(),
            bind_addr: "0.0.0.0:8080".into(),
            public_url: cors_origin.clone(),
            cors_origin,
            jwt_secret: DEV_JWT_SECRET.into(),
            super_admin_email: "admin@antisoup.com".into(),
            gemini: GeminiSettings {
                api_key: None,
                model: "gemini-2.5-flash".into(),
            },
            mail: MailSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cors_origin = var_or("CORS_ORIGIN", &defaults.cors_origin);
        let public_url = var_or("PUBLIC_URL", &cors_origin);

        let jwt_secret = var_or("JWT_SECRET", DEV_JWT_SECRET);
        if jwt_secret == DEV_JWT_SECRET {
            warn!("JWT_SECRET is the development default; sessions are forgeable");
        }

        Self {
            database_url: var_or("DATABASE_URL", &defaults.database_url),
            bind_addr: var_or("BIND_ADDR", &defaults.bind_addr),
            cors_origin,
            public_url,
            jwt_secret,
            super_admin_email: var_or("SUPER_ADMIN_EMAIL", &defaults.super_admin_email),
            gemini: GeminiSettings {
                api_key: optional("GEMINI_API_KEY"),
                model: var_or("GEMINI_MODEL", &defaults.gemini.model),
            },
            mail: MailSettings {
                emailjs: match (
                    optional("EMAILJS_SERVICE_ID"),
                    optional("EMAILJS_TEMPLATE_ID"),
                    optional("EMAILJS_PUBLIC_KEY"),
                ) {
                    (Some(service_id), Some(template_id), Some(public_key)) => {
                        Some(EmailJsCredentials {
                            service_id,
                            template_id,
                            public_key,
                        })
                    }
                    _ => None,
                },
                mailgun: match (optional("MAILGUN_API_KEY"), optional("MAILGUN_DOMAIN")) {
                    (Some(api_key), Some(domain)) => Some(MailgunCredentials { api_key, domain }),
                    _ => None,
                },
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
