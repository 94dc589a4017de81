//! Login-link delivery through the configured mail provider.

use antisoup_shared::{EmailProvider, LoginLinkResponse};
use serde_json::json;
use tracing::{info, warn};

use crate::config::{EmailJsCredentials, MailSettings, MailgunCredentials};

const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";
const SUBJECT: &str = "Your Antisoup login link";

pub(crate) fn failure(message: impl Into<String>) -> LoginLinkResponse {
    LoginLinkResponse {
        success: false,
        message: message.into(),
        demo_link: None,
    }
}

fn sent(email: &str) -> LoginLinkResponse {
    LoginLinkResponse {
        success: true,
        message: format!("Login link sent to {email}"),
        demo_link: None,
    }
}

/// Never errors: delivery problems come back as `success: false`.
pub async fn send_login_link(
    http: &reqwest::Client,
    settings: &MailSettings,
    provider: EmailProvider,
    email: &str,
    link: &str,
) -> LoginLinkResponse {
    match provider {
        EmailProvider::None => LoginLinkResponse {
            success: true,
            message: "No mail provider configured; use the link directly".into(),
            demo_link: Some(link.to_string()),
        },
        EmailProvider::Emailjs => match &settings.emailjs {
            Some(creds) => via_emailjs(http, creds, email, link).await,
            None => failure(
                "EmailJS is not configured (EMAILJS_SERVICE_ID, EMAILJS_TEMPLATE_ID, EMAILJS_PUBLIC_KEY)",
            ),
        },
        EmailProvider::Mailgun => match &settings.mailgun {
            Some(creds) => via_mailgun(http, creds, email, link).await,
            None => failure("Mailgun is not configured (MAILGUN_API_KEY, MAILGUN_DOMAIN)"),
        },
    }
}

async fn via_emailjs(
    http: &reqwest::Client,
    creds: &EmailJsCredentials,
    email: &str,
    link: &str,
) -> LoginLinkResponse {
    let body = json!({
        "service_id": creds.service_id,
        "template_id": creds.template_id,
        "user_id": creds.public_key,
        "template_params": {
            "to_email": email,
            "link": link,
        },
    });

    match http.post(EMAILJS_ENDPOINT).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {
            info!("login link sent through EmailJS");
            sent(email)
        }
        Ok(resp) => {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, %detail, "EmailJS rejected the message");
            failure(format!("EmailJS error ({status}): {detail}"))
        }
        Err(e) => {
            warn!("EmailJS request failed: {e}");
            failure(format!("could not reach EmailJS: {e}"))
        }
    }
}

async fn via_mailgun(
    http: &reqwest::Client,
    creds: &MailgunCredentials,
    email: &str,
    link: &str,
) -> LoginLinkResponse {
    let url = format!("https://api.mailgun.net/v3/{}/messages", creds.domain);
    let from = format!("Antisoup <noreply@{}>", creds.domain);
    let text = format!("Click to sign in (valid for 10 minutes): {link}");
    let form = [
        ("from", from.as_str()),
        ("to", email),
        ("subject", SUBJECT),
        ("text", text.as_str()),
    ];

    let result = http
        .post(&url)
        .basic_auth("api", Some(&creds.api_key))
        .form(&form)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            info!("login link sent through Mailgun");
            sent(email)
        }
        Ok(resp) => {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, %detail, "Mailgun rejected the message");
            failure(format!("Mailgun error ({status}): {detail}"))
        }
        Err(e) => {
            warn!("Mailgun request failed: {e}");
            failure(format!("could not reach Mailgun: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_provider_returns_demo_link() {
        let http = reqwest::Client::new();
        let resp = send_login_link(
            &http,
            &MailSettings::default(),
            EmailProvider::None,
            "a@b.co",
            "http://localhost:5173?token=t",
        )
        .await;
        assert!(resp.success);
        assert_eq!(resp.demo_link.as_deref(), Some("http://localhost:5173?token=t"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let http = reqwest::Client::new();
        let resp = send_login_link(
            &http,
            &MailSettings::default(),
            EmailProvider::Mailgun,
            "a@b.co",
            "link",
        )
        .await;
        assert!(!resp.success);
        assert!(resp.message.contains("MAILGUN_API_KEY"));
        assert!(resp.demo_link.is_none());
    }
}
