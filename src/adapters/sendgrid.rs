use crate::config::toml_config::EmailConfig;
use crate::domain::model::{Platform, RateBudget, Release};
use crate::domain::ports::Mailer;
use crate::utils::error::{NotifierError, Result};
use maud::{html, Markup};
use reqwest::{Client, Response};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
const RESET_HEADER: &str = "X-RateLimit-Reset";

const RELEASES_SUBJECT: &str = "Latest Heavy Metal Releases";
const ADMIN_SUBJECT: &str = "Heavy Metal Notifier Error";

/// Plain text and HTML versions of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailBody {
    pub text: String,
    pub html: String,
}

struct Inner {
    client: Client,
    config: EmailConfig,
}

/// Mailer backed by the SendGrid v3 HTTP API.
///
/// Clones share the same in-flight send tracker.
#[derive(Clone)]
pub struct SendGridMailer {
    inner: Arc<Inner>,
    in_flight: TaskTracker,
}

impl SendGridMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: Client::new(),
                config,
            }),
            in_flight: TaskTracker::new(),
        }
    }

    /// Waits for every email handed out so far. Later sends are still accepted.
    pub async fn flush(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    fn spawn_send(&self, to: String, subject: &'static str, body: EmailBody) {
        let inner = Arc::clone(&self.inner);
        self.in_flight.spawn(async move {
            if let Err(e) = inner.post_mail(&to, subject, body).await {
                tracing::error!("error sending '{}' email to {}: {}", subject, to, e);
            }
        });
    }
}

impl Inner {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_mail(&self, to: &str, subject: &str, body: EmailBody) -> Result<()> {
        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.config.from, "name": self.config.from_name },
            "subject": subject,
            "content": [
                { "type": "text/plain", "value": body.text },
                { "type": "text/html", "value": body.html },
            ],
        });

        self.client
            .post(self.endpoint(&self.config.send_path))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("Sent '{}' email to {}", subject, to);
        Ok(())
    }
}

impl Mailer for SendGridMailer {
    async fn rate_limits(&self) -> Result<RateBudget> {
        let response = self
            .inner
            .client
            .get(self.inner.endpoint(&self.inner.config.rate_limit_path))
            .bearer_auth(&self.inner.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifierError::RateLimitError {
                message: format!("provider answered {}", response.status()),
            });
        }

        Ok(RateBudget {
            remaining: header_number(&response, REMAINING_HEADER)?,
            reset_at_unix_seconds: header_number(&response, RESET_HEADER)?,
        })
    }

    fn send(&self, to: &str, releases: &[Release]) {
        let body = render_releases(to, releases, &self.inner.config.site_url);
        self.spawn_send(to.to_string(), RELEASES_SUBJECT, body);
    }

    fn notify_admin(&self, message: &str) {
        let body = EmailBody {
            text: message.to_string(),
            html: admin_markup(message).into_string(),
        };
        self.spawn_send(self.inner.config.admin.clone(), ADMIN_SUBJECT, body);
    }
}

fn header_number<T: std::str::FromStr>(response: &Response, name: &str) -> Result<T> {
    let value = response
        .headers()
        .get(name)
        .ok_or_else(|| NotifierError::RateLimitError {
            message: format!("cannot find the {} header", name),
        })?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| NotifierError::RateLimitError {
            message: format!("{} header is not a number: {:?}", name, value),
        })
}

/// Email listing the day's releases, addressed by the local part of `to`.
pub fn render_releases(to: &str, releases: &[Release], site_url: &str) -> EmailBody {
    let name = to.split('@').next().unwrap_or(to);

    let mut text = format!("Hi {},\n\nHere are today's heavy metal releases:\n\n", name);
    for release in releases {
        text.push_str(&format!("- {} - {}\n", release.artist, release.album));
        for link in &release.links {
            text.push_str(&format!("    {}: {}\n", platform_label(link.platform), link.url));
        }
    }
    text.push_str(&format!("\n{}\n", site_url));

    EmailBody {
        text,
        html: releases_markup(name, releases, site_url).into_string(),
    }
}

fn releases_markup(name: &str, releases: &[Release], site_url: &str) -> Markup {
    html!(
        p { "Hi " (name) "," }
        p { "Here are today's heavy metal releases:" }
        ul {
            @for release in releases {
                li {
                    strong { (release.artist) }
                    " - " (release.album)
                    @for link in &release.links {
                        " "
                        a href=(link.url) { (platform_label(link.platform)) }
                    }
                }
            }
        }
        p { a href=(site_url) { (site_url) } }
    )
}

fn admin_markup(message: &str) -> Markup {
    html!(p { (message) })
}

fn platform_label(platform: Platform) -> &'static str {
    match platform {
        Platform::SearchEngine => "YouTube",
        Platform::Storefront => "Bandcamp",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Link;
    use httpmock::prelude::*;

    fn config(api_base: String) -> EmailConfig {
        EmailConfig {
            api_base,
            api_key: "SG.test".to_string(),
            from: "noreply@metal.example.com".to_string(),
            from_name: "Heavy Metal Releases".to_string(),
            admin: "admin@metal.example.com".to_string(),
            site_url: "https://metal.example.com".to_string(),
            rate_limit_path: "/v3/templates".to_string(),
            send_path: "/v3/mail/send".to_string(),
        }
    }

    #[tokio::test]
    async fn test_rate_limits_reads_headers() {
        let server = MockServer::start();
        let limits = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/templates")
                .header("Authorization", "Bearer SG.test");
            then.status(200)
                .header("X-RateLimit-Remaining", "42")
                .header("X-RateLimit-Reset", "1700000060")
                .body("{}");
        });

        let budget = SendGridMailer::new(config(server.base_url()))
            .rate_limits()
            .await
            .unwrap();

        limits.assert();
        assert_eq!(
            budget,
            RateBudget {
                remaining: 42,
                reset_at_unix_seconds: 1_700_000_060
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limits_missing_header_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/templates");
            then.status(200).header("X-RateLimit-Remaining", "42");
        });

        let err = SendGridMailer::new(config(server.base_url()))
            .rate_limits()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("X-RateLimit-Reset"));
    }

    #[tokio::test]
    async fn test_rate_limits_error_status_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v3/templates");
            then.status(401);
        });

        let result = SendGridMailer::new(config(server.base_url()))
            .rate_limits()
            .await;

        assert!(matches!(result, Err(NotifierError::RateLimitError { .. })));
    }

    #[tokio::test]
    async fn test_post_mail_sends_json_payload() {
        let server = MockServer::start();
        let send = server.mock(|when, then| {
            when.method(POST)
                .path("/v3/mail/send")
                .header("Authorization", "Bearer SG.test")
                .body_contains("\"email\":\"fan@example.com\"")
                .body_contains("Latest Heavy Metal Releases");
            then.status(202);
        });

        let mailer = SendGridMailer::new(config(server.base_url()));
        let body = render_releases("fan@example.com", &[Release::new("Korn", "Requiem")], "https://metal.example.com");
        mailer
            .inner
            .post_mail("fan@example.com", RELEASES_SUBJECT, body)
            .await
            .unwrap();

        send.assert();
    }

    #[test]
    fn test_render_releases_lists_links() {
        let mut release = Release::new("Guns N' Roses", "Hard Skool (EP)");
        release.links = vec![
            Link {
                platform: Platform::SearchEngine,
                url: "https://www.youtube.com/results?search_query=x".to_string(),
            },
            Link {
                platform: Platform::Storefront,
                url: "https://gunsn'roses.bandcamp.com".to_string(),
            },
        ];

        let body = render_releases("axl@example.com", &[release], "https://metal.example.com");

        assert!(body.text.starts_with("Hi axl,"));
        assert!(body.text.contains("- Guns N' Roses - Hard Skool (EP)"));
        assert!(body.text.contains("YouTube: https://www.youtube.com/results?search_query=x"));
        assert!(body.html.contains("<strong>Guns N' Roses</strong>"));
        assert!(body.html.find("YouTube").unwrap() < body.html.find("Bandcamp").unwrap());
    }

    #[test]
    fn test_render_releases_escapes_markup() {
        let release = Release::new("Zeal & Ardor", "<Live> in \"London\"");

        let body = render_releases("fan@example.com", &[release], "https://metal.example.com");

        assert!(body.html.contains("<strong>Zeal &amp; Ardor</strong>"));
        assert!(body.html.contains("&lt;Live&gt; in &quot;London&quot;"));
        assert!(!body.html.contains("<Live>"));
        assert!(body.text.contains("- Zeal & Ardor - <Live> in \"London\""));
    }

    #[test]
    fn test_admin_markup_is_escaped() {
        let markup = admin_markup("dispatch: error <500>").into_string();

        assert_eq!(markup, "<p>dispatch: error &lt;500&gt;</p>");
    }
}
