use crate::domain::ports::StorefrontProbe;
use crate::utils::error::Result;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Unauthenticated GET with reqwest's default redirect policy.
#[derive(Debug, Clone)]
pub struct HttpStorefrontProbe {
    client: Client,
}

impl HttpStorefrontProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

impl StorefrontProbe for HttpStorefrontProbe {
    async fn resolve(&self, url: &str) -> Result<Url> {
        let response = self.client.get(url).send().await?;
        tracing::trace!("Probe {} landed on {} ({})", url, response.url(), response.status());
        Ok(response.url().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_resolve_follows_redirect_to_signup() {
        let server = MockServer::start();
        let root = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(302).header("Location", "/signup");
        });
        let signup = server.mock(|when, then| {
            when.method(GET).path("/signup");
            then.status(200).body("sign up");
        });

        let probe = HttpStorefrontProbe::new(Duration::from_secs(5)).unwrap();
        let resolved = probe.resolve(&server.url("/")).await.unwrap();

        root.assert();
        signup.assert();
        assert_eq!(resolved.path(), "/signup");
        assert_eq!(resolved.host_str(), Some(server.host().as_str()));
    }

    #[tokio::test]
    async fn test_resolve_without_redirect() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("artist page");
        });

        let probe = HttpStorefrontProbe::new(Duration::from_secs(5)).unwrap();
        let resolved = probe.resolve(&server.url("/")).await.unwrap();

        assert_eq!(resolved.path(), "/");
    }

    #[tokio::test]
    async fn test_resolve_unreachable_host_is_error() {
        let probe = HttpStorefrontProbe::new(Duration::from_secs(2)).unwrap();

        assert!(probe.resolve("http://127.0.0.1:9/").await.is_err());
    }
}
