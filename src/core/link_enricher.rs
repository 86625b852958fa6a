use crate::domain::model::{Link, Platform};
use crate::domain::ports::StorefrontProbe;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Prefix the percent-encoded query is appended to.
    pub search_url_prefix: String,
    pub storefront_scheme: String,
    pub storefront_domain: String,
    pub signup_path: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            search_url_prefix: "https://www.youtube.com/results?search_query=".to_string(),
            storefront_scheme: "https".to_string(),
            storefront_domain: "bandcamp.com".to_string(),
            signup_path: "/signup".to_string(),
        }
    }
}

/// Builds the external links of a release.
pub struct LinkEnricher<P: StorefrontProbe> {
    probe: P,
    settings: LinkSettings,
}

impl<P: StorefrontProbe> LinkEnricher<P> {
    pub fn new(probe: P, settings: LinkSettings) -> Self {
        Self { probe, settings }
    }

    /// Search link first, then the storefront link when the artist has a page.
    pub async fn links(&self, artist: &str, album: &str) -> Vec<Link> {
        let mut links = vec![self.search_link(artist, album)];
        if let Some(storefront) = self.storefront_link(artist).await {
            links.push(storefront);
        }
        links
    }

    pub fn search_link(&self, artist: &str, album: &str) -> Link {
        let query = format!("{} {} full album", artist, album);
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();

        Link {
            platform: Platform::SearchEngine,
            url: format!("{}{}", self.settings.search_url_prefix, encoded),
        }
    }

    async fn storefront_link(&self, artist: &str) -> Option<Link> {
        let subdomain = storefront_subdomain(artist);
        if subdomain.is_empty() {
            return None;
        }

        let host = format!("{}.{}", subdomain, self.settings.storefront_domain);
        let url = format!("{}://{}", self.settings.storefront_scheme, host);

        let resolved = match self.probe.resolve(&url).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!("Storefront probe for {} failed: {}", url, e);
                return None;
            }
        };

        // A signup page on the artist's own host means the page does not exist.
        // Landing on signup anywhere else still counts as found.
        let not_found =
            resolved.path() == self.settings.signup_path && resolved.host_str() == Some(host.as_str());
        if not_found {
            tracing::debug!("No storefront page for {}", artist);
            return None;
        }

        Some(Link {
            platform: Platform::Storefront,
            url,
        })
    }
}

/// Lowercased artist name without spaces.
pub fn storefront_subdomain(artist: &str) -> String {
    artist.to_lowercase().replace(' ', "")
}
