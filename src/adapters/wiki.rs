use crate::config::toml_config::SourceConfig;
use crate::domain::ports::PageSource;
use crate::utils::error::Result;
use reqwest::Client;

const USER_AGENT: &str = concat!("metal-notifier/", env!("CARGO_PKG_VERSION"));

/// Fetches `<base_url>/<year>_in_heavy_metal_music`.
#[derive(Debug, Clone)]
pub struct WikiClient {
    client: Client,
    base_url: String,
}

impl WikiClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn page_url(&self, year: i32) -> String {
        format!("{}/{}_in_heavy_metal_music", self.base_url, year)
    }
}

impl PageSource for WikiClient {
    async fn fetch_year_page(&self, year: i32) -> Result<String> {
        let url = self.page_url(year);
        tracing::debug!("Fetching release page: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        tracing::debug!("Release page response status: {}", response.status());

        Ok(response.text().await?)
    }
}
