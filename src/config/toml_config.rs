use crate::core::link_enricher::LinkSettings;
use crate::utils::error::{NotifierError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub links: LinksConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub subscribers: SubscribersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_wiki_base_url")]
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_search_url_prefix")]
    pub search_url_prefix: String,
    #[serde(default = "default_storefront_scheme")]
    pub storefront_scheme: String,
    #[serde(default = "default_storefront_domain")]
    pub storefront_domain: String,
    #[serde(default = "default_signup_path")]
    pub signup_path: String,
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_api_base")]
    pub api_base: String,
    pub api_key: String,
    pub from: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Receives reports about failed dispatch runs.
    pub admin: String,
    /// Public site linked from every email.
    pub site_url: String,
    #[serde(default = "default_rate_limit_path")]
    pub rate_limit_path: String,
    #[serde(default = "default_send_path")]
    pub send_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribersConfig {
    #[serde(default = "default_subscribers_path")]
    pub path: String,
}

fn default_wiki_base_url() -> String {
    "https://en.wikipedia.org/wiki".to_string()
}

fn default_search_url_prefix() -> String {
    LinkSettings::default().search_url_prefix
}

fn default_storefront_scheme() -> String {
    LinkSettings::default().storefront_scheme
}

fn default_storefront_domain() -> String {
    LinkSettings::default().storefront_domain
}

fn default_signup_path() -> String {
    LinkSettings::default().signup_path
}

fn default_probe_timeout_seconds() -> u64 {
    10
}

fn default_email_api_base() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_from_name() -> String {
    "Heavy Metal Releases".to_string()
}

fn default_rate_limit_path() -> String {
    "/v3/templates".to_string()
}

fn default_send_path() -> String {
    "/v3/mail/send".to_string()
}

fn default_subscribers_path() -> String {
    "subscribers.json".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_wiki_base_url(),
            timeout_seconds: None,
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            search_url_prefix: default_search_url_prefix(),
            storefront_scheme: default_storefront_scheme(),
            storefront_domain: default_storefront_domain(),
            signup_path: default_signup_path(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
        }
    }
}

impl Default for SubscribersConfig {
    fn default() -> Self {
        Self {
            path: default_subscribers_path(),
        }
    }
}

impl LinksConfig {
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            search_url_prefix: self.search_url_prefix.clone(),
            storefront_scheme: self.storefront_scheme.clone(),
            storefront_domain: self.storefront_domain.clone(),
            signup_path: self.signup_path.clone(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl NotifierConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(NotifierError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| NotifierError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| NotifierError::ConfigError {
            message: format!("env pattern failed to compile: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }

        validation::validate_url("links.search_url_prefix", &self.links.search_url_prefix)?;
        validation::validate_non_empty_string(
            "links.storefront_domain",
            &self.links.storefront_domain,
        )?;
        validation::validate_range(
            "links.probe_timeout_seconds",
            self.links.probe_timeout_seconds,
            1,
            120,
        )?;

        validation::validate_url("email.api_base", &self.email.api_base)?;
        validation::validate_non_empty_string("email.api_key", &self.email.api_key)?;
        if self.email.api_key.starts_with("${") {
            return Err(NotifierError::MissingConfigError {
                field: "email.api_key".to_string(),
            });
        }
        validation::validate_email("email.from", &self.email.from)?;
        validation::validate_email("email.admin", &self.email.admin)?;
        validation::validate_url("email.site_url", &self.email.site_url)?;

        validation::validate_path("subscribers.path", &self.subscribers.path)?;

        Ok(())
    }
}

impl Validate for NotifierConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
