use crate::domain::model::Subscriber;
use crate::domain::ports::SubscriberSource;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Reads subscribers from a JSON array such as `[{"email": "fan@example.com"}]`.
#[derive(Debug, Clone)]
pub struct JsonFileSubscribers {
    path: PathBuf,
}

impl JsonFileSubscribers {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SubscriberSource for JsonFileSubscribers {
    async fn users(&self) -> Result<Vec<Subscriber>> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        let users: Vec<Subscriber> = serde_json::from_str(&data)?;
        tracing::debug!("Loaded {} subscribers from {}", users.len(), self.path.display());
        Ok(users)
    }
}
