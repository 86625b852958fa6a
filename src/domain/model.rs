use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day of month, 1 to 31.
pub type Day = u8;

/// Releases of one month keyed by day. Iteration is in day order.
pub type MonthReleases = BTreeMap<Day, Vec<Release>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    SearchEngine,
    Storefront,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub platform: Platform,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub artist: String,
    pub album: String,
    /// Computed on lookup, never persisted.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Release {
    pub fn new(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
}

/// Remaining provider calls before the window resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub remaining: usize,
    pub reset_at_unix_seconds: i64,
}
