use crate::domain::model::{RateBudget, Release, Subscriber};
use crate::utils::error::Result;
use chrono::NaiveDate;
use url::Url;

/// Fetches the raw HTML of the release page for a year.
pub trait PageSource: Send + Sync {
    fn fetch_year_page(&self, year: i32)
        -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait SubscriberSource: Send + Sync {
    fn users(&self) -> impl std::future::Future<Output = Result<Vec<Subscriber>>> + Send;
}

/// Outbound email provider.
///
/// `send` and `notify_admin` return immediately; delivery failures are logged by
/// the implementation and never reach the caller.
pub trait Mailer: Send + Sync {
    fn rate_limits(&self) -> impl std::future::Future<Output = Result<RateBudget>> + Send;
    fn send(&self, to: &str, releases: &[Release]);
    fn notify_admin(&self, message: &str);
}

/// Issues a GET that follows redirects and reports where it landed.
pub trait StorefrontProbe: Send + Sync {
    fn resolve(&self, url: &str) -> impl std::future::Future<Output = Result<Url>> + Send;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now_unix(&self) -> i64;
}
