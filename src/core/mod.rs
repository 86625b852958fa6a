pub mod calendar;
pub mod calendar_builder;
pub mod dispatch;
pub mod jobs;
pub mod link_enricher;
pub mod table_parser;

pub use crate::domain::model::{Day, Link, MonthReleases, Platform, RateBudget, Release, Subscriber};
pub use crate::domain::ports::{Clock, Mailer, PageSource, StorefrontProbe, SubscriberSource};
pub use crate::utils::error::Result;
