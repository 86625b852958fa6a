pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::NotifierConfig;

pub use core::calendar::{Calendar, CalendarHandle};
pub use core::calendar_builder::CalendarBuilder;
pub use core::dispatch::{DispatchLoop, DispatchReport};
pub use core::jobs::{DispatchTodaysReleases, Job, JobRunner, RefreshCalendar};
pub use core::link_enricher::{LinkEnricher, LinkSettings};
pub use utils::error::{NotifierError, Result};
