use crate::domain::ports::Clock;
use chrono::{Local, NaiveDate, Utc};

/// Local date for "today", UTC seconds for rate limit arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}
