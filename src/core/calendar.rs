use crate::core::link_enricher::LinkEnricher;
use crate::domain::model::{Day, MonthReleases, Release};
use crate::domain::ports::StorefrontProbe;
use chrono::Month;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

fn slot(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

/// Releases of one year, one slot per month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    pub year: i32,
    months: [MonthReleases; 12],
}

impl Calendar {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            months: Default::default(),
        }
    }

    pub fn set_month(&mut self, month: Month, releases: MonthReleases) {
        self.months[slot(month)] = releases;
    }

    pub fn month(&self, month: Month) -> &MonthReleases {
        &self.months[slot(month)]
    }

    pub fn release_count(&self) -> usize {
        self.months
            .iter()
            .flat_map(|days| days.values())
            .map(Vec::len)
            .sum()
    }

    /// Releases of one day without links. Unknown days give an empty list.
    pub fn releases_on(&self, month: Month, day: Day) -> Vec<Release> {
        self.month(month).get(&day).cloned().unwrap_or_default()
    }

    /// Releases of one day with freshly computed links.
    ///
    /// Every release is probed concurrently; the returned order matches the table.
    pub async fn releases_on_date<P: StorefrontProbe>(
        &self,
        month: Month,
        day: Day,
        enricher: &LinkEnricher<P>,
    ) -> Vec<Release> {
        let releases = self.releases_on(month, day);

        join_all(releases.into_iter().map(move |mut release| async move {
            release.links = enricher.links(&release.artist, &release.album).await;
            release
        }))
        .await
    }
}

/// Shared handle to the published calendar.
///
/// Readers get a snapshot; a rebuild swaps in a whole new calendar, so a reader
/// never sees one that is half built.
#[derive(Debug, Clone, Default)]
pub struct CalendarHandle {
    current: Arc<RwLock<Arc<Calendar>>>,
}

impl CalendarHandle {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(calendar))),
        }
    }

    pub async fn snapshot(&self) -> Arc<Calendar> {
        self.current.read().await.clone()
    }

    pub async fn publish(&self, calendar: Calendar) {
        *self.current.write().await = Arc::new(calendar);
    }
}
