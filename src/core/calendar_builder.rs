use crate::core::calendar::{Calendar, MONTHS};
use crate::core::table_parser::{self, RawTable};
use crate::domain::model::MonthReleases;
use crate::utils::error::{NotifierError, Result};
use chrono::Month;
use scraper::Html;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The located table of every month, `None` where the page has none yet.
pub type MonthTables = Vec<(Month, Option<RawTable>)>;

/// Parses the twelve month tables in parallel and assembles a [`Calendar`].
#[derive(Debug, Clone, Default)]
pub struct CalendarBuilder {
    cancel: CancellationToken,
}

impl CalendarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Reads the raw rows of every month out of the parsed page.
    pub fn extract_tables(doc: &Html) -> Result<MonthTables> {
        MONTHS
            .into_iter()
            .map(|month| Ok((month, table_parser::locate_table(doc, month)?)))
            .collect()
    }

    /// Parses a page and builds its calendar.
    ///
    /// The DOM is dropped before any task is spawned; only owned cell text crosses
    /// into the month tasks.
    pub async fn build_from_html(&self, year: i32, html: &str) -> Result<Calendar> {
        let tables = {
            let doc = Html::parse_document(html);
            Self::extract_tables(&doc)?
        };
        self.build(year, tables).await
    }

    /// Runs one parse task per month and waits for all of them.
    ///
    /// The first failing month aborts the remaining tasks and the whole build.
    pub async fn build(&self, year: i32, tables: MonthTables) -> Result<Calendar> {
        let mut tasks = JoinSet::new();

        for (month, table) in tables {
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                if cancel.is_cancelled() {
                    return (
                        month,
                        Err(NotifierError::Cancelled {
                            operation: format!("parsing {}", month.name()),
                        }),
                    );
                }
                let releases = match table {
                    Some(rows) => table_parser::parse_table(month, &rows),
                    None => Ok(MonthReleases::new()),
                };
                (month, releases)
            });
        }

        let mut calendar = Calendar::new(year);
        while let Some(joined) = tasks.join_next().await {
            let (month, releases) = joined?;
            match releases {
                Ok(releases) => {
                    tracing::info!(
                        "{}: {} releases on {} days",
                        month.name(),
                        releases.values().map(Vec::len).sum::<usize>(),
                        releases.len()
                    );
                    calendar.set_month(month, releases);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(calendar)
    }
}
