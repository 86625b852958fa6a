use crate::core::calendar::{Calendar, CalendarHandle, MONTHS};
use crate::core::calendar_builder::CalendarBuilder;
use crate::core::dispatch::{DispatchLoop, DispatchReport};
use crate::core::link_enricher::LinkEnricher;
use crate::domain::model::Day;
use crate::domain::ports::{Clock, Mailer, PageSource, StorefrontProbe, SubscriberSource};
use crate::utils::error::{NotifierError, Result};
use async_trait::async_trait;
use chrono::Datelike;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A unit of work an external scheduler triggers.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the job once and returns a one-line summary.
    async fn run(&self) -> Result<String>;
}

pub struct JobRunner<J: Job> {
    job: J,
}

impl<J: Job> JobRunner<J> {
    pub fn new(job: J) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting job {}", self.job.name());
        let started = Instant::now();

        match self.job.run().await {
            Ok(summary) => {
                tracing::info!(
                    "Job {} finished in {:?}: {}",
                    self.job.name(),
                    started.elapsed(),
                    summary
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    "Job {} failed after {:?}: {} (Category: {:?}, Severity: {:?})",
                    self.job.name(),
                    started.elapsed(),
                    e,
                    e.category(),
                    e.severity()
                );
                Err(e)
            }
        }
    }
}

/// Scrapes the current year's page and publishes the new calendar.
///
/// A failed build leaves the published calendar untouched.
pub struct RefreshCalendar<S: PageSource, C: Clock> {
    pages: S,
    clock: Arc<C>,
    calendar: CalendarHandle,
    builder: CalendarBuilder,
}

impl<S: PageSource, C: Clock> RefreshCalendar<S, C> {
    pub fn new(pages: S, clock: Arc<C>, calendar: CalendarHandle) -> Self {
        Self {
            pages,
            clock,
            calendar,
            builder: CalendarBuilder::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.builder = CalendarBuilder::with_cancellation(cancel);
        self
    }

    pub async fn refresh(&self) -> Result<Arc<Calendar>> {
        let year = self.clock.today().year();
        let html = self.pages.fetch_year_page(year).await?;
        let calendar = self.builder.build_from_html(year, &html).await?;

        self.calendar.publish(calendar).await;
        Ok(self.calendar.snapshot().await)
    }
}

#[async_trait]
impl<S: PageSource, C: Clock> Job for RefreshCalendar<S, C> {
    fn name(&self) -> &str {
        "refresh-calendar"
    }

    async fn run(&self) -> Result<String> {
        let calendar = self.refresh().await?;
        Ok(format!(
            "calendar {} updated with {} releases",
            calendar.year,
            calendar.release_count()
        ))
    }
}

/// Emails today's releases to every subscriber.
pub struct DispatchTodaysReleases<F, M, P, C>
where
    F: SubscriberSource,
    M: Mailer,
    P: StorefrontProbe,
    C: Clock,
{
    subscribers: F,
    mailer: M,
    enricher: Arc<LinkEnricher<P>>,
    clock: Arc<C>,
    calendar: CalendarHandle,
    cancel: CancellationToken,
}

impl<F, M, P, C> DispatchTodaysReleases<F, M, P, C>
where
    F: SubscriberSource,
    M: Mailer,
    P: StorefrontProbe,
    C: Clock,
{
    pub fn new(
        subscribers: F,
        mailer: M,
        enricher: Arc<LinkEnricher<P>>,
        clock: Arc<C>,
        calendar: CalendarHandle,
    ) -> Self {
        Self {
            subscribers,
            mailer,
            enricher,
            clock,
            calendar,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn dispatch(&self) -> Result<DispatchReport> {
        let today = self.clock.today();
        let month = MONTHS[today.month0() as usize];
        let day = today.day() as Day;

        let calendar = self.calendar.snapshot().await;
        let releases = calendar.releases_on_date(month, day, &*self.enricher).await;
        if releases.is_empty() {
            tracing::info!("No releases on {}", today);
            return Ok(DispatchReport::default());
        }
        tracing::info!("{} releases on {}", releases.len(), today);

        let users = match self.subscribers.users().await {
            Ok(users) => users,
            Err(e) => {
                self.mailer
                    .notify_admin(&format!("dispatch: error getting users: {}", e));
                return Err(NotifierError::SubscriberError {
                    message: e.to_string(),
                });
            }
        };

        DispatchLoop::new(&self.mailer, self.clock.as_ref())
            .with_cancellation(self.cancel.clone())
            .run(&releases, &users)
            .await
    }
}

#[async_trait]
impl<F, M, P, C> Job for DispatchTodaysReleases<F, M, P, C>
where
    F: SubscriberSource,
    M: Mailer,
    P: StorefrontProbe,
    C: Clock,
{
    fn name(&self) -> &str {
        "dispatch-todays-releases"
    }

    async fn run(&self) -> Result<String> {
        let report = self.dispatch().await?;
        Ok(format!(
            "{} emails sent, {} rate limit pauses",
            report.sent, report.pauses
        ))
    }
}
