use crate::domain::model::{RateBudget, Release, Subscriber};
use crate::domain::ports::{Clock, Mailer};
use crate::utils::error::{NotifierError, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RESET_MARGIN_SECONDS: u64 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Emails handed to the mailer.
    pub sent: usize,
    /// Times the loop waited for the rate limit window to reset.
    pub pauses: usize,
}

/// Sends today's releases to every subscriber without exceeding the provider's
/// rate limit.
pub struct DispatchLoop<'a, M: Mailer, C: Clock> {
    mailer: &'a M,
    clock: &'a C,
    cancel: CancellationToken,
}

impl<'a, M: Mailer, C: Clock> DispatchLoop<'a, M, C> {
    pub fn new(mailer: &'a M, clock: &'a C) -> Self {
        Self {
            mailer,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribers are served strictly in the given order; the budget accounting
    /// counts sends since the last budget fetch.
    pub async fn run(
        &self,
        releases: &[Release],
        subscribers: &[Subscriber],
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        if releases.is_empty() {
            return Ok(report);
        }

        let mut budget = self.fetch_budget().await?;
        let mut count = 0;

        for subscriber in subscribers {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(&report));
            }

            while count >= budget.remaining {
                let wait = self.wait_until_reset(&budget);
                tracing::info!(
                    "Rate limit reached after {} emails, waiting {}s for reset",
                    report.sent,
                    wait.as_secs()
                );

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = self.cancel.cancelled() => return Err(self.cancelled(&report)),
                }
                report.pauses += 1;

                budget = self.fetch_budget().await?;
                count = 0;
            }

            self.mailer.send(&subscriber.email, releases);
            count += 1;
            report.sent += 1;
        }

        tracing::info!(
            "Dispatched {} emails with {} rate limit pauses",
            report.sent,
            report.pauses
        );
        Ok(report)
    }

    async fn fetch_budget(&self) -> Result<RateBudget> {
        match self.mailer.rate_limits().await {
            Ok(budget) => {
                tracing::debug!(
                    "Rate budget: {} remaining, reset at {}",
                    budget.remaining,
                    budget.reset_at_unix_seconds
                );
                Ok(budget)
            }
            Err(e) => {
                tracing::error!("Fetching rate limits failed, aborting dispatch: {}", e);
                self.mailer
                    .notify_admin(&format!("dispatch: error getting rate limits: {}", e));
                Err(e)
            }
        }
    }

    fn wait_until_reset(&self, budget: &RateBudget) -> Duration {
        let seconds = (budget.reset_at_unix_seconds - self.clock.now_unix()).max(0) as u64;
        Duration::from_secs(seconds + RESET_MARGIN_SECONDS)
    }

    fn cancelled(&self, report: &DispatchReport) -> NotifierError {
        NotifierError::Cancelled {
            operation: format!("dispatch after {} emails", report.sent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    const NOW: i64 = 1_700_000_000;

    struct FixedClock;

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()
        }

        fn now_unix(&self) -> i64 {
            NOW
        }
    }

    /// Hands out queued budgets and records when each email was sent.
    struct RecordingMailer {
        started: Instant,
        budgets: Mutex<VecDeque<Result<RateBudget>>>,
        sent: Mutex<Vec<(String, Duration)>>,
        admin: Mutex<Vec<String>>,
        fetches: Mutex<usize>,
    }

    impl RecordingMailer {
        fn new(budgets: Vec<Result<RateBudget>>) -> Self {
            Self {
                started: Instant::now(),
                budgets: Mutex::new(budgets.into()),
                sent: Mutex::new(Vec::new()),
                admin: Mutex::new(Vec::new()),
                fetches: Mutex::new(0),
            }
        }

        fn sent(&self) -> Vec<(String, Duration)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Mailer for RecordingMailer {
        async fn rate_limits(&self) -> Result<RateBudget> {
            *self.fetches.lock().unwrap() += 1;
            self.budgets
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(NotifierError::RateLimitError {
                    message: "no more budgets".to_string(),
                }))
        }

        fn send(&self, to: &str, _releases: &[Release]) {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), self.started.elapsed()));
        }

        fn notify_admin(&self, message: &str) {
            self.admin.lock().unwrap().push(message.to_string());
        }
    }

    fn budget(remaining: usize, reset_in: i64) -> Result<RateBudget> {
        Ok(RateBudget {
            remaining,
            reset_at_unix_seconds: NOW + reset_in,
        })
    }

    fn subscribers(emails: &[&str]) -> Vec<Subscriber> {
        emails
            .iter()
            .map(|e| Subscriber {
                email: e.to_string(),
            })
            .collect()
    }

    fn releases() -> Vec<Release> {
        vec![Release::new("Sabaton", "The War to End All Wars")]
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_until_reset_when_budget_exhausted() {
        let mailer = RecordingMailer::new(vec![budget(2, 5), budget(100, 3600)]);
        let clock = FixedClock;
        let users = subscribers(&["a@x.io", "b@x.io", "c@x.io", "d@x.io"]);

        let report = DispatchLoop::new(&mailer, &clock)
            .run(&releases(), &users)
            .await
            .unwrap();

        assert_eq!(report, DispatchReport { sent: 4, pauses: 1 });
        assert_eq!(*mailer.fetches.lock().unwrap(), 2);

        let sent = mailer.sent();
        let order: Vec<_> = sent.iter().map(|(to, _)| to.as_str()).collect();
        assert_eq!(order, vec!["a@x.io", "b@x.io", "c@x.io", "d@x.io"]);
        assert!(sent[0].1 < Duration::from_secs(1));
        assert!(sent[1].1 < Duration::from_secs(1));
        assert!(sent[2].1 >= Duration::from_secs(6));
        assert!(sent[3].1 >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_in_the_past_waits_only_the_margin() {
        let mailer = RecordingMailer::new(vec![budget(1, -30), budget(1, -30), budget(5, 60)]);
        let clock = FixedClock;
        let users = subscribers(&["a@x.io", "b@x.io", "c@x.io"]);

        let report = DispatchLoop::new(&mailer, &clock)
            .run(&releases(), &users)
            .await
            .unwrap();

        assert_eq!(report.pauses, 2);
        let sent = mailer.sent();
        assert!(sent[1].1 >= Duration::from_secs(1));
        assert!(sent[1].1 < Duration::from_secs(2));
        assert!(sent[2].1 >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_waits_before_first_send() {
        let mailer = RecordingMailer::new(vec![budget(0, 10), budget(10, 3600)]);
        let clock = FixedClock;

        let report = DispatchLoop::new(&mailer, &clock)
            .run(&releases(), &subscribers(&["a@x.io"]))
            .await
            .unwrap();

        assert_eq!(report, DispatchReport { sent: 1, pauses: 1 });
        assert!(mailer.sent()[0].1 >= Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_initial_budget_failure_aborts_without_sending() {
        let mailer = RecordingMailer::new(vec![]);
        let clock = FixedClock;

        let err = DispatchLoop::new(&mailer, &clock)
            .run(&releases(), &subscribers(&["a@x.io", "b@x.io"]))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifierError::RateLimitError { .. }));
        assert!(mailer.sent().is_empty());
        assert_eq!(mailer.admin.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_stops_remaining_sends() {
        let mailer = RecordingMailer::new(vec![budget(1, 2)]);
        let clock = FixedClock;

        let err = DispatchLoop::new(&mailer, &clock)
            .run(&releases(), &subscribers(&["a@x.io", "b@x.io", "c@x.io"]))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifierError::RateLimitError { .. }));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_no_releases_short_circuits() {
        let mailer = RecordingMailer::new(vec![]);
        let clock = FixedClock;

        let report = DispatchLoop::new(&mailer, &clock)
            .run(&[], &subscribers(&["a@x.io"]))
            .await
            .unwrap();

        assert_eq!(report, DispatchReport::default());
        assert_eq!(*mailer.fetches.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_sending() {
        let mailer = RecordingMailer::new(vec![budget(10, 60)]);
        let clock = FixedClock;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = DispatchLoop::new(&mailer, &clock)
            .with_cancellation(cancel)
            .run(&releases(), &subscribers(&["a@x.io"]))
            .await
            .unwrap_err();

        assert!(matches!(err, NotifierError::Cancelled { .. }));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_waiting_for_reset() {
        let mailer = RecordingMailer::new(vec![budget(1, 3600), budget(10, 3600)]);
        let clock = FixedClock;
        let cancel = CancellationToken::new();
        let releases = releases();
        let users = subscribers(&["a@x.io", "b@x.io"]);
        let started = Instant::now();

        let dispatch = DispatchLoop::new(&mailer, &clock).with_cancellation(cancel.clone());
        let (result, _) = tokio::join!(dispatch.run(&releases, &users), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            cancel.cancel();
        });

        assert!(matches!(result, Err(NotifierError::Cancelled { .. })));
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(*mailer.fetches.lock().unwrap(), 1);
    }
}
