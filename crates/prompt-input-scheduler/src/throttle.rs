use std::time::{Duration, Instant};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Run the pass now; the run has already been recorded.
    RunNow,
    /// A pass is pending until the deadline; further requests fold into it.
    Scheduled(Instant),
}

/// Minimum-interval throttle that collapses requests instead of queueing them.
///
/// At most one pass is ever pending. A request that arrives before the
/// interval since the last run has elapsed becomes (or joins) that pending
/// pass, which fires once the interval is over.
#[derive(Debug, Clone)]
pub struct SyncThrottle {
    interval: Duration,
    last_run: Option<Instant>,
    pending_deadline: Option<Instant>,
    coalesced_requests: u64,
}

impl Default for SyncThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL)
    }
}

impl SyncThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending_deadline: None,
            coalesced_requests: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn request(&mut self, now: Instant) -> SyncDecision {
        if let Some(deadline) = self.pending_deadline {
            self.coalesced_requests = self.coalesced_requests.saturating_add(1);
            return SyncDecision::Scheduled(deadline);
        }

        let next_allowed = self
            .last_run
            .and_then(|last_run| last_run.checked_add(self.interval));
        match next_allowed {
            Some(deadline) if !self.interval.is_zero() && now < deadline => {
                self.pending_deadline = Some(deadline);
                tracing::trace!(?deadline, "deferring prompt input sync");
                SyncDecision::Scheduled(deadline)
            }
            _ => {
                self.last_run = Some(now);
                SyncDecision::RunNow
            }
        }
    }

    /// Fires the pending pass once its deadline has passed.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.pending_deadline {
            Some(deadline) if now >= deadline => {
                self.pending_deadline = None;
                self.last_run = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Fires the pending pass regardless of its deadline.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.pending_deadline.take().is_none() {
            return false;
        }
        self.last_run = Some(now);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending_deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending_deadline.is_some()
    }

    /// Requests folded into an already pending pass.
    pub fn coalesced_requests(&self) -> u64 {
        self.coalesced_requests
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{SyncDecision, SyncThrottle};

    const INTERVAL: Duration = Duration::from_millis(16);

    #[test]
    fn first_request_runs_immediately() {
        let mut throttle = SyncThrottle::new(INTERVAL);

        assert_eq!(throttle.request(Instant::now()), SyncDecision::RunNow);
        assert!(!throttle.is_pending());
    }

    #[test]
    fn requests_within_interval_collapse_into_one_pending_run() {
        let mut throttle = SyncThrottle::new(INTERVAL);
        let start = Instant::now();
        assert_eq!(throttle.request(start), SyncDecision::RunNow);

        let deadline = start + INTERVAL;
        assert_eq!(
            throttle.request(start + Duration::from_millis(2)),
            SyncDecision::Scheduled(deadline)
        );
        assert_eq!(
            throttle.request(start + Duration::from_millis(5)),
            SyncDecision::Scheduled(deadline)
        );
        assert_eq!(throttle.deadline(), Some(deadline));
        assert_eq!(throttle.coalesced_requests(), 1);

        assert!(!throttle.poll_due(start + Duration::from_millis(10)));
        assert!(throttle.poll_due(deadline));
        assert!(!throttle.poll_due(deadline));
        assert_eq!(throttle.deadline(), None);
    }

    #[test]
    fn request_after_interval_runs_immediately() {
        let mut throttle = SyncThrottle::new(INTERVAL);
        let start = Instant::now();
        assert_eq!(throttle.request(start), SyncDecision::RunNow);

        assert_eq!(
            throttle.request(start + INTERVAL + Duration::from_millis(1)),
            SyncDecision::RunNow
        );
    }

    #[test]
    fn pending_run_restarts_the_interval_when_it_fires() {
        let mut throttle = SyncThrottle::new(INTERVAL);
        let start = Instant::now();
        throttle.request(start);
        throttle.request(start + Duration::from_millis(1));

        let fired_at = start + INTERVAL;
        assert!(throttle.poll_due(fired_at));
        assert_eq!(
            throttle.request(fired_at + Duration::from_millis(1)),
            SyncDecision::Scheduled(fired_at + INTERVAL)
        );
    }

    #[test]
    fn flush_consumes_pending_run_early() {
        let mut throttle = SyncThrottle::new(INTERVAL);
        let start = Instant::now();
        throttle.request(start);
        throttle.request(start + Duration::from_millis(1));

        assert!(throttle.flush(start + Duration::from_millis(2)));
        assert!(!throttle.flush(start + Duration::from_millis(3)));
        assert!(!throttle.is_pending());
    }

    #[test]
    fn zero_interval_never_defers() {
        let mut throttle = SyncThrottle::new(Duration::ZERO);
        let now = Instant::now();

        assert_eq!(throttle.request(now), SyncDecision::RunNow);
        assert_eq!(throttle.request(now), SyncDecision::RunNow);
        assert_eq!(throttle.deadline(), None);
    }
}
