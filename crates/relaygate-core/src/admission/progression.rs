//! Monotonic lifecycle check against the last processed status.

use chrono::{DateTime, Duration, Utc};
use relaygate_types::admission::{AdmissionDecision, LifecycleStatus, normalize_status};

/// Rejects replays inside the window and backward lifecycle moves.
#[derive(Debug, Clone)]
pub struct StatusProgressionGate {
    replay_window: Duration,
}

impl StatusProgressionGate {
    pub fn new(replay_window: Duration) -> Self {
        Self { replay_window }
    }

    /// Decide whether `new_status` may be processed given the client's last
    /// processed status and when it was processed.
    ///
    /// Unknown statuses and first events are allowed. A backward move into
    /// `reply` is allowed so a client can be re-engaged.
    pub fn check(
        &self,
        last_status: Option<&str>,
        last_processed_at: Option<DateTime<Utc>>,
        new_status: &str,
        now: DateTime<Utc>,
    ) -> AdmissionDecision {
        let new = normalize_status(new_status);
        let Some(last) = last_status.map(normalize_status).filter(|s| !s.is_empty()) else {
            return AdmissionDecision::proceed();
        };

        if new == last {
            if let Some(at) = last_processed_at {
                let elapsed = now - at;
                if elapsed < self.replay_window {
                    let secs = elapsed.num_milliseconds() as f64 / 1000.0;
                    return AdmissionDecision::skip(format!("Duplicate: processed {secs:.1}s ago"));
                }
            }
        }

        if let (Some(from), Some(to)) = (LifecycleStatus::parse(&last), LifecycleStatus::parse(&new)) {
            if to.index() < from.index() && to != LifecycleStatus::Reply {
                return AdmissionDecision::skip(format!("Backwards change to '{new}' not allowed"));
            }
        }

        AdmissionDecision::proceed()
    }
}

impl Default for StatusProgressionGate {
    fn default() -> Self {
        Self::new(Duration::seconds(60))
    }
}
