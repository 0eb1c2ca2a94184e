//! Offline action types and queue snapshot format

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{BACKOFF_MAX_EXPONENT, QUEUE_SNAPSHOT_VERSION};
use crate::types::request::RequestDescriptor;

/// One queued mutating request awaiting replay.
///
/// Captured when a mutation cannot complete (offline or transport failure),
/// held in the in-memory queue, mirrored to persistent storage, and removed
/// only after a successful replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineAction {
    /// Unique id assigned at capture time
    pub id: Uuid,
    /// HTTP method of the original request
    pub method: String,
    /// Full request URL
    pub url: String,
    /// Captured header subset, replayed verbatim
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Opaque payload; absent for body-less mutations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Capture timestamp, preserved across requeues
    pub captured_at: DateTime<Utc>,
    /// Failed replay count; drives backoff and dead-lettering
    #[serde(default)]
    pub attempts: u32,
    /// Earliest next replay time; `None` means due immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl OfflineAction {
    /// Create a new action with a fresh id and the current capture time.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            url: url.into(),
            headers,
            body,
            captured_at: Utc::now(),
            attempts: 0,
            next_attempt_at: None,
        }
    }

    /// Record a failed replay: bump the attempt counter and push the next
    /// attempt out by a capped exponential delay.
    pub fn record_failure(&mut self, base: Duration, cap: Duration) {
        self.attempts = self.attempts.saturating_add(1);
        let delay = next_retry_delay(self.attempts, base, cap);
        self.next_attempt_at = Utc::now().checked_add_signed(
            chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(0)),
        );
    }

    /// Whether this action is eligible for replay at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }

    /// The request to issue when replaying this action, identical to the
    /// one that was originally captured.
    pub fn as_request(&self) -> RequestDescriptor {
        RequestDescriptor {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Whether this action has burned through its replay budget.
    pub fn has_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }
}

/// Compute the delay before retry number `attempts`.
///
/// Exponential in the attempt count with the exponent clamped to avoid
/// overflow, then capped at `cap`.
pub fn next_retry_delay(attempts: u32, base: Duration, cap: Duration) -> Duration {
    let exp = attempts.min(BACKOFF_MAX_EXPONENT);
    let multiplier = 2_u64.saturating_pow(exp);
    let delay_ms = u64::try_from(base.as_millis())
        .unwrap_or(u64::MAX)
        .saturating_mul(multiplier);
    Duration::from_millis(delay_ms).min(cap)
}

/// An action retired from the replay rotation after exhausting its attempts.
///
/// Kept in the persisted snapshot for inspection; never replayed again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetteredAction {
    pub action: OfflineAction,
    pub failed_at: DateTime<Utc>,
    pub reason: String,
}

/// The full, persisted serialization of the queue.
///
/// Written whole after every queue mutation; loaded once at startup to
/// restore state across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineQueueSnapshot {
    /// Snapshot format version
    pub version: u32,
    /// When this snapshot was written
    pub saved_at: DateTime<Utc>,
    /// Pending actions in FIFO order
    pub actions: Vec<OfflineAction>,
    /// Retired actions, newest last
    #[serde(default)]
    pub dead_letters: Vec<DeadLetteredAction>,
}

impl OfflineQueueSnapshot {
    /// Build a snapshot of the given queue contents, stamped now.
    pub fn capture(actions: Vec<OfflineAction>, dead_letters: Vec<DeadLetteredAction>) -> Self {
        Self { version: QUEUE_SNAPSHOT_VERSION, saved_at: Utc::now(), actions, dead_letters }
    }
}

impl Default for OfflineQueueSnapshot {
    fn default() -> Self {
        Self::capture(Vec::new(), Vec::new())
    }
}
