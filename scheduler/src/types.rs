//! Shared types used by the scheduler subsystem.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::classify::Action;
use requests::RequestId;

/// How the run loop treats the daily search window once a date's
/// inventory has already been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Act on every invocation, to catch late cancellations.
    Continuous,
    /// Act only inside the request's daily search window.
    Windowed,
}

/// When the venue releases a date's inventory: a fixed number of days
/// ahead of play, at a fixed venue-local clock time.
///
/// Release and window times are defined in the venue's civil time, so
/// the policy carries an explicit UTC offset instead of relying on the
/// host timezone.
#[derive(Debug, Clone)]
pub struct ReleasePolicy {
    pub days_ahead: i64,
    pub release_time: NaiveTime,
    pub venue_offset: FixedOffset,
}

impl ReleasePolicy {
    /// The date this target's inventory first becomes listable.
    pub fn release_date(&self, target: NaiveDate) -> NaiveDate {
        target - chrono::Duration::days(self.days_ahead)
    }

    /// Venue-local instant at which this target's inventory opens.
    pub fn release_instant(&self, target: NaiveDate) -> NaiveDateTime {
        self.release_date(target).and_time(self.release_time)
    }

    /// The given instant on the venue's civil clock.
    pub fn venue_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.venue_offset).naive_local()
    }
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        Self {
            days_ahead: 7,
            release_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            venue_offset: FixedOffset::east_opt(0).unwrap(),
        }
    }
}

/// Configuration knobs for one run-loop cycle.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: RunMode,
    pub policy: ReleasePolicy,

    /// Block the cycle until the release instant when some fetched
    /// request releases today.
    pub align_to_release: bool,

    /// Maximum number of requests fetched per cycle.
    pub fetch_limit: usize,

    /// How far ahead of the release instant the coarse sleep hands over
    /// to fine-grained polling.
    pub wait_lead: Duration,

    /// Poll interval during the final approach to the release instant.
    pub fine_poll: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Continuous,
            policy: ReleasePolicy::default(),
            align_to_release: false,
            fetch_limit: 50,
            wait_lead: Duration::from_secs(60),
            fine_poll: Duration::from_millis(250),
        }
    }
}

/// What one cycle did to one request.
#[derive(Debug, Clone)]
pub struct CycleAction {
    pub request_id: RequestId,
    pub action: Action,
    pub message: String,
}

/// Summary of one run-loop cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub actions: Vec<CycleAction>,
    pub elapsed: Duration,
    /// Requests whose dispatch or persistence errored. These do not
    /// abort the cycle for the others.
    pub failures: usize,
}

impl CycleReport {
    pub fn push(&mut self, request_id: RequestId, action: Action, message: impl Into<String>) {
        self.actions.push(CycleAction {
            request_id,
            action,
            message: message.into(),
        });
    }
}
