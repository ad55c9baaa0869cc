//! Decides what to do with a booking request at a given instant.
//
//  This module is deliberately pure: no async, no IO, no ambient clock.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::types::{ReleasePolicy, RunMode};
use requests::BookingRequest;

/// Result of classifying one request against the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Not time to act yet (dormant, or outside the search window).
    Skip,
    /// Release day, but the release instant has not been reached.
    WaitRelease,
    /// Hunt for a slot now.
    Process,
    /// The target date has passed; mark the request EXPIRED.
    Expire,
    /// One day before play; stop searching and mark CLOSED.
    Close,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Skip => "skip",
            Action::WaitRelease => "wait-release",
            Action::Process => "process",
            Action::Expire => "expire",
            Action::Close => "close",
        };
        f.write_str(s)
    }
}

/// Classify a request against `now`.
///
/// All date/time comparisons happen on the venue's civil calendar: the
/// release instant and the daily search window are venue-local, so a
/// scheduler host in another timezone must not shift them.
///
/// The lifecycle this encodes, in precedence order:
///   1. past the target date        -> Expire
///   2. one day before play         -> Close (inventory no longer moves)
///   3. before the search start     -> Skip
///   4. on the release day          -> WaitRelease / Process around the
///                                     configured release time
///   5. before the release day      -> Skip (nothing can exist yet)
///   6. after the release day       -> Process, gated by the daily
///                                     search window in windowed mode
pub fn classify(
    request: &BookingRequest,
    now: DateTime<Utc>,
    policy: &ReleasePolicy,
    mode: RunMode,
) -> Action {
    let local = policy.venue_now(now);
    let today = local.date();
    let release_date = policy.release_date(request.target_date);

    if today > request.target_date {
        return Action::Expire;
    }

    if today == request.target_date - Duration::days(1) {
        return Action::Close;
    }

    if today < request.search_start_date {
        return Action::Skip;
    }

    if today == release_date {
        return if local.time() >= policy.release_time {
            Action::Process
        } else {
            Action::WaitRelease
        };
    }

    if today < release_date {
        return Action::Skip;
    }

    match mode {
        RunMode::Continuous => Action::Process,
        RunMode::Windowed => {
            let time = local.time();
            if request.search_window_start_time <= time
                && time <= request.search_window_end_time
            {
                Action::Process
            } else {
                Action::Skip
            }
        }
    }
}
