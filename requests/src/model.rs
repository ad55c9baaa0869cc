use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub type RequestId = uuid::Uuid;

/// Lifecycle of a booking request.
///
/// Requests are created externally in one of the schedulable states and
/// move to `Searching` once the scheduler starts polling for them. The
/// four terminal states also clear `is_active` so the request drops out
/// of the fetch filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Created,
    Queued,
    Searching,
    Booked,
    Expired,
    Closed,
    Failed,
}

impl RequestStatus {
    /// States the scheduler may still act on.
    pub fn is_schedulable(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending
                | RequestStatus::Created
                | RequestStatus::Queued
                | RequestStatus::Searching
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_schedulable()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Created => "CREATED",
            RequestStatus::Queued => "QUEUED",
            RequestStatus::Searching => "SEARCHING",
            RequestStatus::Booked => "BOOKED",
            RequestStatus::Expired => "EXPIRED",
            RequestStatus::Closed => "CLOSED",
            RequestStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "CREATED" => Ok(RequestStatus::Created),
            "QUEUED" => Ok(RequestStatus::Queued),
            "SEARCHING" => Ok(RequestStatus::Searching),
            "BOOKED" => Ok(RequestStatus::Booked),
            "EXPIRED" => Ok(RequestStatus::Expired),
            "CLOSED" => Ok(RequestStatus::Closed),
            "FAILED" => Ok(RequestStatus::Failed),
            other => Err(anyhow::anyhow!("Invalid RequestStatus value: {}", other)),
        }
    }
}

/// One user's desire to occupy a venue/activity/time window on a date.
///
/// Owned by the request store; the scheduler only ever holds a
/// transient copy per cycle. Field names match the store's columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: RequestId,

    // Identity
    pub account_id: uuid::Uuid,
    pub venue_slug: String,
    pub activity_slug: String,

    // Target window
    pub target_date: NaiveDate,
    pub target_start_time: NaiveTime,
    pub target_end_time: NaiveTime,

    // Search config
    pub search_start_date: NaiveDate,
    pub search_window_start_time: NaiveTime,
    pub search_window_end_time: NaiveTime,

    // Ranked court preferences, free text ("Court 5", "court-11", ...)
    pub preferred_court_name_1: Option<String>,
    pub preferred_court_name_2: Option<String>,
    pub preferred_court_name_3: Option<String>,

    // Lifecycle + bookkeeping
    pub status: RequestStatus,
    pub is_active: bool,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,

    // Populated only on success
    #[serde(default)]
    pub booked_court_name: Option<String>,
    #[serde(default)]
    pub booked_slot_start: Option<NaiveTime>,
    #[serde(default)]
    pub booked_slot_end: Option<NaiveTime>,
}

impl BookingRequest {
    /// Ranked, non-empty court preferences in order.
    pub fn preferred_courts(&self) -> Vec<&str> {
        [
            &self.preferred_court_name_1,
            &self.preferred_court_name_2,
            &self.preferred_court_name_3,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect()
    }

    pub fn is_schedulable(&self) -> bool {
        self.is_active && self.status.is_schedulable()
    }
}

/// Username/password pair resolved for a booking account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Created,
            RequestStatus::Queued,
            RequestStatus::Searching,
            RequestStatus::Booked,
            RequestStatus::Expired,
            RequestStatus::Closed,
            RequestStatus::Failed,
        ] {
            let parsed: RequestStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("DORMANT".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn terminal_states_are_not_schedulable() {
        assert!(RequestStatus::Pending.is_schedulable());
        assert!(RequestStatus::Searching.is_schedulable());
        assert!(RequestStatus::Booked.is_terminal());
        assert!(RequestStatus::Expired.is_terminal());
        assert!(RequestStatus::Closed.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }

    #[test]
    fn preferred_courts_skips_gaps_and_blanks() {
        let row = r#"{
            "id": "5e40a648-3fcb-4e62-a697-33498e0b0e41",
            "account_id": "0c9d8c2f-0f5d-4b47-a8a8-96b5f76ba1ce",
            "venue_slug": "walthamstow-leisure-centre",
            "activity_slug": "badminton-40min",
            "target_date": "2026-08-14",
            "target_start_time": "19:00:00",
            "target_end_time": "20:00:00",
            "search_start_date": "2026-08-01",
            "search_window_start_time": "21:55:00",
            "search_window_end_time": "22:30:00",
            "preferred_court_name_1": "Court 11",
            "preferred_court_name_2": "  ",
            "preferred_court_name_3": "court-9",
            "status": "PENDING",
            "is_active": true,
            "attempt_count": 0
        }"#;
        let req: BookingRequest = serde_json::from_str(row).unwrap();
        assert_eq!(req.preferred_courts(), vec!["Court 11", "court-9"]);
        assert!(req.is_schedulable());
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.booked_court_name.is_none());
    }
}
