//! Common types and the abstraction traits the orchestrator books
//! through.

use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use provider::{Cart, ProviderError, Slot};
use requests::{Credentials, RequestStatus};

/// Which step of the booking flow a provider error surfaced at.
///
/// The stage drives both the retry budget (only checkout failures are
/// retried) and the status mapping (listing failures keep the request
/// in SEARCHING, everything else fails it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Credentials,
    Listing,
    Cart,
    Checkout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Credentials => "credentials",
            Stage::Listing => "listing",
            Stage::Cart => "cart",
            Stage::Checkout => "checkout",
        };
        f.write_str(s)
    }
}

/// What happened when the orchestrator processed one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Checkout confirmed; the slot is ours.
    Booked { confirmation: i64, label: String },
    /// The provider listed nothing bookable; keep polling.
    NoSlots,
    /// Slots were listed but none could be selected.
    SelectionFailed,
    /// A provider call failed at the named stage.
    Provider { stage: Stage, detail: String },
}

impl Outcome {
    /// Status the request moves to after this outcome is persisted.
    ///
    /// Listing failures count as "inventory not open yet" and keep the
    /// request in SEARCHING so the next cycle retries it.
    pub fn status(&self) -> RequestStatus {
        match self {
            Outcome::Booked { .. } => RequestStatus::Booked,
            Outcome::NoSlots => RequestStatus::Searching,
            Outcome::Provider {
                stage: Stage::Listing,
                ..
            } => RequestStatus::Searching,
            Outcome::SelectionFailed | Outcome::Provider { .. } => RequestStatus::Failed,
        }
    }

    /// Human-readable result message stored on the request row.
    pub fn message(&self) -> String {
        match self {
            Outcome::Booked {
                confirmation,
                label,
            } => format!("booked {label} (order {confirmation})"),
            Outcome::NoSlots => "no bookable slots in the requested window".to_string(),
            Outcome::SelectionFailed => "slots listed but none could be selected".to_string(),
            Outcome::Provider { stage, detail } => format!("{stage} failed: {detail}"),
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(self, Outcome::Booked { .. })
    }
}

/// Errors the orchestrator cannot map into an `Outcome`: the booking
/// attempt itself resolved, but persisting it did not.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Checkout succeeded but the store write failed. The reservation
    /// exists on the platform and must be reconciled manually.
    #[error("booked {label} (order {confirmation}) but the store update failed: {source}")]
    BookedButUnrecorded {
        confirmation: i64,
        label: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("store update failed: {0}")]
    Store(#[from] anyhow::Error),
}

/// The slice of the venue platform the orchestrator needs.
///
/// `checkout` hides the benefit-vs-credit distinction; the concrete
/// provider picks the flow from the cart's amount.
#[async_trait]
pub trait VenueProvider: Send + Sync {
    async fn list_slots(
        &self,
        venue: &str,
        activity: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Vec<Slot>, ProviderError>;

    async fn add_to_cart(&self, slot: &Slot) -> Result<Cart, ProviderError>;

    async fn checkout(&self, cart: &Cart) -> Result<i64, ProviderError>;
}

/// Builds an authenticated provider session for one account.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn VenueProvider>, ProviderError>;
}
