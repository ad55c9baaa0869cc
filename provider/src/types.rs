//! Public slot/cart types plus the raw wire envelopes the venue
//! platform returns. The public types carry only what the booking core
//! needs; everything else stays in the raw DTOs.

use chrono::NaiveTime;
use serde::Deserialize;

/// One concrete bookable unit: a specific court, date and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: i64,
    pub location_id: i64,
    pub pricing_option_id: i64,
    pub restriction_ids: Vec<i64>,
    /// Display slug of the court, e.g. "badminton-court-7".
    pub name: String,
    /// Cart item type tag required by the cart-add endpoint.
    pub cart_type: String,
}

/// Ephemeral server-side basket created by adding a slot.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: i64,
    /// Monetary amount in the platform's minor units. Zero means the
    /// account's benefit covers the booking.
    pub total: i64,
    /// Source tag the checkout endpoint expects back.
    pub source: String,
}

/// Snapshot of the current cart with the fields credit checkout needs.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub id: i64,
    pub source: String,
    pub total: i64,
    pub item_hash: String,
    pub general_credit_available: i64,
    pub general_credit_max_applicable: i64,
}

/// A free start/end pair on a date, as reported by the times endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityTime {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

// ---------------------------------------------------------------------
// Raw wire DTOs
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SlotsEnvelope {
    #[serde(default)]
    pub data: Vec<RawSlot>,
}

#[derive(Debug, Deserialize)]
pub struct RawSlot {
    pub id: i64,
    #[serde(default)]
    pub spaces: i64,
    pub pricing_option_id: i64,
    #[serde(default)]
    pub restriction_ids: Vec<i64>,
    pub location: RawLocation,
    pub cart_type: String,
    #[serde(default)]
    pub action_to_show: Option<RawAction>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub id: i64,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub status: Option<String>,
}

impl RawSlot {
    /// Free spaces and an explicit BOOK action; everything else is a
    /// full or non-bookable row.
    pub fn is_bookable(&self) -> bool {
        self.spaces > 0
            && self
                .action_to_show
                .as_ref()
                .and_then(|a| a.status.as_deref())
                == Some("BOOK")
    }

    pub fn into_slot(self) -> Slot {
        Slot {
            id: self.id,
            location_id: self.location.id,
            pricing_option_id: self.pricing_option_id,
            restriction_ids: self.restriction_ids,
            name: self.location.slug,
            cart_type: self.cart_type,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimesEnvelope {
    #[serde(default)]
    pub data: Vec<RawTime>,
}

#[derive(Debug, Deserialize)]
pub struct RawTime {
    pub starts_at: RawClock,
    pub ends_at: RawClock,
    #[serde(default)]
    pub spaces: i64,
    #[serde(default)]
    pub booking: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawClock {
    pub format_24_hour: String,
}

#[derive(Debug, Deserialize)]
pub struct CartEnvelope {
    pub data: RawCart,
}

#[derive(Debug, Deserialize)]
pub struct RawCart {
    pub id: i64,
    pub total: i64,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct CartSummaryEnvelope {
    pub data: RawCartSummary,
}

#[derive(Debug, Deserialize)]
pub struct RawCartSummary {
    pub id: i64,
    pub source: String,
    pub total: i64,
    #[serde(rename = "itemHash")]
    pub item_hash: String,
    #[serde(default)]
    pub credits: RawCredits,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawCredits {
    #[serde(default)]
    pub general: RawGeneralCredit,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawGeneralCredit {
    #[serde(default)]
    pub total_available: i64,
    #[serde(default)]
    pub max_applicable: i64,
}

impl RawCartSummary {
    pub fn into_summary(self) -> CartSummary {
        CartSummary {
            id: self.id,
            source: self.source,
            total: self.total,
            item_hash: self.item_hash,
            general_credit_available: self.credits.general.total_available,
            general_credit_max_applicable: self.credits.general.max_applicable,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub complete_order_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}
