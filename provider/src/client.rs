//! Authenticated HTTP client for the venue booking platform.
//!
//! The platform speaks JSON behind a customer login. One client is
//! built per booking account; the bearer token is fetched lazily on the
//! first call that needs it and cached for the rest of the client's
//! life.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::errors::ProviderError;
use crate::types::{
    ActivityTime, ApiMessage, Cart, CartEnvelope, CartSummary, CartSummaryEnvelope,
    CheckoutResponse, LoginResponse, Slot, SlotsEnvelope, TimesEnvelope,
};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

pub struct VenueClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl VenueClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Origin",
            HeaderValue::from_static("https://bookings.better.org.uk"),
        );

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let base_url = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Returns the cached bearer token, logging in first if needed.
    async fn bearer(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        debug!(username = %self.username, "no cached token, logging in");

        let resp = self
            .http
            .post(self.url("auth/customer/login"))
            .json(&json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "login failed with status {}",
                resp.status()
            )));
        }

        let login: LoginResponse = resp.json().await?;
        let token = login
            .token
            .ok_or_else(|| ProviderError::Auth("login response carried no token".into()))?;

        *guard = Some(token.clone());
        Ok(token)
    }

    /// Bookable slots for a venue/activity/date within a time window.
    ///
    /// Only rows with free spaces and an explicit BOOK action are
    /// returned. Before a date's booking window opens the platform
    /// serves an HTML redirect instead of JSON; that case is an empty
    /// list, not an error.
    #[instrument(
        skip(self),
        fields(venue = %venue, activity = %activity, date = %date),
        level = "debug"
    )]
    pub async fn list_slots(
        &self,
        venue: &str,
        activity: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Vec<Slot>, ProviderError> {
        let token = self.bearer().await?;

        let resp = self
            .http
            .get(self.url(&format!(
                "activities/venue/{venue}/activity/{activity}/slots"
            )))
            .bearer_auth(token)
            .query(&[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("start_time", start.format("%H:%M").to_string()),
                ("end_time", end.format("%H:%M").to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = resp.text().await?;
        let envelope: SlotsEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(_) => {
                debug!("non-JSON slots response, booking window not open yet");
                return Ok(Vec::new());
            }
        };

        let slots: Vec<Slot> = envelope
            .data
            .into_iter()
            .filter(|raw| raw.is_bookable())
            .map(|raw| raw.into_slot())
            .collect();

        debug!(count = slots.len(), "slots listed");
        Ok(slots)
    }

    /// Free start/end pairs for a venue/activity/date. Read-only, used
    /// by the availability probe.
    #[instrument(
        skip(self),
        fields(venue = %venue, activity = %activity, date = %date),
        level = "debug"
    )]
    pub async fn list_times(
        &self,
        venue: &str,
        activity: &str,
        date: NaiveDate,
    ) -> Result<Vec<ActivityTime>, ProviderError> {
        let token = self.bearer().await?;

        let resp = self
            .http
            .get(self.url(&format!(
                "activities/venue/{venue}/activity/{activity}/times"
            )))
            .bearer_auth(token)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?
            .error_for_status()?;

        let body = resp.text().await?;
        let envelope: TimesEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(_) => {
                debug!("non-JSON times response, booking window not open yet");
                return Ok(Vec::new());
            }
        };

        let mut times = Vec::new();
        for raw in envelope.data {
            if raw.spaces <= 0 || raw.booking.is_some() {
                continue;
            }
            let start = parse_clock(&raw.starts_at.format_24_hour)?;
            let end = parse_clock(&raw.ends_at.format_24_hour)?;
            times.push(ActivityTime { start, end });
        }

        Ok(times)
    }

    /// Add a slot to the account's cart.
    pub async fn add_to_cart(&self, slot: &Slot) -> Result<Cart, ProviderError> {
        let token = self.bearer().await?;

        let resp = self
            .http
            .post(self.url("activities/cart/add"))
            .bearer_auth(token)
            .json(&json!({
                "items": [{
                    "id": slot.id,
                    "type": slot.cart_type,
                    "pricing_option_id": slot.pricing_option_id,
                    "apply_benefit": true,
                    "activity_restriction_ids": slot.restriction_ids,
                }],
                "membership_user_id": null,
                "selected_user_id": null,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let message = resp
                .json::<ApiMessage>()
                .await
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| format!("status {status}"));
            warn!(slot_id = slot.id, reason = %message, "cart add rejected");
            return Err(ProviderError::CartRejected(message));
        }

        let envelope: CartEnvelope = resp.json().await?;
        let cart = Cart {
            id: envelope.data.id,
            total: envelope.data.total,
            source: envelope.data.source,
        };

        debug!(cart_id = cart.id, total = cart.total, "slot added to cart");
        Ok(cart)
    }

    /// Current cart with the fields credit checkout needs.
    pub async fn cart_summary(&self) -> Result<CartSummary, ProviderError> {
        let token = self.bearer().await?;

        let resp = self
            .http
            .get(self.url("activities/cart"))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;

        let envelope: CartSummaryEnvelope = resp.json().await?;
        Ok(envelope.data.into_summary())
    }

    /// Complete the checkout for a cart and return the confirmation id.
    ///
    /// Zero-total carts are covered by the account's benefit and
    /// complete with an empty payment list. Anything else is paid from
    /// the account's general credit: reserve the amount, then complete.
    pub async fn checkout(&self, cart: &Cart) -> Result<i64, ProviderError> {
        if cart.total == 0 {
            self.checkout_with_benefit(cart).await
        } else {
            self.checkout_with_credit().await
        }
    }

    async fn checkout_with_benefit(&self, cart: &Cart) -> Result<i64, ProviderError> {
        let token = self.bearer().await?;

        let resp = self
            .http
            .post(self.url("checkout/complete"))
            .bearer_auth(token)
            .json(&json!({
                "completed_waivers": [],
                "payments": [],
                "selected_user_id": null,
                "source": cart.source,
                "terms": [1],
            }))
            .send()
            .await?
            .error_for_status()?;

        let completed: CheckoutResponse = resp.json().await?;
        let order_id = completed
            .complete_order_id
            .ok_or(ProviderError::MissingConfirmation)?;

        info!(order_id, "checkout completed via benefit");
        Ok(order_id)
    }

    async fn checkout_with_credit(&self) -> Result<i64, ProviderError> {
        let summary = self.cart_summary().await?;

        if summary.general_credit_available < summary.total {
            return Err(ProviderError::InsufficientCredit {
                available: summary.general_credit_available,
                required: summary.total,
            });
        }

        self.apply_credit(summary.total, &summary.source).await?;

        let token = self.bearer().await?;
        let resp = self
            .http
            .post(self.url("checkout/complete"))
            .bearer_auth(token)
            .json(&json!({
                "completed_waivers": [],
                "payments": [{
                    "tender_type": "credit",
                    "amount": summary.total,
                    "info": {},
                }],
                "item_hash": summary.item_hash,
                "selected_user_id": null,
                "source": summary.source,
                "terms": [1],
            }))
            .send()
            .await?
            .error_for_status()?;

        let completed: CheckoutResponse = resp.json().await?;
        let order_id = completed
            .complete_order_id
            .ok_or(ProviderError::MissingConfirmation)?;

        info!(order_id, amount = summary.total, "checkout completed via credit");
        Ok(order_id)
    }

    /// Reserve general credit against the current cart before checkout.
    async fn apply_credit(&self, amount: i64, cart_source: &str) -> Result<(), ProviderError> {
        let token = self.bearer().await?;

        self.http
            .post(self.url("credits/apply"))
            .bearer_auth(token)
            .json(&json!({
                "credits_to_reserve": [{
                    "amount": amount,
                    "type": "general",
                }],
                "cart_source": cart_source,
                "selected_user_id": null,
            }))
            .send()
            .await?
            .error_for_status()?;

        debug!(amount, "credit reserved");
        Ok(())
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, ProviderError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ProviderError::InvalidResponse(format!("unparseable clock time {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawAction, RawLocation, RawSlot};

    fn raw_slot(spaces: i64, status: Option<&str>) -> RawSlot {
        RawSlot {
            id: 1,
            spaces,
            pricing_option_id: 9,
            restriction_ids: vec![],
            location: RawLocation {
                id: 5151,
                slug: "badminton-court-5".into(),
            },
            cart_type: "activity".into(),
            action_to_show: status.map(|s| RawAction {
                status: Some(s.into()),
            }),
        }
    }

    #[test]
    fn full_slots_are_not_bookable() {
        assert!(!raw_slot(0, Some("BOOK")).is_bookable());
    }

    #[test]
    fn non_book_actions_are_not_bookable() {
        assert!(!raw_slot(3, Some("FULL")).is_bookable());
        assert!(!raw_slot(3, None).is_bookable());
    }

    #[test]
    fn free_book_slots_are_bookable() {
        assert!(raw_slot(1, Some("BOOK")).is_bookable());
    }

    #[test]
    fn slots_envelope_tolerates_missing_optional_fields() {
        let body = r#"{
            "data": [{
                "id": 42,
                "spaces": 2,
                "pricing_option_id": 7,
                "location": {"id": 5154, "slug": "badminton-court-8"},
                "cart_type": "activity",
                "action_to_show": {"status": "BOOK"}
            }]
        }"#;
        let env: SlotsEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.data.len(), 1);
        let slot = env.data.into_iter().next().unwrap().into_slot();
        assert_eq!(slot.location_id, 5154);
        assert_eq!(slot.name, "badminton-court-8");
        assert!(slot.restriction_ids.is_empty());
    }

    #[test]
    fn parse_clock_accepts_24_hour_format() {
        assert_eq!(
            parse_clock("19:00").unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
        assert!(parse_clock("late").is_err());
    }
}
