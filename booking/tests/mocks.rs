//! Hand-rolled store/provider doubles shared by the orchestrator tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;

use booking::types::{ProviderConnector, VenueProvider};
use provider::{Cart, ProviderError, Slot};
use requests::{BookingRequest, Credentials, RequestId, RequestStatus, RequestStore};

#[derive(Default)]
pub struct MockStore {
    pub rows: Mutex<HashMap<RequestId, BookingRequest>>,
    pub missing_credentials: bool,
    pub fail_booked_write: bool,
}

impl MockStore {
    pub async fn insert(&self, request: BookingRequest) {
        self.rows.lock().await.insert(request.id, request);
    }

    pub async fn row(&self, id: RequestId) -> BookingRequest {
        self.rows
            .lock()
            .await
            .get(&id)
            .cloned()
            .expect("request row should exist")
    }
}

#[async_trait]
impl RequestStore for MockStore {
    async fn fetch_active_requests(&self, limit: usize) -> anyhow::Result<Vec<BookingRequest>> {
        let rows = self.rows.lock().await;
        let mut out: Vec<BookingRequest> = rows
            .values()
            .filter(|r| r.is_schedulable())
            .cloned()
            .collect();
        out.sort_by_key(|r| r.target_date);
        out.truncate(limit);
        Ok(out)
    }

    async fn record_attempt(
        &self,
        id: RequestId,
        new_status: Option<RequestStatus>,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no booking request with id={id}"))?;

        row.attempt_count += 1;
        row.last_run_at = Some(Utc::now());
        if let Some(status) = new_status {
            row.status = status;
            if status.is_terminal() {
                row.is_active = false;
            }
        }
        if let Some(message) = message {
            row.last_error = Some(message.to_string());
        }

        Ok(row.clone())
    }

    async fn record_booked(
        &self,
        id: RequestId,
        court_name: &str,
        slot_start: NaiveTime,
        slot_end: NaiveTime,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest> {
        if self.fail_booked_write {
            anyhow::bail!("store unavailable");
        }

        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no booking request with id={id}"))?;

        row.status = RequestStatus::Booked;
        row.is_active = false;
        row.booked_court_name = Some(court_name.to_string());
        row.booked_slot_start = Some(slot_start);
        row.booked_slot_end = Some(slot_end);
        row.attempt_count += 1;
        row.last_run_at = Some(Utc::now());
        if let Some(message) = message {
            row.last_error = Some(message.to_string());
        }

        Ok(row.clone())
    }

    async fn resolve_credentials(
        &self,
        request: &BookingRequest,
    ) -> anyhow::Result<Credentials> {
        if self.missing_credentials {
            anyhow::bail!("booking account {} has no env keys", request.account_id);
        }
        Ok(Credentials {
            username: "user@example.com".into(),
            password: "hunter2".into(),
        })
    }
}

/// Shared provider state so tests can assert call counts after the
/// connector has handed out per-account sessions.
#[derive(Default)]
pub struct ProviderState {
    pub slots: std::sync::Mutex<Vec<Slot>>,
    pub fail_listing: bool,
    pub fail_cart: bool,
    /// Number of leading checkout calls that should fail.
    pub checkout_failures: AtomicUsize,

    pub list_calls: AtomicUsize,
    pub cart_calls: AtomicUsize,
    pub checkout_calls: AtomicUsize,
}

pub struct MockProvider(pub Arc<ProviderState>);

#[async_trait]
impl VenueProvider for MockProvider {
    async fn list_slots(
        &self,
        _venue: &str,
        _activity: &str,
        _date: NaiveDate,
        _start: NaiveTime,
        _end: NaiveTime,
    ) -> Result<Vec<Slot>, ProviderError> {
        self.0.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_listing {
            return Err(ProviderError::InvalidResponse("listing unavailable".into()));
        }
        Ok(self.0.slots.lock().unwrap().clone())
    }

    async fn add_to_cart(&self, _slot: &Slot) -> Result<Cart, ProviderError> {
        self.0.cart_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_cart {
            return Err(ProviderError::CartRejected("slot already taken".into()));
        }
        Ok(Cart {
            id: 1,
            total: 0,
            source: "activity-booking".into(),
        })
    }

    async fn checkout(&self, _cart: &Cart) -> Result<i64, ProviderError> {
        self.0.checkout_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.0.checkout_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.0.checkout_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::MissingConfirmation);
        }
        Ok(4242)
    }
}

pub struct MockConnector {
    pub state: Arc<ProviderState>,
    pub fail_connect: bool,
}

impl MockConnector {
    pub fn new(state: Arc<ProviderState>) -> Self {
        Self {
            state,
            fail_connect: false,
        }
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn VenueProvider>, ProviderError> {
        if self.fail_connect {
            return Err(ProviderError::Auth("login failed with status 401".into()));
        }
        Ok(Box::new(MockProvider(Arc::clone(&self.state))))
    }
}

pub fn mk_request(target: NaiveDate, start_h: u32, end_h: u32) -> BookingRequest {
    BookingRequest {
        id: uuid::Uuid::new_v4(),
        account_id: uuid::Uuid::nil(),
        venue_slug: "walthamstow-leisure-centre".into(),
        activity_slug: "badminton-40min".into(),
        target_date: target,
        target_start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
        target_end_time: NaiveTime::from_hms_opt(end_h, 0, 0).unwrap(),
        search_start_date: target - chrono::Duration::days(14),
        search_window_start_time: NaiveTime::from_hms_opt(21, 55, 0).unwrap(),
        search_window_end_time: NaiveTime::from_hms_opt(22, 30, 0).unwrap(),
        preferred_court_name_1: None,
        preferred_court_name_2: None,
        preferred_court_name_3: None,
        status: RequestStatus::Searching,
        is_active: true,
        attempt_count: 0,
        last_run_at: None,
        last_error: None,
        booked_court_name: None,
        booked_slot_start: None,
        booked_slot_end: None,
    }
}

pub fn mk_slot(id: i64, name: &str) -> Slot {
    Slot {
        id,
        location_id: id,
        pricing_option_id: 1,
        restriction_ids: vec![],
        name: name.into(),
        cart_type: "activity".into(),
    }
}
