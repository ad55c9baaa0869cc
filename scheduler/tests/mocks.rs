//! Store/provider doubles for the engine tests.

use std::collections::{HashMap, HashSet};
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
    /// Requests whose BOOKED write should fail, to exercise the
    /// booked-but-unrecorded path for a single row.
    pub fail_booked_for: Mutex<HashSet<RequestId>>,
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
        out.sort_by_key(|r| (r.target_date, r.target_start_time));
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
        if self.fail_booked_for.lock().await.contains(&id) {
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
        _request: &BookingRequest,
    ) -> anyhow::Result<Credentials> {
        Ok(Credentials {
            username: "user@example.com".into(),
            password: "hunter2".into(),
        })
    }
}

#[derive(Default)]
pub struct ProviderState {
    pub slots: std::sync::Mutex<Vec<Slot>>,
    pub list_calls: AtomicUsize,
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
        Ok(self.0.slots.lock().unwrap().clone())
    }

    async fn add_to_cart(&self, _slot: &Slot) -> Result<Cart, ProviderError> {
        Ok(Cart {
            id: 1,
            total: 0,
            source: "activity-booking".into(),
        })
    }

    async fn checkout(&self, _cart: &Cart) -> Result<i64, ProviderError> {
        self.0.checkout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(4242)
    }
}

pub struct MockConnector {
    pub state: Arc<ProviderState>,
}

impl MockConnector {
    pub fn new(state: Arc<ProviderState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn VenueProvider>, ProviderError> {
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
        search_start_date: target - chrono::Duration::days(30),
        search_window_start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        search_window_end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
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
