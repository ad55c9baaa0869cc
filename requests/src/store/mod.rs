pub mod rest_store;

use chrono::NaiveTime;

use crate::model::{BookingRequest, Credentials, RequestId, RequestStatus};

/// Gateway to the externally-owned request database.
///
/// All durable request state lives behind this trait; the scheduler and
/// orchestrator only hold transient copies per cycle and write changes
/// back through explicit read-modify-write calls.
#[async_trait::async_trait]
pub trait RequestStore: Send + Sync {
    /// Active, schedulable requests whose date range covers today,
    /// ordered by target date ascending.
    async fn fetch_active_requests(&self, limit: usize) -> anyhow::Result<Vec<BookingRequest>>;

    /// Bump the attempt counter and last-run stamp, optionally moving
    /// the request to a new status and recording a result message.
    /// Returns the updated row; errors if the row does not exist.
    async fn record_attempt(
        &self,
        id: RequestId,
        new_status: Option<RequestStatus>,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest>;

    /// Terminal success: status BOOKED, active flag cleared, booked
    /// court and times recorded, attempt counter bumped.
    async fn record_booked(
        &self,
        id: RequestId,
        court_name: &str,
        slot_start: NaiveTime,
        slot_end: NaiveTime,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest>;

    /// Resolve the username/password pair for the request's account.
    async fn resolve_credentials(&self, request: &BookingRequest) -> anyhow::Result<Credentials>;
}
