//! RestRequestStore
//! ----------------
//! `RequestStore` implementation against the hosted Postgres-over-REST
//! request database. Responsibilities:
//!
//!  - server-side filtering of the schedulable request set
//!  - read-modify-write attempt bookkeeping
//!  - terminal BOOKED transitions with the booked-* fields
//!  - account -> env-key -> secret credential indirection
//!
//! Reads retry transparently on transient (5xx) failures a small
//! bounded number of times before surfacing an error.

use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::RequestStore;
use crate::model::{BookingRequest, Credentials, RequestId, RequestStatus};

const REQUESTS_TABLE: &str = "court_booking_requests";
const ACCOUNTS_TABLE: &str = "booking_accounts";
const MAX_FETCH_ATTEMPTS: u32 = 3;

pub struct RestRequestStore {
    http: Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct BookingAccountRow {
    #[serde(default)]
    env_username_key: Option<String>,
    #[serde(default)]
    env_password_key: Option<String>,
}

impl RestRequestStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building request store http client")?;

        let base_url = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn fetch_once(&self, limit: usize) -> Result<Vec<BookingRequest>, reqwest::Error> {
        let today = Utc::now().date_naive().to_string();
        let statuses = format!(
            "in.({},{},{},{})",
            RequestStatus::Pending,
            RequestStatus::Searching,
            RequestStatus::Created,
            RequestStatus::Queued
        );

        self.request(Method::GET, REQUESTS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("is_active", "eq.true".to_string()),
                ("status", statuses),
                ("target_date", format!("gte.{today}")),
                ("search_start_date", format!("lte.{today}")),
                ("order", "target_date.asc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn fetch_row(&self, id: RequestId) -> anyhow::Result<BookingRequest> {
        let id_filter = format!("eq.{id}");
        let rows: Vec<BookingRequest> = self
            .request(Method::GET, REQUESTS_TABLE)
            .query(&[("select", "*"), ("id", id_filter.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding booking request row")?;

        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("no booking request with id={id}"))
    }

    async fn patch_row(
        &self,
        id: RequestId,
        payload: serde_json::Value,
    ) -> anyhow::Result<BookingRequest> {
        let rows: Vec<BookingRequest> = self
            .request(Method::PATCH, REQUESTS_TABLE)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding patched booking request row")?;

        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("update returned no rows for id={id}"))
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.status().is_some_and(|s| s.is_server_error())
}

#[async_trait]
impl RequestStore for RestRequestStore {
    async fn fetch_active_requests(&self, limit: usize) -> anyhow::Result<Vec<BookingRequest>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(limit).await {
                Ok(rows) => {
                    debug!(count = rows.len(), "active booking requests fetched");
                    return Ok(rows);
                }
                Err(err) if attempt < MAX_FETCH_ATTEMPTS && is_transient(&err) => {
                    // Linear backoff, matches the store's own rate advice.
                    let backoff = Duration::from_millis(800 * u64::from(attempt));
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient store failure, retrying fetch"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    return Err(err).context("fetching active booking requests");
                }
            }
        }
    }

    async fn record_attempt(
        &self,
        id: RequestId,
        new_status: Option<RequestStatus>,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest> {
        let current = self.fetch_row(id).await?;

        let mut payload = json!({
            "last_run_at": Utc::now().to_rfc3339(),
            "attempt_count": current.attempt_count + 1,
        });
        if let Some(status) = new_status {
            payload["status"] = json!(status.to_string());
            if status.is_terminal() {
                payload["is_active"] = json!(false);
            }
        }
        if let Some(message) = message {
            payload["last_error"] = json!(message);
        }

        self.patch_row(id, payload)
            .await
            .with_context(|| format!("recording attempt for request {id}"))
    }

    async fn record_booked(
        &self,
        id: RequestId,
        court_name: &str,
        slot_start: NaiveTime,
        slot_end: NaiveTime,
        message: Option<&str>,
    ) -> anyhow::Result<BookingRequest> {
        let current = self.fetch_row(id).await?;

        let mut payload = json!({
            "status": RequestStatus::Booked.to_string(),
            "is_active": false,
            "booked_court_name": court_name,
            "booked_slot_start": slot_start.format("%H:%M:%S").to_string(),
            "booked_slot_end": slot_end.format("%H:%M:%S").to_string(),
            "attempt_count": current.attempt_count + 1,
            "last_run_at": Utc::now().to_rfc3339(),
        });
        if let Some(message) = message {
            payload["last_error"] = json!(message);
        }

        self.patch_row(id, payload)
            .await
            .with_context(|| format!("recording booked state for request {id}"))
    }

    async fn resolve_credentials(&self, request: &BookingRequest) -> anyhow::Result<Credentials> {
        let rows: Vec<BookingAccountRow> = self
            .request(Method::GET, ACCOUNTS_TABLE)
            .query(&[
                ("select", "env_username_key,env_password_key".to_string()),
                ("id", format!("eq.{}", request.account_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding booking account row")?;

        let account = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("booking account not found: {}", request.account_id))?;

        let (Some(user_key), Some(pass_key)) =
            (account.env_username_key, account.env_password_key)
        else {
            bail!("booking account {} has no env keys", request.account_id);
        };

        let username = std::env::var(&user_key)
            .with_context(|| format!("secret {user_key} is not set"))?;
        let password = std::env::var(&pass_key)
            .with_context(|| format!("secret {pass_key} is not set"))?;

        Ok(Credentials { username, password })
    }
}
