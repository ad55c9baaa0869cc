//! The run loop: one polling cycle over the schedulable request set.
//!
//! Per cycle it:
//!   1. Fetches candidate requests from the request store.
//!   2. Optionally blocks until the venue's release instant when some
//!      fetched request releases today (release-clock alignment).
//!   3. Classifies each request and dispatches it: book, expire, close
//!      or leave for a later cycle.
//!   4. After a successful booking, tries the back-to-back sibling
//!      request once (one hop, never recursive).
//!
//! Requests are processed sequentially; a failing request never aborts
//! the cycle for the others.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, warn};

use booking::types::BookingError;
use booking::{Booker, find_contiguous};
use common::TraceId;
use requests::{BookingRequest, RequestId, RequestStatus, RequestStore};

use crate::classify::{Action, classify};
use crate::types::{CycleReport, EngineConfig};

pub struct Engine {
    cfg: EngineConfig,
    store: Arc<dyn RequestStore>,
    booker: Booker,
}

impl Engine {
    pub fn new(cfg: EngineConfig, store: Arc<dyn RequestStore>, booker: Booker) -> Self {
        Self { cfg, store, booker }
    }

    /// Run one full cycle and report what happened.
    ///
    /// `Err` means the cycle itself could not run (the request fetch
    /// failed); per-request failures are counted in the report instead.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let trace_id = TraceId::default();
        let span = common::cycle_span(&trace_id);
        self.run_cycle_inner().instrument(span).await
    }

    async fn run_cycle_inner(&self) -> anyhow::Result<CycleReport> {
        let started = Instant::now();
        let requests = self.store.fetch_active_requests(self.cfg.fetch_limit).await?;
        info!(count = requests.len(), mode = ?self.cfg.mode, "cycle started");

        if self.cfg.align_to_release && !requests.is_empty() {
            self.wait_for_release(&requests).await;
        }

        let mut report = CycleReport::default();
        let mut handled: HashSet<RequestId> = HashSet::new();

        for request in &requests {
            if handled.contains(&request.id) {
                debug!(request_id = %request.id, "already dispatched via chaining this cycle");
                continue;
            }

            let now = Utc::now();
            let action = classify(request, now, &self.cfg.policy, self.cfg.mode);

            match action {
                Action::Skip => {
                    debug!(request_id = %request.id, "not time to act");
                    report.push(request.id, action, "not time to act");
                }
                Action::WaitRelease => {
                    info!(
                        request_id = %request.id,
                        target_date = %request.target_date,
                        "release instant not reached, leaving for a later cycle"
                    );
                    report.push(request.id, action, "release instant not reached");
                }
                Action::Expire => {
                    handled.insert(request.id);
                    self.finalize(
                        request,
                        RequestStatus::Expired,
                        "target date has passed",
                        &mut report,
                        action,
                    )
                    .await;
                }
                Action::Close => {
                    handled.insert(request.id);
                    self.finalize(
                        request,
                        RequestStatus::Closed,
                        "one day before play, search closed",
                        &mut report,
                        action,
                    )
                    .await;
                }
                Action::Process => {
                    handled.insert(request.id);
                    let booked = self.process(request, action, &mut report).await;
                    if booked {
                        self.chain_sibling(request, &requests, &mut handled, &mut report)
                            .await;
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            handled = report.actions.len(),
            failures = report.failures,
            "cycle finished"
        );
        Ok(report)
    }

    /// Block until the earliest release instant among requests whose
    /// release day is today.
    ///
    /// Coarse sleep down to `wait_lead` before the instant, then
    /// sub-second polling until it is reached or passed. Killing the
    /// process during this wait is safe: no store write has happened
    /// yet for any of these requests.
    async fn wait_for_release(&self, requests: &[BookingRequest]) {
        let policy = &self.cfg.policy;
        let now = policy.venue_now(Utc::now());
        let today = now.date();

        let next = requests
            .iter()
            .filter(|r| policy.release_date(r.target_date) == today)
            .map(|r| policy.release_instant(r.target_date))
            .filter(|instant| *instant > now)
            .min();

        let Some(release_at) = next else {
            return;
        };

        info!(release_at = %release_at, "aligning to release instant");

        loop {
            let now = policy.venue_now(Utc::now());
            if now >= release_at {
                break;
            }
            let remaining = (release_at - now).to_std().unwrap_or_default();
            let sleep_for = if remaining > self.cfg.wait_lead {
                remaining - self.cfg.wait_lead
            } else {
                self.cfg.fine_poll.min(remaining)
            };
            tokio::time::sleep(sleep_for).await;
        }

        info!("release instant reached");
    }

    /// Book one request and fold the result into the report. Returns
    /// whether the booking succeeded.
    async fn process(
        &self,
        request: &BookingRequest,
        action: Action,
        report: &mut CycleReport,
    ) -> bool {
        match self.booker.book_and_record(request).await {
            Ok(outcome) => {
                info!(
                    request_id = %request.id,
                    outcome = %outcome.message(),
                    "request processed"
                );
                let booked = outcome.is_booked();
                report.push(request.id, action, outcome.message());
                booked
            }
            Err(err @ BookingError::BookedButUnrecorded { .. }) => {
                // The reservation exists on the platform; operators
                // must reconcile the row by hand.
                error!(request_id = %request.id, error = %err, "booked but unrecorded");
                report.failures += 1;
                report.push(request.id, action, err.to_string());
                false
            }
            Err(err) => {
                error!(request_id = %request.id, error = %err, "request dispatch failed");
                report.failures += 1;
                report.push(request.id, action, err.to_string());
                false
            }
        }
    }

    /// Terminal transition for Expire/Close decisions.
    async fn finalize(
        &self,
        request: &BookingRequest,
        status: RequestStatus,
        message: &str,
        report: &mut CycleReport,
        action: Action,
    ) {
        info!(request_id = %request.id, status = %status, reason = message, "finalizing request");
        match self
            .store
            .record_attempt(request.id, Some(status), Some(message))
            .await
        {
            Ok(_) => report.push(request.id, action, message),
            Err(err) => {
                error!(request_id = %request.id, error = %err, "failed to finalize request");
                report.failures += 1;
                report.push(request.id, action, err.to_string());
            }
        }
    }

    /// After a booking, try the contiguous follow-on request once.
    async fn chain_sibling(
        &self,
        booked: &BookingRequest,
        all: &[BookingRequest],
        handled: &mut HashSet<RequestId>,
        report: &mut CycleReport,
    ) {
        let Some(sibling) = find_contiguous(booked, all) else {
            return;
        };
        if handled.contains(&sibling.id) {
            return;
        }

        info!(
            request_id = %sibling.id,
            after = %booked.id,
            start = %sibling.target_start_time,
            "chaining back-to-back sibling request"
        );

        // One attempt per cycle, whatever the outcome; the main loop
        // must not dispatch it a second time.
        handled.insert(sibling.id);

        match self.booker.book_and_record(sibling).await {
            Ok(outcome) => {
                info!(
                    request_id = %sibling.id,
                    outcome = %outcome.message(),
                    "sibling processed"
                );
                report.push(sibling.id, Action::Process, outcome.message());
            }
            Err(err) => {
                warn!(request_id = %sibling.id, error = %err, "sibling dispatch failed");
                report.failures += 1;
                report.push(sibling.id, Action::Process, err.to_string());
            }
        }
    }
}
