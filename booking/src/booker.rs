//! The booking orchestrator.
//!
//! Drives one request through the provider: resolve credentials,
//! connect, list slots, select, cart, checkout. Every call persists its
//! outcome (attempt counter, last-run stamp, status, message) through
//! the request store before returning.
//!
//! Retry policy: checkout failures get exactly one retry of the full
//! attempt (list onward), because they usually mean another customer
//! grabbed the same slot between listing and paying. Listing and
//! selection failures reflect a stable absence of inventory and are not
//! retried.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use requests::{BookingRequest, RequestStore};

use crate::select::select_slot;
use crate::types::{BookingError, Outcome, ProviderConnector, Stage, VenueProvider};

pub struct Booker {
    store: Arc<dyn RequestStore>,
    connector: Arc<dyn ProviderConnector>,
}

impl Booker {
    pub fn new(store: Arc<dyn RequestStore>, connector: Arc<dyn ProviderConnector>) -> Self {
        Self { store, connector }
    }

    /// Run one booking attempt and persist its outcome.
    ///
    /// `Err` means the attempt resolved but the store write did not;
    /// the `BookedButUnrecorded` variant flags reservations that exist
    /// on the platform without a matching row update.
    #[instrument(skip(self, request), fields(request_id = %request.id, venue = %request.venue_slug))]
    pub async fn book_and_record(
        &self,
        request: &BookingRequest,
    ) -> Result<Outcome, BookingError> {
        let outcome = self.book(request).await;
        self.record(request, &outcome).await?;
        Ok(outcome)
    }

    async fn book(&self, request: &BookingRequest) -> Outcome {
        let credentials = match self.store.resolve_credentials(request).await {
            Ok(credentials) => credentials,
            Err(err) => {
                return Outcome::Provider {
                    stage: Stage::Credentials,
                    detail: err.to_string(),
                };
            }
        };

        let provider = match self.connector.connect(&credentials).await {
            Ok(provider) => provider,
            Err(err) => {
                return Outcome::Provider {
                    stage: Stage::Credentials,
                    detail: err.to_string(),
                };
            }
        };

        let first = self.attempt(provider.as_ref(), request).await;
        match &first {
            Outcome::Provider {
                stage: Stage::Checkout,
                detail,
            } => {
                // The slot may have been contended; the listing is
                // re-fetched so the retry can land on another court.
                warn!(%detail, "checkout failed, retrying the full attempt once");
                self.attempt(provider.as_ref(), request).await
            }
            _ => first,
        }
    }

    async fn attempt(&self, provider: &dyn VenueProvider, request: &BookingRequest) -> Outcome {
        let slots = match provider
            .list_slots(
                &request.venue_slug,
                &request.activity_slug,
                request.target_date,
                request.target_start_time,
                request.target_end_time,
            )
            .await
        {
            Ok(slots) => slots,
            Err(err) => {
                return Outcome::Provider {
                    stage: Stage::Listing,
                    detail: err.to_string(),
                };
            }
        };

        if slots.is_empty() {
            return Outcome::NoSlots;
        }

        let Some((slot, label)) = select_slot(request, &slots) else {
            return Outcome::SelectionFailed;
        };

        info!(slot_id = slot.id, court = %label, "slot selected");

        let cart = match provider.add_to_cart(slot).await {
            Ok(cart) => cart,
            Err(err) => {
                return Outcome::Provider {
                    stage: Stage::Cart,
                    detail: err.to_string(),
                };
            }
        };

        match provider.checkout(&cart).await {
            Ok(confirmation) => Outcome::Booked {
                confirmation,
                label,
            },
            Err(err) => Outcome::Provider {
                stage: Stage::Checkout,
                detail: err.to_string(),
            },
        }
    }

    async fn record(
        &self,
        request: &BookingRequest,
        outcome: &Outcome,
    ) -> Result<(), BookingError> {
        match outcome {
            Outcome::Booked {
                confirmation,
                label,
            } => {
                self.store
                    .record_booked(
                        request.id,
                        label,
                        request.target_start_time,
                        request.target_end_time,
                        Some(&outcome.message()),
                    )
                    .await
                    .map_err(|source| BookingError::BookedButUnrecorded {
                        confirmation: *confirmation,
                        label: label.clone(),
                        source,
                    })?;
                info!(confirmation, court = %label, "booking recorded");
            }
            other => {
                self.store
                    .record_attempt(request.id, Some(other.status()), Some(&other.message()))
                    .await
                    .map_err(BookingError::Store)?;
            }
        }
        Ok(())
    }
}
