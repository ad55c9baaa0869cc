//! Live wiring of the venue platform client behind the orchestrator's
//! trait seams.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use provider::{Cart, ProviderError, Slot, VenueClient};
use requests::Credentials;

use crate::types::{ProviderConnector, VenueProvider};

#[async_trait]
impl VenueProvider for VenueClient {
    async fn list_slots(
        &self,
        venue: &str,
        activity: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Vec<Slot>, ProviderError> {
        VenueClient::list_slots(self, venue, activity, date, start, end).await
    }

    async fn add_to_cart(&self, slot: &Slot) -> Result<Cart, ProviderError> {
        VenueClient::add_to_cart(self, slot).await
    }

    async fn checkout(&self, cart: &Cart) -> Result<i64, ProviderError> {
        VenueClient::checkout(self, cart).await
    }
}

/// Builds one authenticated `VenueClient` per booking account.
pub struct HttpConnector {
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderConnector for HttpConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn VenueProvider>, ProviderError> {
        let client = VenueClient::new(
            self.base_url.as_str(),
            credentials.username.as_str(),
            credentials.password.as_str(),
        )?;
        Ok(Box::new(client))
    }
}
