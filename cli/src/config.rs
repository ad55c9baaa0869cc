use anyhow::Context;
use chrono::{FixedOffset, NaiveTime};

use scheduler::ReleasePolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Request database root URL.
    pub store_url: String,

    /// Service-role key for the request database.
    pub store_service_key: String,

    /// Venue platform API root.
    pub provider_base_url: String,

    // =========================
    // Release policy
    // =========================
    /// How many days before play the venue releases a date's inventory.
    pub release_days_ahead: i64,

    /// Venue-local clock time of the release.
    pub release_time: NaiveTime,

    /// Venue's UTC offset in minutes. The classifier reasons in the
    /// venue's civil time, never the host timezone.
    pub venue_utc_offset_minutes: i32,

    // =========================
    // Scheduler configuration
    // =========================
    /// Maximum number of requests fetched per cycle.
    pub fetch_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_url = std::env::var("STORE_URL").context("STORE_URL is not set")?;
        let store_service_key =
            std::env::var("STORE_SERVICE_KEY").context("STORE_SERVICE_KEY is not set")?;

        let provider_base_url = std::env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://better-admin.org.uk/api".to_string());

        let release_days_ahead = env_or_parse("RELEASE_DAYS_AHEAD", 7)?;

        let release_time = match std::env::var("RELEASE_TIME") {
            Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M:%S")
                .with_context(|| format!("RELEASE_TIME {raw:?} is not HH:MM:SS"))?,
            Err(_) => NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        };

        let venue_utc_offset_minutes = env_or_parse("VENUE_UTC_OFFSET_MINUTES", 0)?;
        let fetch_limit = env_or_parse("FETCH_LIMIT", 50)?;

        Ok(Self {
            store_url,
            store_service_key,
            provider_base_url,
            release_days_ahead,
            release_time,
            venue_utc_offset_minutes,
            fetch_limit,
        })
    }

    pub fn release_policy(&self) -> anyhow::Result<ReleasePolicy> {
        let venue_offset = FixedOffset::east_opt(self.venue_utc_offset_minutes * 60)
            .with_context(|| {
                format!(
                    "VENUE_UTC_OFFSET_MINUTES {} is out of range",
                    self.venue_utc_offset_minutes
                )
            })?;

        Ok(ReleasePolicy {
            days_ahead: self.release_days_ahead,
            release_time: self.release_time,
            venue_offset,
        })
    }
}

fn env_or_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} {raw:?} could not be parsed")),
        Err(_) => Ok(default),
    }
}
