pub mod client;
pub mod errors;
pub mod types;

pub use client::VenueClient;
pub use errors::ProviderError;
pub use types::{ActivityTime, Cart, CartSummary, Slot};
