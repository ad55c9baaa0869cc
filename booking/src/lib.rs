pub mod booker;
pub mod chain;
pub mod live;
pub mod select;
pub mod types;

pub use booker::Booker;
pub use chain::find_contiguous;
pub use live::HttpConnector;
pub use select::select_slot;
pub use types::{BookingError, Outcome, ProviderConnector, Stage, VenueProvider};
