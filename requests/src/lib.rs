pub mod model;
pub mod store;

pub use model::{BookingRequest, Credentials, RequestId, RequestStatus};
pub use store::RequestStore;
pub use store::rest_store::RestRequestStore;
