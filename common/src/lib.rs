pub mod logger;

pub use logger::init::init_logger;
pub use logger::macros::{child_span, cycle_span};
pub use logger::trace_id::TraceId;
