use tracing::{Level, Span};

use super::trace_id::TraceId;

/// Create the root span for one scheduler cycle.
pub fn cycle_span(trace_id: &TraceId) -> Span {
    tracing::span!(
        Level::INFO,
        "cycle",
        trace_id = %trace_id
    )
}

/// Create a child span (inherits trace_id automatically)
pub fn child_span(name: &'static str) -> Span {
    tracing::span!(Level::INFO, "step", step = name)
}
