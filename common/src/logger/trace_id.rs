use std::fmt;

use uuid::Uuid;

/// Correlation ID that follows one scheduler cycle end to end.
#[derive(Clone, Debug)]
pub struct TraceId(Uuid);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}
