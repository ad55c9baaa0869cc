use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("cart rejected: {0}")]
    CartRejected(String),

    #[error("insufficient credit: available={available}, required={required}")]
    InsufficientCredit { available: i64, required: i64 },

    #[error("checkout completed without a confirmation id")]
    MissingConfirmation,

    #[error("invalid response from venue platform: {0}")]
    InvalidResponse(String),
}
