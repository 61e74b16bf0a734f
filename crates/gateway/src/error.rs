use thiserror::Error;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Provider credentials are absent. A configuration issue, reported to
    /// buyers as "payment unavailable" rather than as their fault.
    #[error("Payment provider credentials are not configured")]
    MissingCredentials,

    /// The push target is not a valid mobile number for the supported region.
    #[error("Use a valid mobile number, e.g. 0712345678 or 254712345678")]
    InvalidPhone,

    /// The provider could not be reached at the transport level.
    #[error("Payment provider unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The provider answered with a business-level rejection.
    #[error("Payment provider rejected the request: {detail}")]
    Rejected { detail: String },
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
