use thiserror::Error;

/// Reasons a compact token fails verification.
///
/// `Malformed` covers bad input shape; every other variant is an
/// authentication failure. The authorizer maps all of them to the same Deny.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

/// Errors resolving the signing secret through the cache.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret identifier not configured: {0}")]
    NotConfigured(String),

    #[error("no CURRENT value for secret '{0}'")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Reason an authorization attempt was denied. Logged, never returned to
/// the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Errors talking to a downstream credential consumer.
#[derive(Debug, Error)]
pub enum CredentialSyncError {
    #[error("credential consumer unreachable: {0}")]
    Unreachable(String),

    #[error("credential consumer rejected update: status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("credential consumer reported failure: {0}")]
    Failed(String),
}

/// Errors aborting a rotation attempt.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("secret identifier not configured: {0}")]
    NotConfigured(String),

    #[error("unknown rotation step: {0}")]
    UnknownStep(String),

    #[error("no PENDING version for secret '{secret_id}'")]
    MissingPendingSecret { secret_id: String },

    #[error("credential consumer error: {0}")]
    Consumer(#[from] CredentialSyncError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Errors from repository operations (used by trait definitions in relaygate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
