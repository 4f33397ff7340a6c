//! Error types for G2O authentication.
//!
//! Every failure encountered while validating a request is represented by
//! [`G2oError`]. The `Display` text of each variant doubles as the failure
//! reason reported in a [`VerificationOutcome`](crate::VerificationOutcome).

/// Errors that can occur while configuring a validator or verifying a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum G2oError {
    /// The `X-Akamai-G2O-Auth-Sign` value is missing or empty.
    #[error("No signature header present")]
    MissingSignature,

    /// The `X-Akamai-G2O-Auth-Data` value is missing or empty.
    #[error("No data header present")]
    MissingDataHeader,

    /// The data header does not have six fields, or a numeric field is invalid.
    #[error("Bad header format")]
    MalformedHeader,

    /// The nonce is not present in the secret table, or maps to an empty secret.
    #[error("Invalid secret")]
    UnknownSecret,

    /// The replay guard has already seen this request.
    #[error("Signature already used")]
    ReplayDetected,

    /// The header timestamp is outside the configured time window.
    #[error("Signature expired")]
    Expired,

    /// The header names a signing version other than 1 through 5.
    #[error("Unknown version")]
    UnknownVersion(i32),

    /// The computed signature does not match the presented one.
    #[error("Invalid signature")]
    SignatureMismatch,

    /// The validator could not be constructed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience result type for G2O operations.
pub type G2oResult<T> = Result<T, G2oError>;
