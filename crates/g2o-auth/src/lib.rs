//! Akamai Ghost-to-Origin (G2O) request authentication.
//!
//! An edge server that forwards a request to the origin attaches two headers:
//!
//! - `X-Akamai-G2O-Auth-Data`: `version, edge-ip, client-ip, time, unique-id, nonce`
//! - `X-Akamai-G2O-Auth-Sign`: a base64 signature over the data header and
//!   the request path, keyed by the secret shared for `nonce`.
//!
//! This crate implements the origin side: it parses the data header, resolves
//! the secret, checks the timestamp and recomputes the signature with the
//! algorithm selected by the header version.
//!
//! # Usage
//!
//! ```rust
//! use g2o_auth::Validator;
//!
//! let validator = Validator::from_secrets_str("v1:s3cr3tk3y,v2:n3wk3y")
//!     .unwrap()
//!     .with_time_window(0);
//!
//! let outcome = validator.validate(
//!     "/abc",
//!     "3, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1",
//!     "D2+ASTlqs3WfCC5EBIhtjA==",
//! );
//! assert!(outcome.is_authenticated());
//! ```
//!
//! # Modules
//!
//! - [`config`] - Validator configuration loaded from the environment
//! - [`error`] - Authentication error types
//! - [`header`] - Data header parsing
//! - [`headers`] - Wire header names and HTTP request extraction
//! - [`outcome`] - Verification result value
//! - [`replay`] - Replay guard trait and in-memory TTL cache
//! - [`secrets`] - Nonce/secret table and lookup trait
//! - [`signer`] - The five versioned signing algorithms
//! - [`validator`] - End-to-end request validation

pub mod config;
pub mod error;
pub mod header;
pub mod headers;
pub mod outcome;
pub mod replay;
pub mod secrets;
pub mod signer;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{G2oError, G2oResult};
pub use header::{AuthData, SignedAuthData};
pub use headers::{AUTH_DATA_HEADER, AUTH_SIGN_HEADER};
pub use outcome::VerificationOutcome;
pub use replay::{InMemoryReplayCache, NoReplayCheck, ReplayGuard};
pub use secrets::{NonceSecretTable, SecretProvider};
pub use signer::{SignatureVersion, sign};
pub use validator::Validator;
