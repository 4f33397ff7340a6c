//! End-to-end G2O request validation.
//!
//! [`Validator`] runs the checks below in order and stops at the first one
//! that fails:
//!
//! 1. A signature was presented.
//! 2. A data header was presented.
//! 3. The data header parses.
//! 4. The header's nonce resolves to a non-empty secret.
//! 5. The replay guard has not seen the signature.
//! 6. The header time is inside the time window (skipped when the window is 0).
//! 7. The header version names a known algorithm.
//! 8. The recomputed signature equals the presented one.
//!
//! A signature is recorded with the replay guard only after step 8 passes.

use std::sync::Arc;
use std::time::Duration;

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::{DEFAULT_TIME_WINDOW, ValidatorConfig};
use crate::error::G2oError;
use crate::header::AuthData;
use crate::headers;
use crate::outcome::VerificationOutcome;
use crate::replay::{InMemoryReplayCache, NoReplayCheck, ReplayGuard};
use crate::secrets::{NonceSecretTable, SecretProvider};
use crate::signer;

/// Validates G2O-signed requests against a fixed set of nonce secrets.
///
/// A `Validator` is immutable once built and can be shared between threads
/// behind an `Arc`.
///
/// # Examples
///
/// ```
/// use g2o_auth::Validator;
///
/// let validator = Validator::from_secrets_str("v1:s3cr3tk3y")
///     .unwrap()
///     .with_time_window(0);
///
/// let outcome = validator.validate(
///     "/abc",
///     "5, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1",
///     "d/8DhQppXfD8WvbEP5TU3UVrPxgifX4LumVfadVPxgk=",
/// );
/// assert!(outcome.is_authenticated());
/// assert_eq!(outcome.reason(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    secrets: Arc<dyn SecretProvider>,
    replay_guard: Arc<dyn ReplayGuard>,
    time_window: i64,
}

impl Validator {
    /// Create a validator with the default time window and no replay check.
    #[must_use]
    pub fn new(secrets: NonceSecretTable) -> Self {
        Self::with_provider(Arc::new(secrets))
    }

    /// Create a validator backed by a custom secret provider.
    #[must_use]
    pub fn with_provider(secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            secrets,
            replay_guard: Arc::new(NoReplayCheck),
            time_window: DEFAULT_TIME_WINDOW,
        }
    }

    /// Create a validator from `"key1:secret1,key2:secret2"`.
    ///
    /// # Errors
    ///
    /// Returns [`G2oError::Configuration`] if no valid pair is found.
    pub fn from_secrets_str(encoded: &str) -> Result<Self, G2oError> {
        NonceSecretTable::parse(encoded).map(Self::new)
    }

    /// Create a validator from a [`ValidatorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`G2oError::Configuration`] if the configuration holds no
    /// valid nonce/secret pair.
    pub fn from_config(config: &ValidatorConfig) -> Result<Self, G2oError> {
        let mut validator =
            Self::from_secrets_str(&config.nonce_secrets)?.with_time_window(config.time_window);
        if config.replay_ttl_secs > 0 {
            validator = validator.with_replay_guard(Arc::new(InMemoryReplayCache::new(
                Duration::from_secs(config.replay_ttl_secs),
                config.replay_capacity,
            )));
        }
        Ok(validator)
    }

    /// Set the time window. It is multiplied by 1000 and compared against
    /// the skew in milliseconds. `0` disables the check; negative values are
    /// clamped to `0`.
    #[must_use]
    pub fn with_time_window(mut self, time_window: i64) -> Self {
        self.time_window = time_window.max(0);
        self
    }

    /// Install a replay guard.
    #[must_use]
    pub fn with_replay_guard(mut self, replay_guard: Arc<dyn ReplayGuard>) -> Self {
        self.replay_guard = replay_guard;
        self
    }

    /// The configured time window.
    #[must_use]
    pub fn time_window(&self) -> i64 {
        self.time_window
    }

    /// Validate a request against the current wall clock.
    #[must_use]
    pub fn validate(&self, path: &str, data_header: &str, signature: &str) -> VerificationOutcome {
        self.validate_at(path, data_header, signature, now_millis())
    }

    /// Validate a request as if the current time were `now_millis`.
    #[must_use]
    pub fn validate_at(
        &self,
        path: &str,
        data_header: &str,
        signature: &str,
        now_millis: i64,
    ) -> VerificationOutcome {
        match self.verify(path, data_header, signature, now_millis) {
            Ok(_) => VerificationOutcome::verified(),
            Err(err) => VerificationOutcome::failed(err.to_string()),
        }
    }

    /// Validate the G2O headers of an HTTP request, using its path and query
    /// as the sign-string. Missing headers are treated as empty.
    #[must_use]
    pub fn validate_request(&self, parts: &http::request::Parts) -> VerificationOutcome {
        let found = headers::extract(parts);
        self.validate(found.sign_string, found.data, found.signature)
    }

    /// Run every check and return the parsed header on success.
    ///
    /// # Errors
    ///
    /// Returns the [`G2oError`] for the first check that fails.
    pub fn verify(
        &self,
        path: &str,
        data_header: &str,
        signature: &str,
        now_millis: i64,
    ) -> Result<AuthData, G2oError> {
        if signature.is_empty() {
            return Err(G2oError::MissingSignature);
        }
        if data_header.is_empty() {
            return Err(G2oError::MissingDataHeader);
        }

        let data = AuthData::parse(path, data_header)?;

        let secret = self
            .secrets
            .secret_for(data.nonce())
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                debug!(nonce = %data.nonce(), "No secret configured for G2O nonce");
                G2oError::UnknownSecret
            })?;

        if self.replay_guard.is_seen(signature, now_millis) {
            debug!(unique_id = %data.unique_id(), "G2O signature replayed");
            return Err(G2oError::ReplayDetected);
        }

        self.check_expiry(&data, now_millis)?;

        debug!(
            version = data.version(),
            nonce = %data.nonce(),
            edge_ip = %data.edge_ip(),
            client_ip = %data.client_ip(),
            "Verifying G2O signature"
        );

        let signed = data.with_secret(secret);
        let expected = signer::sign(&signed)?;

        if !bool::from(signature.as_bytes().ct_eq(expected.as_bytes())) {
            debug!(
                expected = %expected,
                provided = %signature,
                "G2O signature mismatch"
            );
            return Err(G2oError::SignatureMismatch);
        }

        // Only verified signatures are remembered; a concurrent duplicate
        // that passed the earlier check loses here.
        if self.replay_guard.record(signature, now_millis) {
            debug!(unique_id = %signed.data().unique_id(), "G2O signature replayed");
            return Err(G2oError::ReplayDetected);
        }

        debug!(nonce = %signed.data().nonce(), "G2O verification succeeded");
        Ok(signed.into_data())
    }

    fn check_expiry(&self, data: &AuthData, now_millis: i64) -> Result<(), G2oError> {
        if self.time_window == 0 {
            return Ok(());
        }
        let skew = now_millis.abs_diff(data.timestamp_millis());
        let allowed = self.time_window.unsigned_abs().saturating_mul(1000);
        if skew > allowed {
            debug!(skew_millis = skew, allowed, "G2O signature expired");
            return Err(G2oError::Expired);
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3tk3y";
    const HEADER: &str = "5, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1";
    const PATH: &str = "/abc";
    const SIGNATURE: &str = "d/8DhQppXfD8WvbEP5TU3UVrPxgifX4LumVfadVPxgk=";
    const HEADER_MILLIS: i64 = 1_471_524_574_000;

    fn validator() -> Validator {
        Validator::from_secrets_str(&format!("v1:{SECRET},nonce1:Others3cr3t"))
            .unwrap()
            .with_time_window(0)
    }

    #[test]
    fn test_should_authenticate_matching_request() {
        let outcome = validator().validate(PATH, HEADER, SIGNATURE);
        assert!(outcome.is_authenticated(), "{:?}", outcome.reason());
        assert_eq!(outcome.reason(), None);
    }

    #[test]
    fn test_should_return_parsed_data_on_success() {
        let data = validator().verify(PATH, HEADER, SIGNATURE, 0).unwrap();
        assert_eq!(data.unique_id(), "2805760.691583751");
    }

    #[test]
    fn test_should_fail_without_signature() {
        let outcome = validator().validate(PATH, HEADER, "");
        assert_eq!(outcome.reason(), Some("No signature header present"));
    }

    #[test]
    fn test_should_check_signature_before_data_header() {
        let outcome = validator().validate(PATH, "", "");
        assert_eq!(outcome.reason(), Some("No signature header present"));
    }

    #[test]
    fn test_should_fail_without_data_header() {
        let outcome = validator().validate(PATH, "", SIGNATURE);
        assert_eq!(outcome.reason(), Some("No data header present"));
    }

    #[test]
    fn test_should_fail_on_malformed_header() {
        let outcome = validator().validate(PATH, "5, 1.2.3.4, v1", SIGNATURE);
        assert_eq!(outcome.reason(), Some("Bad header format"));
    }

    #[test]
    fn test_should_fail_on_unknown_nonce() {
        let validator = Validator::from_secrets_str("nomatch:randomSecret")
            .unwrap()
            .with_time_window(0);
        let outcome = validator.validate(PATH, HEADER, SIGNATURE);
        assert!(!outcome.is_authenticated());
        assert_eq!(outcome.reason(), Some("Invalid secret"));
    }

    #[test]
    fn test_should_fail_on_empty_secret() {
        let table =
            NonceSecretTable::new(vec![("v1".to_owned(), String::new())]).unwrap();
        let outcome = Validator::new(table)
            .with_time_window(0)
            .validate(PATH, HEADER, SIGNATURE);
        assert_eq!(outcome.reason(), Some("Invalid secret"));
    }

    #[test]
    fn test_should_check_secret_before_expiry() {
        let validator = Validator::from_secrets_str("nomatch:randomSecret").unwrap();
        let outcome = validator.validate(PATH, HEADER, SIGNATURE);
        assert_eq!(outcome.reason(), Some("Invalid secret"));
    }

    #[test]
    fn test_should_fail_on_wrong_signature() {
        let outcome = validator().validate(PATH, HEADER, "FWvsJT8JBKvnZ4jGiE7uYA==");
        assert_eq!(outcome.reason(), Some("Invalid signature"));
    }

    #[test]
    fn test_should_fail_on_tampered_path() {
        let outcome = validator().validate("/abd", HEADER, SIGNATURE);
        assert_eq!(outcome.reason(), Some("Invalid signature"));
    }

    #[test]
    fn test_should_authenticate_header_with_trailing_comma() {
        let header = format!("{HEADER},");
        let data = AuthData::parse(PATH, &header).unwrap();
        let signature = signer::sign(&data.with_secret(SECRET)).unwrap();
        assert_ne!(signature, SIGNATURE);

        let outcome = validator().validate(PATH, &header, &signature);
        assert!(outcome.is_authenticated(), "{:?}", outcome.reason());
    }

    #[test]
    fn test_should_fail_on_unknown_version() {
        let header = "7, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1";
        let outcome = validator().validate(PATH, header, SIGNATURE);
        assert_eq!(outcome.reason(), Some("Unknown version"));
    }

    #[test]
    fn test_should_check_expiry_before_version() {
        let header = "7, 1.2.3.4, 3.4.5.6, 1471524574, 2805760.691583751, v1";
        let validator = validator().with_time_window(30);
        let outcome = validator.validate_at(PATH, header, SIGNATURE, HEADER_MILLIS + 31_000);
        assert_eq!(outcome.reason(), Some("Signature expired"));
    }

    #[test]
    fn test_should_accept_request_inside_window() {
        let validator = validator().with_time_window(30);
        for now in [HEADER_MILLIS, HEADER_MILLIS + 30_000, HEADER_MILLIS - 30_000] {
            let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, now);
            assert!(outcome.is_authenticated(), "now={now}: {:?}", outcome.reason());
        }
    }

    #[test]
    fn test_should_reject_request_outside_window() {
        let validator = validator().with_time_window(30);
        for now in [HEADER_MILLIS + 30_001, HEADER_MILLIS - 30_001] {
            let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, now);
            assert_eq!(outcome.reason(), Some("Signature expired"));
        }
    }

    #[test]
    fn test_should_scale_default_window_by_one_thousand_twice() {
        // The default window of 30 * 1000 is compared as 30_000 * 1000 ms.
        let validator = Validator::from_secrets_str("v1:s3cr3tk3y").unwrap();
        assert_eq!(validator.time_window(), 30_000);

        let hour = 3_600_000;
        let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, HEADER_MILLIS + hour);
        assert!(outcome.is_authenticated());

        let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, HEADER_MILLIS + 9 * hour);
        assert_eq!(outcome.reason(), Some("Signature expired"));
    }

    #[test]
    fn test_should_reject_old_timestamp_with_default_window() {
        let outcome = Validator::from_secrets_str("v1:s3cr3tk3y")
            .unwrap()
            .validate(PATH, HEADER, SIGNATURE);
        assert_eq!(outcome.reason(), Some("Signature expired"));
    }

    #[test]
    fn test_should_clamp_negative_window_to_zero() {
        let validator = validator().with_time_window(-5);
        assert_eq!(validator.time_window(), 0);
        assert!(validator.validate(PATH, HEADER, SIGNATURE).is_authenticated());
    }

    #[test]
    fn test_should_detect_replay_when_guard_installed() {
        let validator = validator().with_replay_guard(Arc::new(InMemoryReplayCache::new(
            Duration::from_secs(60),
            16,
        )));

        assert!(validator.validate_at(PATH, HEADER, SIGNATURE, 0).is_authenticated());
        let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, 1_000);
        assert_eq!(outcome.reason(), Some("Signature already used"));
    }

    #[test]
    fn test_should_not_record_signature_that_failed_verification() {
        let validator = validator().with_replay_guard(Arc::new(InMemoryReplayCache::new(
            Duration::from_secs(60),
            16,
        )));

        let outcome = validator.validate_at("/evil", HEADER, SIGNATURE, 0);
        assert_eq!(outcome.reason(), Some("Invalid signature"));

        let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, 1_000);
        assert!(outcome.is_authenticated(), "{:?}", outcome.reason());
    }

    #[test]
    fn test_should_detect_replay_after_flood_of_forged_signatures() {
        let validator = validator().with_replay_guard(Arc::new(InMemoryReplayCache::new(
            Duration::from_secs(60),
            4,
        )));
        assert!(validator.validate_at(PATH, HEADER, SIGNATURE, 0).is_authenticated());

        for i in 0..4 {
            let forged = format!("forged-{i}");
            let outcome = validator.validate_at(PATH, HEADER, &forged, 10);
            assert_eq!(outcome.reason(), Some("Invalid signature"));
        }

        let outcome = validator.validate_at(PATH, HEADER, SIGNATURE, 20);
        assert_eq!(outcome.reason(), Some("Signature already used"));
    }

    #[test]
    fn test_should_build_from_config() {
        let config = ValidatorConfig::builder()
            .nonce_secrets(format!("v1:{SECRET}"))
            .time_window(-1)
            .replay_ttl_secs(60)
            .build();
        let validator = Validator::from_config(&config).unwrap();
        assert_eq!(validator.time_window(), 0);
        assert!(validator.validate_at(PATH, HEADER, SIGNATURE, 0).is_authenticated());
        assert!(!validator.validate_at(PATH, HEADER, SIGNATURE, 0).is_authenticated());
    }

    #[test]
    fn test_should_reject_config_without_secrets() {
        let result = Validator::from_config(&ValidatorConfig::default());
        assert!(matches!(result, Err(G2oError::Configuration(_))));
    }

    #[test]
    fn test_should_validate_http_request_parts() {
        let (parts, ()) = http::Request::builder()
            .method("GET")
            .uri("http://origin.example.com/abc")
            .header(headers::AUTH_DATA_HEADER, HEADER)
            .header(headers::AUTH_SIGN_HEADER, SIGNATURE)
            .body(())
            .unwrap()
            .into_parts();

        assert!(validator().validate_request(&parts).is_authenticated());
    }

    #[test]
    fn test_should_fail_http_request_without_headers() {
        let (parts, ()) = http::Request::builder()
            .uri("http://origin.example.com/abc")
            .body(())
            .unwrap()
            .into_parts();

        let outcome = validator().validate_request(&parts);
        assert_eq!(outcome.reason(), Some("No signature header present"));
    }
}
