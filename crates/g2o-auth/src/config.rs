//! Validator configuration.
//!
//! Provides [`ValidatorConfig`], loaded from environment variables or built
//! in code, from which a [`Validator`](crate::Validator) is constructed.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default time window value, compared as `time_window * 1000` milliseconds.
pub const DEFAULT_TIME_WINDOW: i64 = 30 * 1000;

/// Default maximum number of entries in the replay cache.
pub const DEFAULT_REPLAY_CAPACITY: usize = 100_000;

/// G2O validator configuration.
///
/// # Examples
///
/// ```
/// use g2o_auth::config::ValidatorConfig;
///
/// let config = ValidatorConfig::builder()
///     .nonce_secrets("v1:s3cr3tk3y".to_owned())
///     .time_window(0)
///     .build();
/// assert_eq!(config.replay_ttl_secs, 0);
/// assert_eq!(config.log_level, "info");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Nonce/secret pairs in `"key1:secret1,key2:secret2"` form.
    #[builder(default)]
    #[serde(default, skip_serializing)]
    pub nonce_secrets: String,

    /// Allowed clock skew. Multiplied by 1000 and compared against the
    /// difference in milliseconds. `0` disables the check, negative values
    /// are clamped to `0`.
    #[builder(default = DEFAULT_TIME_WINDOW)]
    pub time_window: i64,

    /// How long presented signatures are remembered, in seconds. `0` disables
    /// replay detection.
    #[builder(default = 0)]
    pub replay_ttl_secs: u64,

    /// Maximum number of remembered signatures.
    #[builder(default = DEFAULT_REPLAY_CAPACITY)]
    pub replay_capacity: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            nonce_secrets: String::new(),
            time_window: DEFAULT_TIME_WINDOW,
            replay_ttl_secs: 0,
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
            log_level: String::from("info"),
        }
    }
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("nonce_secrets", &"<redacted>")
            .field("time_window", &self.time_window)
            .field("replay_ttl_secs", &self.replay_ttl_secs)
            .field("replay_capacity", &self.replay_capacity)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `G2O_NONCE_SECRETS` | *(empty)* |
    /// | `G2O_TIME_WINDOW` | `30000` |
    /// | `G2O_REPLAY_TTL` | `0` |
    /// | `G2O_REPLAY_CAPACITY` | `100000` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numeric values are ignored and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("G2O_NONCE_SECRETS") {
            config.nonce_secrets = v;
        }
        if let Some(v) = lookup("G2O_TIME_WINDOW") {
            if let Ok(n) = v.trim().parse::<i64>() {
                config.time_window = n;
            }
        }
        if let Some(v) = lookup("G2O_REPLAY_TTL") {
            if let Ok(n) = v.trim().parse::<u64>() {
                config.replay_ttl_secs = n;
            }
        }
        if let Some(v) = lookup("G2O_REPLAY_CAPACITY") {
            if let Ok(n) = v.trim().parse::<usize>() {
                config.replay_capacity = n;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}
