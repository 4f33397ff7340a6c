//! The result of validating a request.

use serde::Serialize;

/// Outcome of [`Validator::validate`](crate::Validator::validate).
///
/// The reason is meant for operators and logs. It should not be echoed back
/// to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl VerificationOutcome {
    /// A successful verification.
    #[must_use]
    pub fn verified() -> Self {
        Self {
            authenticated: true,
            reason: None,
        }
    }

    /// A failed verification with a human-readable reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            reason: Some(reason.into()),
        }
    }

    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Why verification failed; `None` when authenticated.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}
