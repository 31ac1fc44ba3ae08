// Identity validation
//
// Confirms that freshly obtained credentials belong to the identity the
// caller expects before they are exported anywhere.

use tracing::debug;

use super::types::{IdentityLookup, LookupError};
use crate::error::{CredentialsError, Result};
use crate::retry::{retry_with_backoff, RetryOptions};

/// Default session-name marker identifying a chained role session
pub const DEFAULT_CHAINED_SESSION_MARKER: &str = "chained";

/// Validates credentials through an injected identity lookup
pub struct IdentityValidator<L> {
    lookup: L,
    retry: RetryOptions,
    retry_enabled: bool,
    chained_session_marker: String,
}

impl<L: IdentityLookup> IdentityValidator<L> {
    /// Create a validator with default retry behaviour
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            retry: RetryOptions::default(),
            retry_enabled: true,
            chained_session_marker: DEFAULT_CHAINED_SESSION_MARKER.to_string(),
        }
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Disable retries entirely; every lookup failure becomes final
    pub fn with_retry_enabled(mut self, enabled: bool) -> Self {
        self.retry_enabled = enabled;
        self
    }

    pub fn with_chained_session_marker(mut self, marker: impl Into<String>) -> Self {
        self.chained_session_marker = marker.into();
        self
    }

    /// Look up the caller identity and compare it against expectations.
    ///
    /// A mismatching access key id fails with `IdentityMismatch`. When
    /// `role_chaining` is set, a principal that is not a chained session fails
    /// with `RoleChainingExpected`. The reverse is accepted: a chained session
    /// passes even when chaining was not requested.
    pub async fn validate_credentials(
        &self,
        expected_access_key_id: Option<&str>,
        role_chaining: bool,
    ) -> Result<()> {
        let retry_enabled = self.retry_enabled;
        let identity = retry_with_backoff(
            || self.lookup.get_caller_identity(),
            |err: &LookupError| retry_enabled && err.is_retryable(),
            &self.retry,
        )
        .await?;

        debug!("Resolved caller identity: {}", identity.principal);

        // An empty expectation means no expectation
        if let Some(expected) = expected_access_key_id.filter(|key| !key.is_empty()) {
            if expected != identity.access_key_id {
                return Err(CredentialsError::IdentityMismatch {
                    expected: expected.to_string(),
                    actual: identity.access_key_id,
                });
            }
        }

        if role_chaining && !identity.is_role_chained(&self.chained_session_marker) {
            return Err(CredentialsError::RoleChainingExpected {
                principal: identity.principal,
            });
        }

        Ok(())
    }
}
