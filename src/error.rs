// Error types for credential validation and persistence

use thiserror::Error;

use crate::identity::LookupError;

/// Errors raised by the identity validator and the credentials store
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// One of access key id, secret access key or session token is absent
    #[error("Can't export credentials to config, missing credentials")]
    MissingCredentials,

    /// Profile name cannot be written as a section header
    #[error("Invalid profile name {0:?}: must be non-empty and contain no brackets or line breaks")]
    InvalidProfileName(String),

    /// Looked-up identity does not belong to the expected access key
    #[error("Credentials loaded do not match the expected access key ID (expected {expected}, got {actual})")]
    IdentityMismatch { expected: String, actual: String },

    /// Role chaining was requested but the identity is a direct session
    #[error("Role chaining was expected but {principal} is not a chained role session")]
    RoleChainingExpected { principal: String },

    /// Failure of a collaborator, passed through unchanged
    #[error(transparent)]
    OperationFailed(#[from] OperationError),
}

/// Failure reported by the identity lookup or the filesystem
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl OperationError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        OperationError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<LookupError> for CredentialsError {
    fn from(err: LookupError) -> Self {
        CredentialsError::OperationFailed(OperationError::Lookup(err))
    }
}

pub type Result<T> = std::result::Result<T, CredentialsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_message() {
        assert_eq!(
            CredentialsError::MissingCredentials.to_string(),
            "Can't export credentials to config, missing credentials"
        );
    }

    #[test]
    fn test_mismatch_names_both_keys() {
        let err = CredentialsError::IdentityMismatch {
            expected: "AKIAEXPECTED".to_string(),
            actual: "ASIAACTUAL".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("AKIAEXPECTED"));
        assert!(message.contains("ASIAACTUAL"));
    }

    #[test]
    fn test_lookup_error_passes_through() {
        let err: CredentialsError = LookupError::Throttled("Rate exceeded".to_string()).into();
        assert!(matches!(
            err,
            CredentialsError::OperationFailed(OperationError::Lookup(LookupError::Throttled(_)))
        ));
        assert_eq!(err.to_string(), LookupError::Throttled("Rate exceeded".to_string()).to_string());
    }
}
