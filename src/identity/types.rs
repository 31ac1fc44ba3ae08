// Identity types and the lookup capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller identity as reported by an STS-style "who am I" call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Access key id the lookup authenticated with
    pub access_key_id: String,
    /// Principal ARN of the caller
    pub principal: String,
}

impl Identity {
    pub fn new(access_key_id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            principal: principal.into(),
        }
    }

    /// Parse the principal ARN into its kind
    pub fn principal_kind(&self) -> PrincipalKind {
        PrincipalKind::from_arn(&self.principal)
    }

    /// Whether the principal is an assumed-role session created by chaining.
    ///
    /// STS reports chained and direct sessions with the same ARN shape, so a
    /// chained session is recognised by `marker` in its session name.
    pub fn is_role_chained(&self, marker: &str) -> bool {
        match self.principal_kind() {
            PrincipalKind::AssumedRole { session, .. } => {
                !marker.is_empty() && session.to_lowercase().contains(&marker.to_lowercase())
            }
            _ => false,
        }
    }
}

/// Kind of principal behind an ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalKind {
    /// `arn:aws:sts::123456789012:assumed-role/<role>/<session>`
    AssumedRole { role: String, session: String },
    /// `arn:aws:iam::123456789012:user/<name>`
    User { name: String },
    /// `arn:aws:sts::123456789012:federated-user/<name>`
    FederatedUser { name: String },
    /// Root account or anything unrecognised
    Other,
}

impl PrincipalKind {
    pub fn from_arn(arn: &str) -> Self {
        // arn:partition:service:region:account:resource
        let mut parts = arn.splitn(6, ':');
        if parts.next() != Some("arn") {
            return PrincipalKind::Other;
        }
        let service = parts.nth(1);
        let resource = match parts.nth(2) {
            Some(resource) => resource,
            None => return PrincipalKind::Other,
        };

        match (service, resource.split_once('/')) {
            (Some("sts"), Some(("assumed-role", rest))) => match rest.split_once('/') {
                Some((role, session)) if !role.is_empty() && !session.is_empty() => {
                    PrincipalKind::AssumedRole {
                        role: role.to_string(),
                        session: session.to_string(),
                    }
                }
                _ => PrincipalKind::Other,
            },
            (Some("sts"), Some(("federated-user", name))) => PrincipalKind::FederatedUser {
                name: name.to_string(),
            },
            // IAM user paths may contain slashes; the name is the last segment
            (Some("iam"), Some(("user", path))) => PrincipalKind::User {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
            },
            _ => PrincipalKind::Other,
        }
    }
}

/// Failure of an identity lookup
#[derive(Debug, Error)]
pub enum LookupError {
    /// Request was throttled by the service
    #[error("Identity lookup throttled: {0}")]
    Throttled(String),

    /// Network or transport failure
    #[error("Identity lookup transport error: {0}")]
    Transport(String),

    /// The service rejected the request
    #[error("Identity lookup rejected ({code}): {message}")]
    Service { code: String, message: String },

    /// Response could not be understood
    #[error("Malformed identity response: {0}")]
    Malformed(String),

    /// Credentials or the lookup client could not be set up
    #[error("Identity lookup unavailable: {0}")]
    Unavailable(String),
}

impl LookupError {
    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Throttled(_) | LookupError::Transport(_))
    }
}

/// Capability for resolving the identity behind a set of credentials
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn get_caller_identity(&self) -> Result<Identity, LookupError>;
}

#[async_trait]
impl<T: IdentityLookup + ?Sized> IdentityLookup for Box<T> {
    async fn get_caller_identity(&self) -> Result<Identity, LookupError> {
        (**self).get_caller_identity().await
    }
}
