//! CI AWS Credentials Library
//!
//! Validates temporary AWS credentials against the identity they are expected
//! to belong to and persists them as named profiles in the shared credentials
//! file, retrying transient identity lookup failures with exponential backoff.

pub mod config;
pub mod error;
pub mod identity;
pub mod retry;
pub mod utils;

// Re-export main types for convenience
pub use config::{Credentials, CredentialsStore, PartialCredentials, Settings};
pub use error::{CredentialsError, OperationError};
pub use identity::{Identity, IdentityLookup, IdentityValidator, LookupError, StsIdentityLookup};
pub use retry::{retry_with_backoff, RetryOptions};
pub use utils::{sanitize, sanitize_tag_value};
