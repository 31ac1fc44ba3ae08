// Identity module
//
// Resolves the caller identity behind a set of credentials and checks it
// against what the pipeline expects.

pub mod sts;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use sts::{StsIdentityLookup, StsLookupConfig};
pub use types::{Identity, IdentityLookup, LookupError, PrincipalKind};
pub use validator::{IdentityValidator, DEFAULT_CHAINED_SESSION_MARKER};
