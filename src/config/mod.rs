// Configuration module for the credentials helper
//
// This module handles the shared credentials file, settings loading and the
// credential value types.

pub mod document;
pub mod fs;
pub mod manager;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use document::CredentialsDocument;
pub use fs::{ConfigFs, TokioFs};
pub use manager::CredentialsStore;
pub use types::{
    Credentials, CredentialsPaths, EnvVars, LogLevel, PartialCredentials, RetrySettings, Settings,
    ValidationSettings,
};
