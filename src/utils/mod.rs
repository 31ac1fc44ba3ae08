// Shared utilities: identifier sanitization and serde helpers

pub mod sanitize;
pub mod serde_helpers;

pub use sanitize::{sanitize, sanitize_tag_value};
pub use serde_helpers::{duration_millis, optional_duration_millis};
