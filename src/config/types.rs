// Configuration types for the credentials helper
//
// Credential value types, settings structures and the well-known paths and
// environment variable names of the AWS shared credentials convention.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CredentialsError;
use crate::identity::DEFAULT_CHAINED_SESSION_MARKER;
use crate::retry::RetryOptions;

/// Log level for the helper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// A complete set of temporary credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }
}

// Secrets never reach log output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

/// Credentials as received from outside, any field possibly missing.
///
/// Field names follow the STS `Credentials` JSON shape.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartialCredentials {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl PartialCredentials {
    /// Promote to [`Credentials`] when all three fields are present and
    /// non-empty.
    pub fn complete(&self) -> Result<Credentials, CredentialsError> {
        fn field(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        match (
            field(&self.access_key_id),
            field(&self.secret_access_key),
            field(&self.session_token),
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(session_token)) => Ok(
                Credentials::new(access_key_id, secret_access_key, session_token),
            ),
            _ => Err(CredentialsError::MissingCredentials),
        }
    }

    /// Whether no field was supplied at all
    pub fn is_empty(&self) -> bool {
        self.access_key_id.is_none()
            && self.secret_access_key.is_none()
            && self.session_token.is_none()
    }

    /// Parse STS JSON output: either a bare `Credentials` object or a full
    /// `assume-role` response wrapping one.
    pub fn from_sts_json(json: &str) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StsJson {
            Envelope {
                #[serde(rename = "Credentials")]
                credentials: PartialCredentials,
            },
            Bare(PartialCredentials),
        }

        Ok(match serde_json::from_str::<StsJson>(json)? {
            StsJson::Envelope { credentials } => credentials,
            StsJson::Bare(credentials) => credentials,
        })
    }

    /// Whether the credentials carry an expiration that has already passed
    pub fn is_expired(&self) -> bool {
        self.expiration
            .map(|expires_at| Utc::now() >= expires_at)
            .unwrap_or(false)
    }
}

impl From<Credentials> for PartialCredentials {
    fn from(credentials: Credentials) -> Self {
        Self {
            access_key_id: Some(credentials.access_key_id),
            secret_access_key: Some(credentials.secret_access_key),
            session_token: Some(credentials.session_token),
            expiration: None,
        }
    }
}

impl fmt::Debug for PartialCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialCredentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "** redacted **"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Set to false to make every lookup failure final
    pub enabled: bool,
    #[serde(flatten)]
    pub options: RetryOptions,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            options: RetryOptions::default(),
        }
    }
}

/// Identity validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Session-name marker identifying a chained role session
    pub chained_session_marker: String,
    /// STS endpoint override for identity lookups
    pub endpoint_url: Option<String>,
    /// Region for identity lookups
    pub region: Option<String>,
    /// Timeout for a single identity lookup in seconds
    pub lookup_timeout_seconds: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            chained_session_marker: DEFAULT_CHAINED_SESSION_MARKER.to_string(),
            endpoint_url: None,
            region: None,
            lookup_timeout_seconds: 30,
        }
    }
}

/// Top-level settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: LogLevel,
    /// Explicit shared credentials file location
    pub credentials_file: Option<PathBuf>,
    pub retry: RetrySettings,
    pub validation: ValidationSettings,
}

/// Environment variable names read by the helper
pub struct EnvVars;

impl EnvVars {
    pub const ACCESS_KEY_ID: &'static str = "AWS_ACCESS_KEY_ID";
    pub const SECRET_ACCESS_KEY: &'static str = "AWS_SECRET_ACCESS_KEY";
    pub const SESSION_TOKEN: &'static str = "AWS_SESSION_TOKEN";
    pub const REGION: &'static str = "AWS_REGION";
    pub const SHARED_CREDENTIALS_FILE: &'static str = "AWS_SHARED_CREDENTIALS_FILE";
    pub const MAX_RETRIES: &'static str = "CI_AWS_MAX_RETRIES";
    pub const DISABLE_RETRY: &'static str = "CI_AWS_DISABLE_RETRY";
    pub const LOG_LEVEL: &'static str = "CI_AWS_LOG_LEVEL";
    pub const STS_ENDPOINT: &'static str = "CI_AWS_STS_ENDPOINT";
}

/// Locations of the shared credentials directory and file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsPaths {
    pub config_dir: PathBuf,
    pub credentials_file: PathBuf,
}

impl CredentialsPaths {
    /// Configuration directory name under the home directory
    pub const CONFIG_DIR_NAME: &'static str = ".aws";

    /// Shared credentials file name
    pub const CREDENTIALS_FILE: &'static str = "credentials";

    /// `<home>/.aws` and `<home>/.aws/credentials`
    pub fn from_home(home: &Path) -> Self {
        let config_dir = home.join(Self::CONFIG_DIR_NAME);
        let credentials_file = config_dir.join(Self::CREDENTIALS_FILE);
        Self {
            config_dir,
            credentials_file,
        }
    }

    /// Paths for an explicit credentials file; the directory is its parent
    pub fn from_file(credentials_file: PathBuf) -> Self {
        let config_dir = credentials_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_dir,
            credentials_file,
        }
    }

    /// Paths under the current user's home directory
    pub fn default_paths() -> Result<Self> {
        dirs::home_dir()
            .map(|home| Self::from_home(&home))
            .context("Failed to determine home directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn partial(a: Option<&str>, s: Option<&str>, t: Option<&str>) -> PartialCredentials {
        PartialCredentials {
            access_key_id: a.map(String::from),
            secret_access_key: s.map(String::from),
            session_token: t.map(String::from),
            expiration: None,
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("invalid".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_complete_credentials() {
        let creds = partial(Some("A"), Some("B"), Some("C")).complete().unwrap();
        assert_eq!(creds, Credentials::new("A", "B", "C"));
    }

    #[test]
    fn test_each_missing_field_rejected() {
        for incomplete in [
            partial(None, Some("B"), Some("C")),
            partial(Some("A"), None, Some("C")),
            partial(Some("A"), Some("B"), None),
            partial(Some(""), Some("B"), Some("C")),
        ] {
            assert!(matches!(
                incomplete.complete(),
                Err(CredentialsError::MissingCredentials)
            ));
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(PartialCredentials::default().is_empty());
        assert!(!partial(None, None, Some("C")).is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("AKIAVISIBLE", "very-secret", "very-token");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("AKIAVISIBLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("very-token"));

        let rendered = format!("{:?}", PartialCredentials::from(creds));
        assert!(!rendered.contains("very-secret"));
    }

    #[test]
    fn test_sts_json_shape() {
        let json = r#"{
            "AccessKeyId": "ASIAEXAMPLE",
            "SecretAccessKey": "secret",
            "SessionToken": "token",
            "Expiration": "2030-01-01T00:00:00Z"
        }"#;
        let creds: PartialCredentials = serde_json::from_str(json).unwrap();

        assert_eq!(creds.access_key_id.as_deref(), Some("ASIAEXAMPLE"));
        assert!(!creds.is_expired());
        assert!(creds.complete().is_ok());
    }

    #[test]
    fn test_assume_role_response() {
        let json = r#"{
            "Credentials": {
                "AccessKeyId": "ASIAWRAPPED",
                "SecretAccessKey": "secret",
                "SessionToken": "token",
                "Expiration": "2030-01-01T00:00:00+00:00"
            },
            "AssumedRoleUser": {
                "AssumedRoleId": "AROAEXAMPLE:GitHubActions",
                "Arn": "arn:aws:sts::123456789012:assumed-role/deploy/GitHubActions"
            }
        }"#;
        let creds = PartialCredentials::from_sts_json(json).unwrap();
        assert_eq!(creds.access_key_id.as_deref(), Some("ASIAWRAPPED"));

        let bare = PartialCredentials::from_sts_json(r#"{"AccessKeyId": "ASIABARE"}"#).unwrap();
        assert_eq!(bare.access_key_id.as_deref(), Some("ASIABARE"));
        assert!(bare.complete().is_err());

        assert!(PartialCredentials::from_sts_json("not json").is_err());
    }

    #[test]
    fn test_expiration() {
        let mut creds = partial(Some("A"), Some("B"), Some("C"));
        assert!(!creds.is_expired());

        creds.expiration = Some(Utc::now() - Duration::minutes(5));
        assert!(creds.is_expired());
    }

    #[test]
    fn test_credentials_paths() {
        let paths = CredentialsPaths::from_home(Path::new("/home/runner"));
        assert_eq!(paths.config_dir, PathBuf::from("/home/runner/.aws"));
        assert_eq!(
            paths.credentials_file,
            PathBuf::from("/home/runner/.aws/credentials")
        );

        let paths = CredentialsPaths::from_file(PathBuf::from("/tmp/ci/creds"));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/ci"));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: Settings = toml::from_str(
            r#"
            log_level = "debug"
            credentials_file = "/tmp/creds"

            [retry]
            enabled = false
            max_attempts = 3
            base_delay = 100

            [validation]
            chained_session_marker = "hop"
            "#,
        )
        .unwrap();

        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.credentials_file, Some(PathBuf::from("/tmp/creds")));
        assert!(!settings.retry.enabled);
        assert_eq!(settings.retry.options.max_attempts, 3);
        assert_eq!(
            settings.retry.options.base_delay,
            std::time::Duration::from_millis(100)
        );
        assert_eq!(settings.validation.chained_session_marker, "hop");
        assert_eq!(settings.validation.endpoint_url, None);
    }
}
