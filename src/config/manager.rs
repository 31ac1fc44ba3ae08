// Credentials store for the shared credentials file
//
// Merges a named profile into the credentials file: read what is there,
// replace or append the profile, write everything back in one go.

use anyhow::Result as AnyResult;
use std::env;
use std::path::PathBuf;

use super::document::CredentialsDocument;
use super::fs::{ConfigFs, TokioFs};
use super::types::{CredentialsPaths, EnvVars, PartialCredentials, Settings};
use crate::error::{CredentialsError, OperationError, Result};

/// Persists credentials as named profiles in the shared credentials file
#[derive(Debug, Clone)]
pub struct CredentialsStore<F = TokioFs> {
    fs: F,
    paths: CredentialsPaths,
}

impl CredentialsStore<TokioFs> {
    /// Store on the local filesystem.
    ///
    /// The file location comes from `settings`, then from
    /// `AWS_SHARED_CREDENTIALS_FILE`, then defaults to `~/.aws/credentials`.
    pub fn new(settings: &Settings) -> AnyResult<Self> {
        let paths = Self::determine_paths(settings)?;
        tracing::debug!("Using credentials file: {:?}", paths.credentials_file);
        Ok(Self::with_fs(TokioFs, paths))
    }

    fn determine_paths(settings: &Settings) -> AnyResult<CredentialsPaths> {
        if let Some(file) = &settings.credentials_file {
            return Ok(CredentialsPaths::from_file(file.clone()));
        }

        if let Ok(file) = env::var(EnvVars::SHARED_CREDENTIALS_FILE) {
            if !file.is_empty() {
                return Ok(CredentialsPaths::from_file(PathBuf::from(file)));
            }
        }

        CredentialsPaths::default_paths()
    }
}

impl<F: ConfigFs> CredentialsStore<F> {
    /// Store on an arbitrary filesystem implementation
    pub fn with_fs(fs: F, paths: CredentialsPaths) -> Self {
        Self { fs, paths }
    }

    pub fn paths(&self) -> &CredentialsPaths {
        &self.paths
    }

    /// Save `credentials` under `profile_name`.
    ///
    /// Does nothing when either argument is `None`. Incomplete credentials and
    /// unusable profile names are rejected before the filesystem is touched.
    pub async fn save_credentials_to_config(
        &self,
        profile_name: Option<&str>,
        credentials: Option<&PartialCredentials>,
    ) -> Result<()> {
        let (Some(profile_name), Some(credentials)) = (profile_name, credentials) else {
            return Ok(());
        };

        let credentials = credentials.complete()?;
        validate_profile_name(profile_name)?;

        let config_dir = &self.paths.config_dir;
        let credentials_file = &self.paths.credentials_file;

        if !self.fs.exists(config_dir).await {
            self.fs
                .create_dir_all(config_dir)
                .await
                .map_err(|e| OperationError::io(format!("Failed to create {:?}", config_dir), e))?;
            tracing::debug!("Created credentials directory: {:?}", config_dir);
        }

        let existing = if self.fs.exists(credentials_file).await {
            self.fs
                .read_to_string(credentials_file)
                .await
                .map_err(|e| OperationError::io(format!("Failed to read {:?}", credentials_file), e))?
        } else {
            String::new()
        };

        let mut document = CredentialsDocument::parse(&existing);
        let replacing = document.contains(profile_name);
        document.upsert(profile_name, &credentials);

        self.fs
            .write(credentials_file, &document.render())
            .await
            .map_err(|e| OperationError::io(format!("Failed to write {:?}", credentials_file), e))?;

        if replacing {
            tracing::info!("Updated profile [{}] in {:?}", profile_name, credentials_file);
        } else {
            tracing::info!("Added profile [{}] to {:?}", profile_name, credentials_file);
        }

        Ok(())
    }
}

fn validate_profile_name(name: &str) -> Result<()> {
    let valid = !name.trim().is_empty()
        && name.trim() == name
        && !name.contains(&['[', ']', '\r', '\n'][..]);

    if valid {
        Ok(())
    } else {
        Err(CredentialsError::InvalidProfileName(name.to_string()))
    }
}
