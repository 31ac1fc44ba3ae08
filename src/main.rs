// CI AWS Credentials - validate temporary credentials and persist them as a
// named profile in the shared credentials file.
//
// Credentials are obtained elsewhere in the pipeline; this binary only checks
// who they belong to and writes them where the AWS tooling will find them.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ci_aws_credentials::config::{LogLevel, PartialCredentials, Settings};
use ci_aws_credentials::identity::{IdentityValidator, StsIdentityLookup, StsLookupConfig};
use ci_aws_credentials::{sanitize, sanitize_tag_value, CredentialsStore};

/// CI AWS Credentials - validate and persist temporary AWS credentials
#[derive(Parser)]
#[command(name = "ci-aws-credentials")]
#[command(about = "Validate temporary AWS credentials and save them to the shared credentials file")]
#[command(version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save credentials as a named profile
    Save {
        /// Profile name to write
        #[arg(short, long)]
        profile: String,

        /// Validate the credentials before saving
        #[arg(long)]
        validate: bool,

        #[command(flatten)]
        expectations: ExpectationArgs,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Check that credentials belong to the expected identity
    Validate {
        #[command(flatten)]
        expectations: ExpectationArgs,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Print a value with unsafe characters replaced
    Sanitize {
        /// Value to sanitize
        value: String,

        /// Also truncate to the session tag value limit
        #[arg(long)]
        tag: bool,
    },
}

#[derive(ClapArgs)]
struct CredentialArgs {
    /// Access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Session token
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Read credentials from STS JSON output; takes precedence over the
    /// individual values
    #[arg(long)]
    from_json: Option<PathBuf>,
}

#[derive(ClapArgs)]
struct ExpectationArgs {
    /// Access key id the looked-up identity must report
    #[arg(long)]
    expected_access_key_id: Option<String>,

    /// Require a chained role session
    #[arg(long)]
    role_chaining: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (settings, ignored) = Settings::load(args.config.as_deref()).await?;

    // Initialize logging
    init_logging(args.verbose, args.log_json, &settings.log_level)?;
    for message in &ignored {
        tracing::warn!("{}", message);
    }

    match args.command {
        Command::Save {
            profile,
            validate,
            expectations,
            credentials,
        } => {
            let credentials = credentials.resolve().await?;
            if validate {
                validate_credentials(&settings, &credentials, &expectations).await?;
            }

            let store = CredentialsStore::new(&settings)?;
            store
                .save_credentials_to_config(Some(&profile), Some(&credentials))
                .await?;
            println!(
                "Saved profile [{}] to {}",
                profile,
                store.paths().credentials_file.display()
            );
        }
        Command::Validate {
            expectations,
            credentials,
        } => {
            let credentials = credentials.resolve().await?;
            validate_credentials(&settings, &credentials, &expectations).await?;
            println!("Credentials validated");
        }
        Command::Sanitize { value, tag } => {
            let sanitized = if tag {
                sanitize_tag_value(&value)
            } else {
                sanitize(&value)
            };
            println!("{}", sanitized);
        }
    }

    Ok(())
}

impl CredentialArgs {
    /// Collect credentials from the JSON file or from flags and environment
    async fn resolve(self) -> Result<PartialCredentials> {
        let credentials = match &self.from_json {
            Some(path) => read_sts_json(path).await?,
            None => PartialCredentials {
                access_key_id: self.access_key_id,
                secret_access_key: self.secret_access_key,
                session_token: self.session_token,
                expiration: None,
            },
        };

        if credentials.is_expired() {
            tracing::warn!(
                "Credentials expired at {}",
                credentials.expiration.map(|e| e.to_rfc3339()).unwrap_or_default()
            );
        }

        Ok(credentials)
    }
}

async fn read_sts_json(path: &Path) -> Result<PartialCredentials> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read credentials JSON {:?}", path))?;

    PartialCredentials::from_sts_json(&content)
        .with_context(|| format!("Failed to parse credentials JSON {:?}", path))
}

async fn validate_credentials(
    settings: &Settings,
    credentials: &PartialCredentials,
    expectations: &ExpectationArgs,
) -> Result<()> {
    let config = StsLookupConfig {
        region: settings.validation.region.clone(),
        endpoint_url: settings.validation.endpoint_url.clone(),
        timeout: Duration::from_secs(settings.validation.lookup_timeout_seconds),
    };

    // Nothing supplied: validate whatever the default provider chain resolves
    let lookup = if credentials.is_empty() {
        StsIdentityLookup::from_default_chain(&config).await?
    } else {
        StsIdentityLookup::with_credentials(&credentials.complete()?, &config).await
    };

    let validator = IdentityValidator::new(lookup)
        .with_retry(settings.retry.options.clone())
        .with_retry_enabled(settings.retry.enabled)
        .with_chained_session_marker(settings.validation.chained_session_marker.clone());

    validator
        .validate_credentials(
            expectations.expected_access_key_id.as_deref(),
            expectations.role_chaining,
        )
        .await
        .context("Credential validation failed")?;

    tracing::info!("Credentials validated");
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, json: bool, level: &LogLevel) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if verbose {
        "debug".to_string()
    } else {
        level.to_string()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ci_aws_credentials={}", log_level).into());

    // Logs go to stderr so stdout stays usable in pipelines
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
