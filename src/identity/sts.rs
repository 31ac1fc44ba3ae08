// STS backed identity lookup
//
// Calls GetCallerIdentity through the AWS SDK. The reported access key id is
// the one the credentials provider actually resolved, not the one the caller
// asked for, so a provider handing out other credentials is caught by the
// validator.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials as SdkCredentials;
use aws_sdk_sts::config::Region;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sts::operation::get_caller_identity::GetCallerIdentityError;
use aws_sdk_sts::Client as StsClient;
use std::time::Duration;
use tracing::debug;

use super::types::{Identity, IdentityLookup, LookupError};
use crate::config::Credentials;

/// Region used when neither settings nor the environment name one. STS
/// answers GetCallerIdentity in every region.
const FALLBACK_REGION: &str = "us-east-1";

/// Provider name attached to explicitly supplied credentials
const PROVIDER_NAME: &str = "ci-aws-credentials";

/// Error codes returned when the caller is being rate limited
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "SlowDown",
];

/// Error codes for server-side failures that a later attempt may not hit
const TRANSIENT_CODES: &[&str] = &[
    "InternalFailure",
    "InternalError",
    "ServiceUnavailable",
    "RequestTimeout",
    "RequestTimeoutException",
];

/// Client settings for the STS lookup
#[derive(Debug, Clone)]
pub struct StsLookupConfig {
    /// Region for the STS client; falls back to the default region chain
    pub region: Option<String>,
    /// Endpoint override, e.g. a VPC endpoint or a local emulator
    pub endpoint_url: Option<String>,
    /// Timeout for a single GetCallerIdentity call
    pub timeout: Duration,
}

impl Default for StsLookupConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Identity lookup through STS GetCallerIdentity
#[derive(Debug, Clone)]
pub struct StsIdentityLookup {
    client: StsClient,
    credentials: SharedCredentialsProvider,
}

impl StsIdentityLookup {
    /// Lookup signed with explicitly supplied credentials
    pub async fn with_credentials(credentials: &Credentials, config: &StsLookupConfig) -> Self {
        let credentials = SdkCredentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            PROVIDER_NAME,
        );
        Self::with_provider(credentials, config).await
    }

    /// Lookup signed with whatever `provider` resolves
    pub async fn with_provider(
        provider: impl ProvideCredentials + 'static,
        config: &StsLookupConfig,
    ) -> Self {
        let provider = SharedCredentialsProvider::new(provider);
        let sdk_config = loader(config)
            .credentials_provider(provider.clone())
            .load()
            .await;

        Self {
            client: StsClient::new(&sdk_config),
            credentials: provider,
        }
    }

    /// Lookup signed with credentials from the default provider chain
    /// (environment, shared profiles, web identity, container or instance
    /// metadata)
    pub async fn from_default_chain(config: &StsLookupConfig) -> Result<Self, LookupError> {
        let sdk_config = loader(config).load().await;
        Self::from_sdk_config(&sdk_config)
    }

    /// Lookup from an already loaded SDK configuration
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Result<Self, LookupError> {
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            LookupError::Unavailable("no credentials provider configured".to_string())
        })?;

        Ok(Self {
            client: StsClient::new(sdk_config),
            credentials,
        })
    }
}

fn loader(config: &StsLookupConfig) -> ConfigLoader {
    let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::from_static(FALLBACK_REGION));

    // Retries are driven by the validator so that its options apply
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(config.timeout)
                .build(),
        );

    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url.clone());
    }

    loader
}

#[async_trait]
impl IdentityLookup for StsIdentityLookup {
    async fn get_caller_identity(&self) -> Result<Identity, LookupError> {
        let resolved = self.credentials.provide_credentials().await.map_err(|e| {
            LookupError::Unavailable(format!(
                "failed to resolve credentials: {}",
                DisplayErrorContext(&e)
            ))
        })?;
        debug!(
            "Calling STS GetCallerIdentity with access key {}",
            resolved.access_key_id()
        );

        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let arn = output.arn().filter(|arn| !arn.is_empty()).ok_or_else(|| {
            LookupError::Malformed("STS GetCallerIdentity returned no Arn".to_string())
        })?;

        Ok(Identity::new(resolved.access_key_id(), arn))
    }
}

/// Map an SDK failure onto a lookup error kind
fn classify_sdk_error(err: SdkError<GetCallerIdentityError>) -> LookupError {
    match &err {
        SdkError::ServiceError(service) => {
            classify_service_error(service.err().code(), service.err().message())
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            LookupError::Transport(DisplayErrorContext(&err).to_string())
        }
        _ => LookupError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn classify_service_error(code: Option<&str>, message: Option<&str>) -> LookupError {
    let code = code.unwrap_or("Unknown");
    let message = message.unwrap_or_default().to_string();

    if THROTTLING_CODES.contains(&code) {
        LookupError::Throttled(format!("{}: {}", code, message))
    } else if TRANSIENT_CODES.contains(&code) {
        LookupError::Transport(format!("{}: {}", code, message))
    } else {
        LookupError::Service {
            code: code.to_string(),
            message,
        }
    }
}
