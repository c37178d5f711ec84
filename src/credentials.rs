//! Credential status of a profile, checked with `sts get-caller-identity`.

use std::path::Path;

use anyhow::anyhow;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_sts::{
    Client, error::SdkError, operation::get_caller_identity::GetCallerIdentityError,
};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_types::error::display::DisplayErrorContext;
use log::debug;

use crate::error::{Error, Result};
use crate::profiles::{Profile, SsoConfig};

/// Why an identity check failed.
#[derive(Debug)]
pub enum IdentityFailure {
    /// No usable credentials: the provider chain failed (expired SSO token)
    /// or the service rejected what it was given.
    Credentials(anyhow::Error),
    /// Anything else, such as a network failure.
    Other(anyhow::Error),
}

#[derive(Debug)]
pub enum CredentialStatus {
    Valid { arn: String },
    NeedsRelogin(SsoConfig),
}

/// Answers "who am I" for one profile.
#[async_trait]
pub trait IdentityProbe {
    async fn caller_arn(&self) -> std::result::Result<String, IdentityFailure>;
}

/// Loads the SDK configuration of `profile` from `config_path` and the
/// default shared credentials file.
pub async fn load_sdk_config(
    config_path: &Path,
    profile: &str,
    fallback_region: Option<&str>,
) -> SdkConfig {
    let files = EnvConfigFiles::builder()
        .include_default_credentials_file(true)
        .with_file(EnvConfigFileKind::Config, config_path)
        .build();

    let config = aws_config::defaults(BehaviorVersion::latest())
        .profile_files(files)
        .profile_name(profile)
        .load()
        .await;

    match fallback_region {
        Some(region) if config.region().is_none() => {
            debug!("Profile {profile} has no region, using {region}");
            config
                .to_builder()
                .region(Some(Region::new(region.to_owned())))
                .build()
        }
        _ => config,
    }
}

pub struct StsProbe {
    client: Client,
}

impl StsProbe {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl IdentityProbe for StsProbe {
    async fn caller_arn(&self) -> std::result::Result<String, IdentityFailure> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(classify)?;
        Ok(output.arn().unwrap_or_default().to_owned())
    }
}

/// Credential provider failures surface as "user" or "other" dispatch
/// failures; I/O and timeouts are connector failures of their own kind.
fn classify(err: SdkError<GetCallerIdentityError, HttpResponse>) -> IdentityFailure {
    let credentials = match &err {
        SdkError::DispatchFailure(failure) => failure.is_user() || failure.is_other(),
        SdkError::ServiceError(_) => true,
        _ => false,
    };
    let source = anyhow!("{}", DisplayErrorContext(&err));
    if credentials {
        IdentityFailure::Credentials(source)
    } else {
        IdentityFailure::Other(source)
    }
}

/// Validates the SSO attributes of `profile` and checks its credentials.
///
/// A missing attribute or a non-credential failure is returned as an error;
/// only credential failures lead to [`CredentialStatus::NeedsRelogin`].
pub async fn check_status<P: IdentityProbe + ?Sized>(
    profile: &Profile,
    probe: &P,
) -> Result<CredentialStatus> {
    let sso = profile.sso()?;

    match probe.caller_arn().await {
        Ok(arn) => Ok(CredentialStatus::Valid { arn }),
        Err(IdentityFailure::Credentials(e)) => {
            debug!("Credentials for profile {} are not usable: {e:#}", profile.name);
            Ok(CredentialStatus::NeedsRelogin(sso))
        }
        Err(IdentityFailure::Other(source)) => Err(Error::Identity {
            profile: profile.name.clone(),
            source,
        }),
    }
}
