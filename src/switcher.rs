//! Profile switching.
//!
//! Picks a profile from the AWS config file, makes sure it has usable
//! credentials and records it in `~/.canu`:
//!
//! ```text
//! config file -> menu -> get-caller-identity -> (device login) -> ~/.canu
//! ```
//!
//! The `canu` alias sources a script that runs this and then exports the
//! recorded name as `AWS_PROFILE`.

use anyhow::{Context, Result};
use log::info;

use crate::credentials::{self, CredentialStatus, IdentityProbe, StsProbe};
use crate::error::Error;
use crate::files::write_private;
use crate::profiles::{AwsConfig, Profile};
use crate::selector;
use crate::settings::Settings;
use crate::sso_login::{AwsSsoOidc, DeviceLogin, SsoOidc, Terminal, UserConsole};

pub struct ProfileSwitcher<'a> {
    settings: &'a Settings,
    config: AwsConfig,
}

impl<'a> ProfileSwitcher<'a> {
    /// Loads the profiles of the configured AWS config file.
    pub fn new(settings: &'a Settings) -> Result<Self> {
        let config = AwsConfig::load(&settings.config_path)?;
        Ok(Self { settings, config })
    }

    /// Lets the user choose a profile, refreshes its SSO login when needed
    /// and saves the choice.
    pub async fn run(&self) -> Result<()> {
        let names = self
            .config
            .selectable(&self.settings.include, &self.settings.exclude)?;

        let Some(choice) = selector::choose_profile(&names)? else {
            println!("\n\nno profile selected, bye!");
            return Ok(());
        };

        let profile = self.profile(&choice)?;
        let sdk_config = credentials::load_sdk_config(
            &self.settings.config_path,
            &profile.name,
            profile.oidc_region(),
        )
        .await;

        self.ensure_credentials(
            profile,
            &StsProbe::new(&sdk_config),
            &AwsSsoOidc::new(&sdk_config, profile.oidc_region()),
            &Terminal,
        )
        .await?;

        // we have permissions, so save the profile name for the alias script
        self.save_selection(&choice)
    }

    fn profile(&self, name: &str) -> Result<&Profile> {
        self.config.get(name).with_context(|| {
            format!(
                "profile {name} not found on file {}",
                self.config.path().display()
            )
        })
    }

    /// Checks the profile's credentials, running the SSO device login when
    /// they are missing or expired.
    pub async fn ensure_credentials<P, O, C>(
        &self,
        profile: &Profile,
        probe: &P,
        oidc: &O,
        console: &C,
    ) -> Result<()>
    where
        P: IdentityProbe + Sync,
        O: SsoOidc + Sync,
        C: UserConsole + Sync,
    {
        match credentials::check_status(profile, probe).await? {
            CredentialStatus::Valid { arn } => {
                println!(
                    "credentials for profile {} and role {arn} already available",
                    profile.name
                );
            }
            CredentialStatus::NeedsRelogin(sso) => {
                info!("Credentials for profile {} expired, logging in", profile.name);
                DeviceLogin::new(oidc, console)
                    .run(&sso, &self.settings.sso_cache_dir())
                    .await?;
            }
        }
        Ok(())
    }

    /// Writes the profile name to the marker file read by the alias script.
    pub fn save_selection(&self, name: &str) -> Result<()> {
        let path = self.settings.marker_path();
        write_private(&path, name.as_bytes()).map_err(|e| Error::persistence(&path, e))?;
        info!("Saved profile {name} to {}", path.display());
        Ok(())
    }
}
