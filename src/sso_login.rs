//! SSO device authorization login.
//!
//! Re-creates the SSO token cache entry the SDK reads when resolving SSO
//! credentials:
//!
//! 1. register a public OIDC client
//! 2. start a device authorization for the profile's start URL
//! 3. open the verification URL and wait for the user to press ENTER
//! 4. exchange the device code for an access token
//! 5. write `<config dir>/sso/cache/<sha1(start url)>.json`
//!
//! There is no polling: if the user confirms before finishing the browser
//! login, the token exchange fails and so does the login.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::SdkConfig;
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::error::{Error, Result, Step};
use crate::profiles::SsoConfig;
use crate::token_cache::{self, CachedToken};

pub const CLIENT_NAME: &str = "canu";
pub const CLIENT_TYPE: &str = "public";
pub const PORTAL_SCOPE: &str = "sso-portal:*";
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Clone)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    /// Unix timestamp.
    pub client_secret_expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub verification_uri_complete: String,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i32,
}

/// The three SSO OIDC calls of a device login.
#[async_trait]
pub trait SsoOidc {
    async fn register_client(&self) -> anyhow::Result<ClientRegistration>;

    async fn start_device_authorization(
        &self,
        client: &ClientRegistration,
        start_url: &str,
    ) -> anyhow::Result<DeviceAuthorization>;

    async fn create_token(
        &self,
        client: &ClientRegistration,
        device_code: &str,
    ) -> anyhow::Result<AccessToken>;
}

/// Where the user completes the browser half of the login.
pub trait UserConsole {
    fn open_url(&self, url: &str) -> io::Result<()>;

    /// Blocks until the user confirms the browser login is done.
    fn wait_for_confirmation(&self) -> io::Result<()>;
}

/// Default browser and stdin.
pub struct Terminal;

impl UserConsole for Terminal {
    fn open_url(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }

    fn wait_for_confirmation(&self) -> io::Result<()> {
        confirm(&mut io::stdout(), &mut io::stdin().lock())
    }
}

const CONFIRMATION_PROMPT: &str = "Press ENTER key once login is done...";

/// Prints the confirmation prompt on its own line and waits for one line of input.
fn confirm(out: &mut impl Write, input: &mut impl BufRead) -> io::Result<()> {
    writeln!(out, "{CONFIRMATION_PROMPT}")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

pub struct AwsSsoOidc {
    client: aws_sdk_ssooidc::Client,
}

impl AwsSsoOidc {
    /// Builds a client for the OIDC endpoint of `region`, or of the
    /// profile's region when `None`.
    pub fn new(config: &SdkConfig, region: Option<&str>) -> Self {
        let mut builder = aws_sdk_ssooidc::config::Builder::from(config);
        if let Some(region) = region {
            builder = builder.region(aws_sdk_ssooidc::config::Region::new(region.to_owned()));
        }
        Self {
            client: aws_sdk_ssooidc::Client::from_conf(builder.build()),
        }
    }
}

fn required(value: Option<&str>, field: &str) -> anyhow::Result<String> {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("AWS returned no {field}"))
}

#[async_trait]
impl SsoOidc for AwsSsoOidc {
    async fn register_client(&self) -> anyhow::Result<ClientRegistration> {
        let resp = self
            .client
            .register_client()
            .client_name(CLIENT_NAME)
            .client_type(CLIENT_TYPE)
            .scopes(PORTAL_SCOPE)
            .send()
            .await
            .map_err(aws_sdk_ssooidc::Error::from)?;

        Ok(ClientRegistration {
            client_id: required(resp.client_id(), "clientId")?,
            client_secret: required(resp.client_secret(), "clientSecret")?,
            client_secret_expires_at: resp.client_secret_expires_at(),
        })
    }

    async fn start_device_authorization(
        &self,
        client: &ClientRegistration,
        start_url: &str,
    ) -> anyhow::Result<DeviceAuthorization> {
        let resp = self
            .client
            .start_device_authorization()
            .client_id(&client.client_id)
            .client_secret(&client.client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(aws_sdk_ssooidc::Error::from)?;

        Ok(DeviceAuthorization {
            device_code: required(resp.device_code(), "deviceCode")?,
            verification_uri_complete: required(
                resp.verification_uri_complete(),
                "verificationUriComplete",
            )?,
        })
    }

    async fn create_token(
        &self,
        client: &ClientRegistration,
        device_code: &str,
    ) -> anyhow::Result<AccessToken> {
        let resp = self
            .client
            .create_token()
            .client_id(&client.client_id)
            .client_secret(&client.client_secret)
            .grant_type(DEVICE_CODE_GRANT_TYPE)
            .device_code(device_code)
            .send()
            .await
            .map_err(aws_sdk_ssooidc::Error::from)
            .context("the browser login may not be complete yet")?;

        Ok(AccessToken {
            access_token: required(resp.access_token(), "accessToken")?,
            expires_in: resp.expires_in(),
        })
    }
}

/// One device login attempt for one profile.
pub struct DeviceLogin<'a, O, C> {
    oidc: &'a O,
    console: &'a C,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, O: SsoOidc + Sync, C: UserConsole + Sync> DeviceLogin<'a, O, C> {
    pub fn new(oidc: &'a O, console: &'a C) -> Self {
        Self {
            oidc,
            console,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the login and writes the token cache file under `cache_dir`.
    ///
    /// Returns the path of the written cache file.
    pub async fn run(&self, sso: &SsoConfig, cache_dir: &Path) -> Result<PathBuf> {
        let profile = sso.profile.as_str();
        info!(
            "Starting SSO login for profile {profile} (account {}, role {}, {})",
            sso.account_id, sso.role_name, sso.start_url
        );

        let client = self.oidc.register_client().await.map_err(|e| {
            Error::workflow(
                profile,
                Step::RegisterClient,
                e.context(format!("sso start url {}", sso.start_url)),
            )
        })?;
        debug!("Registered client for profile {profile}");

        let device = self
            .oidc
            .start_device_authorization(&client, &sso.start_url)
            .await
            .map_err(|e| Error::workflow(profile, Step::StartDeviceAuthorization, e))?;
        let url = device.verification_uri_complete.as_str();

        println!("if browser is not opened automatically, please open link:\n{url}");
        self.console
            .open_url(url)
            .with_context(|| format!("url {url}"))
            .map_err(|e| Error::workflow(profile, Step::OpenBrowser, e))?;

        self.console
            .wait_for_confirmation()
            .map_err(|e| Error::workflow(profile, Step::AwaitConfirmation, e))?;

        let token = self
            .oidc
            .create_token(&client, &device.device_code)
            .await
            .map_err(|e| Error::workflow(profile, Step::CreateToken, e))?;
        let issued_at = (self.clock)();

        let cached = CachedToken {
            start_url: sso.start_url.clone(),
            region: sso.region.clone().unwrap_or_default(),
            access_token: token.access_token,
            expires_at: token_cache::expires_at(issued_at, token.expires_in),
            client_id: client.client_id,
            client_secret: client.client_secret,
            registration_expires_at: token_cache::registration_expires_at(
                client.client_secret_expires_at,
            ),
        };
        let path = cached.write(cache_dir)?;
        info!(
            "SSO token for profile {profile} cached in {} (expires at {})",
            path.display(),
            cached.expires_at
        );

        Ok(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Default)]
    pub(crate) struct FakeOidc {
        pub fail_at: Option<Step>,
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl FakeOidc {
        fn check(&self, step: Step, call: &'static str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail_at == Some(step) {
                return Err(anyhow!("AuthorizationPendingException"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SsoOidc for FakeOidc {
        async fn register_client(&self) -> anyhow::Result<ClientRegistration> {
            self.check(Step::RegisterClient, "register_client")?;
            Ok(ClientRegistration {
                client_id: "client-id".into(),
                client_secret: "client-secret".into(),
                client_secret_expires_at: 1_711_886_400,
            })
        }

        async fn start_device_authorization(
            &self,
            client: &ClientRegistration,
            start_url: &str,
        ) -> anyhow::Result<DeviceAuthorization> {
            self.check(Step::StartDeviceAuthorization, "start_device_authorization")?;
            assert_eq!(client.client_id, "client-id");
            assert_eq!(start_url, "https://x/start");
            Ok(DeviceAuthorization {
                device_code: "device-code".into(),
                verification_uri_complete: "https://device.sso.eu-west-1.amazonaws.com/?user_code=ABCD-EFGH".into(),
            })
        }

        async fn create_token(
            &self,
            client: &ClientRegistration,
            device_code: &str,
        ) -> anyhow::Result<AccessToken> {
            self.check(Step::CreateToken, "create_token")?;
            assert_eq!(client.client_secret, "client-secret");
            assert_eq!(device_code, "device-code");
            Ok(AccessToken {
                access_token: "access-token".into(),
                expires_in: 3600,
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeConsole {
        pub browser_fails: bool,
        pub opened: Mutex<Option<String>>,
        pub confirmed: AtomicBool,
    }

    impl UserConsole for FakeConsole {
        fn open_url(&self, url: &str) -> io::Result<()> {
            if self.browser_fails {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no browser"));
            }
            *self.opened.lock().unwrap() = Some(url.to_owned());
            Ok(())
        }

        fn wait_for_confirmation(&self) -> io::Result<()> {
            self.confirmed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub(crate) fn sso_config() -> SsoConfig {
        SsoConfig {
            profile: "dev-sso".into(),
            start_url: "https://x/start".into(),
            account_id: "111111111111".into(),
            role_name: "Developer".into(),
            region: Some("eu-west-1".into()),
        }
    }

    #[tokio::test]
    async fn writes_cache_file_after_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let oidc = FakeOidc::default();
        let console = FakeConsole::default();

        let path = DeviceLogin::new(&oidc, &console)
            .with_clock(fixed_now)
            .run(&sso_config(), dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join(token_cache::cache_file_name("https://x/start")));
        assert!(console.confirmed.load(Ordering::SeqCst));
        assert_eq!(
            console.opened.lock().unwrap().as_deref(),
            Some("https://device.sso.eu-west-1.amazonaws.com/?user_code=ABCD-EFGH")
        );

        let cached = serde_json::from_slice::<CachedToken>(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            cached,
            CachedToken {
                start_url: "https://x/start".into(),
                region: "eu-west-1".into(),
                access_token: "access-token".into(),
                expires_at: "2024-01-01T13:00:00Z".into(),
                client_id: "client-id".into(),
                client_secret: "client-secret".into(),
                registration_expires_at: "2024-03-31T12:00:00Z".into(),
            }
        );
    }

    #[tokio::test]
    async fn registration_failure_names_start_url() {
        let dir = tempfile::tempdir().unwrap();
        let oidc = FakeOidc {
            fail_at: Some(Step::RegisterClient),
            ..Default::default()
        };
        let console = FakeConsole::default();

        let err = DeviceLogin::new(&oidc, &console)
            .run(&sso_config(), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Workflow { step: Step::RegisterClient, .. }));
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("https://x/start"));
        assert_eq!(*oidc.calls.lock().unwrap(), vec!["register_client"]);
    }

    #[tokio::test]
    async fn browser_failure_aborts_before_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let oidc = FakeOidc::default();
        let console = FakeConsole {
            browser_fails: true,
            ..Default::default()
        };

        let err = DeviceLogin::new(&oidc, &console)
            .run(&sso_config(), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Workflow { step: Step::OpenBrowser, .. }));
        assert!(!console.confirmed.load(Ordering::SeqCst));
        assert!(!oidc.calls.lock().unwrap().contains(&"create_token"));
    }

    #[tokio::test]
    async fn pending_authorization_leaves_no_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let oidc = FakeOidc {
            fail_at: Some(Step::CreateToken),
            ..Default::default()
        };
        let console = FakeConsole::default();

        let err = DeviceLogin::new(&oidc, &console)
            .run(&sso_config(), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Workflow { ref profile, step: Step::CreateToken, .. } if profile == "dev-sso"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn confirmation_prompt_ends_its_line() {
        let mut out = Vec::new();
        let mut input = io::Cursor::new("\nleftover\n");

        confirm(&mut out, &mut input).unwrap();

        assert_eq!(out, b"Press ENTER key once login is done...\n");
        assert_eq!(input.position(), 1);
    }
}
