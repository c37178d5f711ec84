//! canu: switch AWS profiles
//!
//! Lists the SSO profiles of the AWS config file, lets the user pick one and
//! makes sure it has working credentials before saving the choice for the
//! `canu` shell alias.
//!
//! 1. Parses command-line arguments into [`settings::Settings`]
//! 2. Shows a menu with the filtered, sorted SSO profiles
//! 3. Checks the chosen profile with `sts get-caller-identity`
//! 4. Runs the SSO device login when the credentials have expired
//! 5. Writes the profile name to `~/.canu`
//!
//! `install` and `uninstall` manage the alias and the script behind it.

use anyhow::Result;
use clap::Parser;

mod cli;
mod credentials;
mod error;
mod files;
mod install;
mod profiles;
mod selector;
mod settings;
mod sso_login;
mod switcher;
mod token_cache;

use cli::{Args, Command};
use settings::{AliasSettings, Settings};
use switcher::ProfileSwitcher;

/// Everything runs sequentially on one thread; the only wait is for the user
/// to confirm the browser login.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // INFO by default, RUST_LOG overrides
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Args { profiles, command } = Args::parse();
    let settings = Settings::new(profiles)?;

    match command {
        None => ProfileSwitcher::new(&settings)?.run().await,
        Some(Command::Install(args)) => {
            let alias = AliasSettings::new(args.alias, args.skip_alias, &settings.home)?;
            install::install(&settings, &alias)
        }
        Some(Command::Uninstall(args)) => {
            let alias = AliasSettings::new(args, false, &settings.home)?;
            install::uninstall(&alias)
        }
    }
}
