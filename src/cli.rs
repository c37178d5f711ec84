//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// A CLI to switch AWS profiles.
///
/// Lists the SSO-enabled profiles of the AWS config file, lets you pick one,
/// re-runs the SSO device login when its credentials have expired and stores
/// the choice for the `canu` shell alias to export as `AWS_PROFILE`.
#[derive(Parser)]
#[command(name = "_canu", author, version, about)]
pub struct Args {
    #[command(flatten)]
    pub profiles: ProfileArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags shared by the profile selection and `install`.
#[derive(ClapArgs, Clone, Debug)]
pub struct ProfileArgs {
    /// Path with the AWS config file with the defined profiles [default: ~/.aws/config]
    #[arg(short, long, env = "AWS_CONFIG_FILE", global = true)]
    pub config_path: Option<PathBuf>,

    /// Profiles containing any of the includes will be available to select (ignores upper/lower case)
    #[arg(short, long, global = true)]
    pub include: Vec<String>,

    /// Profiles containing any of the excludes will be ignored. Exclude takes preference over include (ignores upper/lower case)
    #[arg(short, long, global = true)]
    pub exclude: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Installs canu aliases
    Install(InstallArgs),
    /// Uninstalls canu aliases
    Uninstall(AliasArgs),
}

#[derive(ClapArgs, Clone, Debug)]
pub struct AliasArgs {
    /// Path to the shell config script [default: ~/.bash_profile]
    #[arg(long = "shell-config")]
    pub shell_config: Option<PathBuf>,

    /// Name of the alias
    #[arg(long, default_value = crate::settings::DEFAULT_ALIAS_NAME)]
    pub alias_name: String,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub alias: AliasArgs,

    /// If provided it won't add an alias to the shell config script
    #[arg(long)]
    pub skip_alias: bool,
}
