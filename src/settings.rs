//! Resolved run configuration.
//!
//! Built once from the command line and passed by reference to every
//! operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};

use crate::cli::{AliasArgs, ProfileArgs};

pub const DEFAULT_RELATIVE_CONFIG_PATH: &str = ".aws/config";
pub const SAVE_PROFILE_FILE_NAME: &str = ".canu";
pub const DEFAULT_SHELL_CONFIG_SCRIPT: &str = ".bash_profile";
pub const DEFAULT_ALIAS_NAME: &str = "canu";

#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub home: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Settings {
    pub fn new(args: ProfileArgs) -> Result<Self> {
        let home = dirs::home_dir().context(
            "error while getting the home directory, please configure your $HOME variable before running canu",
        )?;
        Self::with_home(args, home)
    }

    pub fn with_home(args: ProfileArgs, home: PathBuf) -> Result<Self> {
        let config_path = args
            .config_path
            .unwrap_or_else(|| home.join(DEFAULT_RELATIVE_CONFIG_PATH));
        ensure!(
            !config_path.as_os_str().is_empty(),
            "config-path for AWS config file is empty"
        );

        Ok(Self {
            config_path,
            home,
            include: args.include,
            exclude: args.exclude,
        })
    }

    /// File the selected profile name is written to.
    pub fn marker_path(&self) -> PathBuf {
        self.home.join(SAVE_PROFILE_FILE_NAME)
    }

    /// Directory the SDK reads cached SSO tokens from, next to the config file.
    pub fn sso_cache_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("sso")
            .join("cache")
    }
}

/// Settings for the `install` and `uninstall` commands.
#[derive(Debug, Clone)]
pub struct AliasSettings {
    pub alias_name: String,
    pub shell_config: PathBuf,
    pub skip_alias: bool,
}

impl AliasSettings {
    pub fn new(args: AliasArgs, skip_alias: bool, home: &Path) -> Result<Self> {
        let alias_name = args.alias_name.trim().to_owned();
        ensure!(!alias_name.is_empty(), "an alias name is required");

        Ok(Self {
            alias_name,
            shell_config: args
                .shell_config
                .unwrap_or_else(|| home.join(DEFAULT_SHELL_CONFIG_SCRIPT)),
            skip_alias,
        })
    }
}
