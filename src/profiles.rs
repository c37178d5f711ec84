//! AWS shared config loading and profile filtering.
//!
//! Only `[profile <name>]` sections carrying an `sso_start_url` key are
//! offered for selection. The `[default]` section and `[sso-session ...]`
//! blocks are never listed.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::debug;

use crate::error::{Error, Result};

const PROFILE_PREFIX: &str = "profile";
const SSO_START_URL: &str = "sso_start_url";
const SSO_ACCOUNT_ID: &str = "sso_account_id";
const SSO_ROLE_NAME: &str = "sso_role_name";
const SSO_REGION: &str = "sso_region";
const REGION: &str = "region";

type Sections = HashMap<String, HashMap<String, Option<String>>>;

/// A named profile with the SSO attributes canu cares about.
///
/// Attributes are kept exactly as found; a key present with an empty value is
/// `Some("")` so that [`Profile::sso`] can report it as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub sso_start_url: Option<String>,
    pub sso_account_id: Option<String>,
    pub sso_role_name: Option<String>,
    pub sso_region: Option<String>,
    pub region: Option<String>,
}

/// The validated SSO attributes of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoConfig {
    pub profile: String,
    pub start_url: String,
    pub account_id: String,
    pub role_name: String,
    /// Region of the SSO OIDC endpoint: `sso_region`, falling back to `region`.
    pub region: Option<String>,
}

impl Profile {
    /// Validates that the SSO attributes needed for a device login are set.
    pub fn sso(&self) -> Result<SsoConfig> {
        let required = |value: &Option<String>, key: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "error, {key} field not found for profile {}",
                        self.name
                    ))
                })
        };

        Ok(SsoConfig {
            profile: self.name.clone(),
            start_url: required(&self.sso_start_url, SSO_START_URL)?,
            account_id: required(&self.sso_account_id, SSO_ACCOUNT_ID)?,
            role_name: required(&self.sso_role_name, SSO_ROLE_NAME)?,
            region: self.oidc_region().map(str::to_owned),
        })
    }

    /// `sso_region`, falling back to `region`.
    pub fn oidc_region(&self) -> Option<&str> {
        non_empty(&self.sso_region).or_else(|| non_empty(&self.region))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// The SSO-enabled profiles of an AWS config file.
#[derive(Debug)]
pub struct AwsConfig {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
}

impl AwsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "error while reading AWS config file from path {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(path, &contents)
    }

    /// Parses config file contents; `path` is only used in messages.
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let sections = Ini::new_cs().read(contents.to_owned()).map_err(|e| {
            Error::Configuration(format!(
                "error while parsing AWS config file {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_sections(path.to_path_buf(), sections))
    }

    fn from_sections(path: PathBuf, sections: Sections) -> Self {
        let profiles = sections
            .into_iter()
            .filter_map(|(section, keys)| {
                let name = profile_name(&section)?;
                if !keys.contains_key(SSO_START_URL) {
                    debug!("Skipping profile {name}: no {SSO_START_URL}");
                    return None;
                }
                let get = |key: &str| keys.get(key).map(|v| v.clone().unwrap_or_default());
                let profile = Profile {
                    name: name.to_owned(),
                    sso_start_url: get(SSO_START_URL),
                    sso_account_id: get(SSO_ACCOUNT_ID),
                    sso_role_name: get(SSO_ROLE_NAME),
                    sso_region: get(SSO_REGION),
                    region: get(REGION),
                };
                Some((profile.name.clone(), profile))
            })
            .collect();

        Self { path, profiles }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile names that survive the include/exclude filters, sorted.
    pub fn selectable(&self, include: &[String], exclude: &[String]) -> Result<Vec<String>> {
        let names = filter_names(self.profiles.keys().map(String::as_str), include, exclude);
        if names.is_empty() {
            return Err(Error::Configuration(format!(
                "no profiles found on file {}",
                self.path.display()
            )));
        }
        Ok(names)
    }
}

/// Returns `name` for a `profile <name>` section header.
fn profile_name(section: &str) -> Option<&str> {
    match section.split(' ').collect::<Vec<_>>().as_slice() {
        [PROFILE_PREFIX, name] if !name.is_empty() => Some(*name),
        _ => None,
    }
}

fn contains_any(name: &str, patterns: &[String]) -> bool {
    let name = name.to_uppercase();
    patterns
        .iter()
        .any(|p| name.contains(&p.to_uppercase()))
}

/// Applies excludes first, then includes (when any), and sorts the result.
///
/// Each name appears at most once, however many includes it matches.
pub fn filter_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    include: &[String],
    exclude: &[String],
) -> Vec<String> {
    let mut selected: Vec<String> = names
        .into_iter()
        .filter(|name| !contains_any(name, exclude))
        .filter(|name| include.is_empty() || contains_any(name, include))
        .map(str::to_owned)
        .collect();
    selected.sort();
    selected.dedup();
    selected
}
