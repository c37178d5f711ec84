//! SSO token cache in the format read by the AWS CLI and SDKs.
//!
//! ```json
//! {
//!   "startUrl": "https://my-sso-portal.awsapps.com/start",
//!   "region": "eu-west-1",
//!   "accessToken": "...",
//!   "expiresAt": "2024-01-01T12:00:00Z",
//!   "clientId": "...",
//!   "clientSecret": "...",
//!   "registrationExpiresAt": "2024-03-31T12:00:00Z"
//! }
//! ```
//!
//! The file lives in `<config dir>/sso/cache` and is named after the SHA-1 of
//! the start URL.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::files::write_private;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expires_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registration_expires_at: String,
}

/// Formats a timestamp the way the SDK cache reader expects it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `issued_at + expires_in` seconds, as an RFC3339 UTC timestamp.
pub fn expires_at(issued_at: DateTime<Utc>, expires_in: i32) -> String {
    format_timestamp(issued_at + TimeDelta::seconds(expires_in.into()))
}

/// Converts the registration's unix expiry to an RFC3339 UTC timestamp.
///
/// Returns an empty string, omitted from the cache file, when the value is
/// out of range.
pub fn registration_expires_at(unix_seconds: i64) -> String {
    DateTime::from_timestamp(unix_seconds, 0)
        .map(format_timestamp)
        .unwrap_or_default()
}

/// `lowercase(hex(sha1(start_url))) + ".json"`
pub fn cache_file_name(start_url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(start_url.as_bytes());
    format!("{}.json", hex::encode(hasher.finalize()))
}

pub fn cache_file_path(cache_dir: &Path, start_url: &str) -> PathBuf {
    cache_dir.join(cache_file_name(start_url))
}

impl CachedToken {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Writes the token to its cache file, replacing any previous one.
    pub fn write(&self, cache_dir: &Path) -> Result<PathBuf> {
        let path = cache_file_path(cache_dir, &self.start_url);
        let data = self
            .to_json()
            .map_err(|e| Error::persistence(&path, e.into()))?;

        fs::create_dir_all(cache_dir).map_err(|e| Error::persistence(cache_dir, e))?;
        write_private(&path, &data).map_err(|e| Error::persistence(&path, e))?;
        Ok(path)
    }
}
