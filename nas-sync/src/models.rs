use crate::error::{NasError, NasResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wire protocol used to reach the NAS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    WebDav,
    Smb,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::WebDav => write!(f, "WebDAV"),
            Protocol::Smb => write!(f, "SMB"),
        }
    }
}

/// Connection settings for one NAS device.
///
/// Field names follow the settings file format (`useHttps`, `remotePath`,
/// ...); snake_case spellings are accepted as well.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NasConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "use_https")]
    pub use_https: bool,
    #[serde(default, alias = "remote_path")]
    pub remote_path: Option<String>,
    #[serde(default, alias = "sync_favorites_only")]
    pub sync_favorites_only: bool,
    /// Overrides port-based protocol detection when set
    #[serde(default)]
    pub protocol: Option<Protocol>,
    /// Total deadline for a single WebDAV request
    #[serde(default, alias = "timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for NasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NasConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_https", &self.use_https)
            .field("remote_path", &self.remote_path)
            .field("sync_favorites_only", &self.sync_favorites_only)
            .field("protocol", &self.protocol)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NasConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Checks the fields every transfer needs before anything touches the network
    pub fn validate(&self) -> NasResult<()> {
        if self.host.trim().is_empty() {
            return Err(NasError::Configuration("host is missing".to_string()));
        }
        if self.username.is_empty() {
            return Err(NasError::Configuration("username is missing".to_string()));
        }
        if self.password.is_empty() {
            return Err(NasError::Configuration("password is missing".to_string()));
        }
        Ok(())
    }
}

/// Metadata the EXIF collaborator may attach to a downloaded photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub camera: Option<String>,
}

/// A photo from the local catalog. The sync engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    /// Local file location, either a plain path or a `file://` URI
    pub uri: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PhotoMetadata>,
}

impl Photo {
    /// Local filesystem path with any `file://` scheme removed
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.uri.strip_prefix("file://").unwrap_or(&self.uri))
    }
}

/// One photo that could not be transferred
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncFailure {
    pub photo_id: String,
    pub reason: String,
}

/// Outcome of one sync batch.
///
/// `successful + failed` always equals the number of photos the batch
/// started, and `failures` holds one entry per failed photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
    /// Set when the batch stopped early because it was cancelled
    pub cancelled: bool,
}

impl SyncResult {
    pub fn processed(&self) -> usize {
        self.successful + self.failed
    }
}
