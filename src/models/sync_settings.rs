use nas_sync::NasConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Contents of the `photo-nas.toml` settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Where downloaded photos are written
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Directory under which SMB shares are mounted as `<host>/<share>`
    #[serde(default = "default_smb_mount_root")]
    pub smb_mount_root: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub nas: NasConfig,
}

impl SyncSettings {
    pub fn new(nas: NasConfig) -> Self {
        Self {
            nas,
            database_path: default_database_path(),
            cache_dir: default_cache_dir(),
            smb_mount_root: default_smb_mount_root(),
            concurrency: default_concurrency(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn default_database_path() -> PathBuf {
    crate::database::get_database_path()
}

fn default_cache_dir() -> PathBuf {
    crate::database::get_app_directory().join("cache")
}

fn default_smb_mount_root() -> PathBuf {
    PathBuf::from("/mnt")
}

fn default_concurrency() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_settings_file() {
        let settings = SyncSettings::from_toml(
            r#"
            [nas]
            host = "192.168.1.100"
            port = 445
            username = "admin"
            password = "secret"
            remotePath = "photos/phone"
            "#,
        )
        .unwrap();

        assert_eq!(settings.nas.port, Some(445));
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.smb_mount_root, PathBuf::from("/mnt"));
        assert!(settings.database_path.ends_with("photo-nas.db"));
    }

    #[test]
    fn test_settings_round_trip_through_toml() {
        let mut settings = SyncSettings::new(NasConfig::new("nas", "admin", "secret"));
        settings.concurrency = 4;
        let text = settings.to_toml().unwrap();
        assert_eq!(SyncSettings::from_toml(&text).unwrap(), settings);
    }

    #[test]
    fn test_missing_nas_table_is_error() {
        assert!(SyncSettings::from_toml("concurrency = 2").is_err());
    }
}
