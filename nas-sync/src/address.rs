//! Resource addresses on the NAS
//!
//! WebDAV targets are absolute URLs, SMB targets are a share name plus a
//! share-relative path. Both are derived from `NasConfig::remote_path`.

use crate::error::{NasError, NasResult};
use crate::models::NasConfig;

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;
pub const SMB_PORT: u16 = 445;

/// Share name and share-relative path of an SMB resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbAddress {
    pub share: String,
    pub path: String,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Brings `remote_path` into `/a/b` form, `/` when absent or empty
pub fn normalize_remote_path(remote_path: Option<&str>) -> String {
    let joined = segments(remote_path.unwrap_or("")).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}

/// Joins two path fragments with exactly one slash between segments
pub fn join_path(base: &str, item: &str) -> String {
    segments(base)
        .chain(segments(item))
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_path(path: &str) -> String {
    segments(path)
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `scheme://host:port` with the port defaulting per scheme
pub fn webdav_base_url(config: &NasConfig) -> String {
    let (scheme, default_port) = if config.use_https {
        ("https", HTTPS_PORT)
    } else {
        ("http", HTTP_PORT)
    };
    let host = config.host.trim().trim_end_matches('/');
    format!("{}://{}:{}", scheme, host, config.port.unwrap_or(default_port))
}

/// URL of the configured remote root directory
pub fn webdav_root_url(config: &NasConfig) -> String {
    webdav_url(config, "")
}

/// URL of an item below the configured remote root
pub fn webdav_url(config: &NasConfig, item: &str) -> String {
    let root = normalize_remote_path(config.remote_path.as_deref());
    format!(
        "{}/{}",
        webdav_base_url(config),
        encode_path(&join_path(&root, item))
    )
}

/// Splits `remote_path` into share name and share-relative path for `item`
pub fn smb_address(config: &NasConfig, item: &str) -> NasResult<SmbAddress> {
    let mut parts = segments(config.remote_path.as_deref().unwrap_or(""));
    let share = parts.next().ok_or(NasError::NoShareName)?.to_string();
    let subpath = parts.collect::<Vec<_>>().join("/");

    Ok(SmbAddress {
        share,
        path: join_path(&subpath, item),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(remote_path: Option<&str>) -> NasConfig {
        NasConfig {
            remote_path: remote_path.map(str::to_string),
            ..NasConfig::new("192.168.1.100", "admin", "secret")
        }
    }

    #[test]
    fn test_webdav_url_with_port() {
        let mut cfg = config(Some("/photos"));
        cfg.port = Some(8080);
        assert_eq!(
            webdav_url(&cfg, "photo.jpg"),
            "http://192.168.1.100:8080/photos/photo.jpg"
        );
    }

    #[test]
    fn test_webdav_url_https_default_port() {
        let mut cfg = config(Some("/photos"));
        cfg.use_https = true;
        assert_eq!(
            webdav_url(&cfg, "photo.jpg"),
            "https://192.168.1.100:443/photos/photo.jpg"
        );
    }

    #[test]
    fn test_webdav_url_http_default_port_and_root() {
        let cfg = config(None);
        assert_eq!(webdav_url(&cfg, "photo.jpg"), "http://192.168.1.100:80/photo.jpg");
        assert_eq!(webdav_root_url(&cfg), "http://192.168.1.100:80/");
    }

    #[test]
    fn test_remote_path_without_leading_slash() {
        let with = config(Some("/photos/2024/"));
        let without = config(Some("photos/2024"));
        assert_eq!(webdav_url(&with, "a.jpg"), webdav_url(&without, "a.jpg"));
        assert_eq!(
            webdav_url(&without, "/a.jpg"),
            "http://192.168.1.100:80/photos/2024/a.jpg"
        );
    }

    #[test]
    fn test_webdav_url_encodes_segments() {
        let cfg = config(Some("/My Photos"));
        assert_eq!(
            webdav_url(&cfg, "beach #1.jpg"),
            "http://192.168.1.100:80/My%20Photos/beach%20%231.jpg"
        );
    }

    #[test]
    fn test_normalize_remote_path() {
        assert_eq!(normalize_remote_path(None), "/");
        assert_eq!(normalize_remote_path(Some("")), "/");
        assert_eq!(normalize_remote_path(Some("//photos//")), "/photos");
    }

    #[test]
    fn test_smb_address_splits_share() {
        let cfg = config(Some("photos/vacation"));
        let address = smb_address(&cfg, "photo.jpg").unwrap();
        assert_eq!(address.share, "photos");
        assert_eq!(address.path, "vacation/photo.jpg");
    }

    #[test]
    fn test_smb_address_share_only() {
        let cfg = config(Some("/photos/"));
        let address = smb_address(&cfg, "photo.jpg").unwrap();
        assert_eq!(address.share, "photos");
        assert_eq!(address.path, "photo.jpg");
    }

    #[test]
    fn test_smb_address_without_share() {
        assert!(matches!(
            smb_address(&config(None), "photo.jpg"),
            Err(NasError::NoShareName)
        ));
        assert!(matches!(
            smb_address(&config(Some("/")), "photo.jpg"),
            Err(NasError::NoShareName)
        ));
    }
}
