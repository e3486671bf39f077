//! Transport abstraction and protocol selection

use crate::address::SMB_PORT;
use crate::error::NasResult;
use crate::models::{NasConfig, Photo, Protocol};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the orchestrator needs from either wire protocol
#[async_trait]
pub trait NasTransport: Send + Sync {
    /// Verifies that the NAS is reachable with the configured credentials
    async fn check_connection(&self, config: &NasConfig) -> NasResult<()>;

    /// Transfers one photo to the configured remote root
    async fn upload(&self, photo: &Photo, config: &NasConfig) -> NasResult<()>;
}

/// Picks the wire protocol for a configuration.
///
/// An explicit `protocol` wins; otherwise port 445 means SMB and anything
/// else (including no port) means WebDAV.
pub fn select_protocol(config: &NasConfig) -> Protocol {
    if let Some(protocol) = config.protocol {
        return protocol;
    }
    if config.port == Some(SMB_PORT) {
        Protocol::Smb
    } else {
        Protocol::WebDav
    }
}

/// Routes every call to the transport matching the configuration
#[derive(Clone)]
pub struct TransportSelector {
    webdav: Arc<dyn NasTransport>,
    smb: Arc<dyn NasTransport>,
}

impl TransportSelector {
    pub fn new(webdav: Arc<dyn NasTransport>, smb: Arc<dyn NasTransport>) -> Self {
        Self { webdav, smb }
    }

    pub fn transport_for(&self, config: &NasConfig) -> &Arc<dyn NasTransport> {
        match select_protocol(config) {
            Protocol::WebDav => &self.webdav,
            Protocol::Smb => &self.smb,
        }
    }

    /// `true` when the selected transport can reach the NAS
    pub async fn test_connection(&self, config: &NasConfig) -> bool {
        match self.check_connection(config).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{} connection test failed: {}", select_protocol(config), e);
                false
            }
        }
    }

    /// Single-item upload through the selected transport
    pub async fn upload_photo(&self, photo: &Photo, config: &NasConfig) -> bool {
        self.upload(photo, config).await.is_ok()
    }
}

#[async_trait]
impl NasTransport for TransportSelector {
    async fn check_connection(&self, config: &NasConfig) -> NasResult<()> {
        self.transport_for(config).check_connection(config).await
    }

    async fn upload(&self, photo: &Photo, config: &NasConfig) -> NasResult<()> {
        self.transport_for(config).upload(photo, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NasError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        ok: bool,
    }

    #[async_trait]
    impl NasTransport for Recorder {
        async fn check_connection(&self, _config: &NasConfig) -> NasResult<()> {
            self.calls.lock().unwrap().push("check".to_string());
            if self.ok {
                Ok(())
            } else {
                Err(NasError::Transport("refused".to_string()))
            }
        }

        async fn upload(&self, photo: &Photo, _config: &NasConfig) -> NasResult<()> {
            self.calls.lock().unwrap().push(photo.id.clone());
            Ok(())
        }
    }

    fn photo(id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            uri: format!("/tmp/{}.jpg", id),
            filename: format!("{}.jpg", id),
            mime_type: "image/jpeg".to_string(),
            size: 1,
            is_favorite: false,
            metadata: None,
        }
    }

    #[test]
    fn test_select_protocol_by_port() {
        let mut config = NasConfig::new("nas", "u", "p");
        assert_eq!(select_protocol(&config), Protocol::WebDav);

        config.port = Some(445);
        assert_eq!(select_protocol(&config), Protocol::Smb);

        config.port = Some(8080);
        assert_eq!(select_protocol(&config), Protocol::WebDav);
    }

    #[test]
    fn test_explicit_protocol_overrides_port() {
        let mut config = NasConfig::new("nas", "u", "p");
        config.port = Some(445);
        config.protocol = Some(Protocol::WebDav);
        assert_eq!(select_protocol(&config), Protocol::WebDav);

        config.port = Some(8080);
        config.protocol = Some(Protocol::Smb);
        assert_eq!(select_protocol(&config), Protocol::Smb);
    }

    #[tokio::test]
    async fn test_selector_routes_upload() {
        let webdav = Arc::new(Recorder {
            ok: true,
            ..Default::default()
        });
        let smb = Arc::new(Recorder {
            ok: true,
            ..Default::default()
        });
        let selector = TransportSelector::new(webdav.clone(), smb.clone());

        let mut config = NasConfig::new("nas", "u", "p");
        config.port = Some(445);
        assert!(selector.upload_photo(&photo("1"), &config).await);

        config.port = None;
        assert!(selector.upload_photo(&photo("2"), &config).await);

        assert_eq!(*smb.calls.lock().unwrap(), vec!["1".to_string()]);
        assert_eq!(*webdav.calls.lock().unwrap(), vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn test_selector_connection_failure_is_false() {
        let selector = TransportSelector::new(
            Arc::new(Recorder::default()),
            Arc::new(Recorder::default()),
        );
        let config = NasConfig::new("nas", "u", "p");
        assert!(!selector.test_connection(&config).await);
        assert!(!selector.test_connection(&config).await);
    }
}
