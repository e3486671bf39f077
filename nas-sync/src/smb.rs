//! SMB transport
//!
//! Each operation opens its own session: connect, do one thing, disconnect.
//! The wire client sits behind [`SmbClient`] so the session lifecycle can be
//! driven the same way whatever library or OS facility does the actual I/O.

use crate::address::smb_address;
use crate::auth::SmbCredentials;
use crate::error::{NasError, NasResult};
use crate::media::cache_file_name;
use crate::models::{NasConfig, Photo};
use crate::transport::NasTransport;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed to open a session on one share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbSessionParams {
    pub host: String,
    pub credentials: SmbCredentials,
    pub share: String,
}

/// One SMB session bound to a share
#[async_trait]
pub trait SmbClient: Send {
    async fn connect(&mut self) -> NasResult<()>;
    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> NasResult<()>;
    async fn download(&mut self, remote_path: &str, local_path: &Path) -> NasResult<()>;
    async fn disconnect(&mut self) -> NasResult<()>;
}

/// Creates unconnected clients
pub trait SmbConnector: Send + Sync {
    fn client(&self, params: SmbSessionParams) -> Box<dyn SmbClient>;
}

pub struct SmbTransport {
    connector: Arc<dyn SmbConnector>,
    cache_dir: PathBuf,
}

impl SmbTransport {
    pub fn new(connector: Arc<dyn SmbConnector>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            cache_dir: cache_dir.into(),
        }
    }

    fn try_initialize_client(&self, config: &NasConfig) -> NasResult<Box<dyn SmbClient>> {
        config.validate()?;
        let address = smb_address(config, "")?;
        Ok(self.connector.client(SmbSessionParams {
            host: config.host.trim().to_string(),
            credentials: SmbCredentials::from_config(config),
            share: address.share,
        }))
    }

    /// Client bound to the configured share, `None` if no share resolves
    pub fn initialize_client(&self, config: &NasConfig) -> Option<Box<dyn SmbClient>> {
        match self.try_initialize_client(config) {
            Ok(client) => Some(client),
            Err(e) => {
                log::error!("SMB client for {} not created: {}", config.host, e);
                None
            }
        }
    }

    async fn disconnect(client: &mut dyn SmbClient, config: &NasConfig) {
        if let Err(e) = client.disconnect().await {
            log::warn!("SMB disconnect from {} failed: {}", config.host, e);
        }
    }

    pub async fn try_test_connection(&self, config: &NasConfig) -> NasResult<()> {
        let mut client = self.try_initialize_client(config)?;
        client.connect().await?;
        client.disconnect().await
    }

    pub async fn test_connection(&self, config: &NasConfig) -> bool {
        match self.try_test_connection(config).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("SMB connection test against {} failed: {}", config.host, e);
                false
            }
        }
    }

    pub async fn try_upload_photo(&self, photo: &Photo, config: &NasConfig) -> NasResult<()> {
        let target = smb_address(config, &photo.filename)?;
        let local_path = photo.local_path();

        let mut client = self.try_initialize_client(config)?;
        client.connect().await?;
        let result = client.upload(&local_path, &target.path).await;
        Self::disconnect(&mut *client, config).await;
        result?;

        log::info!("Uploaded photo {} to SMB share {}", photo.id, config.host);
        Ok(())
    }

    pub async fn upload_photo(&self, photo: &Photo, config: &NasConfig) -> bool {
        match self.try_upload_photo(photo, config).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Photo {}: SMB upload failed: {}", photo.id, e);
                false
            }
        }
    }

    /// Fetches a share-relative file into the download cache and returns the local path
    pub async fn try_download_to_cache(
        &self,
        remote_path: &str,
        config: &NasConfig,
    ) -> NasResult<PathBuf> {
        let source = smb_address(config, remote_path)?;
        if remote_path.split('/').all(|s| s.trim().is_empty()) {
            return Err(NasError::Configuration("empty remote path".to_string()));
        }
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let local_path = self.cache_dir.join(cache_file_name(remote_path));

        let mut client = self.try_initialize_client(config)?;
        client.connect().await?;
        let result = client.download(&source.path, &local_path).await;
        Self::disconnect(&mut *client, config).await;
        result?;

        Ok(local_path)
    }

    /// Fetches a share-relative file into the download cache and returns its bytes
    pub async fn try_download_photo(&self, remote_path: &str, config: &NasConfig) -> NasResult<Vec<u8>> {
        let local_path = self.try_download_to_cache(remote_path, config).await?;
        Ok(tokio::fs::read(&local_path).await?)
    }

    pub async fn download_photo(&self, remote_path: &str, config: &NasConfig) -> Option<Vec<u8>> {
        match self.try_download_photo(remote_path, config).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::error!("SMB download of {} failed: {}", remote_path, e);
                None
            }
        }
    }
}

#[async_trait]
impl NasTransport for SmbTransport {
    async fn check_connection(&self, config: &NasConfig) -> NasResult<()> {
        self.try_test_connection(config).await
    }

    async fn upload(&self, photo: &Photo, config: &NasConfig) -> NasResult<()> {
        let result = self.try_upload_photo(photo, config).await;
        if let Err(e) = &result {
            log::error!("Photo {}: SMB upload failed: {}", photo.id, e);
        }
        result
    }
}

/// Shares mounted by the operating system under `<mount_root>/<host>/<share>`.
///
/// Authentication already happened at mount time, so the credentials in
/// [`SmbSessionParams`] are not used here.
pub struct MountedShareConnector {
    mount_root: PathBuf,
}

impl MountedShareConnector {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
        }
    }
}

impl SmbConnector for MountedShareConnector {
    fn client(&self, params: SmbSessionParams) -> Box<dyn SmbClient> {
        Box::new(MountedShareClient {
            share_root: self.mount_root.join(&params.host).join(&params.share),
            connected: false,
        })
    }
}

struct MountedShareClient {
    share_root: PathBuf,
    connected: bool,
}

impl MountedShareClient {
    fn resolve(&self, remote_path: &str) -> NasResult<PathBuf> {
        if !self.connected {
            return Err(NasError::Transport("not connected".to_string()));
        }
        let mut path = self.share_root.clone();
        for segment in remote_path.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                return Err(NasError::Transport(format!(
                    "path escapes share: {}",
                    remote_path
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl SmbClient for MountedShareClient {
    async fn connect(&mut self) -> NasResult<()> {
        let metadata = tokio::fs::metadata(&self.share_root).await.map_err(|e| {
            NasError::Transport(format!(
                "share {} not mounted: {}",
                self.share_root.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(NasError::Transport(format!(
                "{} is not a directory",
                self.share_root.display()
            )));
        }
        self.connected = true;
        Ok(())
    }

    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> NasResult<()> {
        let target = self.resolve(remote_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &target).await?;
        Ok(())
    }

    async fn download(&mut self, remote_path: &str, local_path: &Path) -> NasResult<()> {
        let source = self.resolve(remote_path)?;
        tokio::fs::copy(&source, local_path).await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> NasResult<()> {
        self.connected = false;
        Ok(())
    }
}
