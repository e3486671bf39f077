//! WebDAV transport
//!
//! Every operation is one independent HTTP request carrying a Basic
//! `Authorization` header. Failures are logged and folded into `bool` /
//! `Option` / empty results; the `try_*` variants keep the error for
//! callers that want a reason.

use crate::address::{normalize_remote_path, webdav_root_url, webdav_url};
use crate::auth::basic_auth_header;
use crate::error::{NasError, NasResult};
use crate::media::{
    cache_file_name, mime_type_for, upload_content_type, MetadataExtractor, DEFAULT_DOWNLOAD_NAME,
};
use crate::models::{NasConfig, Photo};
use crate::transport::NasTransport;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

/// WebDAV client for one NAS, stateless between calls
pub struct WebDavTransport {
    cache_dir: PathBuf,
    metadata: Option<Arc<dyn MetadataExtractor>>,
}

impl WebDavTransport {
    /// Downloads are written below `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            metadata: None,
        }
    }

    /// Attach the EXIF collaborator used for downloaded images
    pub fn with_metadata_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.metadata = Some(extractor);
        self
    }

    fn client(&self, config: &NasConfig) -> NasResult<reqwest::Client> {
        let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout)))
            .user_agent(concat!("nas-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NasError::Transport(format!("Client build failed: {}", e)))
    }

    fn request(&self, config: &NasConfig, method: Method, url: &str) -> NasResult<RequestBuilder> {
        config.validate()?;
        Ok(self
            .client(config)?
            .request(method, url)
            .header(AUTHORIZATION, basic_auth_header(&config.username, &config.password)))
    }

    fn propfind(&self, config: &NasConfig, depth: &str) -> NasResult<RequestBuilder> {
        Ok(self
            .request(config, dav_method(b"PROPFIND")?, &webdav_root_url(config))?
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY))
    }

    /// PROPFIND `Depth: 0` on the remote root; 200 and 207 count as reachable
    pub async fn try_test_connection(&self, config: &NasConfig) -> NasResult<()> {
        let response = self.propfind(config, "0")?.send().await?;
        expect_status("PROPFIND", response.status().as_u16(), &[200, 207])
    }

    pub async fn test_connection(&self, config: &NasConfig) -> bool {
        match self.try_test_connection(config).await {
            Ok(()) => {
                log::info!("WebDAV connection to {} OK", config.host);
                true
            }
            Err(e) => {
                log::warn!("WebDAV connection test against {} failed: {}", config.host, e);
                false
            }
        }
    }

    /// PUT the photo's bytes to `<remote root>/<filename>`
    pub async fn try_upload_photo(&self, photo: &Photo, config: &NasConfig) -> NasResult<()> {
        config.validate()?;
        let data = tokio::fs::read(photo.local_path()).await?;
        let url = webdav_url(config, &photo.filename);

        let response = self
            .request(config, Method::PUT, &url)?
            .header(CONTENT_TYPE, upload_content_type(&photo.mime_type))
            .body(data)
            .send()
            .await?;
        expect_status("PUT", response.status().as_u16(), &[200, 201, 204])?;

        log::info!("Uploaded photo {} to {}", photo.id, url);
        Ok(())
    }

    pub async fn upload_photo(&self, photo: &Photo, config: &NasConfig) -> bool {
        match self.try_upload_photo(photo, config).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Photo {}: WebDAV upload failed: {}", photo.id, e);
                false
            }
        }
    }

    /// GET an item below the remote root into the download cache
    pub async fn try_download_photo(
        &self,
        remote_item_path: &str,
        config: &NasConfig,
    ) -> NasResult<Photo> {
        let url = webdav_url(config, remote_item_path);
        let response = self.request(config, Method::GET, &url)?.send().await?;
        expect_status("GET", response.status().as_u16(), &[200])?;
        let bytes = response.bytes().await?;

        let filename = download_filename(remote_item_path);
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let local_path = self.cache_dir.join(&filename);
        tokio::fs::write(&local_path, &bytes).await?;

        let mime_type = mime_type_for(&filename);
        let metadata = if mime_type.starts_with("image/") {
            self.extract_metadata(&local_path)
        } else {
            None
        };

        log::info!("Downloaded {} to {}", url, local_path.display());
        Ok(Photo {
            id: uuid::Uuid::new_v4().to_string(),
            uri: format!("file://{}", local_path.display()),
            filename,
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            is_favorite: false,
            metadata,
        })
    }

    pub async fn download_photo(&self, remote_item_path: &str, config: &NasConfig) -> Option<Photo> {
        match self.try_download_photo(remote_item_path, config).await {
            Ok(photo) => Some(photo),
            Err(e) => {
                log::error!("WebDAV download of {} failed: {}", remote_item_path, e);
                None
            }
        }
    }

    fn extract_metadata(&self, path: &Path) -> Option<crate::models::PhotoMetadata> {
        let extractor = self.metadata.as_ref()?;
        match extractor.extract(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Metadata extraction for {} failed: {}", path.display(), e);
                None
            }
        }
    }

    /// MKCOL on the remote root; 405 means it already exists
    pub async fn try_create_remote_directory(&self, config: &NasConfig) -> NasResult<()> {
        let response = self
            .request(config, dav_method(b"MKCOL")?, &webdav_root_url(config))?
            .send()
            .await?;
        expect_status("MKCOL", response.status().as_u16(), &[201, 405])
    }

    pub async fn create_remote_directory(&self, config: &NasConfig) -> bool {
        match self.try_create_remote_directory(config).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Creating remote directory failed: {}", e);
                false
            }
        }
    }

    /// PROPFIND `Depth: 1`; file hrefs of the multistatus answer
    pub async fn try_list_remote_files(&self, config: &NasConfig) -> NasResult<Vec<String>> {
        let response = self.propfind(config, "1")?.send().await?;
        expect_status("PROPFIND", response.status().as_u16(), &[207])?;
        let body = response.text().await?;
        parse_file_hrefs(&body)
    }

    pub async fn list_remote_files(&self, config: &NasConfig) -> Vec<String> {
        match self.try_list_remote_files(config).await {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Listing remote files failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl NasTransport for WebDavTransport {
    async fn check_connection(&self, config: &NasConfig) -> NasResult<()> {
        self.try_test_connection(config).await
    }

    async fn upload(&self, photo: &Photo, config: &NasConfig) -> NasResult<()> {
        let result = self.try_upload_photo(photo, config).await;
        if let Err(e) = &result {
            log::error!("Photo {}: WebDAV upload failed: {}", photo.id, e);
        }
        result
    }
}

fn dav_method(name: &'static [u8]) -> NasResult<Method> {
    Method::from_bytes(name).map_err(|e| NasError::Transport(format!("invalid method: {}", e)))
}

fn expect_status(operation: &'static str, status: u16, accepted: &[u16]) -> NasResult<()> {
    if accepted.contains(&status) {
        Ok(())
    } else {
        Err(NasError::Protocol { operation, status })
    }
}

fn download_filename(remote_item_path: &str) -> String {
    let last = remote_item_path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() {
        return DEFAULT_DOWNLOAD_NAME.to_string();
    }
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    cache_file_name(&decoded)
}

/// Maps an href from a listing back to a path below the remote root
pub fn relative_to_root(config: &NasConfig, href: &str) -> String {
    let path = match href.find("://") {
        Some(idx) => {
            let rest = &href[idx + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => href,
    };
    let decoded = urlencoding::decode(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let root = normalize_remote_path(config.remote_path.as_deref());
    let relative = if root == "/" {
        decoded.as_str()
    } else {
        match decoded.strip_prefix(&root) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => decoded.as_str(),
        }
    };
    relative.trim_start_matches('/').to_string()
}

/// Collects every `href` of a multistatus body that is not a collection
fn parse_file_hrefs(xml: &str) -> NasResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut hrefs = Vec::new();
    let mut in_href = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"href" => in_href = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"href" => in_href = false,
            Ok(Event::Text(text)) if in_href => {
                let href = text
                    .unescape()
                    .map_err(|e| NasError::Transport(format!("Invalid href: {}", e)))?;
                let href = href.trim();
                if !href.is_empty() && !href.ends_with('/') {
                    hrefs.push(href.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(NasError::Transport(format!(
                    "Malformed PROPFIND response at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }
    Ok(hrefs)
}
