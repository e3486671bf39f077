//! # NAS Sync
//!
//! Uploads photos from the local catalog to a user-operated NAS.
//!
//! This crate provides:
//! - Address building for WebDAV URLs and SMB share paths
//! - A WebDAV transport (PROPFIND, PUT, GET, MKCOL) on top of `reqwest`
//! - An SMB transport driving a connect / operate / disconnect session
//! - Protocol selection from the configured port or an explicit protocol
//! - A batch orchestrator with per-item failure tally and progress reporting
//! - Persistence of the last successful sync time
//!
//! ## Separation of Concerns
//!
//! The crate does **not** own the photo catalog, EXIF extraction or the
//! actual SMB wire library. Those are handed in as [`Photo`] records and
//! through the [`MetadataExtractor`] and [`SmbConnector`] traits.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use nas_sync::{NasSyncService, SqliteKeyValueStore, SyncStateStore, TransportSelector};
//!
//! let (webdav, smb) = nas_sync::default_transports("./cache", "/mnt/nas");
//! let state = SyncStateStore::new(Arc::new(SqliteKeyValueStore::open("app.db")?));
//! let service = NasSyncService::new(Arc::new(TransportSelector::new(webdav, smb)), state);
//!
//! let result = service.sync_to_nas(&photos, &config, None).await;
//! println!("{} uploaded, {} failed", result.successful, result.failed);
//! ```

pub mod address;
pub mod auth;
pub mod error;
pub mod media;
pub mod models;
pub mod smb;
pub mod state;
pub mod sync;
pub mod transport;
pub mod webdav;

use std::path::PathBuf;
use std::sync::Arc;

pub use address::{smb_address, webdav_root_url, webdav_url, SmbAddress};
pub use auth::{basic_auth_header, SmbCredentials};
pub use error::{NasError, NasResult};
pub use media::MetadataExtractor;
pub use models::{NasConfig, Photo, PhotoMetadata, Protocol, SyncFailure, SyncResult};
pub use smb::{MountedShareConnector, SmbClient, SmbConnector, SmbSessionParams, SmbTransport};
pub use state::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, SyncStateStore};
pub use sync::{select_photos, NasSyncService, SyncOptions};
pub use transport::{select_protocol, NasTransport, TransportSelector};
pub use webdav::{relative_to_root, WebDavTransport};

pub use tokio_util::sync::CancellationToken;

/// WebDAV plus SMB through OS-mounted shares, both caching downloads in `cache_dir`
pub fn default_transports(
    cache_dir: impl Into<PathBuf>,
    smb_mount_root: impl Into<PathBuf>,
) -> (Arc<WebDavTransport>, Arc<SmbTransport>) {
    let cache_dir = cache_dir.into();
    (
        Arc::new(WebDavTransport::new(cache_dir.clone())),
        Arc::new(SmbTransport::new(
            Arc::new(MountedShareConnector::new(smb_mount_root)),
            cache_dir,
        )),
    )
}
