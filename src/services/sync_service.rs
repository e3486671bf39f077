use crate::error::AppError;
use crate::models::SyncSettings;
use crate::services::catalog_service;
use chrono::{DateTime, Utc};
use nas_sync::{
    CancellationToken, NasConfig, NasSyncService, SmbTransport, SqliteKeyValueStore, SyncOptions, SyncResult,
    SyncStateStore, TransportSelector, WebDavTransport,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Loads the synchronization settings from a TOML file
pub fn load_sync_settings(path: &Path) -> Result<SyncSettings, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(SyncSettings::from_toml(&text)?)
}

/// Writes a settings file for `nas`, refusing to replace an existing one unless `force`
pub fn write_settings_template(path: &Path, nas: NasConfig, force: bool) -> Result<(), AppError> {
    if path.exists() && !force {
        return Err(AppError::Validation(format!(
            "{} already exists",
            path.display()
        )));
    }
    let text = SyncSettings::new(nas).to_toml()?;
    std::fs::write(path, text)?;
    log::info!("Wrote settings to {}", path.display());
    Ok(())
}

/// Transports, state store and orchestrator wired for one settings file
pub struct NasContext {
    pub settings: SyncSettings,
    pub webdav: Arc<WebDavTransport>,
    pub smb: Arc<SmbTransport>,
    pub service: NasSyncService,
}

impl NasContext {
    pub fn new(settings: SyncSettings) -> Result<Self, AppError> {
        let state = SyncStateStore::new(Arc::new(SqliteKeyValueStore::open(
            &settings.database_path,
        )?));
        Self::with_state(settings, state)
    }

    pub fn with_state(settings: SyncSettings, state: SyncStateStore) -> Result<Self, AppError> {
        let (webdav, smb) = nas_sync::default_transports(
            settings.cache_dir.clone(),
            settings.smb_mount_root.clone(),
        );
        let selector = TransportSelector::new(webdav.clone(), smb.clone());
        let service = NasSyncService::new(Arc::new(selector), state).with_options(SyncOptions {
            concurrency: settings.concurrency.max(1),
        });

        Ok(Self {
            settings,
            webdav,
            smb,
            service,
        })
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.service.state().get_last_sync_time()
    }
}

/// Uploads the catalog to the NAS and logs progress per photo
pub async fn sync_catalog(
    conn: &Connection,
    context: &NasContext,
    favorites_only: bool,
    cancel: &CancellationToken,
) -> Result<SyncResult, AppError> {
    let mut config = context.settings.nas.clone();
    config.sync_favorites_only |= favorites_only;
    config.validate()?;

    let photos = catalog_service::list_photos(conn)?;
    let on_progress = |done: usize, total: usize| {
        log::info!("Synced {}/{}", done, total);
    };

    Ok(context
        .service
        .sync_with_cancel(&photos, &config, Some(&on_progress), cancel)
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nas_sync::MemoryKeyValueStore;

    fn context(dir: &Path, nas: NasConfig) -> NasContext {
        let mut settings = SyncSettings::new(nas);
        settings.cache_dir = dir.join("cache");
        settings.smb_mount_root = dir.join("mnt");
        NasContext::with_state(
            settings,
            SyncStateStore::new(Arc::new(MemoryKeyValueStore::default())),
        )
        .unwrap()
    }

    #[test]
    fn test_load_sync_settings_missing_file() {
        let result = load_sync_settings(Path::new("/nonexistent/photo-nas.toml"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_sync_catalog_rejects_incomplete_settings() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();

        let ctx = context(dir.path(), NasConfig::new("nas.local", "", ""));
        let result = sync_catalog(&conn, &ctx, false, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(AppError::Sync(nas_sync::NasError::Configuration(_)))
        ));
    }

    #[tokio::test]
    async fn test_sync_catalog_to_mounted_share() {
        let dir = tempfile::tempdir().unwrap();
        let share = dir.path().join("mnt").join("nas.local").join("photos");
        std::fs::create_dir_all(&share).unwrap();

        let library = dir.path().join("library");
        std::fs::create_dir_all(&library).unwrap();
        std::fs::write(library.join("a.jpg"), b"a").unwrap();
        std::fs::write(library.join("b.jpg"), b"b").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        catalog_service::import_directory(&conn, &library).unwrap();
        let favorite = catalog_service::list_photos(&conn)
            .unwrap()
            .into_iter()
            .find(|p| p.filename == "b.jpg")
            .unwrap();
        catalog_service::set_favorite(&conn, &favorite.id, true).unwrap();

        let nas = NasConfig {
            port: Some(445),
            remote_path: Some("photos/phone".to_string()),
            ..NasConfig::new("nas.local", "admin", "secret")
        };
        let ctx = context(dir.path(), nas);
        assert!(ctx.last_sync().is_none());

        let result = sync_catalog(&conn, &ctx, true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.successful, 1);
        assert_eq!(result.failed, 0);
        assert!(share.join("phone").join("b.jpg").exists());
        assert!(!share.join("phone").join("a.jpg").exists());
        assert!(ctx.last_sync().is_some());
    }

    #[tokio::test]
    async fn test_context_downloads_smb_file_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let share = dir.path().join("mnt").join("nas.local").join("photos");
        std::fs::create_dir_all(share.join("2024")).unwrap();
        std::fs::write(share.join("2024").join("c.jpg"), b"ccc").unwrap();

        let nas = NasConfig {
            port: Some(445),
            remote_path: Some("photos".to_string()),
            ..NasConfig::new("nas.local", "admin", "secret")
        };
        let ctx = context(dir.path(), nas);
        let local = ctx
            .smb
            .try_download_to_cache("2024/c.jpg", &ctx.settings.nas)
            .await
            .unwrap();

        assert_eq!(local, dir.path().join("cache").join("c.jpg"));
        assert_eq!(std::fs::read(&local).unwrap(), b"ccc");
    }

    #[test]
    fn test_settings_template_is_loadable_and_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo-nas.toml");
        let mut nas = NasConfig::new("nas.local", "admin", "secret");
        nas.port = Some(445);
        nas.remote_path = Some("photos".to_string());

        write_settings_template(&path, nas.clone(), false).unwrap();
        let settings = load_sync_settings(&path).unwrap();
        assert_eq!(settings.nas, nas);

        let again = write_settings_template(&path, NasConfig::new("other", "u", "p"), false);
        assert!(matches!(again, Err(AppError::Validation(_))));
        assert_eq!(load_sync_settings(&path).unwrap().nas.host, "nas.local");

        write_settings_template(&path, NasConfig::new("other", "u", "p"), true).unwrap();
        assert_eq!(load_sync_settings(&path).unwrap().nas.host, "other");
    }
}
