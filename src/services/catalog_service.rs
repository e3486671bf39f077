//! Local photo catalog backed by the `photos` table

use crate::error::AppError;
use nas_sync::media::is_raw_file;
use nas_sync::Photo;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use walkdir::WalkDir;

fn photo_from_row(row: &Row) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        uri: row.get(1)?,
        filename: row.get(2)?,
        mime_type: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        is_favorite: row.get(5)?,
        metadata: None,
    })
}

/// MIME type for a file that belongs in the catalog, `None` for everything else
fn photo_mime_type(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if is_raw_file(name) {
        return Some("image/x-raw".to_string());
    }
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}

/// Adds every image below `dir` to the catalog. Files already present (same
/// location) are skipped. Returns the number of new photos.
pub fn import_directory(conn: &Connection, dir: &Path) -> Result<usize, AppError> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!("Directory {}", dir.display())));
    }

    let mut imported = 0;
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(mime_type) = photo_mime_type(path) else {
            log::debug!("Not a photo: {}", path.display());
            continue;
        };

        let absolute = std::fs::canonicalize(path)?;
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let filename = entry.file_name().to_string_lossy().into_owned();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO photos (id, uri, filename, mime_type, size)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                format!("file://{}", absolute.display()),
                filename,
                mime_type,
                size as i64
            ],
        )?;
        imported += inserted;
    }

    log::info!("Imported {} photos from {}", imported, dir.display());
    Ok(imported)
}

/// All photos in import order
pub fn list_photos(conn: &Connection) -> Result<Vec<Photo>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, uri, filename, mime_type, size, is_favorite
         FROM photos
         ORDER BY created_at, rowid",
    )?;
    let photos = stmt
        .query_map([], photo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(photos)
}

pub fn get_photo(conn: &Connection, id: &str) -> Result<Photo, AppError> {
    conn.query_row(
        "SELECT id, uri, filename, mime_type, size, is_favorite FROM photos WHERE id = ?1",
        params![id],
        photo_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("Photo {}", id)))
}

/// Marks or unmarks a photo as favorite
pub fn set_favorite(conn: &Connection, id: &str, is_favorite: bool) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE photos SET is_favorite = ?1 WHERE id = ?2",
        params![is_favorite, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Photo {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        conn
    }

    fn photo_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IMG_0001.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        std::fs::create_dir(dir.path().join("raw")).unwrap();
        std::fs::write(dir.path().join("raw").join("DSC_0002.NEF"), b"nikon raw").unwrap();
        std::fs::write(dir.path().join("raw").join("edit.png"), b"png").unwrap();
        dir
    }

    #[test]
    fn test_import_directory_picks_images() {
        let conn = setup_test_db();
        let dir = photo_dir();

        assert_eq!(import_directory(&conn, dir.path()).unwrap(), 3);

        let photos = list_photos(&conn).unwrap();
        assert_eq!(photos.len(), 3);
        let raw = photos.iter().find(|p| p.filename == "DSC_0002.NEF").unwrap();
        assert_eq!(raw.mime_type, "image/x-raw");
        assert_eq!(raw.size, 9);
        assert!(raw.uri.starts_with("file://"));
        assert!(raw.local_path().exists());
        let png = photos.iter().find(|p| p.filename == "edit.png").unwrap();
        assert_eq!(png.mime_type, "image/png");
    }

    #[test]
    fn test_import_twice_skips_known_files() {
        let conn = setup_test_db();
        let dir = photo_dir();

        import_directory(&conn, dir.path()).unwrap();
        assert_eq!(import_directory(&conn, dir.path()).unwrap(), 0);
        assert_eq!(list_photos(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_import_missing_directory() {
        let conn = setup_test_db();
        let result = import_directory(&conn, Path::new("/does/not/exist"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_set_favorite() {
        let conn = setup_test_db();
        let dir = photo_dir();
        import_directory(&conn, dir.path()).unwrap();

        let id = list_photos(&conn).unwrap()[0].id.clone();
        set_favorite(&conn, &id, true).unwrap();
        assert!(get_photo(&conn, &id).unwrap().is_favorite);

        set_favorite(&conn, &id, false).unwrap();
        assert!(!get_photo(&conn, &id).unwrap().is_favorite);

        assert!(matches!(
            set_favorite(&conn, "unknown", true),
            Err(AppError::NotFound(_))
        ));
    }
}
