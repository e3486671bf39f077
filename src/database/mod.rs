pub mod schema;

use crate::error::AppError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Returns the app directory (database, download cache)
#[cfg(target_os = "android")]
pub fn get_app_directory() -> PathBuf {
    for d in [
        "/data/user/0/de.teilgedanken.photonas/files",
        "/data/data/de.teilgedanken.photonas/files",
    ] {
        let p = PathBuf::from(d);
        if p.exists() {
            return p;
        }
    }
    PathBuf::from("/data/local/tmp/photo-nas")
}

#[cfg(not(target_os = "android"))]
pub fn get_app_directory() -> PathBuf {
    PathBuf::from("./data")
}

/// Default path of the SQLite database
pub fn get_database_path() -> PathBuf {
    get_app_directory().join("photo-nas.db")
}

/// Opens the database at `path` and brings the schema up to date
pub fn init_database(path: &Path) -> Result<Connection, AppError> {
    // Make sure the directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    schema::init_schema(&conn)?;

    log::debug!("Database ready at {}", path.display());
    Ok(conn)
}
