//! File type detection and the EXIF collaborator seam

use crate::error::NasResult;
use crate::models::PhotoMetadata;
use std::path::{Component, Path};

/// Extensions of camera RAW formats
pub const RAW_EXTENSIONS: &[&str] = &[
    "dng", "cr2", "cr3", "nef", "arw", "orf", "rw2", "raf", "pef", "srw",
];

pub const DEFAULT_UPLOAD_TYPE: &str = "application/octet-stream";

/// Local name used when a remote item has no usable file name
pub const DEFAULT_DOWNLOAD_NAME: &str = "downloaded.jpg";

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_raw_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| RAW_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type of a downloaded file, guessed from its extension
pub fn mime_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("png") => "image/png",
        Some(ext) if RAW_EXTENSIONS.contains(&ext) => "image/x-raw",
        _ => "image/jpeg",
    }
}

/// File name a downloaded item gets inside the cache directory.
///
/// Only the final path component is kept. `.`, `..` and empty names fall
/// back to [`DEFAULT_DOWNLOAD_NAME`].
pub fn cache_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.ends_with(['/', '\\']) {
        return DEFAULT_DOWNLOAD_NAME.to_string();
    }
    match Path::new(trimmed).components().next_back() {
        Some(Component::Normal(last)) => last
            .to_str()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_DOWNLOAD_NAME)
            .to_string(),
        _ => DEFAULT_DOWNLOAD_NAME.to_string(),
    }
}

/// Content-Type to send for an upload
pub fn upload_content_type(mime_type: &str) -> &str {
    if mime_type.trim().is_empty() {
        DEFAULT_UPLOAD_TYPE
    } else {
        mime_type
    }
}

/// Reads capture metadata from an image file.
///
/// Implemented outside this crate; `Ok(None)` means the file carried nothing
/// useful.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> NasResult<Option<PhotoMetadata>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name_stays_in_cache() {
        assert_eq!(cache_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(cache_file_name("2024/photo.jpg"), "photo.jpg");
        assert_eq!(cache_file_name("../escaped.jpg"), "escaped.jpg");
        assert_eq!(cache_file_name("/etc/passwd"), "passwd");
        assert_eq!(cache_file_name(".."), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(cache_file_name("a/.."), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(cache_file_name("."), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(cache_file_name(""), DEFAULT_DOWNLOAD_NAME);
        assert_eq!(cache_file_name("dir/"), DEFAULT_DOWNLOAD_NAME);
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("a.png"), "image/png");
        assert_eq!(mime_type_for("A.PNG"), "image/png");
        assert_eq!(mime_type_for("IMG_1.CR2"), "image/x-raw");
        assert_eq!(mime_type_for("shot.dng"), "image/x-raw");
        assert_eq!(mime_type_for("photo.jpg"), "image/jpeg");
        assert_eq!(mime_type_for("noext"), "image/jpeg");
    }

    #[test]
    fn test_upload_content_type_default() {
        assert_eq!(upload_content_type(""), DEFAULT_UPLOAD_TYPE);
        assert_eq!(upload_content_type("image/heic"), "image/heic");
    }

    #[test]
    fn test_is_raw_file() {
        assert!(is_raw_file("x.nef"));
        assert!(!is_raw_file("x.jpg"));
    }
}
