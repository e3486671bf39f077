use std::fmt;

/// Central error types for the photo-nas app
#[derive(Debug)]
pub enum AppError {
    /// Database error (rusqlite)
    Database(rusqlite::Error),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Settings file could not be read or parsed
    Config(String),
    /// Validation error (e.g. invalid inputs)
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// Error from the NAS sync engine
    Sync(nas_sync::NasError),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Sync(e) => write!(f, "Sync error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(e: toml::ser::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<nas_sync::NasError> for AppError {
    fn from(e: nas_sync::NasError) -> Self {
        AppError::Sync(e)
    }
}

/// User-friendly error messages for the terminal
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred. Please try again.".to_string(),
            AppError::Filesystem(_) => {
                "Error accessing files. Please check paths and permissions.".to_string()
            }
            AppError::Config(msg) => format!("The settings file is invalid: {}", msg),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Sync(nas_sync::NasError::Configuration(msg)) => {
                format!("NAS settings incomplete: {}", msg)
            }
            AppError::Sync(nas_sync::NasError::NoShareName) => {
                "SMB needs a share name as the first part of remotePath.".to_string()
            }
            AppError::Sync(e) => format!("Could not reach the NAS: {}", e),
            AppError::Other(msg) => msg.clone(),
        }
    }
}
