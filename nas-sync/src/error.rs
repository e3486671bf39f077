/// Errors produced inside the NAS sync engine.
///
/// The public transport operations never return these directly; they are
/// folded into `bool` / `Option` results at the transport boundary. The
/// orchestrator keeps them around as per-item failure reasons.
#[derive(Debug)]
pub enum NasError {
    /// Missing host, username or password
    Configuration(String),
    /// No share name could be resolved from `remote_path`
    NoShareName,
    /// DNS, connect, TLS, timeout or client-callback failure
    Transport(String),
    /// The remote device answered with an unexpected status code
    Protocol { operation: &'static str, status: u16 },
    /// Local filesystem failure (reading a photo, writing a download)
    Io(std::io::Error),
    /// Key-value persistence failure
    Storage(String),
}

impl std::fmt::Display for NasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NasError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            NasError::NoShareName => write!(f, "No SMB share name in remote path"),
            NasError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NasError::Protocol { operation, status } => {
                write!(f, "{} returned unexpected status {}", operation, status)
            }
            NasError::Io(e) => write!(f, "IO error: {}", e),
            NasError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for NasError {}

impl From<std::io::Error> for NasError {
    fn from(err: std::io::Error) -> Self {
        NasError::Io(err)
    }
}

impl From<reqwest::Error> for NasError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NasError::Transport(format!("request timed out: {}", err))
        } else {
            NasError::Transport(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for NasError {
    fn from(err: rusqlite::Error) -> Self {
        NasError::Storage(err.to_string())
    }
}

/// Result type for NAS sync operations
pub type NasResult<T> = Result<T, NasError>;
