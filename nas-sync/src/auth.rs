//! Authentication material for the two transports

use crate::models::NasConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// `Authorization` header value for HTTP Basic auth
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let token = STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", token)
}

/// Username/password pair handed to an SMB session
#[derive(Clone, PartialEq, Eq)]
pub struct SmbCredentials {
    pub username: String,
    pub password: String,
}

impl SmbCredentials {
    pub fn from_config(config: &NasConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

impl std::fmt::Debug for SmbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth_header("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_basic_auth_header_keeps_colons_in_password() {
        let header = basic_auth_header("admin", "a:b");
        let decoded = STANDARD
            .decode(header.trim_start_matches("Basic "))
            .unwrap();
        assert_eq!(decoded, b"admin:a:b");
    }

    #[test]
    fn test_smb_credentials_from_config() {
        let config = NasConfig::new("nas", "admin", "secret");
        let creds = SmbCredentials::from_config(&config);
        assert_eq!(creds.username, "admin");
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
