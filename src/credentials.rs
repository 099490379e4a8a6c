//! API credentials sent with every catalog and file request.

use std::fmt;

/// Username and API key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

impl Credentials {
    /// Build credentials when both halves are present and non-blank.
    ///
    /// A lone username or key is treated as no credentials at all.
    pub fn from_parts(username: Option<&str>, api_key: Option<&str>) -> Option<Self> {
        let username = username.map(str::trim).filter(|s| !s.is_empty())?;
        let api_key = api_key.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self {
            username: username.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

// Keep the key out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_both() {
        assert!(Credentials::from_parts(Some("user"), None).is_none());
        assert!(Credentials::from_parts(None, Some("key")).is_none());
        assert!(Credentials::from_parts(Some("user"), Some("   ")).is_none());

        let creds = Credentials::from_parts(Some(" user "), Some("key")).unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.api_key, "key");
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = Credentials::from_parts(Some("user"), Some("hunter2")).unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
