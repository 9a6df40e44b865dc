//! Credentials persisted as `{"token": "...", "cookies": {...}}`

use crate::credentials::{CredentialProvider, Credentials};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads and writes the cookie file left behind by a browser login
#[derive(Clone, Debug)]
pub struct CookieFileProvider {
    path: PathBuf,
}

impl Default for CookieFileProvider {
    fn default() -> Self {
        Self::new("wechat_cookies.json")
    }
}

impl CookieFileProvider {
    /// Provider backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cookie file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credentials
    ///
    /// A missing file, malformed JSON, or a file without a token mean
    /// "not logged in" (`Ok(None)`).
    ///
    /// # Errors
    /// Any other I/O failure while reading the file (permissions, a directory
    /// in its place) is returned as [`Error::Io`](crate::Error::Io).
    pub async fn load(&self) -> Result<Option<Credentials>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Credentials>(&content) {
            Ok(credentials) if credentials.is_usable() => {
                tracing::debug!(
                    path = %self.path.display(),
                    token = %credentials.token_preview(),
                    "Loaded credentials"
                );
                Ok(Some(credentials))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring malformed cookie file"
                );
                Ok(None)
            }
        }
    }

    /// Persist credentials, replacing any previous file
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::info!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    /// Forget the stored session (before a fresh login)
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Cleared credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CredentialProvider for CookieFileProvider {
    async fn credentials(&self) -> Result<Option<Credentials>> {
        self.load().await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_logged_in() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CookieFileProvider::new(dir.path().join("cookies.json"));
        assert!(provider.credentials().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CookieFileProvider::new(dir.path().join("state").join("cookies.json"));
        let creds = Credentials::new("1429384756", [("slave_sid", "s1"), ("bizuin", "b2")]);

        provider.save(&creds).await.unwrap();
        assert_eq!(provider.load().await.unwrap(), Some(creds));

        provider.clear().await.unwrap();
        assert!(provider.load().await.unwrap().is_none());
        // Clearing twice is fine
        provider.clear().await.unwrap();
    }

    #[tokio::test]
    async fn reads_the_browser_login_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wechat_cookies.json");
        std::fs::write(
            &path,
            r#"{"token": "987654321", "cookies": {"data_ticket": "t", "slave_user": "u"}}"#,
        )
        .unwrap();

        let creds = CookieFileProvider::new(&path).load().await.unwrap().unwrap();
        assert_eq!(creds.token, "987654321");
        assert_eq!(creds.cookies.get("slave_user").map(String::as_str), Some("u"));
    }

    #[tokio::test]
    async fn malformed_or_tokenless_files_are_not_logged_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        std::fs::write(&path, "not json").unwrap();
        assert!(CookieFileProvider::new(&path).load().await.unwrap().is_none());

        std::fs::write(&path, r#"{"token": "", "cookies": {}}"#).unwrap();
        assert!(CookieFileProvider::new(&path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::create_dir(&path).unwrap();

        let err = CookieFileProvider::new(&path).load().await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
