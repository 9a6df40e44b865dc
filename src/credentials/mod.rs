//! Platform credentials
//!
//! Logging in happens outside this crate (a browser session yields a token and
//! a cookie jar). The crawler only consumes the resulting pair through a
//! [`CredentialProvider`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod cookie_file;

pub use cookie_file::CookieFileProvider;

/// Session token plus cookie jar for the platform's admin API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Session token passed as the `token` query parameter
    pub token: String,
    /// Cookies sent with every platform request
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl Credentials {
    /// Create credentials from a token and cookie pairs
    pub fn new<I, K, V>(token: impl Into<String>, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            token: token.into(),
            cookies: cookies
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Whether the pair can be used at all
    pub fn is_usable(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// First characters of the token, for log lines
    pub fn token_preview(&self) -> String {
        let preview: String = self.token.chars().take(10).collect();
        format!("{}...", preview)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token_preview())
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Source of platform credentials
///
/// `Ok(None)` means "not logged in"; the archiver fails fast on it before
/// touching the network.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credentials, if any
    async fn credentials(&self) -> Result<Option<Credentials>>;
}

/// Credentials obtained elsewhere and handed over as-is
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials(Option<Credentials>);

impl StaticCredentials {
    /// Provider that always returns `credentials`
    pub fn new(credentials: Credentials) -> Self {
        Self(Some(credentials))
    }

    /// Provider that is never logged in
    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.0.clone().filter(Credentials::is_usable))
    }
}
