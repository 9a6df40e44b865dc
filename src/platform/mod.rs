//! Platform access: authenticated HTTP client, response decoding and the
//! search-then-list fetcher
//!
//! A [`Session`] bundles one login's client and fetcher. Logging in again
//! means building a new session; nothing here is shared global state.

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::Result;
use std::sync::Arc;

mod client;
mod fetcher;
mod response;

pub use client::PlatformClient;
pub use fetcher::{ArticleListing, Fetcher};
pub use response::{
    AccountMatch, ArticleSummary, ListOutcome, RATE_LIMIT_RET, SESSION_EXPIRED_RETS, SearchOutcome,
};

/// Everything that depends on one set of credentials
#[derive(Clone)]
pub struct Session {
    client: Arc<PlatformClient>,
    fetcher: Fetcher,
}

impl Session {
    /// Build a session for `credentials`
    pub fn new(credentials: Credentials, config: &Config) -> Result<Self> {
        let client = Arc::new(PlatformClient::new(credentials, config.platform.clone())?);
        let fetcher = Fetcher::new(client.clone(), config.politeness.page_delay);
        Ok(Self { client, fetcher })
    }

    /// The HTTP client
    pub fn client(&self) -> &Arc<PlatformClient> {
        &self.client
    }

    /// The article-list fetcher
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// The credentials this session was built from
    pub fn credentials(&self) -> &Credentials {
        self.client.credentials()
    }
}
