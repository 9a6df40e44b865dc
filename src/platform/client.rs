//! HTTP access to the platform: admin API, article pages and images

use crate::config::PlatformConfig;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Fallback when the configured pool is empty
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Authenticated HTTP client for one login session
///
/// Every admin API request carries the session token, the cookie jar, a
/// User-Agent drawn from the configured pool and the editor page as
/// `Referer`.
pub struct PlatformClient {
    http: reqwest::Client,
    credentials: Credentials,
    config: PlatformConfig,
}

impl PlatformClient {
    /// Create a client for `credentials`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(credentials: Credentials, config: PlatformConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            token = %credentials.token_preview(),
            base_url = %config.base_url,
            "Platform client ready"
        );

        Ok(Self {
            http,
            credentials,
            config,
        })
    }

    /// The session this client authenticates with
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Platform settings
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Absolute URL of an API path such as `/cgi-bin/appmsg`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// The editor page the admin API expects requests to come from
    pub fn referer(&self) -> String {
        format!(
            "{}?t=media/appmsg_edit_v2&action=edit&isNew=1&type=10&token={}&lang=zh_CN",
            self.endpoint("/cgi-bin/appmsg"),
            self.credentials.token
        )
    }

    fn user_agent(&self) -> &str {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// GET an admin API endpoint and decode its JSON body
    ///
    /// `token` is appended to `params`. Non-success HTTP statuses become
    /// [`Error::HttpStatus`]; the application-level `ret` code is left to the
    /// caller.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T> {
        let url = self.endpoint(path);
        let response = self
            .http
            .get(&url)
            .query(&[("token", self.credentials.token.as_str())])
            .query(params)
            .header(USER_AGENT, self.user_agent())
            .header(REFERER, self.referer())
            .header(COOKIE, self.credentials.cookie_header())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch an article page as text
    pub async fn fetch_article_page(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .header(COOKIE, self.credentials.cookie_header())
            .timeout(self.config.article_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetch an image body
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .timeout(self.config.image_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
