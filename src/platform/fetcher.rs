//! Account lookup and paginated article listing

use crate::config::DelayRange;
use crate::error::{Error, Result};
use crate::platform::client::PlatformClient;
use crate::platform::response::{
    AccountMatch, ArticleSummary, ListOutcome, RawListResponse, RawSearchResponse,
    SESSION_EXPIRED_RETS, SearchOutcome,
};
use rand::Rng;
use std::sync::Arc;

/// Result size requested from the search endpoint
const SEARCH_COUNT: u32 = 5;

/// Articles gathered for one account
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArticleListing {
    /// Articles in listing order (newest first, as the platform returns them)
    pub articles: Vec<ArticleSummary>,
    /// True when listing stopped early on the platform's rate-limit signal
    pub rate_limited: bool,
    /// Number of list requests issued
    pub pages_fetched: u32,
}

/// Walks the search-then-list protocol for one session
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<PlatformClient>,
    page_size: u32,
    page_delay: DelayRange,
}

impl Fetcher {
    /// Create a fetcher over `client`
    pub fn new(client: Arc<PlatformClient>, page_delay: DelayRange) -> Self {
        let page_size = client.config().page_size.max(1);
        Self {
            client,
            page_size,
            page_delay,
        }
    }

    /// Ask the search endpoint about `query`
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let random: f64 = rand::thread_rng().gen_range(0.0..1.0);
        let params = [
            ("action", "search_biz".to_string()),
            ("lang", "zh_CN".to_string()),
            ("f", "json".to_string()),
            ("ajax", "1".to_string()),
            ("random", random.to_string()),
            ("query", query.to_string()),
            ("begin", "0".to_string()),
            ("count", SEARCH_COUNT.to_string()),
        ];
        let raw: RawSearchResponse = self
            .client
            .get_json(
                "/cgi-bin/searchbiz",
                &params,
                self.client.config().search_timeout,
            )
            .await?;
        Ok(raw.into())
    }

    /// Resolve an account name to its platform identity
    ///
    /// The first result wins; the platform's own ranking is taken as-is.
    ///
    /// # Errors
    /// - [`Error::AccountNotFound`] when nothing matched
    /// - [`Error::RateLimited`] on the rate-limit code
    /// - [`Error::NotLoggedIn`] when the platform reports the session as expired
    /// - [`Error::Platform`] for any other non-zero `ret` without results
    pub async fn resolve_account(&self, query: &str) -> Result<AccountMatch> {
        tracing::info!(account = query, "Searching for account");

        match self.search(query).await? {
            SearchOutcome::Found { mut accounts } => {
                if accounts.len() > 1 {
                    tracing::debug!(
                        account = query,
                        matches = accounts.len(),
                        "Several accounts matched, taking the first"
                    );
                }
                let first = accounts.swap_remove(0);
                tracing::info!(
                    account = query,
                    nickname = %first.nickname,
                    alias = %first.alias,
                    "Found account"
                );
                Ok(first)
            }
            SearchOutcome::RateLimited => {
                tracing::error!(account = query, "Rate limited while searching");
                Err(Error::RateLimited {
                    context: format!("searching for {}", query),
                })
            }
            SearchOutcome::Empty { ret: 0, .. } => {
                tracing::warn!(account = query, "Account not found");
                Err(Error::AccountNotFound(query.to_string()))
            }
            SearchOutcome::Empty { ret, message } if SESSION_EXPIRED_RETS.contains(&ret) => {
                tracing::error!(account = query, ret, message = %message, "Session expired");
                Err(Error::NotLoggedIn)
            }
            SearchOutcome::Empty { ret, message } => {
                tracing::warn!(account = query, ret, message = %message, "Search returned non-zero ret");
                Err(Error::Platform { ret, message })
            }
        }
    }

    /// Request one page of `fakeid`'s article list starting at `begin`
    pub async fn list_page(&self, fakeid: &str, begin: u32) -> Result<ListOutcome> {
        let params = [
            ("lang", "zh_CN".to_string()),
            ("f", "json".to_string()),
            ("ajax", "1".to_string()),
            ("action", "list_ex".to_string()),
            ("begin", begin.to_string()),
            ("count", self.page_size.to_string()),
            ("query", String::new()),
            ("fakeid", fakeid.to_string()),
            ("type", "9".to_string()),
        ];
        let raw: RawListResponse = self
            .client
            .get_json("/cgi-bin/appmsg", &params, self.client.config().list_timeout)
            .await?;
        Ok(raw.into())
    }

    /// Gather up to `max_pages` pages of `fakeid`'s articles
    ///
    /// Stops on an empty page, once the platform-reported total is reached,
    /// after `max_pages` requests, or on the rate-limit signal. The last case
    /// keeps what was gathered and sets `rate_limited`. Any other error also
    /// keeps what was gathered and ends listing.
    pub async fn list_articles(&self, fakeid: &str, max_pages: u32) -> ArticleListing {
        let mut listing = ArticleListing::default();
        let mut begin = 0;

        tracing::info!(fakeid, max_pages, "Listing articles");

        for page in 1..=max_pages {
            tracing::debug!(page, max_pages, begin, "Fetching list page");
            listing.pages_fetched += 1;

            let (articles, total_count) = match self.list_page(fakeid, begin).await {
                Ok(ListOutcome::Page {
                    articles,
                    total_count,
                    warning_ret,
                }) => {
                    if let Some(ret) = warning_ret {
                        tracing::warn!(page, ret, "List endpoint returned non-zero ret");
                    }
                    (articles, total_count)
                }
                Ok(ListOutcome::RateLimited) => {
                    tracing::warn!(
                        page,
                        gathered = listing.articles.len(),
                        "Rate limited while listing, keeping gathered articles"
                    );
                    listing.rate_limited = true;
                    return listing;
                }
                Err(e) => {
                    tracing::error!(page, error = %e, "Failed to fetch list page");
                    break;
                }
            };

            if articles.is_empty() {
                tracing::info!(page, "No more articles");
                break;
            }

            listing.articles.extend(articles);
            tracing::debug!(
                gathered = listing.articles.len(),
                total = total_count,
                "Page fetched"
            );

            if total_count > 0 && listing.articles.len() as i64 >= total_count {
                tracing::info!(total = total_count, "Reached reported article total");
                break;
            }

            begin += self.page_size;

            if page < max_pages {
                let delay = self.page_delay.sleep().await;
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Waited before next page");
            }
        }

        tracing::info!(
            articles = listing.articles.len(),
            pages = listing.pages_fetched,
            "Listing complete"
        );
        listing
    }
}
