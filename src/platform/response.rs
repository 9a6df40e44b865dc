//! Platform response shapes, decoded once into tagged outcomes

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// `base_resp.ret` value the platform uses to signal rate limiting
pub const RATE_LIMIT_RET: i64 = 200013;

/// `base_resp.ret` values the platform answers with once the session is gone
/// (invalid session, invalid csrf token)
pub const SESSION_EXPIRED_RETS: [i64; 2] = [200003, 200040];

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BaseResp {
    #[serde(default)]
    pub ret: i64,
    #[serde(default)]
    pub err_msg: String,
}

/// One account returned by the search endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMatch {
    /// Platform-internal id used to list the account's articles
    pub fakeid: String,
    /// Display name
    #[serde(default)]
    pub nickname: String,
    /// WeChat id, often empty
    #[serde(default)]
    pub alias: String,
}

/// Article descriptor from the list endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    /// Article title
    #[serde(default)]
    pub title: String,
    /// Article URL
    #[serde(default)]
    pub link: String,
    /// Unix timestamp of the last update (the publish time shown to readers)
    #[serde(default)]
    pub update_time: i64,
    /// Unix timestamp of creation
    #[serde(default)]
    pub create_time: Option<i64>,
    /// Cover image URL
    #[serde(default)]
    pub cover: Option<String>,
    /// Short summary
    #[serde(default)]
    pub digest: Option<String>,
    /// Platform article id
    #[serde(default)]
    pub aid: Option<String>,
}

impl ArticleSummary {
    /// `update_time` as a local `YYYY-MM-DD` date
    pub fn publish_date(&self) -> String {
        DateTime::from_timestamp(self.update_time, 0)
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown-date".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchResponse {
    #[serde(default)]
    base_resp: Option<BaseResp>,
    #[serde(default)]
    list: Option<Vec<AccountMatch>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawListResponse {
    #[serde(default)]
    base_resp: Option<BaseResp>,
    #[serde(default)]
    app_msg_list: Option<Vec<ArticleSummary>>,
    #[serde(default)]
    app_msg_cnt: Option<i64>,
}

/// Decoded answer of the search endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// At least one account matched, in platform ranking order
    Found {
        /// Matching accounts
        accounts: Vec<AccountMatch>,
    },
    /// The platform refused the request with its rate-limit code
    RateLimited,
    /// Nothing matched (or the platform answered with an unexpected code)
    Empty {
        /// `base_resp.ret`, 0 when absent
        ret: i64,
        /// `base_resp.err_msg`
        message: String,
    },
}

impl From<RawSearchResponse> for SearchOutcome {
    fn from(raw: RawSearchResponse) -> Self {
        let base = raw.base_resp.unwrap_or_default();
        if base.ret == RATE_LIMIT_RET {
            return SearchOutcome::RateLimited;
        }
        match raw.list {
            Some(accounts) if !accounts.is_empty() => SearchOutcome::Found { accounts },
            _ => SearchOutcome::Empty {
                ret: base.ret,
                message: base.err_msg,
            },
        }
    }
}

/// Decoded answer of the list endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListOutcome {
    /// One page of articles (possibly empty)
    Page {
        /// Articles on this page
        articles: Vec<ArticleSummary>,
        /// Platform-reported article total, 0 when absent
        total_count: i64,
        /// Non-zero `ret` that accompanied the page, if any
        warning_ret: Option<i64>,
    },
    /// The platform refused the request with its rate-limit code
    RateLimited,
}

impl From<RawListResponse> for ListOutcome {
    fn from(raw: RawListResponse) -> Self {
        let base = raw.base_resp.unwrap_or_default();
        if base.ret == RATE_LIMIT_RET {
            return ListOutcome::RateLimited;
        }
        let warning_ret = (base.ret != 0).then_some(base.ret);
        match raw.app_msg_list {
            Some(articles) => ListOutcome::Page {
                articles,
                total_count: raw.app_msg_cnt.unwrap_or(0),
                warning_ret,
            },
            None => ListOutcome::Page {
                articles: Vec::new(),
                total_count: 0,
                warning_ret,
            },
        }
    }
}
