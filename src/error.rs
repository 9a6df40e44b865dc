//! Error types for wechat-dl
//!
//! This module provides the error taxonomy used throughout the library:
//! - Session errors (not logged in)
//! - Platform signals (rate limiting, unknown account, unexpected `ret` codes)
//! - Transport errors (network, HTTP status)
//! - Content errors (verification pages, missing content containers)
//! - Store errors (database, I/O)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wechat-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wechat-dl
///
/// Each variant includes enough context to write a useful failure message into
/// the task or article row it ends up attached to.
#[derive(Debug, Error)]
pub enum Error {
    /// No credentials are available (never logged in, or the session was cleared)
    #[error("not logged in: no token or cookies available")]
    NotLoggedIn,

    /// The platform answered with its rate-limit code
    #[error("rate limited by platform while {context}")]
    RateLimited {
        /// What the crawler was doing when the limit hit (e.g. "searching for foo")
        context: String,
    },

    /// Account search returned no results
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The platform returned an unexpected non-zero `ret` code
    #[error("platform returned ret={ret}: {message}")]
    Platform {
        /// The `base_resp.ret` value
        ret: i64,
        /// The `base_resp.err_msg` value, if present
        message: String,
    },

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The article page did not contain recognizable content
    #[error("content parse error: {0}")]
    ContentParse(#[from] ContentParseError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.concurrency")
        key: Option<String>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Structural failures while locating article content
///
/// These are never retried: fetching the same page again yields the same page.
#[derive(Debug, Error)]
pub enum ContentParseError {
    /// The platform served a verification (CAPTCHA) page instead of the article
    #[error("verification page served for '{title}'")]
    VerificationPage {
        /// Article title
        title: String,
    },

    /// The platform refused access to the article
    #[error("access restricted for '{title}'")]
    AccessRestricted {
        /// Article title
        title: String,
    },

    /// None of the content selectors matched
    #[error("no content found for '{title}'. page preview: {preview}...")]
    ContentNotFound {
        /// Article title
        title: String,
        /// First characters of the page, whitespace collapsed
        preview: String,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Artifact-writing errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Failed to create an output directory
    #[error("failed to create directory {path}: {reason}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Failed to write an output file
    #[error("failed to write {path}: {reason}")]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },
}

impl From<ArtifactError> for Error {
    fn from(e: ArtifactError) -> Self {
        Error::Io(std::io::Error::other(e.to_string()))
    }
}

impl Error {
    /// Whether this error should abort the whole run rather than one account
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Error::NotLoggedIn)
    }

    /// Whether this is the platform's rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_includes_context() {
        let err = Error::RateLimited {
            context: "listing articles".into(),
        };
        assert_eq!(
            err.to_string(),
            "rate limited by platform while listing articles"
        );
        assert!(err.is_rate_limited());
        assert!(!err.is_fatal_to_run());
    }

    #[test]
    fn only_not_logged_in_is_fatal_to_run() {
        assert!(Error::NotLoggedIn.is_fatal_to_run());
        assert!(!Error::AccountNotFound("x".into()).is_fatal_to_run());
        assert!(
            !Error::RateLimited {
                context: "searching".into()
            }
            .is_fatal_to_run()
        );
        assert!(!Error::Other("boom".into()).is_fatal_to_run());
    }

    #[test]
    fn content_parse_errors_convert_and_display() {
        let err: Error = ContentParseError::VerificationPage {
            title: "Hello".into(),
        }
        .into();
        assert!(matches!(
            err,
            Error::ContentParse(ContentParseError::VerificationPage { .. })
        ));
        assert!(err.to_string().contains("verification page"));

        let err: Error = ContentParseError::ContentNotFound {
            title: "T".into(),
            preview: "<html>".into(),
        }
        .into();
        assert!(err.to_string().contains("page preview: <html>"));
    }

    #[test]
    fn artifact_error_becomes_io_error() {
        let err: Error = ArtifactError::Write {
            path: PathBuf::from("/tmp/out.html"),
            reason: "disk full".into(),
        }
        .into();
        match err {
            Error::Io(e) => {
                assert!(e.to_string().contains("/tmp/out.html"));
                assert!(e.to_string().contains("disk full"));
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn platform_error_display() {
        let err = Error::Platform {
            ret: 200003,
            message: "invalid session".into(),
        };
        assert_eq!(
            err.to_string(),
            "platform returned ret=200003: invalid session"
        );
    }
}
