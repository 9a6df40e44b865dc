//! Explicitly constructed log pipeline
//!
//! The library only emits `tracing` events. A host builds a [`tracing::Dispatch`]
//! with [`build_dispatch`] once at start-up and installs it (globally with
//! `tracing::dispatcher::set_global_default`, or scoped with
//! `tracing::dispatcher::with_default`).
//!
//! Output goes to stderr at `console_level`. With a `log_dir`, two more files
//! are written: `scraper_YYYYMMDD.log` with everything at `file_level` and
//! `error_YYYYMMDD.log` with errors only. The date stamp is the local date at
//! the time [`build_dispatch`] runs; files are not rotated at midnight. A
//! long-running host that wants one file pair per day builds and installs a
//! fresh dispatcher when the date changes (existing files are appended to).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Console filter directive (default: "info"); `RUST_LOG` overrides it
    #[serde(default = "default_console_level")]
    pub console_level: String,

    /// File filter directive (default: "debug")
    #[serde(default = "default_file_level")]
    pub file_level: String,

    /// Directory for dated log files (default: "logs"); `None` disables files
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: default_console_level(),
            file_level: default_file_level(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_console_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "debug".to_string()
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the dispatcher described by `config`
///
/// Log files are opened here, named after today's local date, and stay open
/// for the dispatcher's lifetime.
///
/// # Errors
///
/// Returns `Error::Config` for an invalid filter directive and `Error::Io`
/// when the log directory or files cannot be opened.
pub fn build_dispatch(config: &LoggingConfig) -> Result<Dispatch> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.console_level))
        .map_err(|e| Error::Config {
            message: format!("invalid console log filter: {}", e),
            key: Some("logging.console_level".to_string()),
        })?;

    let mut layers: Vec<BoxedLayer> = vec![
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed(),
    ];

    if let Some(dir) = &config.log_dir {
        let file_filter = EnvFilter::try_new(&config.file_level).map_err(|e| Error::Config {
            message: format!("invalid file log filter: {}", e),
            key: Some("logging.file_level".to_string()),
        })?;

        let stamp = chrono::Local::now().format("%Y%m%d").to_string();
        let main_log = open_log_file(dir, &format!("scraper_{}.log", stamp))?;
        let error_log = open_log_file(dir, &format!("error_{}.log", stamp))?;

        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(main_log))
                .with_filter(file_filter)
                .boxed(),
        );
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(error_log))
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        );
    }

    Ok(Dispatch::new(tracing_subscriber::registry().with(layers)))
}

fn open_log_file(dir: &Path, name: &str) -> Result<File> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(name))?;
    Ok(file)
}
