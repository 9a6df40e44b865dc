//! Archive one or more accounts from the command line
//!
//! This example demonstrates the core functionality of wechat-dl:
//! - Loading an optional JSON configuration
//! - Installing the log pipeline
//! - Reading credentials saved by a previous login
//! - Streaming progress while accounts are archived
//! - Stopping gracefully on Ctrl+C
//!
//! ```bash
//! cargo run --example archive_accounts -- rustlang another_account
//! WECHAT_DL_CONFIG=config.json WECHAT_DL_PAGES=3 cargo run --example archive_accounts -- rustlang
//! ```

use futures::StreamExt;
use std::path::Path;
use wechat_dl::credentials::{CookieFileProvider, CredentialProvider};
use wechat_dl::{Archiver, Config, ScrapeRequest, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let accounts: Vec<String> = std::env::args().skip(1).collect();
    if accounts.is_empty() {
        eprintln!("usage: archive_accounts <account> [account...]");
        std::process::exit(2);
    }

    let config = match std::env::var("WECHAT_DL_CONFIG") {
        Ok(path) => Config::from_json_file(Path::new(&path))?,
        Err(_) => Config::default(),
    };
    let pages = std::env::var("WECHAT_DL_PAGES")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.platform.default_max_pages);

    let dispatch = wechat_dl::logging::build_dispatch(&config.logging)?;
    tracing::dispatcher::set_global_default(dispatch)?;

    let archiver = Archiver::new(config).await?;

    if let Some(status) = archiver.rate_limit_status().await?
        && status.remaining_seconds > 0
    {
        println!(
            "⚠️ Still rate limited for {} seconds (until {})",
            status.remaining_seconds, status.reset_time
        );
        return Ok(());
    }

    // Ctrl+C stops new downloads; running ones finish
    tokio::spawn(run_with_shutdown(archiver.clone()));

    let credentials = CookieFileProvider::default().credentials().await?;
    let request = if accounts.len() == 1 {
        ScrapeRequest::Single {
            name: accounts[0].clone(),
            pages,
        }
    } else {
        ScrapeRequest::Batch { accounts, pages }
    };

    let mut progress = archiver.scrape(credentials, request);
    while let Some(line) = progress.next().await {
        print!("{}", line);
    }

    let tasks = archiver.db.list_tasks(5).await?;
    for task in tasks {
        println!(
            "task #{} {}: {:?}, {}/{} downloaded, {} failed",
            task.id,
            task.account_name,
            task.status(),
            task.downloaded_count,
            task.total_articles,
            task.failed_count
        );
    }

    Ok(())
}
