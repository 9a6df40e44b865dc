//! Custom test assertions for integration tests

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;
use wechat_dl::{ArticleStatus, Database, ProgressStream, TaskStatus};

/// Drain a progress stream, failing the test if it does not end in time
pub async fn collect_progress(stream: ProgressStream, timeout: Duration) -> Vec<String> {
    match tokio::time::timeout(timeout, stream.collect::<Vec<String>>()).await {
        Ok(lines) => lines,
        Err(_) => panic!("progress stream did not finish within {:?}", timeout),
    }
}

/// Assert that some progress line contains `needle`
pub fn assert_line_contains(lines: &[String], needle: &str) {
    assert!(
        lines.iter().any(|l| l.contains(needle)),
        "no progress line contains {:?}; got:\n{}",
        needle,
        lines.concat()
    );
}

/// Index of the first progress line containing `needle`
pub fn line_index(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no progress line contains {:?}", needle))
}

/// Every file below `dir`, sorted
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Rendered article files below `dir`
pub fn html_files_under(dir: &Path) -> Vec<PathBuf> {
    files_under(dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
        .collect()
}

/// Assert that the article at `link` was downloaded and return its artifact path
pub async fn assert_article_downloaded(db: &Database, link: &str) -> PathBuf {
    let article = db
        .get_article_by_link(link)
        .await
        .expect("query article")
        .unwrap_or_else(|| panic!("article {} not recorded", link));

    assert_eq!(
        article.status(),
        ArticleStatus::Completed,
        "article {} has status {:?} ({:?})",
        link,
        article.status(),
        article.error_message
    );
    assert!(article.downloaded);

    let path = PathBuf::from(
        article
            .local_path
            .unwrap_or_else(|| panic!("article {} has no local path", link)),
    );
    assert!(path.exists(), "artifact {} missing", path.display());
    path
}

/// Assert the status of the most recent task
pub async fn assert_latest_task(db: &Database, expected: TaskStatus, downloaded: i64, failed: i64) {
    let tasks = db.list_tasks(1).await.expect("list tasks");
    let task = tasks.first().expect("a task was recorded");

    assert_eq!(task.status(), expected, "task error: {:?}", task.error_message);
    assert_eq!(task.downloaded_count, downloaded);
    assert_eq!(task.failed_count, failed);
}
