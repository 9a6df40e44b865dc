use super::*;
use crate::config::{Config, PlatformConfig};
use crate::credentials::Credentials;
use crate::types::ArticleStatus;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    db: Arc<Database>,
    output: TempDir,
    downloader: ArticleDownloader,
    _db_file: NamedTempFile,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let db_file = NamedTempFile::new().unwrap();
    let db = Arc::new(Database::new(db_file.path()).await.unwrap());
    let account_id = db
        .upsert_account("Demo Account", Some("fid"), Some("Demo"), None)
        .await
        .unwrap();
    let output = tempfile::tempdir().unwrap();

    let platform = PlatformConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    let client = Arc::new(
        PlatformClient::new(Credentials::new("tok", [("sid", "1")]), platform).unwrap(),
    );
    let download = Config::default().without_delays().download;
    let downloader = ArticleDownloader::new(
        client,
        db.clone(),
        account_id,
        "Demo Account",
        output.path(),
        download,
    );

    Harness {
        server,
        db,
        output,
        downloader,
        _db_file: db_file,
    }
}

fn article_page(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Weekly</title></head><body>
        <div id="js_content" style="visibility: hidden;">{}</div>
        </body></html>"#,
        content
    )
}

async fn mount_article(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(b"\x89PNG-bytes".to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_article_with_images() {
    let h = harness().await;
    let uri = h.server.uri();
    let page = article_page(&format!(
        r#"<p>First paragraph of the weekly issue.</p>
           <img data-src="{uri}/img/a" src="placeholder.gif" data-type="png">
           <img src="data:image/gif;base64,R0lGOD">
           <img data-src="/img/b">"#
    ));
    mount_article(&h.server, "/s/weekly", page, 1).await;
    mount_image(&h.server, "/img/a", 200, 1).await;
    mount_image(&h.server, "/img/b", 200, 1).await;

    let url = format!("{uri}/s/weekly");
    let outcome = h
        .downloader
        .download_article(&url, "Weekly: Issue 1", "2024-01-15")
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(!outcome.skipped);
    assert_eq!(outcome.image_count, 3);
    let artifact = outcome.path.clone().unwrap();
    assert_eq!(
        artifact,
        h.output
            .path()
            .join("Demo Account")
            .join("2024-01-15_Weekly Issue 1.html")
    );

    let images = h.output.path().join("Demo Account").join("images");
    assert!(images.join("Weekly Issue 1_0.png").exists());
    assert!(images.join("Weekly Issue 1_2.jpg").exists());

    let html = std::fs::read_to_string(&artifact).unwrap();
    assert!(html.contains(r#"src="images/Weekly Issue 1_0.png""#));
    assert!(html.contains(r#"src="images/Weekly Issue 1_2.jpg""#));
    assert!(html.contains("data:image/gif;base64,R0lGOD"));
    assert!(!html.contains("data-src"));
    assert!(html.contains("First paragraph of the weekly issue."));
    assert!(html.contains(r#"<span class="account-name">Demo Account</span>"#));

    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert!(row.downloaded);
    assert_eq!(row.status(), ArticleStatus::Completed);
    assert_eq!(row.image_count, 3);
    assert_eq!(row.local_path, Some(artifact.to_string_lossy().into_owned()));
    assert_eq!(
        row.content.as_deref(),
        Some("First paragraph of the weekly issue.")
    );
}

#[tokio::test]
async fn already_downloaded_article_is_not_fetched_again() {
    let h = harness().await;
    let uri = h.server.uri();
    mount_article(&h.server, "/s/once", article_page("<p>body</p>"), 1).await;

    let url = format!("{uri}/s/once");
    let first = h
        .downloader
        .download_article(&url, "Once", "2024-02-01")
        .await
        .unwrap();
    assert!(first.success && !first.skipped);

    let second = h
        .downloader
        .download_article(&url, "Once", "2024-02-01")
        .await
        .unwrap();
    assert_eq!(second, DownloadOutcome::skipped());
    // The mock's expect(1) is verified when the server drops
}

#[tokio::test]
async fn verification_page_fails_without_retry() {
    let h = harness().await;
    let uri = h.server.uri();
    let page = "<html><head><title>环境异常，完成验证后即可继续访问</title></head><body>captcha</body></html>";
    mount_article(&h.server, "/s/captcha", page.to_string(), 1).await;

    let url = format!("{uri}/s/captcha");
    let outcome = h
        .downloader
        .download_article(&url, "Guarded", "2024-03-01")
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("verification page"));

    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert_eq!(row.status(), ArticleStatus::Failed);
    assert_eq!(row.retry_count, 1);
    assert!(!row.downloaded);
}

#[tokio::test]
async fn transient_page_failures_use_the_article_retry_budget() {
    let h = harness().await;
    let uri = h.server.uri();
    // 3 retries after the first attempt
    Mock::given(method("GET"))
        .and(path("/s/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&h.server)
        .await;

    let url = format!("{uri}/s/flaky");
    let outcome = h
        .downloader
        .download_article(&url, "Flaky", "2024-03-02")
        .await
        .unwrap();

    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.starts_with("download error:"), "{error}");

    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert_eq!(row.status(), ArticleStatus::Failed);
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.error_message.as_deref(), Some(error.as_str()));
}

#[tokio::test]
async fn recovers_when_a_retry_succeeds() {
    let h = harness().await;
    let uri = h.server.uri();
    Mock::given(method("GET"))
        .and(path("/s/second-try"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    mount_article(&h.server, "/s/second-try", article_page("<p>ok</p>"), 1).await;

    let url = format!("{uri}/s/second-try");
    let outcome = h
        .downloader
        .download_article(&url, "Second", "2024-03-03")
        .await
        .unwrap();

    assert!(outcome.success);
    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert_eq!(row.retry_count, 0);
    assert_eq!(row.status(), ArticleStatus::Completed);
}

#[tokio::test]
async fn image_succeeding_on_third_attempt_is_kept() {
    let h = harness().await;
    let uri = h.server.uri();
    let page = article_page(&format!(r#"<p>text</p><img data-src="{uri}/img/slow">"#));
    mount_article(&h.server, "/s/slow", page, 1).await;
    Mock::given(method("GET"))
        .and(path("/img/slow"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&h.server)
        .await;
    mount_image(&h.server, "/img/slow", 200, 1).await;

    let outcome = h
        .downloader
        .download_article(&format!("{uri}/s/slow"), "Slow", "2024-04-01")
        .await
        .unwrap();

    assert!(outcome.success);
    let html = std::fs::read_to_string(outcome.path.unwrap()).unwrap();
    assert!(html.contains(r#"src="images/Slow_0.jpg""#));
    assert!(h.downloader.images_dir().join("Slow_0.jpg").exists());
}

#[tokio::test]
async fn image_failing_every_attempt_is_omitted() {
    let h = harness().await;
    let uri = h.server.uri();
    let page = article_page(&format!(
        r#"<p>text</p><img data-src="{uri}/img/broken"><img data-src="{uri}/img/fine">"#
    ));
    mount_article(&h.server, "/s/broken", page, 1).await;
    // 3 attempts in total
    mount_image(&h.server, "/img/broken", 404, 3).await;
    mount_image(&h.server, "/img/fine", 200, 1).await;

    let url = format!("{uri}/s/broken");
    let outcome = h
        .downloader
        .download_article(&url, "Broken", "2024-04-02")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.image_count, 2);
    let html = std::fs::read_to_string(outcome.path.unwrap()).unwrap();
    assert!(!html.contains("/img/broken"));
    assert!(html.contains(r#"src="images/Broken_1.jpg""#));
    assert!(!h.downloader.images_dir().join("Broken_0.jpg").exists());

    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert_eq!(row.status(), ArticleStatus::Completed);
}

#[tokio::test]
async fn near_empty_article_is_still_saved() {
    let h = harness().await;
    let uri = h.server.uri();
    mount_article(&h.server, "/s/empty", article_page(""), 1).await;

    let url = format!("{uri}/s/empty");
    let outcome = h
        .downloader
        .download_article(&url, "Empty", "2024-05-01")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.image_count, 0);
    let row = h.db.get_article_by_link(&url).await.unwrap().unwrap();
    assert!(row.downloaded);
    assert_eq!(row.content, None);
}

#[test]
fn image_sources_resolve_against_the_page() {
    assert_eq!(
        resolve_image_url("https://mp.weixin.qq.com/s/abc", "//mmbiz.qpic.cn/x/640"),
        "https://mmbiz.qpic.cn/x/640"
    );
    assert_eq!(
        resolve_image_url("https://mp.weixin.qq.com/s/abc", "/img/1"),
        "https://mp.weixin.qq.com/img/1"
    );
    assert_eq!(
        resolve_image_url("not a url", "https://cdn.example/a.png"),
        "https://cdn.example/a.png"
    );
}
