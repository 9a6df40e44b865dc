//! Mock platform endpoints and article page fixtures

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The platform's rate-limit code
pub const RATE_LIMIT_RET: i64 = 200013;

/// Bytes served for every image
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfixture";

/// One entry of a mocked article list
#[derive(Clone, Debug)]
pub struct ListedArticle {
    /// Article title
    pub title: String,
    /// Path of the article page on the mock server
    pub route: String,
    /// Publish time as a unix timestamp
    pub update_time: i64,
}

impl ListedArticle {
    /// Article at `/s/{slug}` published on 2024-01-15 plus `day` days
    pub fn new(title: &str, slug: &str, day: i64) -> Self {
        Self {
            title: title.to_string(),
            route: format!("/s/{}", slug),
            // 2024-01-15 12:00:00 UTC
            update_time: 1_705_320_000 + day * 86_400,
        }
    }

    /// Link as the platform reports it
    pub fn link(&self, server: &MockServer) -> String {
        format!("{}{}", server.uri(), self.route)
    }

    fn to_json(&self, server: &MockServer) -> Value {
        json!({
            "aid": format!("{}_1", self.update_time),
            "title": self.title,
            "link": self.link(server),
            "cover": format!("{}/cover/{}.jpg", server.uri(), self.update_time),
            "digest": "",
            "update_time": self.update_time,
            "create_time": self.update_time,
        })
    }
}

/// Answer a search for `query` with one matching account
pub async fn mount_search(server: &MockServer, query: &str, fakeid: &str, nickname: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/searchbiz"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_resp": {"ret": 0, "err_msg": "ok"},
            "list": [{"fakeid": fakeid, "nickname": nickname, "alias": "", "round_head_img": ""}],
            "total": 1,
        })))
        .mount(server)
        .await;
}

/// Answer a search for `query` with no matching account
pub async fn mount_search_empty(server: &MockServer, query: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/searchbiz"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_resp": {"ret": 0, "err_msg": "ok"},
            "list": [],
            "total": 0,
        })))
        .mount(server)
        .await;
}

/// Answer a search for `query` with an HTTP error status
pub async fn mount_search_status(server: &MockServer, query: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/searchbiz"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `articles` as the page of `fakeid`'s list starting at `begin`
pub async fn mount_list_page(
    server: &MockServer,
    fakeid: &str,
    begin: u32,
    articles: &[ListedArticle],
    total: usize,
) {
    let list: Vec<Value> = articles.iter().map(|a| a.to_json(server)).collect();
    Mock::given(method("GET"))
        .and(path("/cgi-bin/appmsg"))
        .and(query_param("fakeid", fakeid))
        .and(query_param("begin", begin.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_resp": {"ret": 0, "err_msg": "ok"},
            "app_msg_list": list,
            "app_msg_cnt": total,
        })))
        .mount(server)
        .await;
}

/// Answer the list page starting at `begin` with the rate-limit code
pub async fn mount_list_rate_limited(server: &MockServer, fakeid: &str, begin: u32) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/appmsg"))
        .and(query_param("fakeid", fakeid))
        .and(query_param("begin", begin.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_resp": {"ret": RATE_LIMIT_RET, "err_msg": "freq control"},
        })))
        .mount(server)
        .await;
}

/// Serve an article page at `route`, expecting exactly `times` requests
pub async fn mount_article(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Serve an image at `route`, expecting exactly `times` requests
pub async fn mount_image(server: &MockServer, route: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// Fail the first `failures` requests for the image at `route` with a 500,
/// then serve it
pub async fn mount_flaky_image(server: &MockServer, route: &str, failures: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(failures)
        .expect(failures)
        .with_priority(1)
        .mount(server)
        .await;
    mount_image(server, route, 1).await;
}

/// Always fail the image at `route` with a 500
pub async fn mount_broken_image(server: &MockServer, route: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500))
        .expect(times)
        .mount(server)
        .await;
}

/// A typical article page with `body` inside the content container
pub fn article_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<div class="rich_media_area_primary">
  <h1 class="rich_media_title">{title}</h1>
  <div class="rich_media_content" id="js_content" style="visibility: hidden;">
    {body}
  </div>
</div>
</body>
</html>"#
    )
}

/// An article page with enough paragraph text to pass the content checks
pub fn text_article(title: &str) -> String {
    article_page(
        title,
        "<p>Ownership rules every value in Rust, and each value has exactly one owner.</p>\
         <p>When the owner goes out of scope the value is dropped and its memory is freed.</p>",
    )
}
