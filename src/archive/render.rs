//! Standalone HTML artifacts

use super::extract::{ArticleContent, Fragment};

/// Inline style given to images that were saved locally
pub(crate) const LOCAL_IMAGE_STYLE: &str =
    "width: 100% !important; height: auto !important; visibility: visible !important;";

const STYLESHEET: &str = r#"<style>
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, "Noto Sans", sans-serif, "Apple Color Emoji", "Segoe UI Emoji", "Segoe UI Symbol", "Noto Color Emoji";
        line-height: 1.6;
        color: #333;
        background-color: #f2f2f2;
        margin: 0;
        padding: 0;
    }
    .page-container {
        max-width: 677px;
        margin: 0 auto;
        background-color: #fff;
        padding: 20px 40px;
        min-height: 100vh;
    }
    @media screen and (max-width: 768px) {
        .page-container {
            padding: 15px;
            width: 100%;
            box-sizing: border-box;
        }
    }
    h1.article-title {
        font-size: 22px;
        font-weight: 700;
        margin-bottom: 14px;
        line-height: 1.4;
        color: #333;
    }
    .article-meta {
        margin-bottom: 22px;
        line-height: 20px;
        font-size: 15px;
        color: rgba(0,0,0,0.3);
    }
    .article-meta span {
        margin-right: 8px;
    }
    .article-meta .account-name {
        color: #576b95;
        font-weight: 400;
    }
    #js_content, .rich_media_content, #img-content {
        visibility: visible !important;
        overflow: hidden;
        color: #333;
        font-size: 17px;
        text-align: justify;
        word-wrap: break-word;
        hyphens: auto;
    }
    #js_content p {
        margin: 0 0 16px;
        min-height: 1em;
    }
    #js_content img {
        max-width: 100% !important;
        height: auto !important;
        display: block;
        margin: 10px auto;
        border-radius: 4px;
    }
    blockquote {
        padding-left: 10px;
        border-left: 3px solid #dbdbdb;
        color: rgba(0,0,0,0.5);
        font-size: 15px;
        margin: 1em 0;
    }
    a {
        color: #576b95;
        text-decoration: none;
    }
    a:hover {
        text-decoration: underline;
    }
    hr {
        border: 0;
        border-top: 1px solid #eee;
        margin: 20px 0;
    }
</style>"#;

/// What happened to one content image
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ImageFate {
    /// Saved; the element now points at this relative path
    Localized(String),
    /// Nothing to fetch (inline data or no source); emitted as found
    Untouched,
    /// Every fetch attempt failed; the element is omitted
    Dropped,
}

/// Escape text content
pub(crate) fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value
pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write `<name attr="...">`
///
/// `overrides` replace same-named attributes in place, or are appended when
/// absent. Attributes named in `removed` are dropped.
pub(crate) fn write_start_tag<'a>(
    buf: &mut String,
    name: &str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
    overrides: &[(&str, &str)],
    removed: &[&str],
) {
    let mut applied = vec![false; overrides.len()];

    buf.push('<');
    buf.push_str(name);
    for (key, value) in attrs {
        if removed.contains(&key) {
            continue;
        }
        let value = match overrides.iter().position(|(k, _)| *k == key) {
            Some(i) => {
                applied[i] = true;
                overrides[i].1
            }
            None => value,
        };
        push_attr(buf, key, value);
    }
    for ((key, value), done) in overrides.iter().zip(applied) {
        if !done {
            push_attr(buf, key, value);
        }
    }
    buf.push('>');
}

fn push_attr(buf: &mut String, key: &str, value: &str) {
    buf.push(' ');
    buf.push_str(key);
    buf.push_str("=\"");
    buf.push_str(&escape_attr(value));
    buf.push('"');
}

/// Serialize the content region with each image resolved per `fates`
///
/// Images without a recorded fate are emitted unchanged.
pub(crate) fn render_content(content: &ArticleContent, fates: &[ImageFate]) -> String {
    let mut out = String::new();
    for fragment in &content.fragments {
        match fragment {
            Fragment::Markup(markup) => out.push_str(markup),
            Fragment::Image(index) => {
                let Some(image) = content.images.get(*index) else {
                    continue;
                };
                let attrs = image.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()));
                match fates.get(*index).unwrap_or(&ImageFate::Untouched) {
                    ImageFate::Localized(path) => write_start_tag(
                        &mut out,
                        "img",
                        attrs,
                        &[("src", path.as_str()), ("style", LOCAL_IMAGE_STYLE)],
                        &["data-src"],
                    ),
                    ImageFate::Untouched => write_start_tag(&mut out, "img", attrs, &[], &[]),
                    ImageFate::Dropped => {}
                }
            }
        }
    }
    out
}

/// Wrap processed content into a self-contained document
pub(crate) fn render_document(
    title: &str,
    account_label: &str,
    publish_date: &str,
    content_html: &str,
) -> String {
    let title = escape_text(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    {css}
</head>
<body>
    <div class="page-container">
        <h1 class="article-title">{title}</h1>
        <div class="article-meta">
            <span class="account-name">{account}</span>
            <span class="publish-time">{date}</span>
        </div>
        <hr>
        {content}
    </div>
</body>
</html>
"#,
        title = title,
        css = STYLESHEET,
        account = escape_text(account_label),
        date = escape_text(publish_date),
        content = content_html,
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extract::extract_article;

    fn content_with_images() -> ArticleContent {
        let html = r#"<html><head><title>t</title></head><body><div id="js_content">
            <p>one</p>
            <img data-src="https://img.example/a" src="placeholder.gif" class="rich_pages">
            <img src="data:image/gif;base64,R0lG">
            <img data-src="https://img.example/c">
        </div></body></html>"#;
        extract_article(html, "t").unwrap()
    }

    #[test]
    fn escaping_covers_markup_characters() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr(r#"say "hi" & go"#), "say &quot;hi&quot; &amp; go");
    }

    #[test]
    fn start_tag_overrides_in_place_and_appends_missing() {
        let mut buf = String::new();
        write_start_tag(
            &mut buf,
            "img",
            [("src", "old"), ("data-src", "lazy"), ("alt", "x")].into_iter(),
            &[("src", "new"), ("style", "s")],
            &["data-src"],
        );
        assert_eq!(buf, r#"<img src="new" alt="x" style="s">"#);
    }

    #[test]
    fn localized_images_point_at_the_local_file() {
        let content = content_with_images();
        let html = render_content(
            &content,
            &[
                ImageFate::Localized("images/t_0.jpg".to_string()),
                ImageFate::Untouched,
                ImageFate::Localized("images/t_2.jpg".to_string()),
            ],
        );

        assert!(html.contains(r#"src="images/t_0.jpg""#));
        assert!(html.contains(r#"src="images/t_2.jpg""#));
        assert!(!html.contains("data-src"));
        assert!(!html.contains("placeholder.gif"));
        assert!(html.contains(r#"class="rich_pages""#));
        assert!(html.contains(&format!(r#"style="{}""#, LOCAL_IMAGE_STYLE)));
        assert!(html.contains("data:image/gif;base64,R0lG"));
    }

    #[test]
    fn dropped_images_are_omitted() {
        let content = content_with_images();
        let html = render_content(
            &content,
            &[
                ImageFate::Dropped,
                ImageFate::Untouched,
                ImageFate::Localized("images/t_2.jpg".to_string()),
            ],
        );

        assert!(!html.contains("img.example/a"));
        assert!(!html.contains("placeholder.gif"));
        assert_eq!(html.matches("<img").count(), 2);
        assert!(html.contains("<p>one</p>"));
    }

    #[test]
    fn document_escapes_title_and_embeds_content() {
        let doc = render_document("A <b> & C", "Demo Account", "2024-01-15", "<div>body</div>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"<html lang="zh-CN">"#));
        assert!(doc.contains("<title>A &lt;b&gt; &amp; C</title>"));
        assert!(doc.contains(r#"<h1 class="article-title">A &lt;b&gt; &amp; C</h1>"#));
        assert!(doc.contains(r#"<span class="account-name">Demo Account</span>"#));
        assert!(doc.contains(r#"<span class="publish-time">2024-01-15</span>"#));
        assert!(doc.contains("<hr>"));
        assert!(doc.contains("<div>body</div>"));
        assert!(doc.contains("<style>"));
    }
}
