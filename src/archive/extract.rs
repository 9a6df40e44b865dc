//! Locating the article body in a fetched page
//!
//! Parsing happens in one synchronous pass: the content region is found,
//! its text and images are collected and the subtree is serialized into
//! [`ArticleContent`]. The parsed document never outlives this module, so
//! the result can be carried across `.await` points.

use crate::error::ContentParseError;
use scraper::{ElementRef, Html, Node, Selector};

use super::render::{escape_text, write_start_tag};

/// Content containers, most specific first
pub(crate) const CONTENT_SELECTORS: &[&str] =
    &["div#js_content", "div.rich_media_content", "div#img-content"];

/// Inline style that un-hides the content container
pub(crate) const VISIBLE_CONTAINER_STYLE: &str =
    "visibility: visible !important; opacity: 1 !important;";

const PREVIEW_CHARS: usize = 500;

// Elements whose text children are emitted without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// One `<img>` element of the content region
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ContentImage {
    /// Lazy-load source if present, else direct source; `None` for inline
    /// `data:` images and images without any source
    pub source: Option<String>,
    /// `data-type` attribute (format hint)
    pub format: Option<String>,
    /// Attributes as parsed
    pub attrs: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Fragment {
    Markup(String),
    Image(usize),
}

/// The content region of an article page
#[derive(Clone, Debug)]
pub(crate) struct ArticleContent {
    /// Whitespace-stripped text of the content region
    pub text: String,
    /// Every image, indexed by ordinal position
    pub images: Vec<ContentImage>,
    /// Character count of the whole page body's stripped text
    pub body_text_chars: usize,
    pub(crate) fragments: Vec<Fragment>,
}

impl ArticleContent {
    /// Number of `<img>` elements found
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// Find and serialize the content region of `html`
///
/// When no selector matches, the page is classified: a verification page,
/// an access-restricted notice, or an unknown layout (with a preview).
pub(crate) fn extract_article(html: &str, title: &str) -> Result<ArticleContent, ContentParseError> {
    let document = Html::parse_document(html);

    let content = CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next());

    let Some(content) = content else {
        return Err(classify_missing_content(&document, html, title));
    };

    let text = stripped_text(content);
    let body_text_chars = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|body| stripped_text(body).chars().count())
        .unwrap_or(0);

    let mut serializer = Serializer::default();
    serializer.element(content, true);
    let fragments = serializer.finish();

    Ok(ArticleContent {
        text,
        images: serializer.images,
        body_text_chars,
        fragments,
    })
}

fn classify_missing_content(document: &Html, html: &str, title: &str) -> ContentParseError {
    let page_title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|t| t.text().collect::<String>())
        .unwrap_or_default();

    if page_title.contains("验证") {
        return ContentParseError::VerificationPage {
            title: title.to_string(),
        };
    }

    let page_text: String = document.root_element().text().collect();
    if page_text.contains("访问受限") {
        return ContentParseError::AccessRestricted {
            title: title.to_string(),
        };
    }

    let preview: String = html
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_CHARS)
        .collect();

    ContentParseError::ContentNotFound {
        title: title.to_string(),
        preview,
    }
}

fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn image_source(attrs: &[(String, String)]) -> Option<String> {
    let lookup = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };
    lookup("data-src")
        .or_else(|| lookup("src"))
        .filter(|src| !src.starts_with("data:"))
        .map(str::to_string)
}

#[derive(Default)]
struct Serializer {
    fragments: Vec<Fragment>,
    buf: String,
    images: Vec<ContentImage>,
}

impl Serializer {
    fn element(&mut self, element: ElementRef<'_>, is_container: bool) {
        let value = element.value();
        let name = value.name();

        if name == "img" {
            let attrs: Vec<(String, String)> = value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let image = ContentImage {
                source: image_source(&attrs),
                format: value.attr("data-type").map(str::to_string),
                attrs,
            };
            self.flush();
            self.fragments.push(Fragment::Image(self.images.len()));
            self.images.push(image);
            return;
        }

        let overrides: &[(&str, &str)] = if is_container {
            &[("style", VISIBLE_CONTAINER_STYLE)]
        } else {
            &[]
        };
        write_start_tag(&mut self.buf, name, value.attrs(), overrides, &[]);

        if VOID_ELEMENTS.contains(&name) {
            return;
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    if raw_text {
                        self.buf.push_str(text);
                    } else {
                        self.buf.push_str(&escape_text(text));
                    }
                }
                Node::Comment(comment) => {
                    self.buf.push_str("<!--");
                    self.buf.push_str(comment);
                    self.buf.push_str("-->");
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, false);
                    }
                }
                _ => {}
            }
        }

        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.fragments
                .push(Fragment::Markup(std::mem::take(&mut self.buf)));
        }
    }

    fn finish(&mut self) -> Vec<Fragment> {
        self.flush();
        std::mem::take(&mut self.fragments)
    }
}
