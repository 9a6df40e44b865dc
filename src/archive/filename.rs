//! Deterministic, filesystem-safe names for artifacts and images

/// Strip characters that are not allowed in file names and trim the rest
///
/// Titles that end up empty become `untitled`.
pub fn sanitize_filename(input: &str) -> String {
    let cleaned: String = input.chars().filter(|c| !is_forbidden(*c)).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

/// `{date}_{title}.html`
pub fn article_file_name(publish_date: &str, title: &str) -> String {
    format!(
        "{}_{}.html",
        sanitize_filename(publish_date),
        sanitize_filename(title)
    )
}

/// `{title}_{ordinal}.{format}`
///
/// `format` comes from the page's `data-type` attribute; anything that is not
/// a short alphanumeric extension falls back to `jpg`.
pub fn image_file_name(title: &str, ordinal: usize, format: Option<&str>) -> String {
    let ext = format
        .map(str::trim)
        .filter(|f| !f.is_empty() && f.len() <= 8 && f.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg");
    format!("{}_{}.{}", sanitize_filename(title), ordinal, ext)
}
