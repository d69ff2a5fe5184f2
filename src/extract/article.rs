//! Locate the post article in a page and render it as plain markdown-ish text.

use scraper::{Html, Selector};

use super::ExtractError;

/// First `<article>` whose id starts with `post`.
const ARTICLE_SELECTOR: &str = r#"article[id^="post"]"#;

/// Wide enough that html2text never re-wraps prose.
const WRAP_WIDTH: usize = 1000;

/// Outer HTML of the first matching article in document order, if any.
pub fn find_article(html: &str) -> Result<Option<String>, ExtractError> {
    let selector =
        Selector::parse(ARTICLE_SELECTOR).map_err(|e| ExtractError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().map(|el| el.html()))
}

/// Convert an HTML fragment to text with ATX headings (`#`, `##`, ...).
pub fn to_markdown(fragment: &str) -> Result<String, ExtractError> {
    let text = html2text::from_read(fragment.as_bytes(), WRAP_WIDTH)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    Ok(text.trim().to_string())
}

/// Find the post article and render it. A page without one is `NotFound`.
pub fn article_markdown(html: &str) -> Result<String, ExtractError> {
    let article = find_article(html)?.ok_or(ExtractError::NotFound)?;
    to_markdown(&article)
}
