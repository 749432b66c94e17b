//! HTML extraction for crawled pages.
//!
//! Pages come from arbitrary sites, so every field is read through a fixed
//! selector priority list: the first selector that yields non-empty text
//! wins. Main content falls back to the whole `<body>` when no content
//! container is found.

use crate::crawler::visited::normalize_link;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Fields pulled out of one HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    /// Main-content text, whitespace collapsed.
    pub text: String,
    /// Raw publication date text, empty when none was found.
    pub date: String,
    /// Absolute http(s) links in document order, without duplicates.
    pub links: Vec<String>,
}

/// Where a date selector keeps its value.
enum DateSource {
    Attr(&'static str),
    Text,
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
}

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["title", "h1"]));

static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));

static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "article",
        "main",
        "[role=main]",
        ".article-body",
        ".entry-content",
        ".post-content",
        "#content",
    ])
});

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("valid selector"));

static DATE_SELECTORS: Lazy<Vec<(Selector, DateSource)>> = Lazy::new(|| {
    [
        (r#"meta[property="article:published_time"]"#, DateSource::Attr("content")),
        (r#"meta[name="date"]"#, DateSource::Attr("content")),
        (r#"meta[itemprop="datePublished"]"#, DateSource::Attr("content")),
        ("time[datetime]", DateSource::Attr("datetime")),
        ("time", DateSource::Text),
        (".date", DateSource::Text),
        (".published", DateSource::Text),
    ]
    .into_iter()
    .map(|(sel, source)| (Selector::parse(sel).expect("valid selector"), source))
    .collect()
});

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `html` fetched from `page_url`.
pub fn extract_page(html: &str, page_url: &Url) -> Page {
    let document = Html::parse_document(html);
    Page {
        title: extract_title(&document),
        text: extract_text(&document),
        date: extract_date(&document),
        links: extract_links(&document, page_url),
    }
}

fn extract_title(document: &Html) -> String {
    TITLE_SELECTORS
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(|el| collapse_whitespace(&element_text(el)))
        .find(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&OG_TITLE_SELECTOR)
                .filter_map(|el| el.value().attr("content"))
                .map(collapse_whitespace)
                .find(|t| !t.is_empty())
        })
        .unwrap_or_default()
}

fn extract_text(document: &Html) -> String {
    CONTENT_SELECTORS
        .iter()
        .map(|sel| {
            let joined = document
                .select(sel)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" ");
            collapse_whitespace(&joined)
        })
        .find(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&BODY_SELECTOR)
                .next()
                .map(|body| collapse_whitespace(&element_text(body)))
        })
        .unwrap_or_default()
}

fn extract_date(document: &Html) -> String {
    DATE_SELECTORS
        .iter()
        .flat_map(|(sel, source)| {
            document.select(sel).map(move |el| match source {
                DateSource::Attr(name) => el.value().attr(name).unwrap_or_default().to_string(),
                DateSource::Text => element_text(el),
            })
        })
        .map(|raw| collapse_whitespace(&raw))
        .find(|d| !d.is_empty())
        .unwrap_or_default()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .select(&LINK_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter_map(|resolved| normalize_link(resolved.as_str()))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
