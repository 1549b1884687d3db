use crate::CrawlError;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub hrefs: Vec<String>,
}

/// Turns raw page content into visible text and outbound hrefs.
pub trait Extractor {
    fn extract(&self, raw: &str) -> Extracted;
}

pub struct HtmlExtractor {
    content: Selector,
    anchors: Selector,
}

impl HtmlExtractor {
    pub fn new(content_selector: &str) -> Result<Self, CrawlError> {
        let content = Selector::parse(content_selector).map_err(|e| CrawlError::Selector {
            selector: content_selector.to_string(),
            reason: e.to_string(),
        })?;
        let anchors = Selector::parse("a[href]").map_err(|e| CrawlError::Selector {
            selector: "a[href]".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { content, anchors })
    }
}

/// Elements whose text content is never rendered as page prose.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text under `el`, one space between text nodes.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|e| HIDDEN_TAGS.contains(&e.name()));
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

impl Extractor for HtmlExtractor {
    fn extract(&self, raw: &str) -> Extracted {
        let doc = Html::parse_document(raw);
        let text = doc
            .select(&self.content)
            .filter(|el| !HIDDEN_TAGS.contains(&el.value().name()))
            .map(visible_text)
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let hrefs = doc
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect();
        Extracted { text, hrefs }
    }
}

/// Strip the fragment so `/a#x` and `/a` are the same page.
pub fn normalize(u: &Url) -> String {
    let mut s = u.clone();
    s.set_fragment(None);
    s.to_string()
}

/// Resolve `href` against the page it appeared on and keep it only if it stays on
/// the crawl's origin (same scheme, host and port).
pub fn resolve_link(base: &Url, page: &Url, href: &str) -> Option<String> {
    let resolved = page.join(href.trim()).ok()?;
    if resolved.origin() != base.origin() {
        return None;
    }
    Some(normalize(&resolved))
}

pub fn resolve_links(base: &Url, page: &Url, hrefs: &[String]) -> BTreeSet<String> {
    hrefs.iter().filter_map(|h| resolve_link(base, page, h)).collect()
}
