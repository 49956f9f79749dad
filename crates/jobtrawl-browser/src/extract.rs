//! HTML content extraction shared by every fetch backend.
//!
//! Turns a rendered HTML document into the visible text of the configured
//! regions and the absolute URLs of the links worth following.

use crate::error::{FetchError, Result};
use jobtrawl_core::{RawPage, RenderConfig};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Elements whose text content is never visible.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract text and links from an HTML document fetched from `url`.
///
/// Relative links are resolved against `url`; fragments are dropped, and
/// non-HTTP schemes (`mailto:`, `javascript:`) are ignored.
pub fn extract_page(url: &str, html: &str, config: &RenderConfig) -> Result<RawPage> {
    let base = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(html);

    let extracted_text = extract_text(&document, url, config)?;
    let links = extract_links(&document, &base, config);

    Ok(RawPage {
        url: url.to_string(),
        extracted_text,
        links,
    })
}

fn parse_selector(selector: &str, url: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| FetchError::Extraction {
        url: url.to_string(),
        reason: format!("invalid selector '{selector}': {e}"),
    })
}

fn extract_text(document: &Html, url: &str, config: &RenderConfig) -> Result<String> {
    let mut lines = Vec::new();

    if config.target_elements.is_empty() {
        let body = parse_selector("body", url)?;
        match document.select(&body).next() {
            Some(element) => collect_text(element, config, &mut lines),
            None => collect_text(document.root_element(), config, &mut lines),
        }
    } else {
        for target in &config.target_elements {
            let selector = parse_selector(target, url)?;
            for element in document.select(&selector) {
                collect_text(element, config, &mut lines);
            }
        }
    }

    Ok(lines.join("\n"))
}

fn collect_text(element: ElementRef<'_>, config: &RenderConfig, out: &mut Vec<String>) {
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                    .is_some_and(|name| SKIPPED_TAGS.contains(&name));
                if hidden {
                    continue;
                }
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    out.push(collapsed);
                }
            }
            Node::Element(el) if el.name() == "img" && !config.exclude_images => {
                if let Some(alt) = el.attr("alt").map(str::trim).filter(|a| !a.is_empty()) {
                    out.push(format!("[image: {alt}]"));
                }
            }
            _ => {}
        }
    }
}

fn extract_links(document: &Html, base: &Url, config: &RenderConfig) -> Vec<String> {
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let page_host = base.host_str().unwrap_or_default();

    document
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|link| matches!(link.scheme(), "http" | "https"))
        .filter_map(|mut link| {
            link.set_fragment(None);
            let host = link.host_str().unwrap_or_default().to_string();
            let internal = host == page_host;
            if config.exclude_external_links && !internal {
                return None;
            }
            if config.exclude_social_media_domains
                && is_social_domain(&host, &config.social_media_domains)
            {
                return None;
            }
            Some(link.to_string())
        })
        .collect()
}

fn is_social_domain(host: &str, social_domains: &[String]) -> bool {
    social_domains
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
}
