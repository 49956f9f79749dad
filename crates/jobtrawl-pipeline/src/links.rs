//! Item-link matching and keyword-derived exclusion.

use crate::error::{PipelineError, Result};
use crate::pagination::slugify;
use jobtrawl_core::{CrawlConfig, ItemReference, RawPage, KEYWORD_PLACEHOLDER};
use regex::Regex;

/// Picks item links out of a search page for one keyword.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    item_pattern: Regex,
    exclusion: Option<Regex>,
}

impl LinkClassifier {
    /// Compile the item-link pattern and the exclusion pattern for `keyword`.
    ///
    /// The `{keyword}` placeholder in the exclusion pattern is replaced by the
    /// regex-escaped keyword slug. An empty exclusion pattern excludes nothing.
    pub fn new(crawl: &CrawlConfig, keyword: &str) -> Result<Self> {
        let item_pattern = compile(&crawl.item_link_pattern)?;

        let exclusion = if crawl.exclusion_pattern.trim().is_empty() {
            None
        } else {
            let pattern = crawl
                .exclusion_pattern
                .replace(KEYWORD_PLACEHOLDER, &regex::escape(&slugify(keyword)));
            Some(compile(&pattern)?)
        };

        Ok(Self {
            item_pattern,
            exclusion,
        })
    }

    /// Links on `page` that match the item pattern, in document order.
    #[must_use]
    pub fn item_links(&self, page: &RawPage) -> Vec<ItemReference> {
        page.links
            .iter()
            .filter(|link| self.item_pattern.is_match(link))
            .map(ItemReference::new)
            .collect()
    }

    /// Whether `reference` is the search page's own pseudo-item.
    #[must_use]
    pub fn is_excluded(&self, reference: &ItemReference) -> bool {
        self.exclusion
            .as_ref()
            .is_some_and(|re| re.is_match(&reference.url))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| PipelineError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
