//! Search page planning.
//!
//! The number of result pages for a keyword is unknown up front. The planner
//! produces the bounded page sequence and groups it into fetch batches: one
//! batch holding every page in eager mode, `page_batch_size` pages per batch
//! in adaptive mode so the orchestrator can stop at the first sentinel page.

use jobtrawl_core::{CrawlConfig, PaginationMode, KEYWORD_PLACEHOLDER};

/// One search page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub number: u32,
    /// Absolute page URL
    pub url: String,
}

/// Lowercase the keyword and join its words with `-`.
#[must_use]
pub fn slugify(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Whether a page with `unique_items` distinct item identities signals that
/// no further results exist. The count includes the search page's own
/// pseudo-item, so only a page with nothing else on it qualifies.
#[must_use]
pub fn is_sentinel(unique_items: usize) -> bool {
    unique_items <= 1
}

/// Builds the page sequence for a keyword.
#[derive(Debug, Clone)]
pub struct PaginationPlanner {
    template: String,
    max_pages: u32,
    mode: PaginationMode,
    batch_size: u32,
}

impl PaginationPlanner {
    /// Create a planner from the crawl settings.
    #[must_use]
    pub fn new(crawl: &CrawlConfig) -> Self {
        Self {
            template: crawl.base_url_template.clone(),
            max_pages: crawl.max_pages,
            mode: crawl.pagination_mode,
            batch_size: crawl.page_batch_size.max(1),
        }
    }

    /// Pagination mode in effect.
    #[must_use]
    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    /// Page URLs `1..=max_pages` for `keyword`.
    #[must_use]
    pub fn plan(&self, keyword: &str) -> Vec<PageRequest> {
        let slug = slugify(keyword);
        let base = self.template.replace(KEYWORD_PLACEHOLDER, &slug);
        let separator = if base.contains('?') { '&' } else { '?' };

        (1..=self.max_pages)
            .map(|number| PageRequest {
                number,
                url: format!("{base}{separator}page={number}"),
            })
            .collect()
    }

    /// The planned pages grouped into fetch batches.
    #[must_use]
    pub fn batches(&self, keyword: &str) -> Vec<Vec<PageRequest>> {
        let pages = self.plan(keyword);
        match self.mode {
            PaginationMode::Eager => {
                if pages.is_empty() {
                    Vec::new()
                } else {
                    vec![pages]
                }
            }
            PaginationMode::Adaptive => pages
                .chunks(self.batch_size as usize)
                .map(<[PageRequest]>::to_vec)
                .collect(),
        }
    }
}
