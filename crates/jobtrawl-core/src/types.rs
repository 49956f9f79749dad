//! Shared types used across the jobtrawl pipeline.
//!
//! This module defines the records that flow downstream through the
//! pipeline: item references discovered on search pages, the fetched pages
//! themselves, and the enriched records that end up in storage.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Canonical deduplication key derived from an item's URL.
///
/// Construction goes through the pipeline's identity resolver, which strips
/// the query string and keeps the final path segment. Once built, an
/// `Identity` is an opaque, non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an already-resolved identity string.
    ///
    /// Returns `None` for an empty string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A link to an item page found on a search page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemReference {
    /// Absolute URL of the item page
    pub url: String,
}

impl ItemReference {
    /// Create a reference from a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The fetched, extracted content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    /// URL that was requested
    pub url: String,
    /// Visible text content, restricted to the configured regions
    pub extracted_text: String,
    /// Absolute URLs of the internal links on the page, in document order
    pub links: Vec<String>,
}

/// The fetched content of one item page, keyed by its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    /// Identity resolved from the item URL
    pub identity: Identity,
    /// URL of the item page
    pub url: String,
    /// Extracted text content of the item page
    pub extracted_text: String,
}

/// Rendering and extraction options passed to the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Drop image alt text from the extracted text
    pub exclude_images: bool,
    /// Drop links pointing at other hosts
    pub exclude_external_links: bool,
    /// Drop links pointing at social media domains
    pub exclude_social_media_domains: bool,
    /// Domains treated as social media
    pub social_media_domains: Vec<String>,
    /// CSS selectors restricting text extraction (empty = whole body)
    pub target_elements: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            exclude_images: true,
            exclude_external_links: true,
            exclude_social_media_domains: true,
            social_media_domains: [
                "facebook.com",
                "twitter.com",
                "x.com",
                "instagram.com",
                "linkedin.com",
                "youtube.com",
                "tiktok.com",
                "pinterest.com",
                "reddit.com",
                "whatsapp.com",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            target_elements: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Restrict extraction to the given CSS selectors.
    #[must_use]
    pub fn with_target_elements<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_elements = selectors.into_iter().map(Into::into).collect();
        self
    }
}

/// Structured output of the enrichment collaborator.
///
/// Every field may be missing in the model output; missing, `null`, and
/// blank values all mean "not present". Wrongly typed values are a parse
/// error, not something to coerce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Job title
    #[serde(default)]
    pub title: Option<String>,
    /// Hiring organization
    #[serde(default)]
    pub organization: Option<String>,
    /// Task responsibilities
    #[serde(default, deserialize_with = "null_as_empty")]
    pub responsibilities: Vec<String>,
    /// Required qualifications
    #[serde(default, deserialize_with = "null_as_empty")]
    pub qualifications: Vec<String>,
    /// Working experience requirements
    #[serde(default, deserialize_with = "null_as_empty")]
    pub experiences: Vec<String>,
    /// Technical and soft skills
    #[serde(default, deserialize_with = "null_as_empty")]
    pub skills: Vec<String>,
    /// Salary as written in the listing
    #[serde(default)]
    pub salary: Option<String>,
    /// Working location
    #[serde(default)]
    pub location: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn clean_scalar(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl StructuredRecord {
    /// Trim every value and turn blank values into "not present".
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            title: clean_scalar(self.title),
            organization: clean_scalar(self.organization),
            responsibilities: clean_list(self.responsibilities),
            qualifications: clean_list(self.qualifications),
            experiences: clean_list(self.experiences),
            skills: clean_list(self.skills),
            salary: clean_scalar(self.salary),
            location: clean_scalar(self.location),
        }
    }
}

/// The final, persisted representation of one listing.
///
/// `identity`, `source_url` and `search_keyword` are stamped by the pipeline,
/// never produced by the inference collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Unique key of the listing
    pub identity: Identity,
    /// URL the listing was fetched from
    pub source_url: String,
    /// Keyword of the search that discovered the listing
    pub search_keyword: String,
    /// Job title
    pub title: Option<String>,
    /// Hiring organization
    pub organization: Option<String>,
    /// Task responsibilities, in listing order
    pub responsibilities: Vec<String>,
    /// Required qualifications, in listing order
    pub qualifications: Vec<String>,
    /// Experience notes, in listing order
    pub experience_notes: Vec<String>,
    /// Skills, in listing order
    pub skills: Vec<String>,
    /// Salary as written in the listing
    pub salary: Option<String>,
    /// Working location
    pub location: Option<String>,
}

impl EnrichedRecord {
    /// Stamp a structured record with the metadata derived out-of-band.
    #[must_use]
    pub fn from_structured(
        identity: Identity,
        source_url: impl Into<String>,
        search_keyword: impl Into<String>,
        structured: StructuredRecord,
    ) -> Self {
        let structured = structured.normalized();
        Self {
            identity,
            source_url: source_url.into(),
            search_keyword: search_keyword.into(),
            title: structured.title,
            organization: structured.organization,
            responsibilities: structured.responsibilities,
            qualifications: structured.qualifications,
            experience_notes: structured.experiences,
            skills: structured.skills,
            salary: structured.salary,
            location: structured.location,
        }
    }
}
