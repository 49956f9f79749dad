//! Identity resolution for item URLs.

use crate::error::IdentityError;
use jobtrawl_core::{Identity, ItemReference};

/// Derive the identity of an item from its URL.
///
/// Everything from the first `?` is dropped (and any `#` fragment), then the
/// text after the last `/` is the identity. A trailing `/` is ignored, so
/// `/job/42/` and `/job/42?ref=x` both resolve to `42`.
pub fn resolve(url: &str) -> Result<Identity, IdentityError> {
    let no_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = no_query.trim_end_matches('/');

    path.rsplit_once('/')
        .and_then(|(_, tail)| Identity::new(tail))
        .ok_or_else(|| IdentityError::NoPathSegment {
            url: url.to_string(),
        })
}

/// Resolve an item reference.
pub fn resolve_reference(reference: &ItemReference) -> Result<Identity, IdentityError> {
    resolve(&reference.url)
}
