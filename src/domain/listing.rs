use std::fmt;

use serde::Serialize;

use crate::utils::canonicalize_url;

/// Canonical absolute URL of one item page.
///
/// Two URLs that differ only in query string or fragment are the same listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ListingLink(String);

impl ListingLink {
    pub fn new(url: &str) -> Self {
        Self(canonicalize_url(url.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ListingLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
