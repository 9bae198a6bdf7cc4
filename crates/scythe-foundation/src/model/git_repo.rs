//! Git repository locator parsed from a remote URL.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ScytheError;

// The first pair of patterns extracts host, owner and repository name from
// URLs carrying a `.git` suffix, keeping the suffix out of the name. The
// second pair handles all other URLs and must stay after the first so a
// `.git` suffix is never folded into the repository name.
static URL_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"^https?://[^/]+@([^/]+)/([^/]+)/([^/]+)\.git/?$").unwrap(),
        Regex::new(r"^https?://([^/]+)/([^/]+)/([^/]+)\.git/?$").unwrap(),
        Regex::new(r"^https?://[^/]+@([^/]+)/([^/]+)/([^/]+)/?$").unwrap(),
        Regex::new(r"^https?://([^/]+)/([^/]+)/([^/]+)/?$").unwrap(),
    ]
});

/// Normalized locator for a remote git repository.
///
/// Derived host/owner/name form the working directory name and identify
/// duplicate in-flight inspections for the same repo+branch pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitRepo {
    /// Remote URL as submitted, trimmed
    pub url: String,
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl GitRepo {
    /// Parse a locator from a remote URL.
    ///
    /// Rejects anything the pattern set cannot decompose into
    /// host/owner/name with a `MalformedRequest` error.
    pub fn parse(url: &str) -> Result<Self, ScytheError> {
        let trimmed = url.trim();
        for pattern in URL_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(trimmed) {
                return Ok(Self {
                    url: trimmed.to_string(),
                    host: captures[1].to_string(),
                    owner: captures[2].to_string(),
                    name: captures[3].to_string(),
                });
            }
        }
        Err(ScytheError::malformed(format!(
            "Cannot parse repository URL: {trimmed}"
        )))
    }
}
