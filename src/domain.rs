use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HarvestError;

/// One harvested record. Kept as raw JSON so nothing the catalog publishes is lost.
pub type RecordDocument = serde_json::Value;

/// URI naming a catalog resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRef(Url);

impl CatalogRef {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for CatalogRef {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CatalogRef {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_location(value).map(Self)
    }
}

/// URI naming one leaf record of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordLink(Url);

impl RecordLink {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for RecordLink {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for RecordLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordLink {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_location(value).map(Self)
    }
}

/// Parses an `http(s)://` or `file://` URL, or a filesystem path which is
/// turned into an absolute `file://` URL.
pub fn parse_location(value: &str) -> Result<Url, HarvestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HarvestError::InvalidUri(value.to_string()));
    }

    match Url::parse(trimmed) {
        Ok(url) if is_supported_scheme(url.scheme()) => return Ok(url),
        // single-letter schemes are Windows drive letters, not URLs
        Ok(url) if url.scheme().len() > 1 => {
            return Err(HarvestError::InvalidUri(value.to_string()));
        }
        _ => {}
    }

    let path = std::path::absolute(trimmed)
        .map_err(|_| HarvestError::InvalidUri(value.to_string()))?;
    Url::from_file_path(&path).map_err(|_| HarvestError::InvalidUri(value.to_string()))
}

/// Resolves a link href against the URI of the document that declared it.
pub fn resolve_href(base: &Url, href: &str) -> Result<Url, HarvestError> {
    let url = base
        .join(href.trim())
        .map_err(|err| HarvestError::InvalidUri(format!("{href}: {err}")))?;
    if !is_supported_scheme(url.scheme()) {
        return Err(HarvestError::InvalidUri(href.to_string()));
    }
    Ok(url)
}

fn is_supported_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https" | "file")
}
