//! STAC wire types: the catalog link graph and the item record schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HarvestError;

pub const REL_SELF: &str = "self";
pub const REL_PARENT: &str = "parent";
pub const REL_CHILD: &str = "child";
pub const REL_ITEM: &str = "item";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The parts of a STAC Catalog (or Collection) the walker relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl CatalogDocument {
    /// Collections are catalogs with extra metadata; both can be walked.
    pub fn is_catalog(&self) -> bool {
        matches!(self.kind.as_deref(), Some("Catalog" | "Collection"))
    }

    pub fn links_with_rel<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links.iter().filter(move |link| link.rel == rel)
    }
}

/// A STAC Item as persisted, one per ndjson line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Option<Value>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    pub properties: Map<String, Value>,
    pub links: Vec<Link>,
    pub assets: Map<String, Value>,
    #[serde(default)]
    pub collection: Option<String>,
}

impl StacItem {
    /// Decodes one ndjson line and checks it against the item schema.
    pub fn from_line(line: &str, location: &str) -> Result<Self, HarvestError> {
        let item: StacItem = serde_json::from_str(line).map_err(|err| HarvestError::Schema {
            location: location.to_string(),
            message: err.to_string(),
        })?;
        item.validate(location)?;
        Ok(item)
    }

    pub fn validate(&self, location: &str) -> Result<(), HarvestError> {
        let fail = |message: String| HarvestError::Schema {
            location: location.to_string(),
            message,
        };

        if self.kind != "Feature" {
            return Err(fail(format!("type must be \"Feature\", got {:?}", self.kind)));
        }
        if self.id.trim().is_empty() {
            return Err(fail("id must not be empty".to_string()));
        }
        if self.stac_version.trim().is_empty() {
            return Err(fail("stac_version must not be empty".to_string()));
        }
        if let Some(bbox) = &self.bbox {
            if bbox.len() != 4 && bbox.len() != 6 {
                return Err(fail(format!("bbox must have 4 or 6 numbers, got {}", bbox.len())));
            }
        }
        if let Some(geometry) = &self.geometry {
            if geometry.get("type").and_then(Value::as_str).is_none() {
                return Err(fail("geometry must be a GeoJSON object".to_string()));
            }
            if self.bbox.is_none() {
                return Err(fail("bbox is required when geometry is set".to_string()));
            }
        }
        self.datetime().map_err(fail)?;
        Ok(())
    }

    /// Nominal datetime of the item. `None` is only valid for items that
    /// declare a `start_datetime`/`end_datetime` range instead.
    pub fn datetime(&self) -> Result<Option<DateTime<Utc>>, String> {
        match self.properties.get("datetime") {
            Some(Value::String(value)) => parse_rfc3339(value).map(Some),
            Some(Value::Null) => {
                for key in ["start_datetime", "end_datetime"] {
                    match self.properties.get(key) {
                        Some(Value::String(value)) => {
                            parse_rfc3339(value)?;
                        }
                        _ => return Err(format!("datetime is null and {key} is missing")),
                    }
                }
                Ok(None)
            }
            Some(other) => Err(format!("datetime must be a string or null, got {other}")),
            None => Err("properties.datetime is missing".to_string()),
        }
    }
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC 3339 datetime {value:?}: {err}"))
}
