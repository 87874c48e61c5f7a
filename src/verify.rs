use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use url::Url;

use crate::catalog::CatalogWalker;
use crate::domain::{CatalogRef, RecordDocument, resolve_href};
use crate::error::HarvestError;
use crate::fetch::RecordFetcher;
use crate::stac::{REL_PARENT, REL_SELF};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountStatus {
    Ok,
    Mismatch,
}

impl fmt::Display for CountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountStatus::Ok => write!(f, "OK"),
            CountStatus::Mismatch => write!(f, "MISMATCH"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub file: Utf8PathBuf,
    pub catalog: String,
    pub status: CountStatus,
    pub item_count: usize,
    pub line_count: usize,
}

/// Compares a harvested file against the catalog its first record points
/// to. The catalog is read as it is now, so a mismatch may only mean the
/// catalog changed after the harvest.
pub struct CountVerifier<'a, F: RecordFetcher + ?Sized> {
    fetcher: &'a F,
}

impl<'a, F: RecordFetcher + ?Sized> CountVerifier<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    pub async fn verify(&self, file: &Utf8Path) -> Result<VerifyReport, HarvestError> {
        let handle = File::open(file.as_std_path())
            .await
            .map_err(|err| HarvestError::io(file, err))?;
        let mut lines = BufReader::new(handle).lines();
        let first = lines
            .next_line()
            .await
            .map_err(|err| HarvestError::io(file, err))?
            .ok_or_else(|| HarvestError::EmptyFile(file.to_string()))?;
        let mut line_count = 1;
        while lines
            .next_line()
            .await
            .map_err(|err| HarvestError::io(file, err))?
            .is_some()
        {
            line_count += 1;
        }

        let record: RecordDocument =
            serde_json::from_str(&first).map_err(|err| HarvestError::Decode {
                source_name: format!("{file}:1"),
                message: err.to_string(),
            })?;
        let parent = parent_catalog(&record)?;
        let catalog = CatalogWalker::new(self.fetcher).resolve(&parent).await?;
        let item_count = catalog.item_links.len();

        let status = if item_count == line_count {
            CountStatus::Ok
        } else {
            CountStatus::Mismatch
        };
        info!(
            file = %file,
            catalog = %parent,
            item_count,
            line_count,
            status = %status,
            "checked item counts"
        );

        Ok(VerifyReport {
            file: file.to_path_buf(),
            catalog: parent.to_string(),
            status,
            item_count,
            line_count,
        })
    }
}

/// Absolute URI of a record's parent catalog. A relative `parent` href
/// needs the record's `self` link to resolve against. Nothing else about
/// the record is inspected.
pub fn parent_catalog(record: &RecordDocument) -> Result<CatalogRef, HarvestError> {
    let id = record.get("id").and_then(Value::as_str).unwrap_or("<unnamed>");
    let parent = link_href(record, REL_PARENT)
        .ok_or_else(|| HarvestError::Resolution(format!("record {id} has no parent link")))?;

    if let Ok(url) = Url::parse(parent) {
        return Ok(CatalogRef::from(url));
    }

    let self_href = link_href(record, REL_SELF).ok_or_else(|| {
        HarvestError::Resolution(format!(
            "record {id} has a relative parent link and no self link"
        ))
    })?;
    let base = Url::parse(self_href)
        .map_err(|err| HarvestError::Resolution(format!("{self_href}: {err}")))?;
    resolve_href(&base, parent).map(CatalogRef::from)
}

fn link_href<'a>(record: &'a RecordDocument, rel: &str) -> Option<&'a str> {
    record
        .get("links")?
        .as_array()?
        .iter()
        .find(|link| link.get("rel").and_then(Value::as_str) == Some(rel))?
        .get("href")?
        .as_str()
}
