use serde::Serialize;
use tracing::debug;

use crate::domain::{CatalogRef, RecordLink, resolve_href};
use crate::error::HarvestError;
use crate::fetch::RecordFetcher;
use crate::stac::{CatalogDocument, REL_CHILD, REL_ITEM};

/// A catalog with every link href made absolute.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCatalog {
    pub href: CatalogRef,
    pub id: String,
    pub title: Option<String>,
    pub child_links: Vec<CatalogRef>,
    pub item_links: Vec<RecordLink>,
}

impl ResolvedCatalog {
    /// Title used to name harvest output. Falls back to the catalog id.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.id,
        }
    }
}

pub struct CatalogWalker<'a, F: RecordFetcher + ?Sized> {
    fetcher: &'a F,
}

impl<'a, F: RecordFetcher + ?Sized> CatalogWalker<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    /// Reads the catalog at `catalog` and enumerates its child and item links.
    /// Relative hrefs resolve against the URI the catalog was read from.
    pub async fn resolve(&self, catalog: &CatalogRef) -> Result<ResolvedCatalog, HarvestError> {
        let raw = self
            .fetcher
            .fetch(catalog.as_url())
            .await
            .map_err(|err| HarvestError::Resolution(format!("{catalog}: {err}")))?;
        if !raw.is_object() {
            return Err(HarvestError::Resolution(format!("{catalog} is not a JSON object")));
        }
        let document: CatalogDocument = serde_json::from_value(raw).map_err(|err| {
            HarvestError::Resolution(format!("{catalog} is not a STAC catalog: {err}"))
        })?;
        if !document.is_catalog() {
            return Err(HarvestError::Resolution(format!(
                "{catalog} has type {:?}, expected Catalog or Collection",
                document.kind.as_deref().unwrap_or("<missing>")
            )));
        }

        let base = catalog.as_url();
        let child_links = document
            .links_with_rel(REL_CHILD)
            .map(|link| resolve_href(base, &link.href).map(CatalogRef::from))
            .collect::<Result<Vec<_>, _>>()?;
        let item_links = document
            .links_with_rel(REL_ITEM)
            .map(|link| resolve_href(base, &link.href).map(RecordLink::from))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            catalog = %catalog,
            children = child_links.len(),
            items = item_links.len(),
            "resolved catalog"
        );

        Ok(ResolvedCatalog {
            href: catalog.clone(),
            id: document.id,
            title: document.title,
            child_links,
            item_links,
        })
    }
}
