use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogWalker;
use crate::config::HarvestConfig;
use crate::domain::{CatalogRef, RecordLink};
use crate::error::HarvestError;
use crate::fetch::RecordFetcher;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::sink::AppendSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestFailure {
    pub link: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub catalog: String,
    pub title: String,
    pub output_path: Utf8PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<HarvestFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn new(catalog: &CatalogRef, title: &str, output_path: Utf8PathBuf, total: usize) -> Self {
        let now = Utc::now();
        Self {
            catalog: catalog.to_string(),
            title: title.to_string(),
            output_path,
            total,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, link: &RecordLink, outcome: HarvestOutcome) {
        match outcome {
            HarvestOutcome::Success => self.succeeded += 1,
            HarvestOutcome::Failure(reason) => {
                self.failed += 1;
                self.failures.push(HarvestFailure {
                    link: link.to_string(),
                    reason,
                });
            }
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Walks a catalog and persists every item it links to.
pub struct Harvester<F: RecordFetcher> {
    fetcher: F,
    config: HarvestConfig,
}

impl<F: RecordFetcher> Harvester<F> {
    pub fn new(fetcher: F, config: HarvestConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvests every item link of `catalog` into `<output_dir>/<title>.json`.
    ///
    /// Item links are enumerated once before any fetch starts. At most
    /// `config.concurrency` fetch-and-append units are pending at a time.
    /// A failed unit is recorded in the summary and never cancels its
    /// siblings; only an unresolvable catalog fails the whole run. Existing
    /// output is appended to, not replaced.
    pub async fn harvest(
        &self,
        catalog: &CatalogRef,
        output_dir: &Utf8Path,
        observer: &dyn ProgressObserver,
    ) -> Result<RunSummary, HarvestError> {
        let resolved = CatalogWalker::new(&self.fetcher).resolve(catalog).await?;
        let title = resolved.display_title().to_string();
        let output_path = output_path_for(output_dir, &title);
        let total = resolved.item_links.len();
        let mut summary = RunSummary::new(catalog, &title, output_path.clone(), total);

        info!(
            catalog = %catalog,
            title = %title,
            items = total,
            concurrency = self.config.concurrency.get(),
            "processing catalog"
        );

        if total == 0 {
            return Ok(summary);
        }

        tokio::fs::create_dir_all(output_dir.as_std_path())
            .await
            .map_err(|err| HarvestError::io(output_dir, err))?;

        let sink = AppendSink::new(output_path);
        observer.event(ProgressEvent::Started {
            title: title.clone(),
            total,
        });

        let mut completions = stream::iter(resolved.item_links.iter())
            .map(|link| self.harvest_one(link, &sink))
            .buffer_unordered(self.config.concurrency.get());

        while let Some((link, outcome)) = completions.next().await {
            let error = match &outcome {
                HarvestOutcome::Success => None,
                HarvestOutcome::Failure(reason) => Some(reason.clone()),
            };
            summary.record(link, outcome);
            observer.event(ProgressEvent::Completed {
                link: link.to_string(),
                completed: summary.completed(),
                total,
                failed: summary.failed,
                error,
            });
        }

        summary.finished_at = Utc::now();
        observer.event(ProgressEvent::Finished {
            succeeded: summary.succeeded,
            failed: summary.failed,
        });
        info!(
            title = %title,
            succeeded = summary.succeeded,
            failed = summary.failed,
            output = %summary.output_path,
            "harvest finished"
        );
        Ok(summary)
    }

    async fn harvest_one<'l>(
        &self,
        link: &'l RecordLink,
        sink: &AppendSink,
    ) -> (&'l RecordLink, HarvestOutcome) {
        let result = async {
            let document = self.fetcher.fetch(link.as_url()).await?;
            sink.append(&document).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(link = %link, "item saved");
                (link, HarvestOutcome::Success)
            }
            Err(err) => {
                warn!(link = %link, error = %err, "item failed");
                (link, HarvestOutcome::Failure(err.to_string()))
            }
        }
    }
}

/// `<output_dir>/<title>.json`. The content is ndjson; the extension is kept
/// for compatibility with existing harvests.
pub fn output_path_for(output_dir: &Utf8Path, title: &str) -> Utf8PathBuf {
    let file_stem = title
        .trim()
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
        .collect::<String>();
    output_dir.join(format!("{file_stem}.json"))
}
