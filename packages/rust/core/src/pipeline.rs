//! End-to-end `merge` pipeline: page → feed links → feeds → merged calendar → output.

use std::io::Write;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use calmerge_fetcher::Fetcher;
use calmerge_ics::{MergedCalendar, serialize_with, split_events};
use calmerge_shared::{CalMergeError, FeedLink, MergeConfig, OutputTarget, Result};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Outcome of one feed within a run.
#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    /// Feed URL.
    pub url: String,
    /// Event blocks found in the feed (0 when the download failed).
    pub events: usize,
    /// Download error, if the feed was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a completed merge run.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Page the feed links were discovered on.
    pub page_url: String,
    /// Where the document was written.
    pub output: String,
    /// Per-feed outcomes, in discovery order.
    pub feeds: Vec<FeedReport>,
    /// Distinct events in the merged calendar.
    pub unique_events: usize,
    /// When the document was produced.
    pub generated_at: DateTime<Utc>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl MergeReport {
    /// Number of feeds that downloaded successfully.
    pub fn feeds_ok(&self) -> usize {
        self.feeds.iter().filter(|f| f.error.is_none()).count()
    }

    /// Number of feeds that were skipped.
    pub fn feeds_failed(&self) -> usize {
        self.feeds.len() - self.feeds_ok()
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the feed links are known.
    fn links_found(&self, links: &[FeedLink]);
    /// Called after a feed was split and merged.
    fn feed_merged(&self, url: &str, events: usize, current: usize, total: usize);
    /// Called when a feed is skipped because its download failed.
    fn feed_failed(&self, url: &str, error: &CalMergeError);
    /// Called when the pipeline completes.
    fn done(&self, report: &MergeReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn links_found(&self, _links: &[FeedLink]) {}
    fn feed_merged(&self, _url: &str, _events: usize, _current: usize, _total: usize) {}
    fn feed_failed(&self, _url: &str, _error: &CalMergeError) {}
    fn done(&self, _report: &MergeReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Fetch `page_url` and return the calendar-feed links it contains.
///
/// A page without any feed link is an error: there is nothing to merge.
#[instrument(skip_all, fields(page_url = %page_url))]
pub async fn discover_feed_links(fetcher: &Fetcher, page_url: &Url) -> Result<Vec<FeedLink>> {
    info!("loading source page");
    let html = fetcher.fetch_text(page_url).await?;

    let links = calmerge_discovery::discover_links(&html, page_url);
    if links.is_empty() {
        return Err(CalMergeError::NoFeedLinks {
            page: page_url.to_string(),
        });
    }

    info!(count = links.len(), "found iCal links");
    Ok(links)
}

/// Run everything except writing: returns the merged document and its report.
///
/// 1. Fetch the page and discover feed links
/// 2. Download all feeds
/// 3. Split and merge feeds in discovery order, skipping failed downloads
/// 4. Serialize
#[instrument(skip_all, fields(page_url = %config.page_url))]
pub async fn build_calendar(
    config: &MergeConfig,
    progress: &dyn ProgressReporter,
) -> Result<(String, MergeReport)> {
    let start = Instant::now();
    let fetcher = Fetcher::new(&config.fetch)?;

    // --- Phase 1: Discovery ---
    progress.phase("Discovering iCal links");
    let links = discover_feed_links(&fetcher, &config.page_url).await?;
    progress.links_found(&links);

    // --- Phase 2: Download ---
    progress.phase("Downloading feeds");
    let fetched = fetcher.fetch_all(&links).await;

    // --- Phase 3: Split + merge, strictly in discovery order ---
    progress.phase("Merging events");
    let total = fetched.len();
    let mut calendar = MergedCalendar::new();
    let mut feeds = Vec::with_capacity(total);

    for (i, fetch) in fetched.into_iter().enumerate() {
        let url = fetch.link.to_string();
        match fetch.result {
            Ok(text) => {
                let events = split_events(&text);
                let count = events.len();
                calendar.merge(events);
                progress.feed_merged(&url, count, i + 1, total);
                feeds.push(FeedReport {
                    url,
                    events: count,
                    error: None,
                });
            }
            Err(e) => {
                warn!(%url, error = %e, "skipping feed");
                progress.feed_failed(&url, &e);
                feeds.push(FeedReport {
                    url,
                    events: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    info!(unique_events = calendar.len(), "collected unique events");

    // --- Phase 4: Serialize ---
    let document = serialize_with(&calendar, &config.calendar);

    let report = MergeReport {
        page_url: config.page_url.to_string(),
        output: config.output.to_string(),
        feeds,
        unique_events: calendar.len(),
        generated_at: Utc::now(),
        elapsed: start.elapsed(),
    };

    Ok((document, report))
}

/// Run the full `merge` pipeline and write the document to the configured output.
pub async fn run_merge(
    config: &MergeConfig,
    progress: &dyn ProgressReporter,
) -> Result<MergeReport> {
    let start = Instant::now();
    let (document, mut report) = build_calendar(config, progress).await?;

    progress.phase("Writing calendar");
    write_output(&config.output, &document)?;
    info!(output = %config.output, bytes = document.len(), "calendar written");

    report.elapsed = start.elapsed();
    progress.done(&report);
    Ok(report)
}

/// Write `document` to a file (creating parent directories) or stdout.
pub fn write_output(target: &OutputTarget, document: &str) -> Result<()> {
    match target {
        OutputTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| CalMergeError::io(parent, e))?;
            }
            std::fs::write(path, document).map_err(|e| CalMergeError::io(path, e))
        }
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(document.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| CalMergeError::io("<stdout>", e))
        }
    }
}
