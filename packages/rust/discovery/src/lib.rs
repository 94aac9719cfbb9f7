//! Calendar-feed link discovery.
//!
//! Scans an already-fetched HTML page for anchors that point at iCal feeds
//! and resolves them to absolute URLs. No network access happens here; the
//! caller fetches the page and decides whether an empty result is fatal.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use calmerge_shared::FeedLink;

/// Link text fragment marking an iCal link.
const TEXT_MARKER: &str = "ical";

/// Query fragment used by Joomla-style calendar components for feed downloads.
const DOWNLOAD_TASK_MARKER: &str = "task=ical.download";

/// File extension of a calendar feed.
const ICS_EXTENSION: &str = ".ics";

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Find every calendar-feed link in `markup`, resolved against `base_url`.
///
/// An anchor qualifies when its visible text contains "ical", or its href
/// contains `task=ical.download`, or its href ends with `.ics` (all
/// case-insensitive). Order of first occurrence is kept and duplicates of the
/// resolved URL are dropped.
#[instrument(skip_all, fields(base_url = %base_url))]
pub fn discover_links(markup: &str, base_url: &Url) -> Vec<FeedLink> {
    let doc = Html::parse_document(markup);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&ANCHOR_SEL) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.trim().is_empty() || !is_feed_anchor(&el, href) {
            continue;
        }

        let resolved = match base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!(href, error = %e, "skipping unresolvable href");
                continue;
            }
        };

        if seen.insert(resolved.as_str().to_owned()) {
            links.push(FeedLink::new(resolved));
        }
    }

    debug!(count = links.len(), "feed links discovered");
    links
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_feed_anchor(el: &ElementRef<'_>, href: &str) -> bool {
    let text = el.text().collect::<String>().to_lowercase();
    let href = href.to_lowercase();

    text.contains(TEXT_MARKER)
        || href.contains(DOWNLOAD_TASK_MARKER)
        || href.ends_with(ICS_EXTENSION)
}
