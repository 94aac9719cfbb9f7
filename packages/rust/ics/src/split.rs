//! Event splitter: raw feed text → [`EventBlock`]s.
//!
//! A line-oriented scanner with two states. Outside an event it looks for a
//! line containing `BEGIN:VEVENT`; inside, it collects lines until the next
//! line containing `END:VEVENT`. Markers are matched case-insensitively. A
//! `BEGIN:VEVENT` seen while inside is ordinary content, so a span always runs
//! from a begin marker to the nearest end marker after it.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use calmerge_shared::EventBlock;

const BEGIN_MARKER: &str = "BEGIN:VEVENT";
const END_MARKER: &str = "END:VEVENT";

/// Matches a `UID:` property at the start of a line.
static UID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:UID):(.*)$").expect("UID regex"));

enum ScanState<'a> {
    OutsideEvent,
    InsideEvent(Vec<&'a str>),
}

/// Split feed text into event blocks, in the order they appear.
///
/// An unterminated trailing `BEGIN:VEVENT` yields no block. Text without any
/// event yields an empty vector.
#[instrument(skip_all, fields(len = feed_text.len()))]
pub fn split_events(feed_text: &str) -> Vec<EventBlock> {
    let text = normalize_line_endings(feed_text);
    let mut blocks = Vec::new();
    let mut state = ScanState::OutsideEvent;

    for line in text.split('\n') {
        let upper = line.to_ascii_uppercase();

        state = match state {
            ScanState::OutsideEvent => match upper.find(BEGIN_MARKER) {
                // Begin and end on the same line.
                Some(pos) if upper[pos + BEGIN_MARKER.len()..].contains(END_MARKER) => {
                    blocks.push(to_block(line.to_owned()));
                    ScanState::OutsideEvent
                }
                Some(_) => ScanState::InsideEvent(vec![line]),
                None => ScanState::OutsideEvent,
            },
            ScanState::InsideEvent(mut lines) => {
                lines.push(line);
                if upper.contains(END_MARKER) {
                    blocks.push(to_block(lines.join("\n")));
                    ScanState::OutsideEvent
                } else {
                    ScanState::InsideEvent(lines)
                }
            }
        };
    }

    if let ScanState::InsideEvent(lines) = state {
        debug!(lines = lines.len(), "dropping unterminated VEVENT");
    }

    debug!(events = blocks.len(), "feed split");
    blocks
}

/// SHA-256 of `text`, lowercase hex.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn to_block(raw: String) -> EventBlock {
    let uid = find_uid(&raw).unwrap_or_else(|| content_hash(&raw));
    EventBlock { uid, raw }
}

/// Value of the first `UID:` line, unfolded and trimmed.
///
/// Returns `None` when there is no `UID:` line or its value is blank.
fn find_uid(raw: &str) -> Option<String> {
    let mut lines = raw.split('\n');

    while let Some(line) = lines.next() {
        let Some(caps) = UID_RE.captures(line) else {
            continue;
        };

        let mut value = caps[1].to_string();
        // RFC 5545 folding: continuation lines start with one space or tab.
        for cont in lines.by_ref() {
            match cont.strip_prefix(' ').or_else(|| cont.strip_prefix('\t')) {
                Some(rest) => value.push_str(rest),
                None => break,
            }
        }

        let value = value.trim();
        return (!value.is_empty()).then(|| value.to_string());
    }

    None
}
