//! Core domain types shared by the discovery, ics, and fetcher crates.

use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// FeedLink
// ---------------------------------------------------------------------------

/// An absolute URL pointing to a calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedLink(Url);

impl FeedLink {
    /// Wrap an already-resolved absolute URL.
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    /// The link as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The underlying URL.
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for FeedLink {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl std::fmt::Display for FeedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventBlock
// ---------------------------------------------------------------------------

/// One `BEGIN:VEVENT` … `END:VEVENT` span extracted from a feed.
///
/// `raw` holds the span verbatim with `\n` line endings, from the begin-marker
/// line through the end-marker line. `uid` is the merge key: the block's `UID`
/// value, or a content digest when the block has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    /// Stable identifier used as the merge key.
    pub uid: String,
    /// The raw block text, line endings normalized to `\n`.
    pub raw: String,
}

impl EventBlock {
    pub fn new(uid: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            raw: raw.into(),
        }
    }

    /// Iterate the block's lines (without terminators).
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.raw.split('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_link_displays_as_url() {
        let link = FeedLink::new(Url::parse("https://example.com/cal.ics").unwrap());
        assert_eq!(link.to_string(), "https://example.com/cal.ics");
        assert_eq!(link.as_str(), "https://example.com/cal.ics");
    }

    #[test]
    fn event_block_lines_split_on_newline() {
        let block = EventBlock::new("a", "BEGIN:VEVENT\nUID:a\nEND:VEVENT");
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines, vec!["BEGIN:VEVENT", "UID:a", "END:VEVENT"]);
    }
}
