//! Event merger: folds blocks from many feeds into one keyed collection.

use std::collections::BTreeMap;

use tracing::debug;

use calmerge_shared::EventBlock;

use crate::split::split_events;

/// Deduplicated event blocks keyed by identifier.
///
/// Keys are unique by construction. Iteration is in ascending identifier
/// order, which is also the serialization order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedCalendar {
    events: BTreeMap<String, EventBlock>,
}

impl MergedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `events` in, in order. A block replaces any earlier block with
    /// the same identifier. Returns `self` for chaining across feeds.
    pub fn merge(&mut self, events: impl IntoIterator<Item = EventBlock>) -> &mut Self {
        let mut added = 0usize;
        let mut replaced = 0usize;

        for block in events {
            if self.events.insert(block.uid.clone(), block).is_some() {
                replaced += 1;
            } else {
                added += 1;
            }
        }

        debug!(added, replaced, total = self.events.len(), "events merged");
        self
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&EventBlock> {
        self.events.get(uid)
    }

    /// Identifiers in ascending order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// Blocks in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EventBlock> {
        self.events.values()
    }
}

impl<'a> IntoIterator for &'a MergedCalendar {
    type Item = &'a EventBlock;
    type IntoIter = std::collections::btree_map::Values<'a, String, EventBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.values()
    }
}

impl FromIterator<EventBlock> for MergedCalendar {
    fn from_iter<I: IntoIterator<Item = EventBlock>>(iter: I) -> Self {
        let mut calendar = Self::new();
        calendar.merge(iter);
        calendar
    }
}

/// Free-function form of [`MergedCalendar::merge`].
pub fn merge(
    existing: &mut MergedCalendar,
    events: impl IntoIterator<Item = EventBlock>,
) -> &mut MergedCalendar {
    existing.merge(events)
}

/// Split and merge feed texts in the given order.
pub fn merge_feeds<'a>(feeds: impl IntoIterator<Item = &'a str>) -> MergedCalendar {
    let mut calendar = MergedCalendar::new();
    for feed in feeds {
        calendar.merge(split_events(feed));
    }
    calendar
}
