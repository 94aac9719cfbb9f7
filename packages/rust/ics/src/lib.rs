//! Event extraction, merging, and serialization for iCalendar feeds.
//!
//! This crate is the pure core of calmerge. It never touches the network or
//! the filesystem:
//! - [`split_events`] cuts raw feed text into [`EventBlock`]s with stable ids
//! - [`MergedCalendar`] folds blocks from many feeds, last write wins
//! - [`serialize`] wraps the merged blocks into one `VCALENDAR` document

mod merge;
mod serialize;
mod split;

pub use calmerge_shared::EventBlock;
pub use merge::{MergedCalendar, merge, merge_feeds};
pub use serialize::{LINE_ENDING, serialize, serialize_with};
pub use split::{content_hash, split_events};
