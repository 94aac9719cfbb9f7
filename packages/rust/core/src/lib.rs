//! Pipeline orchestration for calmerge.
//!
//! This crate ties together page fetching, feed-link discovery, feed
//! downloads, and the ics merge engine into the end-to-end `merge` workflow.

pub mod pipeline;
