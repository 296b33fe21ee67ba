//! The synth-match ingestion load tool.
//!
//! This library supports the synth-match binary found elsewhere in this
//! project: it validates the run's inputs, resolves configuration and drives
//! events from [`synth_match_payload`] into an HTTP ingestion endpoint, one
//! request at a time.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub mod args;
pub mod config;
pub mod run;
pub mod sender;
