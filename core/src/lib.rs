//! Faction crime tracker core.
//!
//! Persistence for the member roster, the Torn API client, the bulk fetch
//! cycle, and the delta report built from stored snapshots. The interactive
//! menu lives in the `crime-tracker` binary; everything testable lives here.

pub mod config;
pub mod cycle;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod store;
pub mod types;
