//! Feed processing pipeline.
//!
//! - `normalize`: Raw payload to entity graph, with integrity warnings
//! - `index`: Lookups and derived queries over a built graph
//! - `scrape`: Recurring refresh-and-log cycles

pub mod index;
pub mod normalize;
pub mod scrape;

#[cfg(test)]
pub(crate) mod fixtures;

pub use index::{EntityGraph, EntityRef, GraphStats, Selection, Target};
pub use normalize::{IntegrityWarning, Normalized, normalize};
pub use scrape::{CycleReport, ScrapeHandle, ScrapeScheduler, ShutdownReport};
