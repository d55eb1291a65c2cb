//! Service layer for the feed scraper.
//!
//! - Feed retrieval (`FeedFetcher`, `HttpFeedFetcher`)
//! - Snapshot ownership (`Session`)

mod feed;
mod session;

pub use feed::{FeedFetcher, HttpFeedFetcher};
pub use session::{Refresh, Session};
