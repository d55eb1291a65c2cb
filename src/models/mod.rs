// src/models/mod.rs

//! Domain models for the feed scraper.
//!
//! - `feed`: raw shape of the live JSON document
//! - `entities`: the normalized country → city → station → bike model
//! - `config`: application configuration

mod config;
mod entities;
mod feed;

// Re-export all public types
pub use config::{Config, FeedConfig, LoggingConfig, ScrapeConfig, StorageConfig};
pub use entities::{Bike, City, Country, EntityKind, Organization, STATE_OK, Station};
pub use feed::{FeedBike, FeedCity, FeedDocument, FeedOrganization, FeedPlace, RawPayload};
