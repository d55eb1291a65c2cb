// src/models/feed.rs

//! Raw shape of the nextbike live feed.
//!
//! These types mirror the JSON document one-to-one and are only used as the
//! input of normalization. Every listed field is required; unknown fields
//! are ignored.

use serde::Deserialize;

use crate::utils::de::number;

/// Raw feed bytes as returned by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload(Vec<u8>);

impl RawPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// Top-level feed document.
#[derive(Debug, Deserialize)]
pub struct FeedDocument {
    /// One entry per organization, despite the key name
    pub countries: Vec<FeedOrganization>,
}

#[derive(Debug, Deserialize)]
pub struct FeedOrganization {
    /// Organization name
    pub name: String,
    /// ISO country code in any case
    pub country: String,
    pub country_name: String,
    #[serde(deserialize_with = "number")]
    pub lat: f64,
    #[serde(deserialize_with = "number")]
    pub lng: f64,
    pub cities: Vec<FeedCity>,
}

#[derive(Debug, Deserialize)]
pub struct FeedCity {
    #[serde(deserialize_with = "number")]
    pub uid: u64,
    pub name: String,
    #[serde(deserialize_with = "number")]
    pub lat: f64,
    #[serde(deserialize_with = "number")]
    pub lng: f64,
    #[serde(deserialize_with = "number")]
    pub available_bikes: u32,
    pub places: Vec<FeedPlace>,
}

/// A station ("place" in feed terms).
#[derive(Debug, Deserialize)]
pub struct FeedPlace {
    #[serde(deserialize_with = "number")]
    pub uid: u64,
    pub name: String,
    #[serde(deserialize_with = "number")]
    pub number: u64,
    #[serde(deserialize_with = "number")]
    pub lat: f64,
    #[serde(deserialize_with = "number")]
    pub lng: f64,
    #[serde(deserialize_with = "number")]
    pub free_racks: u32,
    #[serde(deserialize_with = "number")]
    pub bikes_available_to_rent: u32,
    pub bike_list: Vec<FeedBike>,
}

#[derive(Debug, Deserialize)]
pub struct FeedBike {
    /// Bike number, usually sent as a string
    #[serde(deserialize_with = "number")]
    pub number: u64,
    #[serde(deserialize_with = "number")]
    pub bike_type: u32,
    pub active: bool,
    pub state: String,
}
