// src/models/entities.rs

//! Country, Organization, City, Station and Bike entities.
//!
//! Each entity holds its own fields plus the children it owns. Children are
//! shared through `Arc` so the flat indexes of an [`EntityGraph`] and the
//! nested trees point at the same values.
//!
//! [`EntityGraph`]: crate::pipeline::EntityGraph

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Bike state reported by the feed for a rentable bike.
pub const STATE_OK: &str = "ok";

/// Kind of entity, doubling as the directory name of its snapshot logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Country,
    Organization,
    City,
    Station,
    Bike,
}

impl EntityKind {
    /// Directory name under the log root.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Country => "countries",
            EntityKind::Organization => "organizations",
            EntityKind::City => "cities",
            EntityKind::Station => "stations",
            EntityKind::Bike => "bikes",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "countries" | "country" => Ok(EntityKind::Country),
            "organizations" | "organization" => Ok(EntityKind::Organization),
            "cities" | "city" => Ok(EntityKind::City),
            "stations" | "station" => Ok(EntityKind::Station),
            "bikes" | "bike" => Ok(EntityKind::Bike),
            _ => Err(AppError::validation(format!("Unknown entity kind '{s}'"))),
        }
    }
}

/// A single bike parked at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bike {
    pub id: u64,
    #[serde(rename = "type")]
    pub bike_type: u32,
    pub active: bool,
    pub state: String,
    /// Coordinates of the station the bike was seen at
    pub lat: f64,
    pub lng: f64,
}

impl Bike {
    /// A bike can be rented when it is active and its state is `ok`.
    pub fn is_available(&self) -> bool {
        self.active && self.state == STATE_OK
    }
}

impl fmt::Display for Bike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bike {} (type {}, {}, state {}) at {:.5}, {:.5}",
            self.id,
            self.bike_type,
            if self.active { "active" } else { "inactive" },
            self.state,
            self.lat,
            self.lng
        )
    }
}

/// A rental station and the bikes currently parked there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u64,
    pub name: String,
    pub number: u64,
    pub lat: f64,
    pub lng: f64,
    pub free_racks: u32,
    pub bikes_available_to_rent: u32,
    pub bikes: BTreeMap<u64, Arc<Bike>>,
}

impl Station {
    pub fn bike(&self, bike_id: u64) -> Option<&Bike> {
        self.bikes.get(&bike_id).map(Arc::as_ref)
    }

    /// Bikes at this station that can be rented right now, ordered by id.
    pub fn available_bikes(&self) -> Vec<&Bike> {
        self.bikes
            .values()
            .map(Arc::as_ref)
            .filter(|bike| bike.is_available())
            .collect()
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Station {} '{}' (#{}) at {:.5}, {:.5}: {} free racks, {} bikes to rent",
            self.id,
            self.name,
            self.number,
            self.lat,
            self.lng,
            self.free_racks,
            self.bikes_available_to_rent
        )
    }
}

/// A city served by one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Counter reported by the feed, kept as-is
    pub available_bikes: u32,
    pub stations: BTreeMap<u64, Arc<Station>>,
}

impl City {
    pub fn station(&self, station_id: u64) -> Option<&Station> {
        self.stations.get(&station_id).map(Arc::as_ref)
    }

    /// All bikes of all stations, keyed by bike id.
    pub fn bikes(&self) -> BTreeMap<u64, &Bike> {
        bikes_of(self.stations.values().map(Arc::as_ref))
    }

    /// Available bikes summed over the stations.
    ///
    /// Independent of the feed-reported [`City::available_bikes`]; the two
    /// may disagree and neither is corrected from the other.
    pub fn derived_available_bikes(&self) -> usize {
        self.stations
            .values()
            .map(|station| station.available_bikes().len())
            .sum()
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "City {} '{}' at {:.5}, {:.5}: {} available bikes, {} stations",
            self.id,
            self.name,
            self.lat,
            self.lng,
            self.available_bikes,
            self.stations.len()
        )
    }
}

/// A country grouping the cities of every organization operating there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    /// Upper-case ISO code
    pub code: String,
    pub lat: f64,
    pub lng: f64,
    pub cities: BTreeMap<u64, Arc<City>>,
}

impl Country {
    pub fn city(&self, city_id: u64) -> Option<&City> {
        self.cities.get(&city_id).map(Arc::as_ref)
    }

    pub fn stations(&self) -> BTreeMap<u64, &Station> {
        stations_of(self.cities.values().map(Arc::as_ref))
    }

    pub fn bikes(&self) -> BTreeMap<u64, &Bike> {
        bikes_of(self.stations().into_values())
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Country {} '{}' at {:.4}, {:.4}: {} cities",
            self.code,
            self.name,
            self.lat,
            self.lng,
            self.cities.len()
        )
    }
}

/// A bike-sharing operator and the cities it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub country_name: String,
    /// Upper-case ISO code
    pub country_code: String,
    pub lat: f64,
    pub lng: f64,
    pub cities: BTreeMap<u64, Arc<City>>,
}

impl Organization {
    pub fn city(&self, city_id: u64) -> Option<&City> {
        self.cities.get(&city_id).map(Arc::as_ref)
    }

    pub fn stations(&self) -> BTreeMap<u64, &Station> {
        stations_of(self.cities.values().map(Arc::as_ref))
    }

    pub fn bikes(&self) -> BTreeMap<u64, &Bike> {
        bikes_of(self.stations().into_values())
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Organization '{}' ({}, {}) at {:.5}, {:.5}: {} cities",
            self.name,
            self.country_name,
            self.country_code,
            self.lat,
            self.lng,
            self.cities.len()
        )
    }
}

// First occurrence of an id wins, matching the graph indexes.
fn stations_of<'a>(cities: impl Iterator<Item = &'a City>) -> BTreeMap<u64, &'a Station> {
    let mut stations = BTreeMap::new();
    for city in cities {
        for (id, station) in &city.stations {
            stations.entry(*id).or_insert(station.as_ref());
        }
    }
    stations
}

fn bikes_of<'a>(stations: impl Iterator<Item = &'a Station>) -> BTreeMap<u64, &'a Bike> {
    let mut bikes = BTreeMap::new();
    for station in stations {
        for (id, bike) in &station.bikes {
            bikes.entry(*id).or_insert(bike.as_ref());
        }
    }
    bikes
}
