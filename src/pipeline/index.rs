//! Entity index over one normalized feed snapshot.
//!
//! An [`EntityGraph`] holds the nested country/organization trees together
//! with flat id indexes for cities, stations and bikes. Both views share the
//! same `Arc`ed entities. A graph is immutable once built; a new fetch
//! produces a new graph.
//!
//! Lookups return `Option`: an id missing from the current snapshot is an
//! expected outcome, not an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::models::{Bike, City, Country, EntityKind, Organization, ScrapeConfig, Station};

/// Normalized, read-only view of one feed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityGraph {
    pub(crate) countries: BTreeMap<String, Country>,
    pub(crate) organizations: BTreeMap<String, Organization>,
    pub(crate) cities: BTreeMap<u64, Arc<City>>,
    pub(crate) stations: BTreeMap<u64, Arc<Station>>,
    pub(crate) bikes: BTreeMap<u64, Arc<Bike>>,
}

impl EntityGraph {
    /// Normalize a country code the way countries are keyed.
    pub fn country_key(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }

    pub fn countries(&self) -> &BTreeMap<String, Country> {
        &self.countries
    }

    pub fn organizations(&self) -> &BTreeMap<String, Organization> {
        &self.organizations
    }

    pub fn cities(&self) -> &BTreeMap<u64, Arc<City>> {
        &self.cities
    }

    pub fn stations(&self) -> &BTreeMap<u64, Arc<Station>> {
        &self.stations
    }

    pub fn bikes(&self) -> &BTreeMap<u64, Arc<Bike>> {
        &self.bikes
    }

    // --- Lookups ---

    /// Find a country by ISO code, ignoring case.
    pub fn country_by_code(&self, code: &str) -> Option<&Country> {
        self.countries.get(&Self::country_key(code))
    }

    pub fn organization_by_name(&self, name: &str) -> Option<&Organization> {
        self.organizations.get(name)
    }

    pub fn city_by_id(&self, city_id: u64) -> Option<&City> {
        self.cities.get(&city_id).map(Arc::as_ref)
    }

    pub fn station_by_id(&self, station_id: u64) -> Option<&Station> {
        self.stations.get(&station_id).map(Arc::as_ref)
    }

    pub fn bike_by_id(&self, bike_id: u64) -> Option<&Bike> {
        self.bikes.get(&bike_id).map(Arc::as_ref)
    }

    // --- Derived queries (computed on every call) ---

    /// All stations in all cities of a country.
    pub fn stations_of_country(&self, code: &str) -> Option<Vec<&Station>> {
        self.country_by_code(code)
            .map(|country| country.stations().into_values().collect())
    }

    pub fn bikes_of_station(&self, station_id: u64) -> Option<Vec<&Bike>> {
        self.station_by_id(station_id)
            .map(|station| station.bikes.values().map(Arc::as_ref).collect())
    }

    /// Bikes at a station that are active and in state `ok`.
    pub fn available_bikes_of_station(&self, station_id: u64) -> Option<Vec<&Bike>> {
        self.station_by_id(station_id)
            .map(Station::available_bikes)
    }

    /// Entity counts of this snapshot.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            countries: self.countries.len(),
            organizations: self.organizations.len(),
            cities: self.cities.len(),
            stations: self.stations.len(),
            bikes: self.bikes.len(),
            available_bikes: self.bikes.values().filter(|b| b.is_available()).count(),
        }
    }

    /// Resolve configured selectors against this snapshot.
    ///
    /// Selectors are processed per kind in the order countries,
    /// organizations, cities, stations, bikes.
    pub fn select(&self, config: &ScrapeConfig) -> Selection<'_> {
        let mut selection = Selection::default();

        for code in &config.country_codes {
            let found = self.country_by_code(code).map(EntityRef::Country);
            selection.push(EntityKind::Country, Self::country_key(code), found);
        }
        for name in &config.organization_names {
            let found = self.organization_by_name(name).map(EntityRef::Organization);
            selection.push(EntityKind::Organization, name.clone(), found);
        }
        for id in &config.city_ids {
            let found = self.city_by_id(*id).map(EntityRef::City);
            selection.push(EntityKind::City, id.to_string(), found);
        }
        for id in &config.station_ids {
            let found = self.station_by_id(*id).map(EntityRef::Station);
            selection.push(EntityKind::Station, id.to_string(), found);
        }
        for id in &config.bike_ids {
            let found = self.bike_by_id(*id).map(EntityRef::Bike);
            selection.push(EntityKind::Bike, id.to_string(), found);
        }

        selection
    }
}

/// Borrowed reference to any entity of a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Country(&'a Country),
    Organization(&'a Organization),
    City(&'a City),
    Station(&'a Station),
    Bike(&'a Bike),
}

impl EntityRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Country(_) => EntityKind::Country,
            EntityRef::Organization(_) => EntityKind::Organization,
            EntityRef::City(_) => EntityKind::City,
            EntityRef::Station(_) => EntityKind::Station,
            EntityRef::Bike(_) => EntityKind::Bike,
        }
    }
}

impl Serialize for EntityRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityRef::Country(e) => e.serialize(serializer),
            EntityRef::Organization(e) => e.serialize(serializer),
            EntityRef::City(e) => e.serialize(serializer),
            EntityRef::Station(e) => e.serialize(serializer),
            EntityRef::Bike(e) => e.serialize(serializer),
        }
    }
}

impl fmt::Display for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Country(e) => e.fmt(f),
            EntityRef::Organization(e) => e.fmt(f),
            EntityRef::City(e) => e.fmt(f),
            EntityRef::Station(e) => e.fmt(f),
            EntityRef::Bike(e) => e.fmt(f),
        }
    }
}

/// A selector that resolved to an entity.
#[derive(Debug, Clone)]
pub struct Target<'a> {
    pub kind: EntityKind,
    pub id: String,
    pub entity: EntityRef<'a>,
}

/// Outcome of resolving selectors against a graph.
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    pub targets: Vec<Target<'a>>,
    /// Selectors with no matching entity, as `(kind, id)`
    pub missing: Vec<(EntityKind, String)>,
}

impl<'a> Selection<'a> {
    // Repeated selectors resolve once; two writers would race on one file.
    fn push(&mut self, kind: EntityKind, id: String, found: Option<EntityRef<'a>>) {
        let seen = self.targets.iter().any(|t| t.kind == kind && t.id == id)
            || self.missing.iter().any(|(k, i)| *k == kind && *i == id);
        if seen {
            return;
        }
        match found {
            Some(entity) => self.targets.push(Target { kind, id, entity }),
            None => self.missing.push((kind, id)),
        }
    }
}

/// Entity counts of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub countries: usize,
    pub organizations: usize,
    pub cities: usize,
    pub stations: usize,
    pub bikes: usize,
    pub available_bikes: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} countries, {} organizations, {} cities, {} stations, {} bikes ({} available)",
            self.countries,
            self.organizations,
            self.cities,
            self.stations,
            self.bikes,
            self.available_bikes
        )
    }
}
