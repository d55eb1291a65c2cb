// src/pipeline/normalize.rs

//! Feed normalization.
//!
//! Turns a raw feed payload into an [`EntityGraph`]. The payload is walked
//! once in document order; the result depends on nothing but the payload.
//! A malformed payload yields an error and no graph at all.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    Bike, City, Country, EntityKind, FeedCity, FeedDocument, FeedOrganization, FeedPlace,
    Organization, RawPayload, Station,
};
use crate::pipeline::EntityGraph;
use crate::utils::centroids::country_centroid;

/// Non-fatal data integrity issue found while normalizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// A second entity reused an id; the first one was kept.
    DuplicateId {
        kind: EntityKind,
        id: String,
        /// Where the collision happened, e.g. `index` or `country AT`
        scope: String,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::DuplicateId { kind, id, scope } => write!(
                f,
                "duplicate {kind} id '{id}' in {scope}, keeping the first occurrence"
            ),
        }
    }
}

/// A freshly built graph and the warnings raised while building it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub graph: EntityGraph,
    pub warnings: Vec<IntegrityWarning>,
}

/// Normalize a raw feed payload into an entity graph.
pub fn normalize(raw: &RawPayload) -> Result<Normalized> {
    let text = std::str::from_utf8(raw.as_bytes())
        .map_err(|e| AppError::parse(format!("feed is not valid UTF-8: {e}")))?;
    let document: FeedDocument = serde_json::from_str(text).map_err(AppError::parse)?;

    let normalized = GraphBuilder::default().build(document);
    for warning in &normalized.warnings {
        log::warn!("Integrity: {}", warning);
    }
    Ok(normalized)
}

const INDEX_SCOPE: &str = "index";

#[derive(Default)]
struct GraphBuilder {
    graph: EntityGraph,
    warnings: Vec<IntegrityWarning>,
}

impl GraphBuilder {
    fn build(mut self, document: FeedDocument) -> Normalized {
        for organization in document.countries {
            self.add_organization(organization);
        }
        Normalized {
            graph: self.graph,
            warnings: self.warnings,
        }
    }

    fn add_organization(&mut self, raw: FeedOrganization) {
        let code = EntityGraph::country_key(&raw.country);
        let org_scope = format!("organization '{}'", raw.name);
        let country_scope = format!("country {code}");
        let mut cities = BTreeMap::new();

        for raw_city in raw.cities {
            let city = self.build_city(raw_city);
            let id = city.id;
            let warnings = &mut self.warnings;
            let city = insert_indexed(
                warnings,
                &mut self.graph.cities,
                &mut cities,
                id,
                city,
                EntityKind::City,
                &org_scope,
            );

            // The first city seen under a code fixes the country's identity.
            let country = self.graph.countries.entry(code.clone()).or_insert_with(|| {
                let (lat, lng) = country_centroid(&code).unwrap_or((raw.lat, raw.lng));
                Country {
                    name: raw.country_name.clone(),
                    code: code.clone(),
                    lat,
                    lng,
                    cities: BTreeMap::new(),
                }
            });
            insert_first(
                warnings,
                &mut country.cities,
                id,
                city,
                EntityKind::City,
                &country_scope,
            );
        }

        let organization = Organization {
            name: raw.name.clone(),
            country_name: raw.country_name,
            country_code: code,
            lat: raw.lat,
            lng: raw.lng,
            cities,
        };
        insert_first(
            &mut self.warnings,
            &mut self.graph.organizations,
            raw.name,
            organization,
            EntityKind::Organization,
            INDEX_SCOPE,
        );
    }

    fn build_city(&mut self, raw: FeedCity) -> Arc<City> {
        let mut stations = BTreeMap::new();
        let scope = format!("city {}", raw.uid);

        for place in raw.places {
            let station = self.build_station(place);
            let id = station.id;
            insert_indexed(
                &mut self.warnings,
                &mut self.graph.stations,
                &mut stations,
                id,
                station,
                EntityKind::Station,
                &scope,
            );
        }

        Arc::new(City {
            id: raw.uid,
            name: raw.name,
            lat: raw.lat,
            lng: raw.lng,
            available_bikes: raw.available_bikes,
            stations,
        })
    }

    fn build_station(&mut self, raw: FeedPlace) -> Arc<Station> {
        let mut bikes = BTreeMap::new();
        let scope = format!("station {}", raw.uid);

        for raw_bike in raw.bike_list {
            // Bikes have no position of their own in the feed.
            let bike = Arc::new(Bike {
                id: raw_bike.number,
                bike_type: raw_bike.bike_type,
                active: raw_bike.active,
                state: raw_bike.state,
                lat: raw.lat,
                lng: raw.lng,
            });
            let id = bike.id;
            insert_indexed(
                &mut self.warnings,
                &mut self.graph.bikes,
                &mut bikes,
                id,
                bike,
                EntityKind::Bike,
                &scope,
            );
        }

        Arc::new(Station {
            id: raw.uid,
            name: raw.name,
            number: raw.number,
            lat: raw.lat,
            lng: raw.lng,
            free_racks: raw.free_racks,
            bikes_available_to_rent: raw.bikes_available_to_rent,
            bikes,
        })
    }
}

/// Index `value` first-writer-wins, then nest whichever entity the index
/// holds for `key`, so a duplicate id never reaches a nested tree.
///
/// Returns the indexed entity.
fn insert_indexed<V>(
    warnings: &mut Vec<IntegrityWarning>,
    index: &mut BTreeMap<u64, Arc<V>>,
    nested: &mut BTreeMap<u64, Arc<V>>,
    key: u64,
    value: Arc<V>,
    kind: EntityKind,
    scope: &str,
) -> Arc<V> {
    let winner = match index.entry(key) {
        Entry::Vacant(slot) => Arc::clone(slot.insert(value)),
        Entry::Occupied(slot) => {
            warnings.push(IntegrityWarning::DuplicateId {
                kind,
                id: key.to_string(),
                scope: INDEX_SCOPE.to_string(),
            });
            Arc::clone(slot.get())
        }
    };
    insert_first(warnings, nested, key, Arc::clone(&winner), kind, scope);
    winner
}

/// Insert unless the key is taken; a collision is recorded as a warning.
fn insert_first<K, V>(
    warnings: &mut Vec<IntegrityWarning>,
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    kind: EntityKind,
    scope: &str,
) where
    K: Ord + fmt::Display,
{
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(slot) => warnings.push(IntegrityWarning::DuplicateId {
            kind,
            id: slot.key().to_string(),
            scope: scope.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{DUPLICATE_FEED, FREIBURG_FEED, freiburg_payload};

    #[test]
    fn test_normalize_freiburg() {
        let Normalized { graph, warnings } = normalize(&freiburg_payload()).unwrap();
        assert!(warnings.is_empty());

        let station = graph.station_by_id(15430457).unwrap();
        assert_eq!(station.name, "Hauptbahnhof");
        assert_eq!(station.number, 9001);
        assert_eq!(station.free_racks, 6);
        assert_eq!(station.bikes_available_to_rent, 1);
        assert_eq!(station.bikes.len(), 2);

        let bike = graph.bike_by_id(930002).unwrap();
        assert!(!bike.active);
        assert!(!bike.is_available());
        assert_eq!(bike.bike_type, 71);
        assert_eq!((bike.lat, bike.lng), (station.lat, station.lng));

        let city = graph.city_by_id(619).unwrap();
        assert_eq!(city.available_bikes, 7);
        assert_eq!(city.derived_available_bikes(), 1);

        let country = graph.country_by_code("de").unwrap();
        assert_eq!(country.name, "Germany");
        assert_eq!(country.code, "DE");
        assert_eq!((country.lat, country.lng), (51.1657, 10.4515));
        assert!(country.city(619).is_some());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let first = normalize(&freiburg_payload()).unwrap().graph;
        let second = normalize(&freiburg_payload()).unwrap().graph;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_duplicate_ids_first_wins_with_warnings() {
        let Normalized { graph, warnings } = normalize(&RawPayload::from(DUPLICATE_FEED)).unwrap();

        assert_eq!(graph.city_by_id(1).unwrap().name, "Wien");
        assert_eq!(graph.station_by_id(100).unwrap().name, "Karlsplatz");
        assert!(graph.bike_by_id(5000).unwrap().is_available());

        let country = graph.country_by_code("at").unwrap();
        assert_eq!(country.name, "Austria");
        assert_eq!(country.cities.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(country.city(1).unwrap().name, "Wien");

        // A losing organization lists the winning city under the shared id.
        let graz = graph.organization_by_name("nextbike Graz").unwrap();
        assert_eq!(graz.cities.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(Arc::ptr_eq(&graz.cities[&1], &graph.cities()[&1]));
        assert_eq!(graz.city(1).unwrap().name, "Wien");
        assert_eq!(graz.country_code, "AT");

        let dup = |kind, id: &str, scope: &str| IntegrityWarning::DuplicateId {
            kind,
            id: id.to_string(),
            scope: scope.to_string(),
        };
        assert_eq!(
            warnings,
            vec![
                dup(EntityKind::Bike, "5000", "index"),
                dup(EntityKind::Station, "100", "index"),
                dup(EntityKind::City, "1", "index"),
                dup(EntityKind::City, "1", "country AT"),
            ]
        );
    }

    #[test]
    fn test_unknown_country_code_uses_organization_position() {
        let feed = r#"{"countries": [{
            "name": "Org", "country": "nz", "country_name": "New Zealand",
            "lat": -36.85, "lng": 174.76, "cities": []
        }, {
            "name": "Org 2", "country": "nz", "country_name": "New Zealand",
            "lat": -41.28, "lng": 174.77,
            "cities": [{"uid": 5, "name": "Wellington", "lat": -41.28, "lng": 174.77,
                        "available_bikes": 0, "places": []}]
        }]}"#;
        let graph = normalize(&RawPayload::from(feed)).unwrap().graph;
        let country = graph.country_by_code("NZ").unwrap();
        assert_eq!((country.lat, country.lng), (-41.28, 174.77));
        assert_eq!(graph.organizations().len(), 2);
    }

    #[test]
    fn test_missing_station_field_is_parse_failure() {
        let broken = FREIBURG_FEED.replace("\"free_racks\": 6,", "");
        let err = normalize(&RawPayload::from(broken.as_str())).unwrap_err();
        assert!(err.is_parse_failure());
        assert!(err.to_string().contains("free_racks"));
    }

    #[test]
    fn test_malformed_payloads_are_parse_failures() {
        let cases: [&[u8]; 5] = [
            b"",
            b"<html>502 Bad Gateway</html>",
            b"{\"countries\": 5}",
            b"{\"cities\": []}",
            &[0xff, 0xfe, 0x7b, 0x7d],
        ];
        for bytes in cases {
            let err = normalize(&RawPayload::new(bytes)).unwrap_err();
            assert!(err.is_parse_failure(), "{err}");
        }
    }

    #[test]
    fn test_non_numeric_counter_is_parse_failure() {
        let broken = FREIBURG_FEED.replace("\"free_racks\": 6", "\"free_racks\": \"six\"");
        assert!(normalize(&RawPayload::from(broken.as_str())).unwrap_err().is_parse_failure());

        let negative = FREIBURG_FEED.replace("\"free_racks\": 6", "\"free_racks\": -1");
        assert!(normalize(&RawPayload::from(negative.as_str())).unwrap_err().is_parse_failure());
    }

    #[test]
    fn test_repeated_bike_in_one_station_is_nested_once() {
        let feed = FREIBURG_FEED.replace("\"number\": \"930002\"", "\"number\": \"930001\"");
        let Normalized { graph, warnings } = normalize(&RawPayload::from(feed.as_str())).unwrap();

        let station = graph.station_by_id(15430457).unwrap();
        assert_eq!(station.bikes.len(), 1);
        assert!(Arc::ptr_eq(&station.bikes[&930001], &graph.bikes()[&930001]));
        assert!(station.bike(930001).unwrap().active);
        assert_eq!(
            warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "duplicate bikes id '930001' in index, keeping the first occurrence",
                "duplicate bikes id '930001' in station 15430457, keeping the first occurrence",
            ]
        );
    }

    #[test]
    fn test_empty_feed() {
        let graph = normalize(&RawPayload::from(r#"{"countries": []}"#)).unwrap().graph;
        assert_eq!(graph, EntityGraph::default());
    }
}
