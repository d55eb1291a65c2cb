//! Feed payloads and fakes shared by the tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::RawPayload;
use crate::services::FeedFetcher;

/// Fetcher replaying a fixed list of results, failing once exhausted.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<RawPayload>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<RawPayload>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<RawPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AppError::fetch(self.endpoint(), "script exhausted")))
    }

    fn endpoint(&self) -> &str {
        "scripted://feed"
    }
}

/// One organization in Germany with one city, one station and two bikes,
/// one of which is inactive. The city's `available_bikes` counter (7) does
/// not match the bikes listed, like the live feed often does.
pub const FREIBURG_FEED: &str = r#"{
  "countries": [
    {
      "lat": 47.9959,
      "lng": 7.85222,
      "zoom": 13,
      "name": "Frelo Freiburg",
      "hotline": "+49 761 4511 7755",
      "domain": "fg",
      "country": "de",
      "country_name": "Germany",
      "cities": [
        {
          "uid": 619,
          "lat": 47.9959,
          "lng": 7.85222,
          "zoom": 13,
          "name": "Freiburg",
          "available_bikes": 7,
          "places": [
            {
              "uid": 15430457,
              "lat": 47.997688,
              "lng": 7.841809,
              "bike": false,
              "name": "Hauptbahnhof",
              "number": 9001,
              "bikes": 2,
              "bikes_available_to_rent": 1,
              "bike_racks": 8,
              "free_racks": 6,
              "bike_list": [
                {
                  "number": "930001",
                  "bike_type": 71,
                  "lock_types": ["frame_lock"],
                  "active": true,
                  "state": "ok"
                },
                {
                  "number": "930002",
                  "bike_type": 71,
                  "lock_types": ["frame_lock"],
                  "active": false,
                  "state": "ok"
                }
              ]
            }
          ]
        }
      ]
    }
  ]
}"#;

pub fn freiburg_payload() -> RawPayload {
    RawPayload::from(FREIBURG_FEED)
}

/// Two organizations in Austria, the second reusing city, station and bike
/// ids of the first.
pub const DUPLICATE_FEED: &str = r#"{
  "countries": [
    {
      "name": "nextbike Wien", "country": "AT", "country_name": "Austria",
      "lat": 48.2, "lng": 16.37,
      "cities": [
        {
          "uid": 1, "name": "Wien", "lat": 48.2, "lng": 16.37, "available_bikes": 1,
          "places": [
            {
              "uid": 100, "name": "Karlsplatz", "number": 1, "lat": 48.2, "lng": 16.37,
              "free_racks": 3, "bikes_available_to_rent": 1,
              "bike_list": [
                {"number": "5000", "bike_type": 1, "active": true, "state": "ok"}
              ]
            }
          ]
        }
      ]
    },
    {
      "name": "nextbike Graz", "country": "at", "country_name": "Österreich",
      "lat": 47.07, "lng": 15.44,
      "cities": [
        {
          "uid": 1, "name": "Graz", "lat": 47.07, "lng": 15.44, "available_bikes": 0,
          "places": [
            {
              "uid": 100, "name": "Jakominiplatz", "number": 2, "lat": 47.07, "lng": 15.44,
              "free_racks": 5, "bikes_available_to_rent": 0,
              "bike_list": [
                {"number": 5000, "bike_type": 2, "active": false, "state": "defect"}
              ]
            }
          ]
        },
        {
          "uid": 2, "name": "Leoben", "lat": 47.38, "lng": 15.09, "available_bikes": 0,
          "places": []
        }
      ]
    }
  ]
}"#;
