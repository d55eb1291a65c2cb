// src/services/session.rs

//! Feed session: a fetcher plus the latest good snapshot.
//!
//! A `Session` is an ordinary value owned by its caller. It replaces a
//! process-wide client: one-shot callers create one, refresh it and query
//! the graph; the scrape scheduler drives one per run. Refreshes are
//! serialized, so at most one fetch is in flight and graphs are published in
//! the order their fetches started.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::FeedConfig;
use crate::pipeline::{EntityGraph, IntegrityWarning, Normalized, normalize};
use crate::services::{FeedFetcher, HttpFeedFetcher};

/// A successful refresh.
#[derive(Debug, Clone)]
pub struct Refresh {
    pub graph: Arc<EntityGraph>,
    pub warnings: Vec<IntegrityWarning>,
}

pub struct Session {
    fetcher: Arc<dyn FeedFetcher>,
    current: RwLock<Option<Arc<EntityGraph>>>,
    refreshing: Mutex<()>,
}

impl Session {
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            current: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// Session over the HTTP feed described by `config`.
    pub fn http(config: &FeedConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFeedFetcher::new(config)?)))
    }

    /// Fetch and normalize the feed, then publish the new graph.
    ///
    /// On a fetch or parse failure the previously published graph stays in
    /// place and the error is returned. A refresh started while another is
    /// running waits for it to finish first.
    pub async fn refresh(&self) -> Result<Refresh> {
        let _refreshing = self.refreshing.lock().await;
        let result = self.fetch_and_normalize().await;
        match result {
            Ok(Normalized { graph, warnings }) => {
                let graph = Arc::new(graph);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&graph));
                log::info!("Snapshot refreshed: {}", graph.stats());
                Ok(Refresh { graph, warnings })
            }
            Err(e) => {
                log::warn!("Refresh failed, keeping previous snapshot: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_and_normalize(&self) -> Result<Normalized> {
        let payload = self.fetcher.fetch().await?;
        normalize(&payload)
    }

    /// The latest successfully built graph, if any.
    pub fn snapshot(&self) -> Option<Arc<EntityGraph>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn endpoint(&self) -> &str {
        self.fetcher.endpoint()
    }
}
