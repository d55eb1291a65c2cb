// src/pipeline/scrape.rs

//! Recurring scrape loop.
//!
//! A [`ScrapeScheduler`] is idle until [`ScrapeScheduler::start`] moves it
//! into a background task and hands back a [`ScrapeHandle`]. Each cycle
//! refreshes the session and, if that worked, snapshots every selected
//! entity. Cycles never overlap: the next one is scheduled `interval` after
//! the previous one *finished*, so a slow cycle pushes later cycles back
//! without accumulating drift.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::{EntityKind, ScrapeConfig};
use crate::pipeline::IntegrityWarning;
use crate::services::Session;
use crate::storage::{LogOutcome, SnapshotLogger};

/// What happened during one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle number, counting skipped cycles too
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    /// Why the log phase was skipped (fetch or parse failure)
    pub skipped: Option<String>,
    pub warnings: Vec<IntegrityWarning>,
    /// Selectors that matched nothing in the snapshot
    pub missing: Vec<(EntityKind, String)>,
    pub written: Vec<String>,
    pub already_logged: Vec<String>,
    pub failures: Vec<String>,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            cycle: 0,
            started_at,
            skipped: None,
            warnings: Vec::new(),
            missing: Vec::new(),
            written: Vec::new(),
            already_logged: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Scheduler in its idle state.
pub struct ScrapeScheduler {
    session: Arc<Session>,
    logger: SnapshotLogger,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl ScrapeScheduler {
    pub fn new(session: Arc<Session>, logger: SnapshotLogger) -> Self {
        Self {
            session,
            logger,
            reports: None,
        }
    }

    /// Publish a [`CycleReport`] after every cycle.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Start cycling in a background task.
    ///
    /// The first cycle starts immediately. Dropping the returned handle
    /// stops the loop after the running cycle.
    pub fn start(self, config: ScrapeConfig) -> ScrapeHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let cycles = Arc::new(AtomicU64::new(0));

        log::info!(
            "Scraping {} every {}s ({} selectors)",
            self.session.endpoint(),
            config.interval_secs,
            config.selector_count()
        );

        let task = tokio::spawn(self.run(config, stop_rx, Arc::clone(&cycles)));
        ScrapeHandle {
            stop: stop_tx,
            cycles,
            task,
        }
    }

    /// Run a single cycle in the foreground.
    pub async fn run_once(&self, config: &ScrapeConfig) -> CycleReport {
        let mut report = self.run_cycle(config).await;
        report.cycle = 1;
        self.publish(report.clone());
        report
    }

    async fn run(
        self,
        config: ScrapeConfig,
        mut stop: watch::Receiver<bool>,
        cycles: Arc<AtomicU64>,
    ) {
        let interval = Duration::from_secs(config.interval_secs);

        loop {
            let mut report = self.run_cycle(&config).await;
            report.cycle = cycles.fetch_add(1, Ordering::SeqCst) + 1;
            log::info!(
                "Scraped: {} ({} written, {} already logged, {} failed{})",
                report.cycle,
                report.written.len(),
                report.already_logged.len(),
                report.failures.len(),
                if report.skipped.is_some() { ", skipped" } else { "" }
            );
            self.publish(report);

            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                // Also fires when the handle is dropped.
                _ = stop.changed() => break,
            }
        }

        log::info!("Scraper stopped after {} cycles", cycles.load(Ordering::SeqCst));
    }

    async fn run_cycle(&self, config: &ScrapeConfig) -> CycleReport {
        let mut report = CycleReport::new(Utc::now());

        let refresh = match self.session.refresh().await {
            Ok(refresh) => refresh,
            Err(e) => {
                log::warn!("Skipping log phase: {}", e);
                report.skipped = Some(e.to_string());
                return report;
            }
        };
        report.warnings = refresh.warnings;

        let selection = refresh.graph.select(config);
        for (kind, id) in &selection.missing {
            log::warn!("Selected {} '{}' not found in snapshot", kind, id);
        }
        report.missing = selection.missing.clone();

        // Every entity of a cycle shares one timestamp.
        let at = Utc::now();
        let writes = selection.targets.iter().map(|target| async move {
            let result = self
                .logger
                .log(&target.entity, target.kind, &target.id, at)
                .await;
            (target, result)
        });

        for (target, result) in join_all(writes).await {
            match result {
                Ok(LogOutcome::Written(location)) => report.written.push(location),
                Ok(LogOutcome::AlreadyLogged(location)) => report.already_logged.push(location),
                Err(e) => {
                    log::warn!("Failed to log {} {}: {}", target.kind, target.id, e);
                    report.failures.push(e.to_string());
                }
            }
        }

        report
    }

    fn publish(&self, report: CycleReport) {
        if let Some(reports) = &self.reports {
            // Nobody listening is fine.
            let _ = reports.send(report);
        }
    }
}

/// Handle to a running scheduler.
pub struct ScrapeHandle {
    stop: watch::Sender<bool>,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

/// How a shutdown went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub cycles: u64,
    /// The running cycle did not finish within the deadline and was aborted
    pub aborted: bool,
}

impl ScrapeHandle {
    /// Ask the loop to stop; the running cycle is finished first.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop and wait up to `deadline` for the running cycle to finish.
    ///
    /// A cycle still running at the deadline is aborted.
    pub async fn shutdown(self, deadline: Duration) -> ShutdownReport {
        self.stop();
        let mut task = self.task;

        let aborted = match tokio::time::timeout(deadline, &mut task).await {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                log::error!("Scraper task ended abnormally: {}", e);
                true
            }
            Err(_) => {
                log::warn!("Scraper did not stop within {:?}, aborting", deadline);
                task.abort();
                true
            }
        };

        ShutdownReport {
            cycles: self.cycles.load(Ordering::SeqCst),
            aborted,
        }
    }
}
