//! Enrichment pipeline orchestrator.
//!
//! Drains the stream of addresses without routes, selects candidate
//! stops per address, asks the directions provider for true distance
//! and duration per candidate, and persists successes. A failed lookup
//! skips that one candidate and nothing else; interruption at any point
//! leaves the store valid, and the next run re-derives the remaining
//! work from the absence of route rows.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::directions::{DirectionsProvider, TravelMode};
use crate::error::Result;
use crate::selector::select_closest;
use crate::store::Store;

/// Default number of candidate stops enriched per address.
pub const DEFAULT_STOPS_PER_ADDRESS: usize = 5;

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentConfig {
    pub stops_per_address: usize,
    pub mode: TravelMode,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            stops_per_address: DEFAULT_STOPS_PER_ADDRESS,
            mode: TravelMode::Walking,
        }
    }
}

/// Outcome counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Addresses drained from the unrouted stream.
    pub addresses_processed: usize,
    /// Route rows written.
    pub routes_recorded: usize,
    /// Candidate lookups that failed and were skipped.
    pub lookup_failures: usize,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Run the enrichment pipeline to completion.
pub fn run(
    store: &Store,
    provider: &dyn DirectionsProvider,
    config: &EnrichmentConfig,
) -> Result<RunReport> {
    run_with_cancel(store, provider, config, &AtomicBool::new(false))
}

/// Run the enrichment pipeline, stopping between candidates once
/// `cancel` is set. The in-flight lookup always completes first;
/// partial progress is valid because completion is defined by route
/// rows, never by a separate progress counter.
pub fn run_with_cancel(
    store: &Store,
    provider: &dyn DirectionsProvider,
    config: &EnrichmentConfig,
    cancel: &AtomicBool,
) -> Result<RunReport> {
    let stops = store.all_stops()?;
    info!(
        stops = stops.len(),
        stops_per_address = config.stops_per_address,
        mode = ?config.mode,
        "starting enrichment run"
    );

    let mut report = RunReport::default();

    for address in store.unrouted_addresses() {
        let address = address?;
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        report.addresses_processed += 1;

        let candidates = select_closest(&address, &stops, config.stops_per_address);
        for candidate in &candidates {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            match provider.route(&address, candidate, config.mode) {
                Ok(summary) => {
                    store.insert_route(
                        address.id(),
                        candidate.id(),
                        summary.distance,
                        summary.duration,
                    )?;
                    report.routes_recorded += 1;
                }
                Err(err) => {
                    // Retry already happened inside the client; skip the
                    // candidate and keep the run alive. An address whose
                    // candidates all fail stays unrouted and is picked up
                    // again on the next run.
                    warn!(
                        address = %address,
                        stop = %candidate,
                        error = %err,
                        "candidate lookup failed, skipping"
                    );
                    report.lookup_failures += 1;
                }
            }
        }
        if report.cancelled {
            break;
        }
    }

    info!(
        addresses = report.addresses_processed,
        routes = report.routes_recorded,
        failures = report.lookup_failures,
        cancelled = report.cancelled,
        "enrichment run finished"
    );
    Ok(report)
}
