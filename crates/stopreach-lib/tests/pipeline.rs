use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;

use stopreach_lib::directions::{DirectionsProvider, RouteSummary, TravelMode};
use stopreach_lib::error::RouteLookupError;
use stopreach_lib::location::Location;
use stopreach_lib::pipeline::{run, run_with_cancel, EnrichmentConfig};
use stopreach_lib::store::Store;

/// Scripted provider: pops one outcome per lookup and records the
/// (origin id, destination id) of every call.
struct ScriptedProvider {
    outcomes: RefCell<VecDeque<Result<RouteSummary, RouteLookupError>>>,
    calls: RefCell<Vec<(i64, i64)>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<Result<RouteSummary, RouteLookupError>>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn always(summary: RouteSummary, capacity: usize) -> Self {
        Self::new((0..capacity).map(|_| Ok(summary)).collect())
    }

    fn calls(&self) -> Vec<(i64, i64)> {
        self.calls.borrow().clone()
    }
}

impl DirectionsProvider for ScriptedProvider {
    fn route(
        &self,
        origin: &Location,
        destination: &Location,
        _mode: TravelMode,
    ) -> Result<RouteSummary, RouteLookupError> {
        self.calls.borrow_mut().push((origin.id(), destination.id()));
        self.outcomes
            .borrow_mut()
            .pop_front()
            .expect("provider called more times than scripted")
    }
}

fn summary(distance: f64, duration: f64) -> RouteSummary {
    RouteSummary { distance, duration }
}

fn lookup_failure() -> RouteLookupError {
    RouteLookupError::NoRoutes
}

fn store_with_schema() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.create_schema().unwrap();
    store
}

fn config(stops_per_address: usize) -> EnrichmentConfig {
    EnrichmentConfig {
        stops_per_address,
        mode: TravelMode::Walking,
    }
}

#[test]
fn end_to_end_single_address_writes_one_route() {
    let store = store_with_schema();
    let addr = store.add_address(0.0, 0.0).unwrap();
    let near = store.add_stop(1.0, 1.0).unwrap();
    let _far = store.add_stop(2.0, 2.0).unwrap();

    let provider = ScriptedProvider::new(vec![Ok(summary(500.0, 600.0))]);
    let report = run(&store, &provider, &config(1)).unwrap();

    assert_eq!(report.addresses_processed, 1);
    assert_eq!(report.routes_recorded, 1);
    assert_eq!(report.lookup_failures, 0);
    assert!(!report.cancelled);

    // The selector picked the near stop only.
    assert_eq!(provider.calls(), vec![(addr, near)]);

    let routes = store.all_routes().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].address_id, addr);
    assert_eq!(routes[0].stop_id, near);
    assert_eq!(routes[0].distance, 500.0);
    assert_eq!(routes[0].time, 600.0);

    assert_eq!(store.unrouted_addresses().count(), 0);
}

#[test]
fn candidate_failure_does_not_abort_the_address() {
    let store = store_with_schema();
    let addr = store.add_address(0.0, 0.0).unwrap();
    let first = store.add_stop(1.0, 1.0).unwrap();
    let second = store.add_stop(2.0, 2.0).unwrap();

    let provider = ScriptedProvider::new(vec![Err(lookup_failure()), Ok(summary(800.0, 700.0))]);
    let report = run(&store, &provider, &config(2)).unwrap();

    assert_eq!(report.routes_recorded, 1);
    assert_eq!(report.lookup_failures, 1);
    assert_eq!(provider.calls(), vec![(addr, first), (addr, second)]);

    let routes = store.all_routes().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].stop_id, second);
}

#[test]
fn address_with_all_candidates_failed_stays_unrouted() {
    let store = store_with_schema();
    let addr = store.add_address(0.0, 0.0).unwrap();
    store.add_stop(1.0, 1.0).unwrap();
    store.add_stop(2.0, 2.0).unwrap();

    let provider = ScriptedProvider::new(vec![Err(lookup_failure()), Err(lookup_failure())]);
    let report = run(&store, &provider, &config(2)).unwrap();

    assert_eq!(report.routes_recorded, 0);
    assert_eq!(report.lookup_failures, 2);
    assert!(store.all_routes().unwrap().is_empty());

    // Resumability: the address is re-derived as remaining work.
    let remaining: Vec<i64> = store
        .unrouted_addresses()
        .map(|loc| loc.unwrap().id())
        .collect();
    assert_eq!(remaining, vec![addr]);
}

#[test]
fn second_run_only_processes_the_remaining_addresses() {
    let store = store_with_schema();
    let a1 = store.add_address(0.0, 0.0).unwrap();
    let a2 = store.add_address(5.0, 5.0).unwrap();
    let a3 = store.add_address(9.0, 9.0).unwrap();
    let stop = store.add_stop(1.0, 1.0).unwrap();

    // First run: a1 and a3 succeed, a2's only candidate fails.
    let provider = ScriptedProvider::new(vec![
        Ok(summary(100.0, 60.0)),
        Err(lookup_failure()),
        Ok(summary(300.0, 240.0)),
    ]);
    run(&store, &provider, &config(1)).unwrap();
    assert_eq!(
        provider.calls(),
        vec![(a1, stop), (a2, stop), (a3, stop)]
    );

    // Second run sees exactly a2.
    let provider = ScriptedProvider::new(vec![Ok(summary(200.0, 120.0))]);
    let report = run(&store, &provider, &config(1)).unwrap();
    assert_eq!(report.addresses_processed, 1);
    assert_eq!(provider.calls(), vec![(a2, stop)]);
    assert_eq!(store.unrouted_addresses().count(), 0);
}

#[test]
fn addresses_are_processed_in_ascending_id_order() {
    let store = store_with_schema();
    let a1 = store.add_address(9.0, 9.0).unwrap();
    let a2 = store.add_address(0.0, 0.0).unwrap();
    let stop = store.add_stop(1.0, 1.0).unwrap();

    let provider = ScriptedProvider::always(summary(10.0, 10.0), 2);
    run(&store, &provider, &config(1)).unwrap();
    assert_eq!(provider.calls(), vec![(a1, stop), (a2, stop)]);
}

#[test]
fn empty_address_set_is_a_clean_noop() {
    let store = store_with_schema();
    store.add_stop(1.0, 1.0).unwrap();

    let provider = ScriptedProvider::new(Vec::new());
    let report = run(&store, &provider, &config(3)).unwrap();
    assert_eq!(report.addresses_processed, 0);
    assert_eq!(report.routes_recorded, 0);
}

#[test]
fn no_stops_means_no_lookups() {
    let store = store_with_schema();
    store.add_address(0.0, 0.0).unwrap();

    let provider = ScriptedProvider::new(Vec::new());
    let report = run(&store, &provider, &config(3)).unwrap();
    assert_eq!(report.addresses_processed, 1);
    assert_eq!(report.routes_recorded, 0);
    assert!(provider.calls().is_empty());
}

#[test]
fn cancellation_before_the_run_processes_nothing() {
    let store = store_with_schema();
    store.add_address(0.0, 0.0).unwrap();
    store.add_stop(1.0, 1.0).unwrap();

    let cancel = AtomicBool::new(true);
    let provider = ScriptedProvider::new(Vec::new());
    let report = run_with_cancel(&store, &provider, &config(1), &cancel).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.routes_recorded, 0);
    assert!(provider.calls().is_empty());
    // Nothing was lost: the address is still pending.
    assert_eq!(store.unrouted_addresses().count(), 1);
}
