//! stopreach library entry points.
//!
//! This crate measures public-transit accessibility: it stores address
//! and stop coordinates in SQLite, selects the geometrically nearest
//! stops per address, enriches each candidate with true distance and
//! duration from a directions provider, and exports the results for
//! heat-map rendering. The CLI should only depend on the functions
//! exported here instead of reimplementing behavior.

#![deny(warnings)]

pub mod directions;
pub mod error;
pub mod export;
pub mod grid;
pub mod location;
pub mod pipeline;
pub mod reduce;
pub mod retry;
pub mod selector;
pub mod store;

pub use directions::{
    load_api_key, DirectionsProvider, MapboxConfig, MapboxDirections, RouteSummary, TravelMode,
};
pub use error::{Error, Result, RouteLookupError};
pub use export::write_routes_csv;
pub use grid::UniformGrid;
pub use location::{Location, LocationId};
pub use pipeline::{run, run_with_cancel, EnrichmentConfig, RunReport};
pub use reduce::closest_per_address;
pub use retry::RetryPolicy;
pub use selector::select_closest;
pub use store::{ExportRow, RouteRecord, Store};
