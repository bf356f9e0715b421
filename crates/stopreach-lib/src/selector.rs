//! Geometric candidate selection.
//!
//! Narrows the full address × stop space down to a small per-address
//! candidate set before any network calls happen. The metric is squared
//! planar distance: cheap and consistent for ranking, with the true
//! walking distance deferred to the directions provider.

use crate::location::Location;

/// Return the `n` targets geometrically closest to `source`.
///
/// Output length is `min(n, targets.len())`, sorted by non-decreasing
/// squared distance. Equal distances fall back to the `Location`
/// ordering (latitude, longitude, id), so the result is deterministic
/// for identical inputs.
pub fn select_closest(source: &Location, targets: &[Location], n: usize) -> Vec<Location> {
    let mut ranked: Vec<(f64, Location)> = targets
        .iter()
        .map(|target| (source.squared_distance_to(target), *target))
        .collect();

    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    ranked.truncate(n);
    ranked.into_iter().map(|(_, target)| target).collect()
}
