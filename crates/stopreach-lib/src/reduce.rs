//! Closest-route reduction for export and reporting.

use std::collections::BTreeMap;

use crate::store::RouteRecord;

/// Reduce the full route log to the best row(s) per address.
///
/// Rows are grouped by address id and every row tied at the group's
/// minimum distance is kept: the same minimal distance can legitimately
/// describe multiple equally-close stops. Output is ordered by
/// ascending address id, keeping input order within a group. Pure
/// function over already-persisted data.
pub fn closest_per_address(routes: &[RouteRecord]) -> Vec<RouteRecord> {
    let mut groups: BTreeMap<i64, Vec<RouteRecord>> = BTreeMap::new();
    for route in routes {
        groups.entry(route.address_id).or_default().push(*route);
    }

    let mut reduced = Vec::new();
    for group in groups.values() {
        let min = group
            .iter()
            .map(|route| route.distance)
            .fold(f64::INFINITY, f64::min);
        reduced.extend(group.iter().filter(|route| route.distance == min));
    }
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: i64, address_id: i64, stop_id: i64, distance: f64) -> RouteRecord {
        RouteRecord {
            id,
            address_id,
            stop_id,
            distance,
            time: distance * 1.2,
        }
    }

    #[test]
    fn keeps_only_the_minimum_distance_row() {
        let routes = vec![route(1, 1, 2, 100.0), route(2, 1, 3, 50.0)];
        let reduced = closest_per_address(&routes);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].stop_id, 3);
        assert_eq!(reduced[0].distance, 50.0);
    }

    #[test]
    fn retains_all_rows_tied_at_the_minimum() {
        let routes = vec![
            route(1, 1, 2, 75.0),
            route(2, 1, 3, 75.0),
            route(3, 1, 4, 90.0),
        ];
        let reduced = closest_per_address(&routes);
        assert_eq!(reduced.len(), 2);
        assert!(reduced.iter().all(|r| r.distance == 75.0));
    }

    #[test]
    fn groups_are_ordered_by_address_id() {
        let routes = vec![
            route(1, 5, 1, 10.0),
            route(2, 2, 1, 20.0),
            route(3, 5, 2, 5.0),
        ];
        let reduced = closest_per_address(&routes);
        assert_eq!(
            reduced
                .iter()
                .map(|r| (r.address_id, r.stop_id))
                .collect::<Vec<_>>(),
            vec![(2, 1), (5, 2)]
        );
    }

    #[test]
    fn empty_input_reduces_to_empty() {
        assert!(closest_per_address(&[]).is_empty());
    }
}
