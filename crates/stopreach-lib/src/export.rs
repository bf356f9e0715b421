//! Heat-map CSV export.

use std::io::Write;

use tracing::info;

use crate::error::Result;
use crate::reduce::closest_per_address;
use crate::store::Store;

/// Write persisted routes as a heat-map CSV with columns
/// `address_latitude, address_longitude, stop_latitude, stop_longitude,
/// distance, time`.
///
/// With `closest_only`, the route log is first reduced to the
/// minimum-distance row(s) per address.
pub fn write_routes_csv<W: Write>(store: &Store, writer: W, closest_only: bool) -> Result<usize> {
    let rows = if closest_only {
        let routes = store.all_routes()?;
        store.resolve_export_rows(&closest_per_address(&routes))?
    } else {
        store.export_rows()?
    };

    let mut csv = csv::Writer::from_writer(writer);
    for row in &rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    info!(rows = rows.len(), closest_only, "exported routes");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.create_schema().unwrap();
        let addr = store.add_address(41.5, -81.6).unwrap();
        let near = store.add_stop(41.51, -81.61).unwrap();
        let far = store.add_stop(41.9, -81.9).unwrap();
        store.insert_route(addr, near, 120.0, 95.0).unwrap();
        store.insert_route(addr, far, 4800.0, 3600.0).unwrap();
        store
    }

    #[test]
    fn full_export_writes_every_route() {
        let store = seeded_store();
        let mut buffer = Vec::new();
        let count = write_routes_csv(&store, &mut buffer, false).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "address_latitude,address_longitude,stop_latitude,\
                 stop_longitude,distance,time"
            )
        );
        assert_eq!(lines.next(), Some("41.5,-81.6,41.51,-81.61,120.0,95.0"));
        assert_eq!(lines.next(), Some("41.5,-81.6,41.9,-81.9,4800.0,3600.0"));
    }

    #[test]
    fn closest_only_export_keeps_the_minimum_distance_row() {
        let store = seeded_store();
        let mut buffer = Vec::new();
        let count = write_routes_csv(&store, &mut buffer, true).unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("120.0,95.0"));
        assert!(!text.contains("4800.0"));
    }
}
