//! SQLite-backed store for addresses, stops, and enrichment results.
//!
//! Routes are an append-only log of successful enrichments: an address
//! counts as "done" only because at least one route row references it.
//! That absence-based definition is what makes the pipeline resumable
//! after an arbitrary interruption.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::Result;
use crate::location::{Location, LocationId};

/// Number of address rows fetched per page by [`UnroutedAddresses`].
const UNROUTED_PAGE_SIZE: usize = 256;

/// A persisted enrichment result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRecord {
    pub id: i64,
    pub address_id: LocationId,
    pub stop_id: LocationId,
    pub distance: f64,
    pub time: f64,
}

/// One row of the heat-map export, with both endpoints resolved.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ExportRow {
    pub address_latitude: f64,
    pub address_longitude: f64,
    pub stop_latitude: f64,
    pub stop_longitude: f64,
    pub distance: f64,
    pub time: f64,
}

/// Handle on the SQLite database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an existing database, failing if the file is absent.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Create the addresses/stops/routes tables if they do not exist.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS addresses (
                 id INTEGER PRIMARY KEY,
                 latitude REAL NOT NULL,
                 longitude REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS stops (
                 id INTEGER PRIMARY KEY,
                 latitude REAL NOT NULL,
                 longitude REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS routes (
                 id INTEGER PRIMARY KEY,
                 address_id INTEGER NOT NULL,
                 stop_id INTEGER NOT NULL,
                 distance REAL NOT NULL,
                 time REAL NOT NULL,
                 FOREIGN KEY(address_id) REFERENCES addresses(id),
                 FOREIGN KEY(stop_id) REFERENCES stops(id)
             );
             CREATE INDEX IF NOT EXISTS idx_routes_address ON routes(address_id);",
        )?;
        debug!("schema ready");
        Ok(())
    }

    /// Insert one address and return its assigned id.
    pub fn add_address(&self, latitude: f64, longitude: f64) -> Result<LocationId> {
        self.conn.execute(
            "INSERT INTO addresses (latitude, longitude) VALUES (?1, ?2)",
            params![latitude, longitude],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert one stop and return its assigned id.
    pub fn add_stop(&self, latitude: f64, longitude: f64) -> Result<LocationId> {
        self.conn.execute(
            "INSERT INTO stops (latitude, longitude) VALUES (?1, ?2)",
            params![latitude, longitude],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Bulk-load addresses from a `latitude,longitude` CSV file.
    pub fn load_addresses_csv(&self, path: &Path) -> Result<usize> {
        let count = self.load_locations_csv(path, "addresses")?;
        info!(count, path = %path.display(), "loaded addresses");
        Ok(count)
    }

    /// Bulk-load stops from a `latitude,longitude` CSV file.
    pub fn load_stops_csv(&self, path: &Path) -> Result<usize> {
        let count = self.load_locations_csv(path, "stops")?;
        info!(count, path = %path.display(), "loaded stops");
        Ok(count)
    }

    fn load_locations_csv(&self, path: &Path, table: &str) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        let sql = format!("INSERT INTO {table} (latitude, longitude) VALUES (?1, ?2)");

        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in reader.deserialize::<CsvLocation>() {
                let row = record?;
                // Validate ranges before the row reaches storage.
                Location::new(row.latitude, row.longitude, 0)?;
                stmt.execute(params![row.latitude, row.longitude])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Append one enrichment result. Constraint violations (unknown
    /// address or stop id) surface as errors and are never retried.
    pub fn insert_route(
        &self,
        address_id: LocationId,
        stop_id: LocationId,
        distance: f64,
        time: f64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO routes (address_id, stop_id, distance, time) VALUES (?1, ?2, ?3, ?4)",
            params![address_id, stop_id, distance, time],
        )?;
        Ok(())
    }

    /// Full target set, ascending id. Stops are assumed stable for the
    /// duration of a pipeline run.
    pub fn all_stops(&self) -> Result<Vec<Location>> {
        self.select_locations("SELECT id, latitude, longitude FROM stops ORDER BY id")
    }

    /// Full source set, ascending id.
    pub fn all_addresses(&self) -> Result<Vec<Location>> {
        self.select_locations("SELECT id, latitude, longitude FROM addresses ORDER BY id")
    }

    fn select_locations(&self, sql: &str) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut locations = Vec::new();
        while let Some(row) = rows.next()? {
            locations.push(Location::new(row.get(1)?, row.get(2)?, row.get(0)?)?);
        }
        Ok(locations)
    }

    /// Lazy, restartable stream of addresses that have no route row yet,
    /// in ascending id order.
    ///
    /// Each page is a fresh query against current state, so a stream
    /// created after an interrupted run yields exactly the remaining
    /// work and nothing that was already enriched.
    pub fn unrouted_addresses(&self) -> UnroutedAddresses<'_> {
        UnroutedAddresses {
            store: self,
            cursor: 0,
            page: Vec::new(),
            exhausted: false,
        }
    }

    fn unrouted_page(&self, after: LocationId, limit: usize) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT a.id, a.latitude, a.longitude
             FROM addresses a
             WHERE a.id > ?1
               AND NOT EXISTS (SELECT 1 FROM routes r WHERE r.address_id = a.id)
             ORDER BY a.id
             LIMIT ?2",
        )?;
        let mut rows = stmt.query(params![after, limit as i64])?;
        let mut locations = Vec::new();
        while let Some(row) = rows.next()? {
            locations.push(Location::new(row.get(1)?, row.get(2)?, row.get(0)?)?);
        }
        Ok(locations)
    }

    /// Every persisted route, ascending id.
    pub fn all_routes(&self) -> Result<Vec<RouteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, address_id, stop_id, distance, time FROM routes ORDER BY id",
        )?;
        let mut rows = stmt.query([])?;
        let mut routes = Vec::new();
        while let Some(row) = rows.next()? {
            routes.push(RouteRecord {
                id: row.get(0)?,
                address_id: row.get(1)?,
                stop_id: row.get(2)?,
                distance: row.get(3)?,
                time: row.get(4)?,
            });
        }
        Ok(routes)
    }

    /// Routes joined with both endpoint coordinates, for the export.
    pub fn export_rows(&self) -> Result<Vec<ExportRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.latitude, a.longitude, s.latitude, s.longitude, r.distance, r.time
             FROM routes r
             JOIN addresses a ON a.id = r.address_id
             JOIN stops s ON s.id = r.stop_id
             ORDER BY r.id",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(ExportRow {
                address_latitude: row.get(0)?,
                address_longitude: row.get(1)?,
                stop_latitude: row.get(2)?,
                stop_longitude: row.get(3)?,
                distance: row.get(4)?,
                time: row.get(5)?,
            });
        }
        Ok(out)
    }

    /// Resolve the endpoints of already-reduced route records.
    pub fn resolve_export_rows(&self, routes: &[RouteRecord]) -> Result<Vec<ExportRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT a.latitude, a.longitude, s.latitude, s.longitude
             FROM addresses a, stops s
             WHERE a.id = ?1 AND s.id = ?2",
        )?;
        let mut out = Vec::with_capacity(routes.len());
        for route in routes {
            let row = stmt.query_row(params![route.address_id, route.stop_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            out.push(ExportRow {
                address_latitude: row.0,
                address_longitude: row.1,
                stop_latitude: row.2,
                stop_longitude: row.3,
                distance: route.distance,
                time: route.time,
            });
        }
        Ok(out)
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvLocation {
    latitude: f64,
    longitude: f64,
}

/// Keyset-paginated iterator over addresses without any route row.
pub struct UnroutedAddresses<'a> {
    store: &'a Store,
    cursor: LocationId,
    page: Vec<Location>,
    exhausted: bool,
}

impl Iterator for UnroutedAddresses<'_> {
    type Item = Result<Location>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() {
            if self.exhausted {
                return None;
            }
            match self.store.unrouted_page(self.cursor, UNROUTED_PAGE_SIZE) {
                Ok(mut page) => {
                    if page.len() < UNROUTED_PAGE_SIZE {
                        self.exhausted = true;
                    }
                    if let Some(last) = page.last() {
                        self.cursor = last.id();
                    }
                    page.reverse();
                    self.page = page;
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
        self.page.pop().map(Ok)
    }
}
