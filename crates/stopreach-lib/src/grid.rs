//! Uniform coordinate-grid generation.
//!
//! Produces a lattice of addresses covering a bounding box at a fixed
//! resolution, for seeding the database when no real address data is
//! available. Both extremes of each axis are included: the interval
//! count per axis is `ceil((max - min) / step) + 1`.

use std::io::Write;

use crate::error::{Error, Result};
use crate::location::Location;

/// A validated uniform grid specification.
#[derive(Debug, Clone, Copy)]
pub struct UniformGrid {
    lat_min: f64,
    lon_min: f64,
    lat_step: f64,
    lon_step: f64,
    lat_count: usize,
    lon_count: usize,
}

impl UniformGrid {
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        lat_step: f64,
        lon_step: f64,
    ) -> Result<Self> {
        if !(lat_step > 0.0 && lon_step > 0.0) {
            return Err(Error::InvalidGrid {
                message: "step sizes must be positive".to_string(),
            });
        }
        if lat_min > lat_max || lon_min > lon_max {
            return Err(Error::InvalidGrid {
                message: "minimum bound exceeds maximum bound".to_string(),
            });
        }
        // Validate the corners; every lattice point lies between them.
        Location::new(lat_min, lon_min, 0)?;
        Location::new(lat_max, lon_max, 0)?;

        Ok(Self {
            lat_min,
            lon_min,
            lat_step,
            lon_step,
            lat_count: interval_count(lat_min, lat_max, lat_step),
            lon_count: interval_count(lon_min, lon_max, lon_step),
        })
    }

    /// Total number of lattice points.
    pub fn len(&self) -> usize {
        self.lat_count * self.lon_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate lattice points in ascending (latitude, longitude) order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let grid = *self;
        (0..grid.lat_count).flat_map(move |i| {
            (0..grid.lon_count).map(move |j| {
                (
                    grid.lat_min + grid.lat_step * i as f64,
                    grid.lon_min + grid.lon_step * j as f64,
                )
            })
        })
    }

    /// Write the grid as a `latitude,longitude` CSV, the format the
    /// store's bulk loaders ingest.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["latitude", "longitude"])?;
        let mut count = 0usize;
        for (lat, lon) in self.points() {
            csv.write_record([lat.to_string(), lon.to_string()])?;
            count += 1;
        }
        csv.flush()?;
        Ok(count)
    }
}

/// Number of lattice points between `min` and `max` inclusive at `step`
/// spacing.
fn interval_count(min: f64, max: f64, step: f64) -> usize {
    ((max - min) / step).ceil() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_count_includes_both_extremes() {
        assert_eq!(interval_count(0.0, 1.0, 0.5), 3);
        assert_eq!(interval_count(0.0, 1.0, 0.4), 4);
        assert_eq!(interval_count(0.0, 0.0, 0.5), 1);
    }

    #[test]
    fn grid_enumerates_latitude_major() {
        let grid = UniformGrid::new(0.0, 1.0, 10.0, 11.0, 1.0, 1.0).unwrap();
        let points: Vec<(f64, f64)> = grid.points().collect();
        assert_eq!(
            points,
            vec![(0.0, 10.0), (0.0, 11.0), (1.0, 10.0), (1.0, 11.0)]
        );
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn rejects_non_positive_steps() {
        assert!(UniformGrid::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0).is_err());
        assert!(UniformGrid::new(0.0, 1.0, 0.0, 1.0, 1.0, -0.5).is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(UniformGrid::new(1.0, 0.0, 0.0, 1.0, 0.1, 0.1).is_err());
    }

    #[test]
    fn rejects_out_of_range_corners() {
        assert!(UniformGrid::new(-91.0, 0.0, 0.0, 1.0, 0.1, 0.1).is_err());
    }

    #[test]
    fn csv_output_is_loadable_shape() {
        let grid = UniformGrid::new(0.0, 0.0, 5.0, 6.0, 1.0, 1.0).unwrap();
        let mut buffer = Vec::new();
        let count = grid.write_csv(&mut buffer).unwrap();
        assert_eq!(count, 2);
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "latitude,longitude\n0,5\n0,6\n");
    }
}
