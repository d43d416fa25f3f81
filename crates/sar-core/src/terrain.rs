//! Terrain grid and bilinear sampler (C1).
//!
//! Mirrors the shape of `terra-core::heightfield::HeightField`: a row-major
//! `Vec<f32>` plus a geographic bounding box, with bilinear sampling and
//! coordinate conversion. Unlike `HeightField` this grid also tracks a
//! `NODATA` sentinel and a cell resolution in metres, and `elevation()`
//! refuses to interpolate across missing cells.

use crate::geo::haversine_m;
use serde::{Deserialize, Serialize};

/// Sentinel marking a cell with no elevation measurement.
pub const NODATA: f32 = -9999.0;

/// Row-major elevation raster covering a fixed geographic bounding box.
///
/// Row 0 is north, column 0 is west. Constructed once per simulation from
/// the elevation provider and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainGrid {
    elevation: Vec<f32>,
    rows: usize,
    cols: usize,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    resolution_m: f64,
}

impl TerrainGrid {
    /// Build a terrain grid from a row-major elevation buffer.
    ///
    /// `elevation.len()` must equal `rows * cols`.
    pub fn new(
        elevation: Vec<f32>,
        rows: usize,
        cols: usize,
        bounds: (f64, f64, f64, f64),
        resolution_m: f64,
    ) -> Self {
        assert_eq!(elevation.len(), rows * cols, "elevation buffer size mismatch");
        let (west, south, east, north) = bounds;
        Self {
            elevation,
            rows,
            cols,
            west,
            south,
            east,
            north,
            resolution_m,
        }
    }

    /// Build a flat (constant-elevation) grid, primarily for tests.
    pub fn flat(rows: usize, cols: usize, bounds: (f64, f64, f64, f64), resolution_m: f64, value: f32) -> Self {
        Self::new(vec![value; rows * cols], rows, cols, bounds, resolution_m)
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.west, self.south, self.east, self.north)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn resolution_m(&self) -> f64 {
        self.resolution_m
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f32 {
        self.elevation[row * self.cols + col]
    }

    fn in_bounds(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Convert a coordinate to `(row, col)` grid indices.
    ///
    /// `row = floor((north - lat) * rows / (north - south))`,
    /// `col = floor((lon - west) * cols / (east - west))`.
    ///
    /// Values on the north/west boundary map to row/col 0. This function does
    /// not clamp: callers passing a point outside `bounds()` get an
    /// out-of-range index and must clamp explicitly (matching the "south/east
    /// boundary is clamped by the caller" edge policy).
    pub fn to_index(&self, lat: f64, lon: f64) -> (isize, isize) {
        let row = ((self.north - lat) * self.rows as f64 / (self.north - self.south)).floor() as isize;
        let col = ((lon - self.west) * self.cols as f64 / (self.east - self.west)).floor() as isize;
        (row, col)
    }

    /// `to_index`, clamped into `[0, rows-1] x [0, cols-1]`.
    pub fn to_index_clamped(&self, lat: f64, lon: f64) -> (usize, usize) {
        let (row, col) = self.to_index(lat, lon);
        let row = row.clamp(0, self.rows as isize - 1) as usize;
        let col = col.clamp(0, self.cols as isize - 1) as usize;
        (row, col)
    }

    /// Bilinear elevation at `(lat, lon)`.
    ///
    /// Returns `None` if the point lies outside `bounds()`, or if any of the
    /// four surrounding corners is `NODATA` — missing cells are never
    /// interpolated across.
    pub fn elevation(&self, lat: f64, lon: f64) -> Option<f32> {
        if !self.in_bounds(lat, lon) {
            return None;
        }

        // Same row/col scale as `to_index` (no `-1`): matches
        // `terrain_sampler.py::_latlon_to_rowcol`'s convention, which both
        // index lookup and bilinear sampling share in the original.
        let fx = (lon - self.west) / (self.east - self.west) * self.cols as f64;
        let fy = (self.north - lat) / (self.north - self.south) * self.rows as f64;

        let c0 = fx.floor() as usize;
        let r0 = fy.floor() as usize;
        let c1 = (c0 + 1).min(self.cols - 1);
        let r1 = (r0 + 1).min(self.rows - 1);
        let c0 = c0.min(self.cols - 1);
        let r0 = r0.min(self.rows - 1);

        let v00 = self.get(r0, c0);
        let v01 = self.get(r0, c1);
        let v10 = self.get(r1, c0);
        let v11 = self.get(r1, c1);

        if v00 == NODATA || v01 == NODATA || v10 == NODATA || v11 == NODATA {
            return None;
        }

        let tx = (fx - c0 as f64) as f32;
        let ty = (fy - r0 as f64) as f32;

        let v = v00 * (1.0 - tx) * (1.0 - ty)
            + v01 * tx * (1.0 - ty)
            + v10 * (1.0 - tx) * ty
            + v11 * tx * ty;

        Some(v)
    }

    /// Slope between two points: `(elev2 - elev1) / haversine_distance_m`.
    ///
    /// Returns `Some(0.0)` if the two points are within 0.1 m of each other,
    /// `None` if either elevation is unavailable.
    pub fn slope(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f32> {
        let e1 = self.elevation(lat1, lon1)?;
        let e2 = self.elevation(lat2, lon2)?;

        let dist = haversine_m(lat1, lon1, lat2, lon2);
        if dist < 0.1 {
            return Some(0.0);
        }

        Some((e2 - e1) as f64 as f32 / dist as f32)
    }
}
