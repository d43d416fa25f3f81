//! Linear-feature rasterizer (C2).
//!
//! Converts trail/road/river/cliff linestrings into boolean masks aligned to
//! the terrain grid. Grounded in `osm_features.py::rasterize_features`, with
//! the buffer-then-union-then-point-in-polygon pipeline replaced by a direct
//! point-to-segment distance test (equivalent for a single-sided buffer
//! around open linestrings, and avoids pulling in a full 2-D geometry crate
//! for a mask this simple).

use crate::config::FeatureBuffers;
use crate::terrain::TerrainGrid;
use serde::{Deserialize, Serialize};

/// One feature class's boolean raster, same shape as the terrain grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mask {
    data: Vec<bool>,
    rows: usize,
    cols: usize,
}

impl Mask {
    fn empty(rows: usize, cols: usize) -> Self {
        Self { data: vec![false; rows * cols], rows, cols }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols + col]
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// The four feature masks, aligned to a `TerrainGrid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMasks {
    pub trails: Mask,
    pub roads: Mask,
    pub rivers: Mask,
    pub cliffs: Mask,
}

/// Raw per-class linestrings, in `(lat, lon)` pairs, as returned by a
/// `FeatureProvider`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeatures {
    pub trails: Vec<Vec<(f64, f64)>>,
    pub roads: Vec<Vec<(f64, f64)>>,
    pub rivers: Vec<Vec<(f64, f64)>>,
    pub cliffs: Vec<Vec<(f64, f64)>>,
}

/// Metres per degree of latitude, used to convert a metre buffer to degrees.
/// Matches the approximation used throughout the original model
/// (`buffer_m / 111_320.0`).
const METERS_PER_DEGREE: f64 = 111_320.0;

impl FeatureMasks {
    /// Rasterize `raw` onto a grid matching `terrain`'s shape and bounds,
    /// using `buffers` as the per-class buffer radii (metres).
    ///
    /// Deterministic for a given input order: cells are visited row-major and
    /// lines are buffered in the order they appear in `raw`.
    pub fn rasterize(raw: &RawFeatures, terrain: &TerrainGrid, buffers: &FeatureBuffers) -> Self {
        let (rows, cols) = terrain.shape();
        let (west, south, east, north) = terrain.bounds();

        Self {
            trails: rasterize_class(&raw.trails, rows, cols, west, south, east, north, buffers.trails),
            roads: rasterize_class(&raw.roads, rows, cols, west, south, east, north, buffers.roads),
            rivers: rasterize_class(&raw.rivers, rows, cols, west, south, east, north, buffers.rivers),
            cliffs: rasterize_class(&raw.cliffs, rows, cols, west, south, east, north, buffers.cliffs),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rasterize_class(
    lines: &[Vec<(f64, f64)>],
    rows: usize,
    cols: usize,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    buffer_m: f64,
) -> Mask {
    if lines.is_empty() || rows == 0 || cols == 0 {
        return Mask::empty(rows, cols);
    }

    // Anisotropic degree buffer: latitude degrees are ~constant length, but a
    // degree of longitude shrinks by cos(latitude). Use the grid's mid
    // latitude, matching the original's single-scalar buffer_deg at the
    // query-grid center.
    let mid_lat = (south + north) / 2.0;
    let buffer_deg_lat = buffer_m / METERS_PER_DEGREE;
    let buffer_deg_lon = buffer_m / (METERS_PER_DEGREE * mid_lat.to_radians().cos().max(1e-6));

    let lon_per_col = (east - west) / cols as f64;
    let lat_per_row = (north - south) / rows as f64;

    let mut data = vec![false; rows * cols];

    for row in 0..rows {
        let lat = north - (row as f64 + 0.5) * lat_per_row;
        for col in 0..cols {
            let lon = west + (col as f64 + 0.5) * lon_per_col;
            let hit = lines.iter().any(|line| {
                point_near_polyline(lat, lon, line, buffer_deg_lat, buffer_deg_lon)
            });
            if hit {
                data[row * cols + col] = true;
            }
        }
    }

    Mask { data, rows, cols }
}

/// Whether `(lat, lon)` lies within an (anisotropic) buffer ellipse of any
/// segment of `line`.
fn point_near_polyline(
    lat: f64,
    lon: f64,
    line: &[(f64, f64)],
    buffer_deg_lat: f64,
    buffer_deg_lon: f64,
) -> bool {
    if line.len() < 2 {
        return line.iter().any(|&(plat, plon)| {
            within_ellipse(lat, lon, plat, plon, buffer_deg_lat, buffer_deg_lon)
        });
    }
    line.windows(2).any(|seg| {
        let (a_lat, a_lon) = seg[0];
        let (b_lat, b_lon) = seg[1];
        segment_distance_within(lat, lon, a_lat, a_lon, b_lat, b_lon, buffer_deg_lat, buffer_deg_lon)
    })
}

fn within_ellipse(lat: f64, lon: f64, clat: f64, clon: f64, r_lat: f64, r_lon: f64) -> bool {
    let dlat = (lat - clat) / r_lat.max(1e-12);
    let dlon = (lon - clon) / r_lon.max(1e-12);
    dlat * dlat + dlon * dlon <= 1.0
}

/// Scale longitude by `r_lat / r_lon` so the buffer ellipse becomes a circle
/// in the scaled space, then do ordinary point-segment distance.
fn segment_distance_within(
    lat: f64,
    lon: f64,
    a_lat: f64,
    a_lon: f64,
    b_lat: f64,
    b_lon: f64,
    r_lat: f64,
    r_lon: f64,
) -> bool {
    let scale = r_lat.max(1e-12) / r_lon.max(1e-12);

    let px = lon * scale;
    let py = lat;
    let ax = a_lon * scale;
    let ay = a_lat;
    let bx = b_lon * scale;
    let by = b_lat;

    let abx = bx - ax;
    let aby = by - ay;
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq < 1e-18 {
        0.0
    } else {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    };

    let cx = ax + t * abx;
    let cy = ay + t * aby;

    let ddx = px - cx;
    let ddy = py - cy;
    (ddx * ddx + ddy * ddy).sqrt() <= r_lat.max(1e-12)
}
