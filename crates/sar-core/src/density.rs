//! Density reduction (C7): final agent positions to a smoothed probability
//! surface.
//!
//! Grounded in `SARSimulator._agents_to_grid` / `_agents_to_heatmap`: bin
//! final positions into a 2-D histogram, Gaussian-smooth it, then normalize
//! so the peak cell is exactly `1.0`. The coarse output grid and the
//! full-resolution heatmap share this pipeline but use different smoothing
//! widths — the heatmap is meant for dense visual rendering, the grid for a
//! compact API response.
use crate::agent::Agent;
use serde::{Deserialize, Serialize};

/// Smoothing width, in grid cells, for the compact output grid.
pub const GRID_SIGMA_CELLS: f64 = 0.5;
/// Smoothing width, in grid cells, for the full-resolution heatmap.
pub const HEATMAP_SIGMA_CELLS: f64 = 1.5;
/// Heatmap points below this normalized value are dropped entirely.
pub const HEATMAP_MIN_VALUE: f64 = 1e-4;

/// A normalized probability surface over a geographic bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityGrid {
    /// Row-major, `rows * cols` entries, normalized so the maximum is `1.0`
    /// (or all-zero if no agent ever lands inside `bounds`).
    pub data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
    pub bounds: (f64, f64, f64, f64),
}

impl ProbabilityGrid {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }
}

/// A single point of the sparse heatmap representation: a geographic
/// coordinate and its normalized density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

fn histogram(agents: &[Agent], bounds: (f64, f64, f64, f64), rows: usize, cols: usize) -> Vec<f64> {
    let (west, south, east, north) = bounds;
    let mut data = vec![0.0; rows * cols];

    for agent in agents {
        if agent.lat < south || agent.lat > north || agent.lon < west || agent.lon > east {
            continue;
        }
        let col = (((agent.lon - west) / (east - west)) * cols as f64)
            .floor()
            .clamp(0.0, (cols - 1) as f64) as usize;
        let row = (((north - agent.lat) / (north - south)) * rows as f64)
            .floor()
            .clamp(0.0, (rows - 1) as f64) as usize;
        data[row * cols + col] += 1.0;
    }

    data
}

/// Truncated discrete Gaussian kernel, normalized to sum to `1.0`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (sigma * 3.0).ceil().max(1.0) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    if sum > 0.0 {
        kernel.iter_mut().for_each(|v| *v /= sum);
    }
    kernel
}

/// Separable 2-D convolution: one pass along rows, one along columns, with
/// zero-padding at the edges (mass that falls outside the grid is lost,
/// matching `scipy.ndimage.gaussian_filter`'s default for a bounded region
/// small relative to its kernel).
fn smooth(data: &[f64], rows: usize, cols: usize, sigma: f64) -> Vec<f64> {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = k as isize - radius;
                let cc = c as isize + offset;
                if cc >= 0 && (cc as usize) < cols {
                    acc += data[r * cols + cc as usize] * w;
                }
            }
            horizontal[r * cols + c] = acc;
        }
    }

    let mut result = vec![0.0; rows * cols];
    for c in 0..cols {
        for r in 0..rows {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = k as isize - radius;
                let rr = r as isize + offset;
                if rr >= 0 && (rr as usize) < rows {
                    acc += horizontal[rr as usize * cols + c] * w;
                }
            }
            result[r * cols + c] = acc;
        }
    }

    result
}

fn normalize_max(data: &mut [f64]) {
    let max = data.iter().cloned().fold(0.0_f64, f64::max);
    if max > 0.0 {
        data.iter_mut().for_each(|v| *v /= max);
    }
}

/// Reduce final agent positions to a compact, normalized probability grid.
pub fn reduce_to_grid(agents: &[Agent], bounds: (f64, f64, f64, f64), grid_size: usize) -> ProbabilityGrid {
    let mut data = histogram(agents, bounds, grid_size, grid_size);
    data = smooth(&data, grid_size, grid_size, GRID_SIGMA_CELLS);
    normalize_max(&mut data);
    ProbabilityGrid { data, rows: grid_size, cols: grid_size, bounds }
}

/// Reduce final agent positions to a sparse, full-resolution heatmap: only
/// cells whose normalized value exceeds [`HEATMAP_MIN_VALUE`] are emitted.
pub fn reduce_to_heatmap(
    agents: &[Agent],
    bounds: (f64, f64, f64, f64),
    resolution: usize,
) -> Vec<HeatmapPoint> {
    let mut data = histogram(agents, bounds, resolution, resolution);
    data = smooth(&data, resolution, resolution, HEATMAP_SIGMA_CELLS);
    normalize_max(&mut data);

    let (west, south, east, north) = bounds;
    let lat_per_row = (north - south) / resolution as f64;
    let lon_per_col = (east - west) / resolution as f64;

    let mut points = Vec::new();
    for row in 0..resolution {
        for col in 0..resolution {
            let value = data[row * resolution + col];
            if value > HEATMAP_MIN_VALUE {
                let lat = north - (row as f64 + 0.5) * lat_per_row;
                let lon = west + (col as f64 + 0.5) * lon_per_col;
                points.push(HeatmapPoint { lat, lon, value });
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Strategy;

    fn agent_at(id: u32, lat: f64, lon: f64) -> Agent {
        Agent {
            id,
            lat,
            lon,
            elevation: 0.0,
            strategy: Strategy::RandomWalking,
            heading: 0.0,
            steps_taken: 0,
            energy: 1.0,
            is_active: true,
        }
    }

    #[test]
    fn empty_population_yields_all_zero_grid() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let grid = reduce_to_grid(&[], bounds, 10);
        assert!(grid.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn peak_cell_normalizes_to_one() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let agents: Vec<Agent> = (0..50).map(|i| agent_at(i, 0.0, 0.0)).collect();
        let grid = reduce_to_grid(&agents, bounds, 20);
        let max = grid.data.iter().cloned().fold(0.0_f64, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_bounds_agents_are_dropped_not_clamped() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let agents = vec![agent_at(0, 5.0, 5.0)];
        let grid = reduce_to_grid(&agents, bounds, 10);
        assert!(grid.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn smoothing_spreads_density_to_neighboring_cells() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let agents: Vec<Agent> = (0..200).map(|i| agent_at(i, 0.0, 0.0)).collect();
        let grid = reduce_to_grid(&agents, bounds, 20);
        let (center_row, center_col) = (10, 10);
        assert!(grid.get(center_row, center_col) > grid.get(center_row, center_col + 2));
        assert!(grid.get(center_row, center_col + 1) > 0.0);
    }

    #[test]
    fn heatmap_drops_negligible_cells() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let agents: Vec<Agent> = (0..50).map(|i| agent_at(i, 0.0, 0.0)).collect();
        let points = reduce_to_heatmap(&agents, bounds, 40);
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.value > HEATMAP_MIN_VALUE));
        assert!(points.iter().any(|p| (p.value - 1.0).abs() < 1e-6));
    }
}
