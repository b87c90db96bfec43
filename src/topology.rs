//! Surface height fields and the coordinate grid they live on.

use std::path::Path;

use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::error::{ContactError, Result};

/// Immutable square grid of surface heights, micrometers.
///
/// The field describes the sum topography of the two contacting surfaces;
/// it is read-only for the duration of one evaluation.
#[derive(Clone, Debug)]
pub struct HeightField {
    heights: DMatrix<f64>,
}

impl HeightField {
    /// Wraps an existing square height matrix.
    pub fn from_matrix(heights: DMatrix<f64>) -> Result<Self> {
        if heights.nrows() == 0 {
            return Err(ContactError::dimension_mismatch("height field rows", 1, 0));
        }
        if heights.nrows() != heights.ncols() {
            return Err(ContactError::dimension_mismatch(
                "height field columns",
                heights.nrows(),
                heights.ncols(),
            ));
        }
        Ok(Self { heights })
    }

    /// Creates a perfectly flat field of `n` by `n` points at height zero.
    pub fn flat(n: usize) -> Result<Self> {
        Self::from_matrix(DMatrix::zeros(n, n))
    }

    /// Reads a whitespace-separated square grid of heights from a file.
    ///
    /// The grid count is inferred from the file: every non-empty line is one
    /// row, and the number of rows must equal the number of columns.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ContactError::TopologyIo {
            path: path.display().to_string(),
            source,
        })?;

        let format_error = |line: usize, reason: &'static str| ContactError::TopologyFormat {
            path: path.display().to_string(),
            line,
            reason,
        };

        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|token| token.parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|_| format_error(index + 1, "invalid height value"))?;
            if let Some(first) = rows.first() {
                if row.len() != first.len() {
                    return Err(format_error(index + 1, "rows have differing lengths"));
                }
            }
            rows.push(row);
        }

        let n = rows.len();
        if n == 0 {
            return Err(format_error(1, "file contains no height rows"));
        }
        if rows[0].len() != n {
            return Err(format_error(1, "height grid is not square"));
        }

        let heights = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::from_matrix(heights)
    }

    /// Generates a self-affine fractal surface with the random-midpoint
    /// displacement algorithm.
    ///
    /// The grid has `2^resolution + 1` points per side. `hurst_exponent`
    /// controls how quickly the displacement amplitude decays under grid
    /// refinement; `initial_std_deviation` scales the corner heights. A fixed
    /// `seed` makes the surface reproducible.
    pub fn random_midpoint(
        resolution: u32,
        initial_std_deviation: f64,
        hurst_exponent: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if initial_std_deviation <= 0.0 {
            return Err(ContactError::non_positive(
                "initial standard deviation",
                initial_std_deviation,
            ));
        }
        if hurst_exponent <= 0.0 {
            return Err(ContactError::non_positive("Hurst exponent", hurst_exponent));
        }

        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let mut normal = move || -> f64 { rng.sample(StandardNormal) };

        let n = (1usize << resolution) + 1;
        let mut heights = DMatrix::zeros(n, n);

        let mut amplitude = initial_std_deviation;
        for &(i, j) in &[(0, 0), (0, n - 1), (n - 1, 0), (n - 1, n - 1)] {
            heights[(i, j)] = amplitude * normal();
        }

        let mut step = n - 1;
        while step > 1 {
            let half = step / 2;
            amplitude *= 0.5_f64.powf(hurst_exponent);

            // Diamond pass: cell centres from the four surrounding corners.
            for i in (half..n).step_by(step) {
                for j in (half..n).step_by(step) {
                    let mean = (heights[(i - half, j - half)]
                        + heights[(i - half, j + half)]
                        + heights[(i + half, j - half)]
                        + heights[(i + half, j + half)])
                        / 4.0;
                    heights[(i, j)] = mean + amplitude * normal();
                }
            }

            // Square pass: edge midpoints from their in-bounds axial neighbours.
            for i in (0..n).step_by(half) {
                let start = if (i / half) % 2 == 0 { half } else { 0 };
                for j in (start..n).step_by(step) {
                    let mut sum = 0.0;
                    let mut count = 0.0;
                    if i >= half {
                        sum += heights[(i - half, j)];
                        count += 1.0;
                    }
                    if i + half < n {
                        sum += heights[(i + half, j)];
                        count += 1.0;
                    }
                    if j >= half {
                        sum += heights[(i, j - half)];
                        count += 1.0;
                    }
                    if j + half < n {
                        sum += heights[(i, j + half)];
                        count += 1.0;
                    }
                    heights[(i, j)] = sum / count + amplitude * normal();
                }
            }

            step = half;
        }

        Self::from_matrix(heights)
    }

    /// Grid points per side.
    pub fn grid_count(&self) -> usize {
        self.heights.nrows()
    }

    /// Returns a read-only view of the height matrix.
    pub fn heights(&self) -> &DMatrix<f64> {
        &self.heights
    }

    /// Height at grid point `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.heights[(i, j)]
    }

    /// Maximum and mean height over the whole field, as a parallel reduction.
    pub fn max_and_mean(&self) -> SurfaceStats {
        let (sum, max) = self
            .heights
            .as_slice()
            .par_iter()
            .map(|&z| (z, z))
            .reduce(
                || (0.0, f64::NEG_INFINITY),
                |a, b| (a.0 + b.0, a.1.max(b.1)),
            );

        SurfaceStats {
            max,
            mean: sum / (self.heights.len() as f64),
        }
    }
}

/// Aggregate height statistics used to anchor the gap-to-contact relation.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceStats {
    /// Highest summit of the field.
    pub max: f64,
    /// Mean height of the field.
    pub mean: f64,
}

/// Builds the 1-D cell-centre coordinate array shared by both spatial axes,
/// `x_i = grid_size / 2 + i * grid_size`.
pub fn create_meshgrid(n: usize, grid_size: f64) -> Vec<f64> {
    (0..n)
        .into_par_iter()
        .map(|i| grid_size / 2.0 + i as f64 * grid_size)
        .collect()
}
