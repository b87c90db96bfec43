//! Flat-indentor calibration of the compliance shape factor.
//!
//! Pressing a perfectly flat indentor of side `L` into the half space by
//! `delta` puts the whole domain in contact, so the constrained solver is
//! unnecessary and one direct dense solve yields the total force. The shape
//! factor `alpha = delta * E* * L / force` extracted this way is what the
//! tabulated values in [`crate::shape_factors`] were computed with.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::{ContactError, Result};
use crate::evaluate::integrate_force_and_area;
use crate::influence::assemble_influence_matrix;
use crate::params::GreenKernel;
use crate::topology::create_meshgrid;

/// Default byte budget for one influence matrix during calibration: 2 GiB.
pub const DEFAULT_MATRIX_BYTE_LIMIT: usize = 2 << 30;

/// Result of one flat-indentor solve.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationReport {
    /// Grid cells per side.
    pub grid_count: usize,
    /// Calibrated shape factor `delta * E* * L / force`.
    pub shape_factor: f64,
    /// Mean pressure over the nominal domain.
    pub mean_pressure: f64,
    /// Contact-area fraction; 1 for a flat topology by construction.
    pub contact_area_fraction: f64,
}

/// Solves the flat-indentor problem on an `n`-by-`n` grid.
///
/// The influence matrix needs `8 * n^4` bytes; the allocation is refused with
/// [`ContactError::MatrixTooLarge`] when it would exceed `matrix_byte_limit`,
/// which is what lets a resolution sweep stop gracefully instead of aborting.
pub fn flat_shape_factor(
    grid_count: usize,
    delta: f64,
    composite_youngs: f64,
    lateral_length: f64,
    kernel: GreenKernel,
    matrix_byte_limit: usize,
) -> Result<CalibrationReport> {
    if grid_count == 0 {
        return Err(ContactError::dimension_mismatch("grid count", 1, 0));
    }
    if delta <= 0.0 {
        return Err(ContactError::non_positive("far-field displacement", delta));
    }
    if composite_youngs <= 0.0 {
        return Err(ContactError::non_positive("composite modulus", composite_youngs));
    }
    if lateral_length <= 0.0 {
        return Err(ContactError::non_positive("lateral length", lateral_length));
    }

    let system_size = grid_count * grid_count;
    let required_bytes = system_size
        .checked_mul(system_size)
        .and_then(|entries| entries.checked_mul(std::mem::size_of::<f64>()))
        .unwrap_or(usize::MAX);
    if required_bytes > matrix_byte_limit {
        return Err(ContactError::MatrixTooLarge {
            system_size,
            required_bytes,
            limit_bytes: matrix_byte_limit,
        });
    }

    let grid_size = lateral_length / grid_count as f64;
    let meshgrid = create_meshgrid(grid_count, grid_size);

    // Every grid point is a candidate; coordinates follow grid order.
    let mut xs = Vec::with_capacity(system_size);
    let mut ys = Vec::with_capacity(system_size);
    for i in 0..grid_count {
        for j in 0..grid_count {
            xs.push(meshgrid[i]);
            ys.push(meshgrid[j]);
        }
    }

    let influence: DMatrix<f64> =
        assemble_influence_matrix(&xs, &ys, grid_size, composite_youngs, kernel);
    let rhs = DVector::from_element(system_size, delta);
    let pressures = influence
        .lu()
        .solve(&rhs)
        .ok_or_else(|| ContactError::singular(system_size))?;

    let (force, area) = integrate_force_and_area(&pressures, grid_size, kernel);
    if !(force > 0.0) {
        return Err(ContactError::NumericalError {
            context: "flat indentor force integration",
        });
    }

    let domain_area = lateral_length * lateral_length;
    let report = CalibrationReport {
        grid_count,
        shape_factor: delta * composite_youngs * lateral_length / force,
        mean_pressure: force / domain_area,
        contact_area_fraction: area / domain_area,
    };
    info!(
        "flat calibration n={grid_count}: shape factor {:.16}",
        report.shape_factor
    );
    Ok(report)
}

/// Outcome of a nominal-to-`n` calibration sweep.
#[derive(Debug)]
pub struct SweepOutcome {
    /// Reports for every resolution that completed, in ascending order.
    pub reports: Vec<CalibrationReport>,
    /// The resolution that stopped the sweep, with its error, if any.
    pub stopped: Option<(usize, ContactError)>,
}

/// Calibrates shape factors for every grid count from 1 up to
/// `max_grid_count`, stopping gracefully at the first resolution whose
/// matrix does not fit the byte budget (or whose solve fails) and returning
/// everything computed so far.
pub fn sweep_shape_factors(
    max_grid_count: usize,
    delta: f64,
    composite_youngs: f64,
    lateral_length: f64,
    kernel: GreenKernel,
    matrix_byte_limit: usize,
) -> SweepOutcome {
    let mut reports = Vec::new();
    for grid_count in 1..=max_grid_count {
        match flat_shape_factor(
            grid_count,
            delta,
            composite_youngs,
            lateral_length,
            kernel,
            matrix_byte_limit,
        ) {
            Ok(report) => reports.push(report),
            Err(error) => {
                warn!("calibration sweep stopped at n={grid_count}: {error}");
                return SweepOutcome {
                    reports,
                    stopped: Some((grid_count, error)),
                };
            }
        }
    }
    SweepOutcome {
        reports,
        stopped: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape_factors::shape_factor;

    #[test]
    fn single_cell_pressure_calibration_matches_the_table() {
        let report = flat_shape_factor(
            1,
            1.0,
            1.0e6,
            100.0,
            GreenKernel::UniformPressure,
            DEFAULT_MATRIX_BYTE_LIMIT,
        )
        .unwrap();

        let tabulated = shape_factor(1, GreenKernel::UniformPressure).unwrap();
        assert!((report.shape_factor - tabulated).abs() < 1e-12);
        assert!((report.contact_area_fraction - 1.0).abs() < 1e-12);

        // Mean pressure of the flat problem: delta * E* / (L * alpha).
        let expected = 1.0 * 1.0e6 / (100.0 * tabulated);
        assert!((report.mean_pressure - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn small_grids_reproduce_the_tabulated_pressure_factors() {
        for n in [2usize, 3, 4, 5] {
            let report = flat_shape_factor(
                n,
                2.0,
                5.0e5,
                40.0,
                GreenKernel::UniformPressure,
                DEFAULT_MATRIX_BYTE_LIMIT,
            )
            .unwrap();
            let tabulated = shape_factor(n, GreenKernel::UniformPressure).unwrap();
            assert!(
                (report.shape_factor - tabulated).abs() < 1e-9,
                "n = {n}: {} vs {tabulated}",
                report.shape_factor
            );
        }
    }

    #[test]
    fn single_point_force_factor_is_two_over_pi() {
        // One point load: H = 1/(E* pi h/2), force = delta / H, so
        // alpha = delta E* L / force = 2 / pi for L = h.
        let report = flat_shape_factor(
            1,
            1.0,
            1.0e6,
            10.0,
            GreenKernel::PointForce,
            DEFAULT_MATRIX_BYTE_LIMIT,
        )
        .unwrap();
        assert!((report.shape_factor - 2.0 / std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn sweep_stops_gracefully_at_the_byte_budget() {
        // n = 3 needs 8 * 81 = 648 bytes; cap below that.
        let outcome = sweep_shape_factors(
            5,
            1.0,
            1.0e6,
            100.0,
            GreenKernel::UniformPressure,
            600,
        );

        assert_eq!(outcome.reports.len(), 2);
        let (stopped_at, error) = outcome.stopped.expect("sweep must stop");
        assert_eq!(stopped_at, 3);
        assert!(matches!(error, ContactError::MatrixTooLarge { .. }));
    }
}
