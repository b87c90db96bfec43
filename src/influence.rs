//! Assembly of the dense influence-coefficient matrix.
//!
//! Entry `(i, j)` is the normal surface displacement at candidate `i` caused
//! by a unit load on candidate `j`, for an elastic half space. Two closed-form
//! kernels are available, selected by [`GreenKernel`].

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::params::GreenKernel;

/// Builds the dense symmetric influence matrix for one candidate set.
///
/// Symmetry is exact by construction: both orderings of a pair evaluate the
/// kernel on the same canonicalized offsets, so `H(i, j)` and `H(j, i)` are
/// the identical floating-point computation. Assembly parallelizes over the
/// columns of the (column-major) storage.
pub fn assemble_influence_matrix(
    xs: &[f64],
    ys: &[f64],
    grid_size: f64,
    composite_youngs: f64,
    kernel: GreenKernel,
) -> DMatrix<f64> {
    let n0 = xs.len();
    debug_assert_eq!(ys.len(), n0);

    let mut matrix = DMatrix::zeros(n0, n0);
    if n0 == 0 {
        return matrix;
    }

    let half = 0.5 * grid_size;
    match kernel {
        GreenKernel::UniformPressure => {
            let coeff = 1.0 / (std::f64::consts::PI * composite_youngs);
            matrix
                .as_mut_slice()
                .par_chunks_mut(n0)
                .enumerate()
                .for_each(|(j, column)| {
                    for (i, entry) in column.iter_mut().enumerate() {
                        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
                        *entry = uniform_pressure_entry(
                            xs[lo] - xs[hi],
                            ys[lo] - ys[hi],
                            grid_size,
                            coeff,
                        );
                    }
                });
        }
        GreenKernel::PointForce => {
            let c = 1.0 / (composite_youngs * std::f64::consts::PI * half);
            matrix
                .as_mut_slice()
                .par_chunks_mut(n0)
                .enumerate()
                .for_each(|(j, column)| {
                    for (i, entry) in column.iter_mut().enumerate() {
                        *entry = if i == j {
                            c
                        } else {
                            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                            let dx = xs[lo] - xs[hi];
                            let dy = ys[lo] - ys[hi];
                            let r = (dx * dx + dy * dy).sqrt();
                            // Distinct candidates come from distinct grid
                            // points, so r > 0 always holds here.
                            debug_assert!(r > 0.0);
                            c * (half / r).asin()
                        };
                    }
                });
        }
    }

    matrix
}

/// Displacement at offset `(dx, dy)` from a square cell of side `grid_size`
/// carrying unit uniform pressure, after Pohrt and Li (2014), eq. 12.
///
/// The `(1 - nu) / (2 pi G)` prefactor of the paper is folded into `coeff`
/// as `1 / (pi E*)`. The geometric construction keeps every logarithm
/// argument strictly positive, including the coincident self term.
fn uniform_pressure_entry(dx: f64, dy: f64, grid_size: f64, coeff: f64) -> f64 {
    let k = dx + 0.5 * grid_size;
    let l = k - grid_size;
    let m = dy + 0.5 * grid_size;
    let n = m - grid_size;

    coeff
        * (k * ((((k * k + m * m).sqrt() + m) / ((k * k + n * n).sqrt() + n)).ln())
            + l * ((((l * l + n * n).sqrt() + n) / ((l * l + m * m).sqrt() + m)).ln())
            + m * ((((m * m + k * k).sqrt() + k) / ((m * m + l * l).sqrt() + l)).ln())
            + n * ((((n * n + l * l).sqrt() + l) / ((n * n + k * k).sqrt() + k)).ln()))
}
