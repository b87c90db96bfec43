//! Tabulated shape factors for the elastic compliance correction.
//!
//! The shape factor relates the far-field approach of a perfectly flat
//! indentor to its mean contact pressure, `alpha = delta * E* * L / force`,
//! and depends only on the grid count per side and the Green's function in
//! use. The pressure-kernel values below were computed with
//! [`crate::calibration::flat_shape_factor`]; the point-force values are from
//! Table 1 of Bonari et al. (2020), <https://doi.org/10.1007/s00466-019-01791-3>.

use crate::error::{ContactError, Result};
use crate::params::GreenKernel;

/// Flat-indentor shape factors for the uniform-pressure kernel, indexed by
/// grid count `n`. Index 0 is a sentinel.
const PRESSURE_BY_N: [f64; 28] = [
    -1.0,
    1.1221997046783601,
    1.0068605251532485,
    0.9613892379176019,
    0.9385553774805636,
    0.9247153424324350,
    0.9154315222403194,
    0.9087685392496161,
    0.9037519877715218,
    0.8998375318806964,
    0.8966971707662920,
    0.8941214388008705,
    0.8919702710377435,
    0.8901464435834811,
    0.8885803476015518,
    0.8872208283196537,
    0.8860294454171725,
    0.8849767510419421,
    0.8840398035738947,
    0.8832004634308468,
    0.8824441981346327,
    0.8817592274578133,
    0.8811359008070114,
    0.8805662363985260,
    0.8800435751941625,
    0.8795623175713739,
    0.8791177205270474,
    0.8787057397731856,
];

/// Point-force kernel shape factors, keyed by grid count `n = 2^k + 1`.
const FORCE_BY_N: [(usize, f64); 8] = [
    (3, 0.778958541513360),
    (5, 0.805513388666376),
    (9, 0.826126871395416),
    (17, 0.841369158110513),
    (33, 0.851733020725652),
    (65, 0.858342234203154),
    (129, 0.862368243479785),
    (257, 0.864741597831785),
];

/// Looks up the tabulated shape factor for `n` grid cells per side.
///
/// Returns [`ContactError::ShapeFactorUnavailable`] when the table has no
/// entry; the calibration module can compute one for any resolution that
/// fits in memory.
pub fn shape_factor(n: usize, kernel: GreenKernel) -> Result<f64> {
    let tabulated = match kernel {
        GreenKernel::UniformPressure => {
            (n >= 1 && n < PRESSURE_BY_N.len()).then(|| PRESSURE_BY_N[n])
        }
        GreenKernel::PointForce => FORCE_BY_N
            .iter()
            .find(|(grid, _)| *grid == n)
            .map(|(_, factor)| *factor),
    };

    tabulated.ok_or(ContactError::ShapeFactorUnavailable { n, kernel })
}
