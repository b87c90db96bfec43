//! Warm starting a solve from the previous step's converged active set.

use std::collections::HashMap;

use nalgebra::DVector;

/// Builds an initial pressure guess for a new candidate set by carrying over
/// the pressures of the previous active set.
///
/// A new candidate inherits a pressure exactly when its coordinates match a
/// previous active coordinate bit-for-bit; every other candidate starts at
/// zero. Both steps draw their coordinates from the same meshgrid, so the
/// exact-equality lookup is reliable rather than approximate.
pub fn warmstart(
    candidate_xs: &[f64],
    candidate_ys: &[f64],
    previous_xs: &[f64],
    previous_ys: &[f64],
    previous_pressures: &[f64],
) -> DVector<f64> {
    debug_assert_eq!(candidate_xs.len(), candidate_ys.len());
    debug_assert_eq!(previous_xs.len(), previous_ys.len());
    debug_assert_eq!(previous_xs.len(), previous_pressures.len());

    let mut carried: HashMap<(u64, u64), f64> = HashMap::with_capacity(previous_xs.len());
    for ((&x, &y), &pressure) in previous_xs
        .iter()
        .zip(previous_ys)
        .zip(previous_pressures)
    {
        carried.insert((x.to_bits(), y.to_bits()), pressure);
    }

    DVector::from_iterator(
        candidate_xs.len(),
        candidate_xs.iter().zip(candidate_ys).map(|(&x, &y)| {
            carried
                .get(&(x.to_bits(), y.to_bits()))
                .copied()
                .unwrap_or(0.0)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_pressures_only_for_exact_coordinate_matches() {
        let previous_xs = [1.5, 2.5];
        let previous_ys = [0.5, 0.5];
        let previous_pressures = [10.0, 20.0];

        // The new prediction kept (1.5, 0.5), dropped (2.5, 0.5), and added
        // two fresh points.
        let candidate_xs = [0.5, 1.5, 3.5];
        let candidate_ys = [0.5, 0.5, 0.5];

        let seed = warmstart(
            &candidate_xs,
            &candidate_ys,
            &previous_xs,
            &previous_ys,
            &previous_pressures,
        );

        assert_eq!(seed.len(), 3);
        assert_eq!(seed[0], 0.0);
        assert_eq!(seed[1], 10.0);
        assert_eq!(seed[2], 0.0);
    }

    #[test]
    fn empty_previous_set_seeds_zeros() {
        let seed = warmstart(&[0.5, 1.5], &[0.5, 0.5], &[], &[], &[]);
        assert!(seed.iter().all(|&p| p == 0.0));
    }
}
