//! Prediction of the candidate contact set from the current gap geometry.

use nalgebra::DVector;
use rayon::prelude::*;

use crate::topology::HeightField;

/// Grid points predicted to be in or near contact for one outer iteration.
///
/// Rebuilt from scratch at every prediction; the parallel arrays share the
/// candidate ordering (grid order, row-major).
#[derive(Clone, Debug)]
pub struct CandidateSet {
    grid_indices: Vec<usize>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    rhs: DVector<f64>,
}

impl CandidateSet {
    /// Number of candidate points.
    pub fn len(&self) -> usize {
        self.grid_indices.len()
    }

    /// True when no grid point satisfies the contact criterion.
    pub fn is_empty(&self) -> bool {
        self.grid_indices.is_empty()
    }

    /// Linear (row-major) grid indices of the candidates.
    pub fn grid_indices(&self) -> &[usize] {
        &self.grid_indices
    }

    /// x coordinates of the candidates.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// y coordinates of the candidates.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Prescribed surface displacements `b0` at the candidates.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }
}

/// Selects every grid point that might be in contact for the current gap.
///
/// With `delta_contact = delta + elastic_displacement - zmax`, a point
/// qualifies when `height(i, j) >= -delta_contact`, and its prescribed
/// displacement is `b0 = height(i, j) + delta_contact`. The candidate count
/// is data-dependent, so the grid is counted before the output arrays are
/// allocated. An empty set (no contact) and the full grid are both valid.
pub fn predict_contact_set(
    field: &HeightField,
    meshgrid: &[f64],
    zmax: f64,
    delta: f64,
    elastic_displacement: f64,
) -> CandidateSet {
    let n = field.grid_count();
    debug_assert_eq!(meshgrid.len(), n);

    let delta_contact = delta + elastic_displacement - zmax;
    let heights = field.heights();

    let n0 = (0..n * n)
        .into_par_iter()
        .filter(|&a| heights[(a / n, a % n)] >= -delta_contact)
        .count();

    let mut grid_indices = Vec::with_capacity(n0);
    let mut xs = Vec::with_capacity(n0);
    let mut ys = Vec::with_capacity(n0);
    let mut rhs = Vec::with_capacity(n0);

    for i in 0..n {
        for j in 0..n {
            let z = heights[(i, j)];
            if z >= -delta_contact {
                grid_indices.push(i * n + j);
                xs.push(meshgrid[i]);
                ys.push(meshgrid[j]);
                rhs.push(z + delta_contact);
            }
        }
    }

    CandidateSet {
        grid_indices,
        xs,
        ys,
        rhs: DVector::from_vec(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::create_meshgrid;
    use nalgebra::DMatrix;

    #[test]
    fn selects_only_points_above_the_contact_plane() {
        // zmax = 4, delta = 1, w_el = 0 -> threshold height >= 3.
        let field = HeightField::from_matrix(DMatrix::from_row_slice(
            2,
            2,
            &[4.0, 2.0, 3.5, 1.0],
        ))
        .unwrap();
        let meshgrid = create_meshgrid(2, 0.5);

        let set = predict_contact_set(&field, &meshgrid, 4.0, 1.0, 0.0);

        assert_eq!(set.len(), 2);
        assert_eq!(set.grid_indices(), &[0, 2]);
        assert_eq!(set.xs(), &[0.25, 0.75]);
        assert_eq!(set.ys(), &[0.25, 0.25]);
        // b0 = height + (delta - zmax) = height - 3.
        assert!((set.rhs()[0] - 1.0).abs() < 1e-15);
        assert!((set.rhs()[1] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn small_approach_keeps_only_the_summit() {
        let field = HeightField::from_matrix(DMatrix::from_row_slice(
            2,
            2,
            &[4.0, 2.0, 3.5, 1.0],
        ))
        .unwrap();
        let meshgrid = create_meshgrid(2, 0.5);

        // zmax - height > delta everywhere except at the summit itself.
        let set = predict_contact_set(&field, &meshgrid, 4.0, 0.25, 0.0);
        assert_eq!(set.grid_indices(), &[0]);
    }

    #[test]
    fn receding_gap_yields_an_empty_set() {
        let field = HeightField::from_matrix(DMatrix::from_row_slice(
            2,
            2,
            &[4.0, 2.0, 3.5, 1.0],
        ))
        .unwrap();
        let meshgrid = create_meshgrid(2, 0.5);

        let set = predict_contact_set(&field, &meshgrid, 4.0, -1.0, 0.0);
        assert!(set.is_empty());
        assert_eq!(set.rhs().len(), 0);
    }

    #[test]
    fn flat_field_puts_the_whole_grid_in_contact() {
        let field = HeightField::flat(3).unwrap();
        let meshgrid = create_meshgrid(3, 1.0);
        let set = predict_contact_set(&field, &meshgrid, 0.0, 0.1, 0.0);
        assert_eq!(set.len(), 9);
    }
}
