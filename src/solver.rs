//! Active-set solver for the non-negative contact pressure problem.
//!
//! Solves `min ||H p - b0||` subject to `p >= 0` with the active-set pivoting
//! scheme of Bemporad and Paggi (2015), Algorithm 3: grow the active set one
//! index at a time from the most violated complementary-slackness residual,
//! solve the unconstrained dense system on the active set, and walk back along
//! the feasible segment whenever the unconstrained solution turns a pressure
//! negative. The set mutations are strictly sequential; the argmin searches,
//! the compaction of the index arena, and the residual products parallelize.

use log::debug;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ContactError, Result};

/// Configuration for the active-set pressure solver.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    /// Gates both the complementary-slackness test and the ratio-test
    /// negativity test; sharing one tolerance between the two is intentional.
    pub tolerance: f64,
    /// Budget of inner (pivoting) iterations before giving up.
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-8,
            max_iterations: 10_000,
        }
    }
}

/// Diagnostics returned alongside the pressure vector.
#[derive(Clone, Copy, Debug)]
pub struct SolverSummary {
    /// Number of inner iterations performed (dense solves).
    pub iterations: usize,
    /// Cardinality of the final active set.
    pub active_set_size: usize,
    /// False when the iteration budget ran out before the optimality test
    /// passed; the pressure vector is then best-effort, not optimal.
    pub converged: bool,
}

/// Index arena of all candidates, split into an active prefix and an
/// inactive suffix.
///
/// The split point is the only state distinguishing the two sets; indices
/// cross it by position swap, one per solver iteration, and are never copied
/// into a second container.
#[derive(Clone, Debug)]
pub struct ActivePartition {
    order: Vec<usize>,
    active_len: usize,
}

impl ActivePartition {
    /// Partitions `0..n0` by the initial pressure guess: indices with
    /// `p[i] >= tolerance` form the active prefix. The pass is parallel, with
    /// one atomically-incremented position counter per half (active slots
    /// fill from the front, inactive from the back).
    pub fn from_pressures(pressures: &DVector<f64>, tolerance: f64) -> Self {
        let n0 = pressures.len();
        let slots: Vec<AtomicUsize> = (0..n0).map(|_| AtomicUsize::new(0)).collect();
        let head = AtomicUsize::new(0);
        let tail = AtomicUsize::new(0);

        pressures
            .as_slice()
            .par_iter()
            .enumerate()
            .for_each(|(index, &value)| {
                if value >= tolerance {
                    let slot = head.fetch_add(1, Ordering::Relaxed);
                    slots[slot].store(index, Ordering::Relaxed);
                } else {
                    let slot = tail.fetch_add(1, Ordering::Relaxed);
                    slots[n0 - 1 - slot].store(index, Ordering::Relaxed);
                }
            });

        Self {
            order: slots.into_iter().map(AtomicUsize::into_inner).collect(),
            active_len: head.into_inner(),
        }
    }

    /// Total number of candidates in the arena.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the arena holds no candidates at all.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Size of the active prefix.
    pub fn active_len(&self) -> usize {
        self.active_len
    }

    /// Candidate indices currently assumed in contact.
    pub fn active(&self) -> &[usize] {
        &self.order[..self.active_len]
    }

    /// Candidate indices currently assumed out of contact.
    pub fn inactive(&self) -> &[usize] {
        &self.order[self.active_len..]
    }

    /// Moves the inactive entry at `offset` (position within the suffix)
    /// into the active prefix.
    fn activate(&mut self, offset: usize) {
        self.order.swap(self.active_len + offset, self.active_len);
        self.active_len += 1;
    }

    /// Moves the active entry at `position` (position within the prefix)
    /// into the inactive suffix.
    fn deactivate(&mut self, position: usize) {
        self.active_len -= 1;
        self.order.swap(position, self.active_len);
    }
}

/// Associative reduction operator for argmin-with-location: compare by value,
/// carry the position along. Ties keep the left operand.
fn smaller_by_value(a: (f64, usize), b: (f64, usize)) -> (f64, usize) {
    if b.0 < a.0 {
        b
    } else {
        a
    }
}

/// Solves the constrained contact system for non-negative pressures.
///
/// `influence` is the symmetric candidate influence matrix, `rhs` the
/// prescribed surface displacements, and `initial_pressures` the starting
/// guess (all zeros, or a warm start carried over from a previous solve).
///
/// Budget exhaustion is reported through [`SolverSummary::converged`], not as
/// an error; a singular active sub-matrix is fatal for the solve.
pub fn solve_contact_pressures(
    influence: &DMatrix<f64>,
    rhs: &DVector<f64>,
    initial_pressures: DVector<f64>,
    options: &SolverOptions,
) -> Result<(DVector<f64>, SolverSummary)> {
    let n0 = rhs.len();
    if influence.nrows() != n0 || influence.ncols() != n0 {
        return Err(ContactError::dimension_mismatch(
            "influence matrix order",
            n0,
            influence.nrows(),
        ));
    }
    if initial_pressures.len() != n0 {
        return Err(ContactError::dimension_mismatch(
            "initial pressure length",
            n0,
            initial_pressures.len(),
        ));
    }
    if options.tolerance <= 0.0 {
        return Err(ContactError::non_positive(
            "solver tolerance",
            options.tolerance,
        ));
    }

    let tolerance = options.tolerance;
    let mut p = initial_pressures;
    let mut partition = ActivePartition::from_pressures(&p, tolerance);
    let mut w = DVector::zeros(n0);

    // With an empty active set the first solve is trivial: w = H p - b0 = -b0.
    let mut initialized = partition.active_len() == 0;
    if initialized {
        w.as_mut_slice()
            .par_iter_mut()
            .zip(rhs.as_slice().par_iter())
            .for_each(|(wi, bi)| *wi = -bi);
    }

    let mut iterations = 0usize;
    let mut converged = false;

    'outer: while iterations < options.max_iterations {
        if initialized {
            if partition.active_len() == n0 {
                converged = true;
                break;
            }

            let (min_w, offset) = partition
                .inactive()
                .par_iter()
                .enumerate()
                .map(|(offset, &index)| (w[index], offset))
                .reduce(|| (f64::INFINITY, usize::MAX), smaller_by_value);

            if min_w >= -tolerance {
                converged = true;
                break;
            }
            partition.activate(offset);
        } else {
            // Warm-started entry: the initial active set is trialled as-is
            // before any pivoting.
            initialized = true;
        }

        loop {
            iterations += 1;

            let s = solve_active_system(influence, rhs, partition.active())?;

            let feasible = s.as_slice().par_iter().all(|&value| value >= -tolerance);
            if feasible {
                for (position, &index) in partition.active().iter().enumerate() {
                    p[index] = s[position].max(0.0);
                }
                recompute_residual(&mut w, influence, rhs, partition.active(), &s);
                break;
            }

            // Longest feasible step towards s: alpha = min p_i / (p_i - s_i)
            // over active entries pulled negative, guarded against a zero
            // denominator by machine epsilon.
            let (alpha, alpha_position) = partition
                .active()
                .par_iter()
                .enumerate()
                .filter(|(position, _)| s[*position] <= 0.0)
                .map(|(position, &index)| {
                    (p[index] / (f64::EPSILON + p[index] - s[position]), position)
                })
                .reduce(|| (f64::INFINITY, usize::MAX), smaller_by_value);

            for (position, &index) in partition.active().iter().enumerate() {
                p[index] += alpha * (s[position] - p[index]);
            }

            if alpha_position != usize::MAX {
                let index = partition.active()[alpha_position];
                p[index] = 0.0;
                partition.deactivate(alpha_position);
            }

            if partition.active_len() == 0 {
                // Every trial index was walked back out; restart the outer
                // loop from an empty active set.
                break;
            }
            if iterations >= options.max_iterations {
                break 'outer;
            }
        }
    }

    let summary = SolverSummary {
        iterations,
        active_set_size: partition.active_len(),
        converged,
    };
    debug!(
        "pressure solve: n0={n0}, iterations={}, active={}, converged={}",
        summary.iterations, summary.active_set_size, summary.converged
    );

    Ok((p, summary))
}

/// Dense pivoted solve of the compacted active system `H_A s = b0_A`.
///
/// The single-index case is closed-form division; larger systems gather the
/// active rows and columns in parallel and go through an LU factorization
/// with partial pivoting.
fn solve_active_system(
    influence: &DMatrix<f64>,
    rhs: &DVector<f64>,
    active: &[usize],
) -> Result<DVector<f64>> {
    let k = active.len();
    debug_assert!(k > 0);

    if k == 1 {
        let index = active[0];
        let diagonal = influence[(index, index)];
        if diagonal == 0.0 {
            return Err(ContactError::singular(1));
        }
        return Ok(DVector::from_element(1, rhs[index] / diagonal));
    }

    let mut compact = DMatrix::zeros(k, k);
    compact
        .as_mut_slice()
        .par_chunks_mut(k)
        .enumerate()
        .for_each(|(j, column)| {
            let source_column = active[j];
            for (i, entry) in column.iter_mut().enumerate() {
                *entry = influence[(active[i], source_column)];
            }
        });
    let compact_rhs = DVector::from_fn(k, |i, _| rhs[active[i]]);

    compact
        .lu()
        .solve(&compact_rhs)
        .ok_or_else(|| ContactError::singular(k))
}

/// Refreshes the full residual `w = H p - b0`, using only the active columns
/// (inactive pressures are zero by construction).
fn recompute_residual(
    w: &mut DVector<f64>,
    influence: &DMatrix<f64>,
    rhs: &DVector<f64>,
    active: &[usize],
    active_pressures: &DVector<f64>,
) {
    w.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, wi)| {
            let mut sum = 0.0;
            for (position, &index) in active.iter().enumerate() {
                sum += influence[(i, index)] * active_pressures[position];
            }
            *wi = sum - rhs[i];
        });
}
