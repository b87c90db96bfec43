//! High-level evaluation pipeline: predict, assemble, solve, integrate.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{ContactError, Result};
use crate::influence::assemble_influence_matrix;
use crate::params::{ContactParameters, GreenKernel};
use crate::predictor::predict_contact_set;
use crate::solver::{solve_contact_pressures, SolverOptions, SolverSummary};
use crate::topology::{create_meshgrid, HeightField};
use crate::warmstart::warmstart;

/// One contact evaluation: parameters plus the surface they apply to.
#[derive(Clone, Debug)]
pub struct ContactProblem {
    params: ContactParameters,
    topology: HeightField,
    meshgrid: Vec<f64>,
}

impl ContactProblem {
    /// Pairs a parameter record with a height field of matching resolution.
    pub fn new(params: ContactParameters, topology: HeightField) -> Result<Self> {
        if topology.grid_count() != params.grid_count {
            return Err(ContactError::dimension_mismatch(
                "height field resolution",
                params.grid_count,
                topology.grid_count(),
            ));
        }
        let meshgrid = create_meshgrid(params.grid_count, params.grid_size);
        Ok(Self {
            params,
            topology,
            meshgrid,
        })
    }

    /// Accessor for the resolved parameters.
    pub fn parameters(&self) -> &ContactParameters {
        &self.params
    }

    /// Accessor for the surface height field.
    pub fn topology(&self) -> &HeightField {
        &self.topology
    }

    /// The shared cell-centre coordinate array.
    pub fn meshgrid(&self) -> &[f64] {
        &self.meshgrid
    }

    /// Runs the full evaluation for the configured far-field displacement.
    ///
    /// Outer loop: predict the candidate contact set from the current gap
    /// (including the elastic compliance displacement fed back from the last
    /// pass), assemble the influence matrix, solve for non-negative
    /// pressures, and integrate force and area, until the relative force
    /// change drops below the configured tolerance or the pass budget runs
    /// out. Non-convergence of either loop is flagged on the report, never
    /// silently accepted.
    pub fn evaluate(&self) -> Result<ContactSolution> {
        self.evaluate_with_displacement(self.params.delta)
    }

    /// Same as [`evaluate`](Self::evaluate) but for an explicit far-field
    /// displacement, for approach sweeps over one topology.
    pub fn evaluate_with_displacement(&self, delta: f64) -> Result<ContactSolution> {
        if delta < 0.0 {
            return Err(ContactError::non_positive("far-field displacement", delta));
        }

        let params = &self.params;
        let stats = self.topology.max_and_mean();
        let solver_options = SolverOptions {
            max_iterations: params.max_iterations,
            ..SolverOptions::default()
        };
        let domain_area = params.lateral_length * params.lateral_length;

        let mut elastic_displacement = 0.0;
        let mut previous_force = 0.0;
        let mut previous_active: Option<ActiveState> = None;
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut last: Option<(Vec<usize>, DVector<f64>, SolverSummary)> = None;
        let mut outer_converged = false;

        for pass in 0..params.max_outer_iterations.max(1) {
            let candidates = predict_contact_set(
                &self.topology,
                &self.meshgrid,
                stats.max,
                delta,
                elastic_displacement,
            );

            if candidates.is_empty() {
                // No grid point can touch: the zero solution is exact and no
                // linear system is ever formed.
                return Ok(ContactSolution::no_contact(
                    params.grid_count,
                    history,
                    pass + 1,
                ));
            }

            let influence = assemble_influence_matrix(
                candidates.xs(),
                candidates.ys(),
                params.grid_size,
                params.composite_youngs,
                params.kernel,
            );

            let initial = match (&previous_active, params.warm_start) {
                (Some(state), true) => warmstart(
                    candidates.xs(),
                    candidates.ys(),
                    &state.xs,
                    &state.ys,
                    &state.pressures,
                ),
                _ => DVector::zeros(candidates.len()),
            };

            let (pressures, summary) =
                solve_contact_pressures(&influence, candidates.rhs(), initial, &solver_options)?;

            let (force, area) = integrate_force_and_area(&pressures, params.grid_size, params.kernel);
            elastic_displacement = force / params.elastic_compliance_correction;

            let relative_change = if force > 0.0 {
                ((force - previous_force) / force).abs()
            } else if previous_force == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };

            history.push(IterationRecord {
                total_force: force,
                contact_area: area,
                solver_iterations: summary.iterations,
                active_set_size: summary.active_set_size,
            });
            info!(
                "pass {pass}: candidates={}, force={force:.6e}, area={area:.6e}, \
                 relative change={relative_change:.3e}",
                candidates.len()
            );

            previous_active = Some(ActiveState::from_solution(
                candidates.xs(),
                candidates.ys(),
                &pressures,
            ));
            previous_force = force;
            last = Some((candidates.grid_indices().to_vec(), pressures, summary));

            if relative_change < params.tolerance {
                outer_converged = true;
                break;
            }
        }

        let (candidate_grid_indices, pressures, summary) =
            last.expect("at least one outer pass ran");
        let active_grid_indices: Vec<usize> = candidate_grid_indices
            .iter()
            .zip(pressures.iter())
            .filter(|(_, &p)| p > 0.0)
            .map(|(&index, _)| index)
            .collect();

        let (total_force, contact_area) =
            integrate_force_and_area(&pressures, params.grid_size, params.kernel);

        if !outer_converged || !summary.converged {
            warn!(
                "contact evaluation did not fully converge \
                 (outer={outer_converged}, solver={}); report is provisional",
                summary.converged
            );
        }

        Ok(ContactSolution {
            grid_count: params.grid_count,
            pressures,
            candidate_grid_indices,
            active_grid_indices,
            total_force,
            mean_pressure: total_force / domain_area,
            contact_area_fraction: contact_area / domain_area,
            outer_iterations: history.len(),
            converged: outer_converged,
            solver_converged: summary.converged,
            history,
        })
    }
}

/// Previous active coordinates and pressures kept for warm starting.
#[derive(Clone, Debug)]
struct ActiveState {
    xs: Vec<f64>,
    ys: Vec<f64>,
    pressures: Vec<f64>,
}

impl ActiveState {
    fn from_solution(xs: &[f64], ys: &[f64], pressures: &DVector<f64>) -> Self {
        let mut state = Self {
            xs: Vec::new(),
            ys: Vec::new(),
            pressures: Vec::new(),
        };
        for (position, &p) in pressures.iter().enumerate() {
            if p > 0.0 {
                state.xs.push(xs[position]);
                state.ys.push(ys[position]);
                state.pressures.push(p);
            }
        }
        state
    }
}

/// Per-pass diagnostics of the outer evaluation loop.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct IterationRecord {
    /// Integrated normal force after the pass.
    pub total_force: f64,
    /// Integrated contact area after the pass.
    pub contact_area: f64,
    /// Inner iterations the pressure solver spent.
    pub solver_iterations: usize,
    /// Active-set cardinality at the end of the solve.
    pub active_set_size: usize,
}

/// Final report of one contact evaluation.
///
/// Always populated, including under non-convergence (then flagged
/// provisional through [`converged`](ContactSolution::converged) and
/// [`solver_converged`](ContactSolution::solver_converged)).
#[derive(Clone, Debug, Serialize)]
pub struct ContactSolution {
    /// Grid points per side of the underlying height field.
    pub grid_count: usize,
    /// Contact pressures (or point forces, depending on the kernel), one per
    /// candidate, non-negative, zero off the active set.
    pub pressures: DVector<f64>,
    /// Linear grid indices of the candidate points, parallel to `pressures`.
    pub candidate_grid_indices: Vec<usize>,
    /// Linear grid indices that carry positive pressure.
    pub active_grid_indices: Vec<usize>,
    /// Integrated normal force.
    pub total_force: f64,
    /// Total force divided by the nominal domain area.
    pub mean_pressure: f64,
    /// Contact area divided by the nominal domain area.
    pub contact_area_fraction: f64,
    /// Number of outer predict/solve passes performed.
    pub outer_iterations: usize,
    /// Whether the outer force iteration met its tolerance.
    pub converged: bool,
    /// Whether the final pressure solve met its optimality test.
    pub solver_converged: bool,
    /// Per-pass force, area, and solver counters.
    pub history: Vec<IterationRecord>,
}

impl ContactSolution {
    fn no_contact(grid_count: usize, history: Vec<IterationRecord>, passes: usize) -> Self {
        Self {
            grid_count,
            pressures: DVector::zeros(0),
            candidate_grid_indices: Vec::new(),
            active_grid_indices: Vec::new(),
            total_force: 0.0,
            mean_pressure: 0.0,
            contact_area_fraction: 0.0,
            outer_iterations: passes,
            converged: true,
            solver_converged: true,
            history,
        }
    }

    /// Scatters the candidate pressures back onto the full grid, zero
    /// elsewhere; intended for visualization consumers.
    pub fn pressure_grid(&self) -> DMatrix<f64> {
        let n = self.grid_count;
        let mut grid = DMatrix::zeros(n, n);
        for (&index, &pressure) in self.candidate_grid_indices.iter().zip(self.pressures.iter()) {
            grid[(index / n, index % n)] = pressure;
        }
        grid
    }
}

/// Integrates total force and contact area from a pressure vector.
///
/// The uniform-pressure kernel's unknowns are cell pressures, so the force is
/// `sum(p) * cell_area`; the point-force kernel's unknowns already are forces
/// and sum directly. A cell counts towards the contact area when it carries
/// positive pressure.
pub fn integrate_force_and_area(
    pressures: &DVector<f64>,
    grid_size: f64,
    kernel: GreenKernel,
) -> (f64, f64) {
    let sum: f64 = pressures.as_slice().par_iter().sum();
    let contacting = pressures
        .as_slice()
        .par_iter()
        .filter(|&&p| p > 0.0)
        .count();

    let cell_area = grid_size * grid_size;
    let force = match kernel {
        GreenKernel::UniformPressure => sum * cell_area,
        GreenKernel::PointForce => sum,
    };
    (force, contacting as f64 * cell_area)
}
