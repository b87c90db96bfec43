use approx::assert_relative_eq;
use asperity::calibration::{flat_shape_factor, DEFAULT_MATRIX_BYTE_LIMIT};
use asperity::evaluate::ContactProblem;
use asperity::influence::assemble_influence_matrix;
use asperity::params::{ContactParameters, ContactSpec, GreenKernel};
use asperity::predictor::predict_contact_set;
use asperity::solver::{solve_contact_pressures, SolverOptions};
use asperity::topology::{create_meshgrid, HeightField};
use nalgebra::DVector;

fn rough_problem(delta: f64) -> ContactProblem {
    let surface = HeightField::random_midpoint(2, 10.0, 0.8, Some(1234)).unwrap();
    let params = ContactParameters::builder(surface.grid_count(), delta, 500.0)
        .material(1.0e7, 0.3, 1.0e7, 0.3)
        .tolerance(1.0e-5)
        .build()
        .unwrap();
    ContactProblem::new(params, surface).unwrap()
}

/// The flat-indentor relation `mean pressure = delta * E* / (L * alpha)` is
/// what defines the shape factor; the calibrated factor must reproduce the
/// tabulated single-cell value.
#[test]
fn flat_indentor_mean_pressure_matches_the_shape_factor_relation() {
    let delta = 2.5;
    let youngs = 4.0e6;
    let lateral = 250.0;

    let report = flat_shape_factor(
        1,
        delta,
        youngs,
        lateral,
        GreenKernel::UniformPressure,
        DEFAULT_MATRIX_BYTE_LIMIT,
    )
    .unwrap();

    assert_relative_eq!(report.shape_factor, 1.1221997046783601, epsilon = 1e-12);
    assert_relative_eq!(
        report.mean_pressure,
        delta * youngs / (lateral * report.shape_factor),
        epsilon = 1e-9
    );
    assert_relative_eq!(report.contact_area_fraction, 1.0, epsilon = 1e-12);
}

/// Pressing further must never reduce the total force or the contact area.
#[test]
fn force_and_area_grow_monotonically_with_approach() {
    let mut previous_force = 0.0;
    let mut previous_fraction = 0.0;

    for delta in [2.0, 5.0, 10.0] {
        let solution = rough_problem(delta).evaluate().unwrap();
        assert!(solution.converged, "delta = {delta} did not converge");
        assert!(
            solution.total_force > previous_force,
            "force fell from {previous_force} at delta = {delta}"
        );
        assert!(solution.contact_area_fraction >= previous_fraction);
        previous_force = solution.total_force;
        previous_fraction = solution.contact_area_fraction;
    }
}

/// End-to-end complementary slackness on a generated rough surface: pressures
/// stay non-negative, active residuals vanish, inactive residuals stay above
/// the negative tolerance.
#[test]
fn rough_surface_solution_satisfies_the_contact_conditions() {
    let surface = HeightField::random_midpoint(3, 15.0, 0.7, Some(99)).unwrap();
    let n = surface.grid_count();
    let grid_size = 800.0 / n as f64;
    let meshgrid = create_meshgrid(n, grid_size);
    let stats = surface.max_and_mean();

    let candidates = predict_contact_set(&surface, &meshgrid, stats.max, 8.0, 0.0);
    assert!(!candidates.is_empty());

    let influence = assemble_influence_matrix(
        candidates.xs(),
        candidates.ys(),
        grid_size,
        5.0e6,
        GreenKernel::UniformPressure,
    );
    let options = SolverOptions::default();
    let (pressures, summary) = solve_contact_pressures(
        &influence,
        candidates.rhs(),
        DVector::zeros(candidates.len()),
        &options,
    )
    .unwrap();

    assert!(summary.converged);
    assert!(summary.active_set_size > 0);

    let residual = &influence * &pressures - candidates.rhs();
    let scale = candidates.rhs().amax();
    for i in 0..candidates.len() {
        assert!(pressures[i] >= 0.0);
        if pressures[i] > 0.0 {
            assert!(residual[i].abs() <= 1e-8 * scale.max(1.0));
        } else {
            assert!(residual[i] >= -options.tolerance);
        }
    }
}

/// Re-solving from a converged pressure vector must pass the optimality test
/// immediately, without any additional pivoting.
#[test]
fn warm_started_resolve_terminates_at_the_first_optimality_check() {
    let surface = HeightField::random_midpoint(2, 12.0, 0.8, Some(5))
        .unwrap();
    let n = surface.grid_count();
    let grid_size = 100.0;
    let meshgrid = create_meshgrid(n, grid_size);
    let stats = surface.max_and_mean();

    let candidates = predict_contact_set(&surface, &meshgrid, stats.max, 6.0, 0.0);
    let influence = assemble_influence_matrix(
        candidates.xs(),
        candidates.ys(),
        grid_size,
        2.0e6,
        GreenKernel::UniformPressure,
    );
    let options = SolverOptions::default();

    let (converged_pressures, first) = solve_contact_pressures(
        &influence,
        candidates.rhs(),
        DVector::zeros(candidates.len()),
        &options,
    )
    .unwrap();
    assert!(first.converged);

    let (again, second) = solve_contact_pressures(
        &influence,
        candidates.rhs(),
        converged_pressures.clone(),
        &options,
    )
    .unwrap();

    assert!(second.converged);
    assert_eq!(second.iterations, 1);
    assert_relative_eq!(again, converged_pressures, epsilon = 1e-9);
}

/// A configuration record deserialized from JSON resolves into a runnable
/// problem.
#[test]
fn contact_spec_round_trips_through_serde() {
    let json = r#"{
        "young_modulus_first": 1.0e7,
        "young_modulus_second": 1.0e7,
        "poisson_ratio_first": 0.3,
        "poisson_ratio_second": 0.3,
        "far_field_displacement": 5.0,
        "lateral_length": 400.0,
        "tolerance": 1.0e-4,
        "max_iterations": 10000,
        "kernel": "UniformPressure",
        "warm_start": true,
        "topology": {
            "RandomMidpoint": {
                "resolution": 2,
                "initial_std_deviation": 8.0,
                "hurst_exponent": 0.9,
                "seed": 77
            }
        }
    }"#;

    let spec: ContactSpec = serde_json::from_str(json).unwrap();
    let (params, surface) = spec.resolve().unwrap();
    assert_eq!(params.grid_count, 5);
    assert!(params.warm_start);

    let solution = ContactProblem::new(params, surface)
        .unwrap()
        .evaluate()
        .unwrap();
    assert!(solution.total_force > 0.0);
    assert!(solution.pressures.iter().all(|&p| p >= 0.0));
}

/// Both kernels run the whole pipeline and report a plausible contact state.
#[test]
fn point_force_kernel_evaluates_end_to_end() {
    let surface = HeightField::random_midpoint(2, 10.0, 0.8, Some(21)).unwrap();
    let params = ContactParameters::builder(surface.grid_count(), 6.0, 300.0)
        .material(1.0e7, 0.3, 1.0e7, 0.3)
        .kernel(GreenKernel::PointForce)
        .tolerance(1.0e-4)
        .build()
        .unwrap();

    let solution = ContactProblem::new(params, surface).unwrap().evaluate().unwrap();
    assert!(solution.total_force > 0.0);
    assert!(solution.contact_area_fraction > 0.0);
    assert!(solution.contact_area_fraction <= 1.0);
}
