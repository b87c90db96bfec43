//! Boundary-element simulation of elastic contact between rough surfaces.
//!
//! This crate computes the normal contact pressure field between two
//! nominally flat, randomly rough surfaces pressed together by a prescribed
//! far-field displacement, using a half-space Green's function
//! discretization. It offers tools to
//!
//! - describe or generate surface height fields (`topology` module),
//! - predict the candidate contact set for the current gap (`predictor`
//!   module),
//! - assemble dense influence-coefficient matrices for two closed-form
//!   kernels (`influence` module),
//! - solve the unilateral contact problem with an active-set non-negative
//!   least-squares method (`solver` module), and
//! - drive the outer predict/solve/integrate iteration to a converged mean
//!   pressure and contact-area fraction (`evaluate` module).
//!
//! The active-set scheme follows Bemporad and Paggi (2015); the
//! uniform-pressure influence kernel follows Pohrt and Li (2014).
//!
//! # Quick start
//!
//! ```no_run
//! use asperity::evaluate::ContactProblem;
//! use asperity::params::{ContactParameters, GreenKernel};
//! use asperity::topology::HeightField;
//!
//! // A self-affine rough surface on a 2^4 + 1 = 17 point grid.
//! let surface = HeightField::random_midpoint(4, 20.0, 0.7, Some(42)).expect("surface");
//!
//! let params = ContactParameters::builder(surface.grid_count(), 10.0, 1000.0)
//!     .material(1.0e7, 0.3, 1.0e7, 0.3)
//!     .kernel(GreenKernel::UniformPressure)
//!     .warm_start(true)
//!     .build()
//!     .expect("validated parameters");
//!
//! let problem = ContactProblem::new(params, surface).expect("matching resolution");
//! let solution = problem.evaluate().expect("well-posed contact problem");
//! println!(
//!     "mean pressure {:.3}, contact fraction {:.4}",
//!     solution.mean_pressure, solution.contact_area_fraction
//! );
//! ```
//!
//! Configuration files deserialize into [`params::ContactSpec`] through
//! serde; the calibration module recomputes the flat-indentor shape factors
//! that anchor the elastic compliance correction.

pub mod calibration;
pub mod error;
pub mod evaluate;
pub mod influence;
pub mod params;
pub mod predictor;
pub mod shape_factors;
pub mod solver;
pub mod topology;
pub mod warmstart;

pub use error::{ContactError, Result};
pub use evaluate::{ContactProblem, ContactSolution};
pub use params::{ContactParameters, ContactSpec, GreenKernel};
pub use solver::{SolverOptions, SolverSummary};
pub use topology::HeightField;
