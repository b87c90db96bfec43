//! Resolved solver parameters and the raw input record they are built from.

use serde::{Deserialize, Serialize};

use crate::error::{ContactError, Result};
use crate::shape_factors::shape_factor;
use crate::topology::HeightField;

/// Discrete half-space Green's function used for the influence matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GreenKernel {
    /// Uniform pressure over a square cell, after Pohrt and Li (2014).
    UniformPressure,
    /// Concentrated force at the cell centre with an `asin` regularization.
    PointForce,
}

/// Where the surface height field comes from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TopologySource {
    /// Self-affine fractal surface from the random-midpoint generator.
    RandomMidpoint {
        /// Grid refinement level; the surface has `2^resolution + 1` points per side.
        resolution: u32,
        /// Standard deviation of the initial corner heights, micrometers.
        initial_std_deviation: f64,
        /// Hurst exponent controlling the height-spectrum roll-off.
        hurst_exponent: f64,
        /// Fixed RNG seed; `None` seeds from entropy.
        seed: Option<u64>,
    },
    /// Whitespace-separated square grid of heights read from a file.
    File { path: String },
}

/// Raw, file-loadable description of one contact simulation.
///
/// This is the serde seam towards configuration files: deserialize it from
/// whichever format the caller prefers, then [`resolve`](ContactSpec::resolve)
/// it into validated [`ContactParameters`] plus the height field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactSpec {
    /// Young's modulus of the first body.
    pub young_modulus_first: f64,
    /// Young's modulus of the second body.
    pub young_modulus_second: f64,
    /// Poisson's ratio of the first body.
    pub poisson_ratio_first: f64,
    /// Poisson's ratio of the second body.
    pub poisson_ratio_second: f64,
    /// Far-field approach of the two surfaces, micrometers.
    pub far_field_displacement: f64,
    /// Side length of the square simulation domain, micrometers.
    pub lateral_length: f64,
    /// Relative force-change tolerance for the outer evaluation loop.
    pub tolerance: f64,
    /// Iteration budget for the active-set pressure solver.
    pub max_iterations: usize,
    /// Green's function selector.
    pub kernel: GreenKernel,
    /// Whether to seed each solve from the previous active set.
    pub warm_start: bool,
    /// Height-field provider.
    pub topology: TopologySource,
}

impl ContactSpec {
    /// Builds the height field and the resolved parameter record.
    pub fn resolve(&self) -> Result<(ContactParameters, HeightField)> {
        let heights = match &self.topology {
            TopologySource::RandomMidpoint {
                resolution,
                initial_std_deviation,
                hurst_exponent,
                seed,
            } => HeightField::random_midpoint(
                *resolution,
                *initial_std_deviation,
                *hurst_exponent,
                *seed,
            )?,
            TopologySource::File { path } => HeightField::from_file(path)?,
        };

        let params = ContactParameters::builder(
            heights.grid_count(),
            self.far_field_displacement,
            self.lateral_length,
        )
        .material(
            self.young_modulus_first,
            self.poisson_ratio_first,
            self.young_modulus_second,
            self.poisson_ratio_second,
        )
        .kernel(self.kernel)
        .tolerance(self.tolerance)
        .max_iterations(self.max_iterations)
        .warm_start(self.warm_start)
        .build()?;

        Ok((params, heights))
    }
}

/// Composite plane-strain modulus of two elastic bodies,
/// `1/E* = (1 - nu1^2)/E1 + (1 - nu2^2)/E2`.
pub fn composite_youngs(e1: f64, nu1: f64, e2: f64, nu2: f64) -> f64 {
    1.0 / ((1.0 - nu1 * nu1) / e1 + (1.0 - nu2 * nu2) / e2)
}

/// Fully-resolved parameters for one contact evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactParameters {
    /// Composite Young's modulus of the pairing.
    pub composite_youngs: f64,
    /// Far-field approach of the two surfaces, micrometers.
    pub delta: f64,
    /// Side length of the square domain, micrometers.
    pub lateral_length: f64,
    /// Grid points per side of the height field.
    pub grid_count: usize,
    /// Cell side length, `lateral_length / grid_count`.
    pub grid_size: f64,
    /// Flat-indentor shape factor for this grid count and kernel.
    pub shape_factor: f64,
    /// `lateral_length * composite_youngs / shape_factor`; one unit of total
    /// force produces `1 / elastic_compliance_correction` of far-field
    /// elastic displacement.
    pub elastic_compliance_correction: f64,
    /// Relative force-change tolerance for the outer evaluation loop.
    pub tolerance: f64,
    /// Iteration budget for the active-set pressure solver.
    pub max_iterations: usize,
    /// Cap on outer predict/solve passes.
    pub max_outer_iterations: usize,
    /// Green's function selector.
    pub kernel: GreenKernel,
    /// Whether to seed each solve from the previous active set.
    pub warm_start: bool,
}

impl ContactParameters {
    /// Starts building parameters for an `n`-by-`n` grid.
    pub fn builder(grid_count: usize, delta: f64, lateral_length: f64) -> ContactParametersBuilder {
        ContactParametersBuilder::new(grid_count, delta, lateral_length)
    }
}

/// Builder that validates inputs and derives the dependent quantities before
/// constructing [`ContactParameters`].
#[derive(Clone, Debug)]
pub struct ContactParametersBuilder {
    grid_count: usize,
    delta: f64,
    lateral_length: f64,
    composite_youngs: Option<f64>,
    kernel: GreenKernel,
    tolerance: f64,
    max_iterations: usize,
    max_outer_iterations: usize,
    warm_start: bool,
    shape_factor: Option<f64>,
}

impl ContactParametersBuilder {
    /// Starts from the grid count, far-field displacement, and domain size.
    pub fn new(grid_count: usize, delta: f64, lateral_length: f64) -> Self {
        Self {
            grid_count,
            delta,
            lateral_length,
            composite_youngs: None,
            kernel: GreenKernel::UniformPressure,
            tolerance: 0.01,
            max_iterations: 10_000,
            max_outer_iterations: 100,
            warm_start: false,
            shape_factor: None,
        }
    }

    /// Derives the composite modulus from the four elastic constants.
    pub fn material(mut self, e1: f64, nu1: f64, e2: f64, nu2: f64) -> Self {
        self.composite_youngs = Some(composite_youngs(e1, nu1, e2, nu2));
        self
    }

    /// Sets the composite modulus directly.
    pub fn composite_youngs(mut self, value: f64) -> Self {
        self.composite_youngs = Some(value);
        self
    }

    /// Selects the Green's function kernel.
    pub fn kernel(mut self, kernel: GreenKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets the relative force-change tolerance of the outer loop.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the iteration budget of the pressure solver.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Caps the number of outer predict/solve passes.
    pub fn max_outer_iterations(mut self, max_outer_iterations: usize) -> Self {
        self.max_outer_iterations = max_outer_iterations.max(1);
        self
    }

    /// Enables warm starting from the previous active set.
    pub fn warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Overrides the tabulated shape factor, e.g. with a freshly calibrated
    /// value for a grid count outside the table.
    pub fn shape_factor(mut self, shape_factor: f64) -> Self {
        self.shape_factor = Some(shape_factor);
        self
    }

    /// Finalizes construction after validating every scalar.
    pub fn build(self) -> Result<ContactParameters> {
        if self.grid_count == 0 {
            return Err(ContactError::dimension_mismatch("grid count", 1, 0));
        }
        if self.lateral_length <= 0.0 {
            return Err(ContactError::non_positive("lateral length", self.lateral_length));
        }
        if self.delta < 0.0 {
            return Err(ContactError::non_positive("far-field displacement", self.delta));
        }
        if self.tolerance <= 0.0 {
            return Err(ContactError::non_positive("tolerance", self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(ContactError::dimension_mismatch("iteration budget", 1, 0));
        }

        let composite = match self.composite_youngs {
            Some(value) if value > 0.0 => value,
            Some(value) => return Err(ContactError::non_positive("composite modulus", value)),
            None => return Err(ContactError::non_positive("composite modulus", 0.0)),
        };

        let alpha = match self.shape_factor {
            Some(value) if value > 0.0 => value,
            Some(value) => return Err(ContactError::non_positive("shape factor", value)),
            None => shape_factor(self.grid_count, self.kernel)?,
        };

        Ok(ContactParameters {
            composite_youngs: composite,
            delta: self.delta,
            lateral_length: self.lateral_length,
            grid_count: self.grid_count,
            grid_size: self.lateral_length / self.grid_count as f64,
            shape_factor: alpha,
            elastic_compliance_correction: self.lateral_length * composite / alpha,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            max_outer_iterations: self.max_outer_iterations,
            kernel: self.kernel,
            warm_start: self.warm_start,
        })
    }
}
