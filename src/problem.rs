//! Problem specification for the Poisson boundary-value problem.
//!
//! Holds everything that defines one discretized instance of
//! −Δu = f on the unit square with Dirichlet data on all four edges:
//! grid dimension, source term, boundary callables, solver controls and
//! an optional exact solution for error measurement. Immutable once
//! handed to a [`Solver`](crate::solver::Solver).

use crate::error::{PoissonError, Result};

/// A scalar field on the unit square, `(x, y) -> value`.
pub type ScalarField = Box<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Box a closure as a [`ScalarField`].
pub fn field<F>(f: F) -> ScalarField
where
    F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
{
    Box::new(f)
}

/// Specification of one Poisson problem instance.
///
/// The grid is n×n with spacing h = 1/(n−1); cell (i, j) sits at
/// physical coordinates (i·h, j·h). Row 0 is the top edge, row n−1 the
/// bottom edge, column 0 the left edge and column n−1 the right edge.
pub struct ProblemSpec {
    /// Grid dimension (points per side, n ≥ 3).
    pub n: usize,
    /// Iteration cap for the outer loop.
    pub max_iter: u32,
    /// Convergence tolerance on the residual (strictly positive).
    pub tol: f64,
    /// Source term f(x, y).
    pub f: ScalarField,
    /// Dirichlet data on the top edge (row 0).
    pub bc_top: ScalarField,
    /// Dirichlet data on the right edge (column n−1).
    pub bc_right: ScalarField,
    /// Dirichlet data on the bottom edge (row n−1).
    pub bc_bottom: ScalarField,
    /// Dirichlet data on the left edge (column 0).
    pub bc_left: ScalarField,
    /// Exact solution, when known, for error measurement.
    pub uex: Option<ScalarField>,
}

impl ProblemSpec {
    /// Spec with homogeneous (zero) boundary data and no exact solution.
    pub fn homogeneous(n: usize, max_iter: u32, tol: f64, f: ScalarField) -> Self {
        Self {
            n,
            max_iter,
            tol,
            f,
            bc_top: field(|_, _| 0.0),
            bc_right: field(|_, _| 0.0),
            bc_bottom: field(|_, _| 0.0),
            bc_left: field(|_, _| 0.0),
            uex: None,
        }
    }

    /// Grid spacing h = 1/(n−1).
    pub fn h(&self) -> f64 {
        1.0 / (self.n as f64 - 1.0)
    }

    /// Check the configuration before any solve touches state.
    ///
    /// Every rank of a distributed run evaluates the same pure check, so
    /// a bad configuration fails identically everywhere before the first
    /// collective call.
    pub fn validate(&self) -> Result<()> {
        if self.n < 3 {
            return Err(PoissonError::Config(format!(
                "grid dimension must be at least 3, got {}",
                self.n
            )));
        }
        if self.max_iter == 0 {
            return Err(PoissonError::Config("max_iter must be positive".into()));
        }
        if !(self.tol > 0.0) {
            return Err(PoissonError::Config(format!(
                "tolerance must be positive, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}
