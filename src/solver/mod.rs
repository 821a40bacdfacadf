//! The Poisson solver entity and its execution modes.
//!
//! One [`Solver`] owns the n×n iterate and exposes four Jacobi solves
//! (serial, shared-memory, distributed, hybrid) plus the distributed
//! direct Schwarz variant. All of them share the same kernel and the
//! same convergence test; the distributed modes take a
//! [`CommunicationBackend`](comm::CommunicationBackend) so they can run
//! on MPI or degenerate to a single process.

pub mod comm;
#[cfg(feature = "distributed")]
pub mod comm_mpi;
pub mod decomposition;
pub mod direct;
pub mod distributed;
mod kernel;

use crate::error::{PoissonError, Result};
use crate::grid;
use crate::problem::ProblemSpec;

use self::comm::CommunicationBackend;
use self::kernel::Stencil;

/// Iterative and direct solvers for −Δu = f on the unit square.
pub struct Solver {
    spec: ProblemSpec,
    u: Vec<f64>,
    iter: u32,
    l2_error: f64,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("n", &self.spec.n)
            .field("iter", &self.iter)
            .field("l2_error", &self.l2_error)
            .finish_non_exhaustive()
    }
}

impl Solver {
    /// Build a solver from a validated spec and an initial iterate.
    ///
    /// The interior of the guess may be anything; the boundary cells are
    /// overwritten with the spec's Dirichlet data. Fails without touching
    /// any state if the configuration is invalid.
    pub fn new(spec: ProblemSpec, initial_guess: Vec<f64>) -> Result<Self> {
        spec.validate()?;
        if initial_guess.len() != spec.n * spec.n {
            return Err(PoissonError::Config(format!(
                "initial guess has {} cells, expected {}",
                initial_guess.len(),
                spec.n * spec.n
            )));
        }
        let mut u = initial_guess;
        grid::apply_boundary(&mut u, &spec);
        Ok(Self {
            spec,
            u,
            iter: 0,
            l2_error: -1.0,
        })
    }

    /// Jacobi iteration with no parallelism.
    pub fn solve_jacobi_serial(&mut self) -> Result<()> {
        let _span = tracing::debug_span!("solve_jacobi_serial", n = self.spec.n).entered();
        grid::apply_boundary(&mut self.u, &self.spec);
        self.iter = self.run_local_jacobi(None);
        Ok(())
    }

    /// Jacobi iteration on a bounded in-process worker pool.
    ///
    /// `workers == 0` uses rayon's default thread count.
    pub fn solve_jacobi_shared(&mut self, workers: usize) -> Result<()> {
        let _span =
            tracing::debug_span!("solve_jacobi_shared", n = self.spec.n, workers).entered();
        let pool = build_pool(workers)?;
        grid::apply_boundary(&mut self.u, &self.spec);
        self.iter = self.run_local_jacobi(Some(&pool));
        Ok(())
    }

    /// Row-distributed Jacobi iteration. All ranks must enter
    /// collectively; the root rank's field holds the result on return.
    pub fn solve_jacobi_distributed(&mut self, comm: &dyn CommunicationBackend) -> Result<()> {
        self.iter = distributed::solve_jacobi(&mut self.u, &self.spec, comm, None)?;
        Ok(())
    }

    /// Distributed Jacobi with the shared-memory tier active inside each
    /// rank. Same collective contract as [`Self::solve_jacobi_distributed`].
    pub fn solve_jacobi_hybrid(
        &mut self,
        comm: &dyn CommunicationBackend,
        workers: usize,
    ) -> Result<()> {
        let pool = build_pool(workers)?;
        self.iter = distributed::solve_jacobi(&mut self.u, &self.spec, comm, Some(&pool))?;
        Ok(())
    }

    /// Schwarz variant: each rank solves its strip exactly per outer
    /// step. Same collective contract as the distributed Jacobi.
    pub fn solve_direct_distributed(&mut self, comm: &dyn CommunicationBackend) -> Result<()> {
        self.iter = direct::solve(&mut self.u, &self.spec, comm)?;
        Ok(())
    }

    /// Iterations consumed by the last solve.
    pub fn iter(&self) -> u32 {
        self.iter
    }

    /// The computed iterate, row-major n×n.
    pub fn solution(&self) -> &[f64] {
        &self.u
    }

    /// The problem this solver was built for.
    pub fn spec(&self) -> &ProblemSpec {
        &self.spec
    }

    /// L2 error of the iterate against the exact solution.
    ///
    /// Returns −1.0 and logs a warning when no exact solution was given.
    pub fn l2_error(&mut self) -> f64 {
        match &self.spec.uex {
            Some(uex) => {
                let exact = grid::tabulate(self.spec.n, uex);
                self.l2_error = grid::l2_diff(&self.u, &exact, self.spec.n, self.spec.n);
                self.l2_error
            }
            None => {
                tracing::warn!("exact solution is not known; cannot compute error");
                -1.0
            }
        }
    }

    /// The exact solution tabulated on the grid, when known.
    pub fn exact_solution(&self) -> Option<Vec<f64>> {
        self.spec.uex.as_ref().map(|uex| grid::tabulate(self.spec.n, uex))
    }

    /// Zero the iterate and the iteration counter.
    pub fn reset(&mut self) {
        self.iter = 0;
        self.u.clear();
        self.u.resize(self.spec.n * self.spec.n, 0.0);
    }

    /// The in-process Jacobi loop: copy, sweep, residual, until the
    /// residual drops strictly below the tolerance or the cap is hit.
    fn run_local_jacobi(&mut self, pool: Option<&rayon::ThreadPool>) -> u32 {
        let n = self.spec.n;
        let stencil = Stencil {
            rows: n,
            cols: n,
            start_row: 0,
            h: self.spec.h(),
            f: &self.spec.f,
        };

        let mut prev = vec![0.0; n * n];
        let mut iterations = 0u32;
        let mut converged = false;

        for iteration in 0..self.spec.max_iter {
            prev.copy_from_slice(&self.u);
            let residual = match pool {
                Some(pool) => {
                    stencil.sweep_on(pool, &mut self.u, &prev);
                    kernel::l2_diff_on(pool, &self.u, &prev, n, n)
                }
                None => {
                    stencil.sweep(&mut self.u, &prev);
                    grid::l2_diff(&self.u, &prev, n, n)
                }
            };
            if residual < self.spec.tol {
                converged = true;
                iterations = iteration + 1;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                max_iter = self.spec.max_iter,
                "maximum number of iterations reached without convergence"
            );
            iterations = self.spec.max_iter;
        } else {
            tracing::debug!(iterations, "Jacobi converged");
        }
        iterations
    }
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PoissonError::Config(format!("failed to build worker pool: {e}")))
}
