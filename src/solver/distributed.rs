//! Distributed outer loop shared by the Jacobi and Schwarz variants.
//!
//! The per-rank state machine is
//!
//! ```text
//! START → SWEEP → REDUCE → {CONVERGED | MAX_ITER | CONTINUE}
//! CONTINUE → EXCHANGE → SWEEP
//! CONVERGED, MAX_ITER → EXCHANGE → GATHER → END
//! ```
//!
//! The reduce always completes before the exchange, so every rank makes
//! the same convergence decision on the same iterate. The final exchange
//! runs even after the decision: the gather writes overlapping slices
//! back to the root, and it is only harmless because every ghost row
//! holds the same value as the owned row it mirrors.

use crate::error::{PoissonError, Result};
use crate::grid;
use crate::problem::ProblemSpec;

use super::comm::CommunicationBackend;
use super::decomposition::{self, RowDecomposition};
use super::kernel::{self, Stencil};

/// Distributed Jacobi solve; `pool` switches the in-rank tier (hybrid).
///
/// Collective: every rank must enter with the same spec. On return the
/// root's `u` holds the solution; other ranks' `u` is untouched.
pub(crate) fn solve_jacobi(
    u: &mut [f64],
    spec: &ProblemSpec,
    comm: &dyn CommunicationBackend,
    pool: Option<&rayon::ThreadPool>,
) -> Result<u32> {
    let _span = tracing::debug_span!(
        "solve_jacobi_distributed",
        rank = comm.rank(),
        ranks = comm.num_ranks(),
        hybrid = pool.is_some()
    )
    .entered();

    let (dec, mut local) = scatter(u, spec, comm)?;
    let stencil = Stencil {
        rows: dec.local_rows,
        cols: spec.n,
        start_row: dec.start_row,
        h: spec.h(),
        f: &spec.f,
    };

    let iterations = run_outer(&dec, spec, comm, &mut local, |field, prev| {
        match pool {
            Some(pool) => {
                stencil.sweep_on(pool, field, prev);
                Ok(kernel::l2_diff_on(pool, field, prev, dec.local_rows, spec.n))
            }
            None => {
                stencil.sweep(field, prev);
                Ok(grid::l2_diff(field, prev, dec.local_rows, spec.n))
            }
        }
    })?;

    gather(u, &local, &dec, comm);
    Ok(iterations)
}

/// Validate the rank/grid pairing, apply boundary data on the root,
/// broadcast the scatter layout and distribute the initial slices.
pub(crate) fn scatter(
    u: &mut [f64],
    spec: &ProblemSpec,
    comm: &dyn CommunicationBackend,
) -> Result<(RowDecomposition, Vec<f64>)> {
    let n = spec.n;
    let size = comm.num_ranks();
    let rank = comm.rank();

    // Pure check, identical on every rank, before the first collective.
    if size > n {
        return Err(PoissonError::Config(format!(
            "{size} ranks cannot partition {n} rows"
        )));
    }

    // The scattered slices embed the boundary rows/columns, so the
    // Dirichlet data must be in place before the scatter.
    if rank == 0 {
        grid::apply_boundary(u, spec);
    }

    let (mut counts, mut displs) = if rank == 0 {
        decomposition::scatter_layout(n, size)
    } else {
        (vec![0i32; size], vec![0i32; size])
    };
    comm.broadcast_counts(&mut counts);
    comm.broadcast_counts(&mut displs);
    let dec = RowDecomposition::from_layout(n, rank, counts, displs);

    let mut local = vec![0.0; dec.local_rows * n];
    comm.scatter_field(
        if rank == 0 { Some(u) } else { None },
        &dec.counts,
        &dec.displs,
        &mut local,
    );
    Ok((dec, local))
}

/// Gather the local slices back onto the root with the scatter layout.
pub(crate) fn gather(
    u: &mut [f64],
    local: &[f64],
    dec: &RowDecomposition,
    comm: &dyn CommunicationBackend,
) {
    comm.gather_field(
        local,
        &dec.counts,
        &dec.displs,
        if comm.rank() == 0 { Some(u) } else { None },
    );
}

/// The lockstep outer loop: advance, reduce, decide, exchange.
///
/// `step` advances the local field from the previous iterate and returns
/// the local residual; the Jacobi variants sweep, the Schwarz variant
/// solves its strip system. Every rank performs the same number of outer
/// iterations because the decision comes from the max-reduction.
pub(crate) fn run_outer<F>(
    dec: &RowDecomposition,
    spec: &ProblemSpec,
    comm: &dyn CommunicationBackend,
    local: &mut [f64],
    mut step: F,
) -> Result<u32>
where
    F: FnMut(&mut [f64], &[f64]) -> Result<f64>,
{
    let mut prev = vec![0.0; local.len()];
    let mut iterations = 0u32;
    let mut converged = false;

    for iteration in 0..spec.max_iter {
        prev.copy_from_slice(local);
        let local_residual = step(local, &prev)?;
        let global_residual = comm.all_reduce_max(local_residual);

        let mut done = false;
        if global_residual < spec.tol {
            converged = true;
            iterations = iteration + 1;
            done = true;
        } else if iteration + 1 == spec.max_iter {
            done = true;
        }

        // Refresh ghost rows even on the last pass so the overlapping
        // gather slices agree on the interface rows.
        exchange_halos(dec, comm, local);
        if done {
            break;
        }
    }

    if !converged {
        tracing::warn!(
            max_iter = spec.max_iter,
            "maximum number of iterations reached without convergence"
        );
        iterations = spec.max_iter;
    } else {
        tracing::debug!(iterations, "distributed solve converged");
    }
    Ok(iterations)
}

/// Bidirectional ghost-row exchange along the row axis.
///
/// Each rank sends its first owned row up and its last owned row down,
/// receiving the neighbors' boundary rows into its ghost rows. The
/// backend orders each pairwise transfer so the exchange cannot
/// deadlock for any rank count.
pub(crate) fn exchange_halos(
    dec: &RowDecomposition,
    comm: &dyn CommunicationBackend,
    local: &mut [f64],
) {
    let n = dec.n;
    if dec.has_top_halo() {
        let (top_halo, rest) = local.split_at_mut(n);
        comm.exchange_row(dec.rank - 1, &rest[..n], top_halo);
    }
    if dec.has_bottom_halo() {
        let split = (dec.local_rows - 1) * n;
        let (rest, bottom_halo) = local.split_at_mut(split);
        comm.exchange_row(dec.rank + 1, &rest[split - n..], bottom_halo);
    }
}
