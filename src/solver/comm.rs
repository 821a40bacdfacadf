//! Communication backend abstraction for the distributed solvers.
//!
//! Provides a trait for cross-rank coordination (residual reductions,
//! field scatter/gather, halo-row exchange) and a no-op single-process
//! implementation.

/// Abstraction over inter-process communication for distributed solves.
///
/// Implementations: `SingleProcessComm` (no-op), `MpiComm` (via mpi crate).
pub trait CommunicationBackend: Send + Sync {
    /// This process's rank (strip index).
    fn rank(&self) -> usize;

    /// Total number of ranks (strips).
    fn num_ranks(&self) -> usize;

    /// Max of a local scalar across all ranks.
    fn all_reduce_max(&self, local: f64) -> f64;

    /// Broadcast a buffer of element counts/offsets from rank 0.
    fn broadcast_counts(&self, buf: &mut [i32]);

    /// Scatter variable-length slices of the root's global field.
    ///
    /// `counts`/`displs` give each rank's slice in elements; slices of
    /// adjacent ranks overlap on the shared halo rows. `global` must be
    /// `Some` on rank 0 and is ignored elsewhere. `local` receives
    /// exactly `counts[rank]` elements.
    fn scatter_field(&self, global: Option<&[f64]>, counts: &[i32], displs: &[i32], local: &mut [f64]);

    /// Gather local slices back into the root's global field using the
    /// same counts/offsets as the scatter.
    fn gather_field(&self, local: &[f64], counts: &[i32], displs: &[i32], global: Option<&mut [f64]>);

    /// Paired exchange of one grid row with a neighbor rank: sends
    /// `send` and fills `recv` with the peer's row. Implementations must
    /// order the transfer so that opposing calls cannot deadlock.
    fn exchange_row(&self, peer: usize, send: &[f64], recv: &mut [f64]);

    /// Synchronization barrier.
    fn barrier(&self);
}

/// No-op communication backend for single-process execution.
///
/// Scatter and gather degenerate to copies of the full field; halo
/// exchange never happens because a single rank has no neighbors.
pub struct SingleProcessComm;

impl CommunicationBackend for SingleProcessComm {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn all_reduce_max(&self, local: f64) -> f64 {
        local
    }

    fn broadcast_counts(&self, _buf: &mut [i32]) {
        // Single process: the root's values are already everyone's values.
    }

    fn scatter_field(
        &self,
        global: Option<&[f64]>,
        _counts: &[i32],
        _displs: &[i32],
        local: &mut [f64],
    ) {
        let global = global.expect("rank 0 must supply the global field");
        local.copy_from_slice(&global[..local.len()]);
    }

    fn gather_field(
        &self,
        local: &[f64],
        _counts: &[i32],
        _displs: &[i32],
        global: Option<&mut [f64]>,
    ) {
        let global = global.expect("rank 0 must supply the global field");
        global[..local.len()].copy_from_slice(local);
    }

    fn exchange_row(&self, _peer: usize, _send: &[f64], _recv: &mut [f64]) {
        // Single process: no neighbors, nothing to exchange.
    }

    fn barrier(&self) {}
}
