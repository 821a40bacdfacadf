//! MPI communication backend for distributed solvers.
//!
//! Requires the `distributed` feature flag and an MPI installation.
//! Implements `CommunicationBackend` using `mpi::traits::*` for
//! inter-process communication (all-reduce, scatter/gather, halo
//! exchange).
//!
//! # Usage
//!
//! The caller must initialize MPI before constructing `MpiComm`:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let comm = MpiComm::new();
//! ```
//!
//! Invoking a distributed solve without an initialized runtime therefore
//! fails at `MpiComm` construction, before any solver state is touched.

use super::comm::CommunicationBackend;
use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

/// MPI-based communication backend for distributed solvers.
///
/// Wraps the MPI world communicator. Requires `mpi::initialize()` to have
/// been called before construction.
pub struct MpiComm;

impl MpiComm {
    /// Create a new MPI communication backend.
    ///
    /// Panics if MPI has not been initialized via `mpi::initialize()`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MpiComm {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunicationBackend for MpiComm {
    fn rank(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.rank() as usize
    }

    fn num_ranks(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.size() as usize
    }

    fn all_reduce_max(&self, local: f64) -> f64 {
        let world = SimpleCommunicator::world();
        let mut global = 0.0f64;
        world.all_reduce_into(&local, &mut global, SystemOperation::max());
        global
    }

    fn broadcast_counts(&self, buf: &mut [i32]) {
        let world = SimpleCommunicator::world();
        world.process_at_rank(0).broadcast_into(buf);
    }

    fn scatter_field(
        &self,
        global: Option<&[f64]>,
        counts: &[i32],
        displs: &[i32],
        local: &mut [f64],
    ) {
        let world = SimpleCommunicator::world();
        let root = world.process_at_rank(0);
        if world.rank() == 0 {
            let global = global.expect("rank 0 must supply the global field");
            let partition = Partition::new(global, counts, displs);
            root.scatter_varcount_into_root(&partition, local);
        } else {
            root.scatter_varcount_into(local);
        }
    }

    fn gather_field(
        &self,
        local: &[f64],
        counts: &[i32],
        displs: &[i32],
        global: Option<&mut [f64]>,
    ) {
        let world = SimpleCommunicator::world();
        let root = world.process_at_rank(0);
        if world.rank() == 0 {
            let global = global.expect("rank 0 must supply the global field");
            let mut partition = PartitionMut::new(global, counts, displs);
            root.gather_varcount_into_root(local, &mut partition);
        } else {
            root.gather_varcount_into(local);
        }
    }

    fn exchange_row(&self, peer: usize, send: &[f64], recv: &mut [f64]) {
        let world = SimpleCommunicator::world();
        let peer_process = world.process_at_rank(peer as i32);

        // Rank-based ordering keeps the pairwise exchange deadlock-free:
        // the lower-ranked process sends first, the higher-ranked
        // receives first.
        if world.rank() < peer as i32 {
            peer_process.send(send);
            peer_process.receive_into(recv);
        } else {
            peer_process.receive_into(recv);
            peer_process.send(send);
        }
    }

    fn barrier(&self) {
        let world = SimpleCommunicator::world();
        world.barrier();
    }
}
