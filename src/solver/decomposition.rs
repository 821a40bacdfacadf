//! Row-strip domain decomposition for distributed solves.
//!
//! Rows are block-partitioned across ranks in rank order; each rank's
//! local field carries its owned rows plus up to two ghost rows that
//! mirror the adjacent ranks' boundary rows. The scatter layout includes
//! the ghost rows, so adjacent ranks' slices overlap on the interface
//! rows and a single scatter distributes initial values including halos.

/// One rank's view of the row-block partition.
#[derive(Debug, Clone)]
pub struct RowDecomposition {
    /// Global grid dimension.
    pub n: usize,
    /// This rank's index.
    pub rank: usize,
    /// Total number of ranks.
    pub num_ranks: usize,
    /// Rows this rank is authoritative for.
    pub owned_rows: usize,
    /// Owned rows plus ghost rows; the height of the local field.
    pub local_rows: usize,
    /// Global row index of local row 0.
    pub start_row: usize,
    /// Per-rank slice lengths in elements, shared by scatter and gather.
    pub counts: Vec<i32>,
    /// Per-rank slice offsets into the global field, in elements.
    pub displs: Vec<i32>,
}

impl RowDecomposition {
    /// Build the decomposition for `rank` of `num_ranks` on an n-row grid.
    ///
    /// Requires `num_ranks <= n` so every rank owns at least one row.
    pub fn new(n: usize, rank: usize, num_ranks: usize) -> Self {
        debug_assert!(rank < num_ranks && num_ranks <= n);
        let (counts, displs) = scatter_layout(n, num_ranks);
        Self::from_layout(n, rank, counts, displs)
    }

    /// Assemble a rank's view from a broadcast scatter layout.
    pub fn from_layout(n: usize, rank: usize, counts: Vec<i32>, displs: Vec<i32>) -> Self {
        let num_ranks = counts.len();
        Self {
            n,
            rank,
            num_ranks,
            owned_rows: owned_rows(n, rank, num_ranks),
            local_rows: counts[rank] as usize / n,
            start_row: displs[rank] as usize / n,
            counts,
            displs,
        }
    }

    /// Whether local row 0 is a ghost row (interior and last ranks).
    pub fn has_top_halo(&self) -> bool {
        self.rank > 0
    }

    /// Whether the last local row is a ghost row (interior and first ranks).
    pub fn has_bottom_halo(&self) -> bool {
        self.rank < self.num_ranks - 1
    }

    /// Global row index of a local row.
    pub fn global_row(&self, local_row: usize) -> usize {
        debug_assert!(local_row < self.local_rows);
        self.start_row + local_row
    }
}

/// Rows owned by rank `r` of `p`: ⌊n/p⌋ plus one of the remainder rows
/// for the first `n mod p` ranks, contiguous and in rank order.
pub fn owned_rows(n: usize, r: usize, p: usize) -> usize {
    n / p + usize::from(r < n % p)
}

/// Per-rank scatter counts and offsets into the global field, in elements.
///
/// Each slice covers the rank's owned rows plus its ghost rows, so each
/// subsequent slice starts `counts[r] − 2n` elements after the previous
/// one and adjacent slices overlap on the two interface rows. With a
/// single rank the slice is the whole field.
pub fn scatter_layout(n: usize, p: usize) -> (Vec<i32>, Vec<i32>) {
    if p == 1 {
        return (vec![(n * n) as i32], vec![0]);
    }
    let mut counts = vec![0i32; p];
    let mut displs = vec![0i32; p];
    for r in 0..p {
        let halos = if r == 0 || r == p - 1 { 1 } else { 2 };
        counts[r] = ((owned_rows(n, r, p) + halos) * n) as i32;
    }
    for r in 1..p {
        displs[r] = displs[r - 1] + counts[r - 1] - 2 * n as i32;
    }
    (counts, displs)
}
