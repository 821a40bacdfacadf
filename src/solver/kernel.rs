//! The Jacobi sweep kernel shared by every execution mode.
//!
//! A sweep updates the interior cells of a field strip from the previous
//! iterate; the first and last local rows are never touched (they are
//! physical boundary rows or ghost rows), nor are the side columns.

use rayon::prelude::*;

use crate::problem::ScalarField;

/// Geometry of one strip sweep.
///
/// `rows` is the strip height including ghost/boundary rows, `cols` the
/// global grid dimension, `start_row` the global index of local row 0
/// (needed to evaluate the source term at the right physical point).
pub(crate) struct Stencil<'a> {
    pub rows: usize,
    pub cols: usize,
    pub start_row: usize,
    pub h: f64,
    pub f: &'a ScalarField,
}

impl Stencil<'_> {
    /// One serial Jacobi sweep: u ← ¼(N + S + W + E + h²·f).
    pub fn sweep(&self, u: &mut [f64], prev: &[f64]) {
        let cols = self.cols;
        debug_assert!(u.len() == self.rows * cols && prev.len() == u.len());
        for i in 1..self.rows - 1 {
            let x = (self.start_row + i) as f64 * self.h;
            for j in 1..cols - 1 {
                u[i * cols + j] = 0.25
                    * (prev[(i - 1) * cols + j]
                        + prev[(i + 1) * cols + j]
                        + prev[i * cols + (j - 1)]
                        + prev[i * cols + (j + 1)]
                        + self.h * self.h * (self.f)(x, j as f64 * self.h));
            }
        }
    }

    /// One data-parallel sweep on the given worker pool.
    ///
    /// Interior rows are statically partitioned across the workers; each
    /// cell is written by exactly one worker, and `prev` is read-only, so
    /// the sweep is race-free. The implicit join is the barrier between
    /// the update phase and the residual phase.
    pub fn sweep_on(&self, pool: &rayon::ThreadPool, u: &mut [f64], prev: &[f64]) {
        let cols = self.cols;
        debug_assert!(u.len() == self.rows * cols && prev.len() == u.len());
        let interior = &mut u[cols..(self.rows - 1) * cols];
        pool.install(|| {
            interior
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(k, row)| {
                    let i = k + 1;
                    let x = (self.start_row + i) as f64 * self.h;
                    for j in 1..cols - 1 {
                        row[j] = 0.25
                            * (prev[(i - 1) * cols + j]
                                + prev[(i + 1) * cols + j]
                                + prev[i * cols + (j - 1)]
                                + prev[i * cols + (j + 1)]
                                + self.h * self.h * (self.f)(x, j as f64 * self.h));
                    }
                });
        });
    }
}

/// Parallel variant of [`crate::grid::l2_diff`]: per-row partial sums
/// reduced on the pool, then the shared scale and square root.
pub(crate) fn l2_diff_on(
    pool: &rayon::ThreadPool,
    a: &[f64],
    b: &[f64],
    rows: usize,
    cols: usize,
) -> f64 {
    let sum: f64 = pool.install(|| {
        a[..rows * cols]
            .par_chunks(cols)
            .zip(b[..rows * cols].par_chunks(cols))
            .map(|(ra, rb)| {
                ra.iter()
                    .zip(rb)
                    .map(|(x, y)| {
                        let d = x - y;
                        d * d
                    })
                    .sum::<f64>()
            })
            .sum()
    });
    (sum / (cols as f64 - 1.0)).sqrt()
}
