//! Index arithmetic and norms on the row-major n×n field.

use crate::problem::{ProblemSpec, ScalarField};

/// Normalized coordinate of grid line `i` on an n-point axis.
#[inline]
pub fn coord(i: usize, n: usize) -> f64 {
    debug_assert!(i < n, "grid index {i} out of range for n = {n}");
    i as f64 / (n as f64 - 1.0)
}

/// Assign the four boundary edges of `u` from the spec's callables.
///
/// The horizontal edges win the corners: the top and bottom rows are
/// written in full first, then the left/right columns overwrite only the
/// end cells of interior rows. Each callable is evaluated at the cell's
/// own normalized coordinates, so applying twice equals applying once.
pub fn apply_boundary(u: &mut [f64], spec: &ProblemSpec) {
    let n = spec.n;
    debug_assert_eq!(u.len(), n * n);

    for j in 0..n {
        u[j] = (spec.bc_top)(coord(0, n), coord(j, n));
        u[(n - 1) * n + j] = (spec.bc_bottom)(coord(n - 1, n), coord(j, n));
    }
    for i in 1..n - 1 {
        u[i * n] = (spec.bc_left)(coord(i, n), coord(0, n));
        u[i * n + (n - 1)] = (spec.bc_right)(coord(i, n), coord(n - 1, n));
    }
}

/// Scaled L2 norm of the elementwise difference over a `rows × cols`
/// region with stride `cols`: √((1/(cols−1)) · Σ (a−b)²).
///
/// The 1/(n−1) scale is a convention inherited from the reference
/// implementation, not an h² area weight; changing it breaks comparison
/// against recorded error values. Accumulation is naive double precision.
pub fn l2_diff(a: &[f64], b: &[f64], rows: usize, cols: usize) -> f64 {
    debug_assert!(a.len() >= rows * cols && b.len() >= rows * cols);
    let mut sum = 0.0;
    for i in 0..rows {
        for j in 0..cols {
            let d = a[i * cols + j] - b[i * cols + j];
            sum += d * d;
        }
    }
    (sum / (cols as f64 - 1.0)).sqrt()
}

/// Sample a callable on the full n×n grid, row-major.
pub fn tabulate(n: usize, f: &ScalarField) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            out[i * n + j] = f(coord(i, n), coord(j, n));
        }
    }
    out
}
