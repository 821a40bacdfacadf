//! Direct-per-subdomain Schwarz solver.
//!
//! Each outer step replaces the Jacobi sweep with an exact solve of the
//! rank's strip: the 5-point operator restricted to the strip interior,
//! with the ghost rows and the physical side columns treated as fixed
//! Dirichlet data folded into the right-hand side. Repeated halo
//! exchange makes the block-Jacobi iteration converge in a modest number
//! of outer steps.

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};

use crate::error::{PoissonError, Result};
use crate::grid;
use crate::problem::ProblemSpec;
use crate::sparse::CsrMatrix;

use super::comm::CommunicationBackend;
use super::decomposition::RowDecomposition;
use super::distributed;

/// Distributed Schwarz solve. Same collective contract as the
/// distributed Jacobi: root's `u` holds the result on return.
pub(crate) fn solve(
    u: &mut [f64],
    spec: &ProblemSpec,
    comm: &dyn CommunicationBackend,
) -> Result<u32> {
    let _span = tracing::debug_span!(
        "solve_direct_distributed",
        rank = comm.rank(),
        ranks = comm.num_ranks()
    )
    .entered();

    let n = spec.n;
    let (dec, mut local) = distributed::scatter(u, spec, comm)?;

    let width = dec.local_rows - 2;
    let cols = n - 2;
    // A one-row strip on the grid edge has no interior unknowns; the
    // rank still takes part in every reduce and exchange.
    let operator = if width > 0 {
        Some(assemble_operator(width, cols))
    } else {
        None
    };

    let iterations = distributed::run_outer(&dec, spec, comm, &mut local, |field, prev| {
        if let Some(a) = &operator {
            // The ghost contributions are re-read from the current local
            // field, so the strip borrows fresh Dirichlet data each step.
            let b = assemble_rhs(prev, &dec, spec);
            let x = solve_strip(a, &b)?;
            for (k, xk) in x.iter().enumerate() {
                let (i, j) = (k / cols + 1, k % cols + 1);
                field[i * n + j] = *xk;
            }
        }
        Ok(grid::l2_diff(field, prev, dec.local_rows, n))
    })?;

    distributed::gather(u, &local, &dec, comm);
    Ok(iterations)
}

/// The 5-point Laplacian restricted to a `width × cols` strip interior,
/// unknowns in row-major order: 4 on the diagonal, −1 for in-strip
/// north/south/west/east neighbors. Symmetric positive definite.
pub(crate) fn assemble_operator(width: usize, cols: usize) -> CsrMatrix {
    let m = width * cols;
    let mut triplets = Vec::with_capacity(5 * m);
    for r in 0..width {
        for c in 0..cols {
            let k = r * cols + c;
            triplets.push((k, k, 4.0));
            if r > 0 {
                triplets.push((k, k - cols, -1.0));
            }
            if r + 1 < width {
                triplets.push((k, k + cols, -1.0));
            }
            if c > 0 {
                triplets.push((k, k - 1, -1.0));
            }
            if c + 1 < cols {
                triplets.push((k, k + 1, -1.0));
            }
        }
    }
    CsrMatrix::from_triplets(m, m, &triplets)
}

/// Right-hand side for the strip system: h²·f at each unknown plus the
/// Dirichlet values of any neighbor that falls outside the strip (ghost
/// rows above/below, physical side columns).
pub(crate) fn assemble_rhs(local: &[f64], dec: &RowDecomposition, spec: &ProblemSpec) -> Vec<f64> {
    let n = spec.n;
    let h = spec.h();
    let width = dec.local_rows - 2;
    let cols = n - 2;
    let mut b = vec![0.0; width * cols];
    for r in 0..width {
        let i = r + 1;
        let x = dec.global_row(i) as f64 * h;
        for c in 0..cols {
            let j = c + 1;
            let mut v = h * h * (spec.f)(x, j as f64 * h);
            if r == 0 {
                v += local[(i - 1) * n + j];
            }
            if r + 1 == width {
                v += local[(i + 1) * n + j];
            }
            if c == 0 {
                v += local[i * n];
            }
            if c + 1 == cols {
                v += local[i * n + (n - 1)];
            }
            b[r * cols + c] = v;
        }
    }
    b
}

/// Solve the strip system Ax = b with sparse Cholesky.
///
/// The operator is SPD by construction, so a factorization failure means
/// the assembly itself is broken; it is fatal to the solve, with no
/// diagonal-perturbation retry.
pub(crate) fn solve_strip(a: &CsrMatrix, b: &[f64]) -> Result<Vec<f64>> {
    let m = a.nrows;
    if a.ncols != m || b.len() != m {
        return Err(PoissonError::Solve(format!(
            "dimension mismatch: matrix is {}x{}, rhs length is {}",
            a.nrows,
            a.ncols,
            b.len()
        )));
    }
    if m == 0 {
        return Ok(Vec::new());
    }

    let mut triplets = Vec::with_capacity(a.nnz());
    for row in 0..m {
        for idx in a.row_pointers[row]..a.row_pointers[row + 1] {
            triplets.push(Triplet::new(row, a.col_indices[idx], a.values[idx]));
        }
    }

    let a_sp = SparseColMat::<usize, f64>::try_new_from_triplets(m, m, &triplets)
        .map_err(|e| PoissonError::Solve(format!("sparse matrix build failed: {e:?}")))?;

    let chol = a_sp
        .sp_cholesky(faer::Side::Lower)
        .map_err(|e| PoissonError::Solve(format!("sparse Cholesky factorization failed: {e:?}")))?;

    let rhs = faer::Mat::<f64>::from_fn(m, 1, |i, _| b[i]);
    let x = chol.solve(rhs);

    let mut out = vec![0.0; m];
    for i in 0..m {
        let xi = x[(i, 0)];
        if !xi.is_finite() {
            return Err(PoissonError::Solve(
                "strip solve produced NaN/Inf solution".into(),
            ));
        }
        out[i] = xi;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::field;
    use approx::assert_abs_diff_eq;

    #[test]
    fn operator_structure_2x2() {
        // 2×2 strip interior: every unknown has two in-strip neighbors.
        let a = assemble_operator(2, 2);
        let dense = a.to_dense();
        let expected = [
            [4.0, -1.0, -1.0, 0.0],
            [-1.0, 4.0, 0.0, -1.0],
            [-1.0, 0.0, 4.0, -1.0],
            [0.0, -1.0, -1.0, 4.0],
        ];
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(dense[i][j], expected[i][j], "entry ({i}, {j})");
            }
        }
    }

    #[test]
    fn operator_is_symmetric() {
        let a = assemble_operator(3, 4);
        let dense = a.to_dense();
        for i in 0..a.nrows {
            for j in 0..a.ncols {
                assert_eq!(dense[i][j], dense[j][i]);
            }
        }
    }

    #[test]
    fn operator_row_sums_reflect_dropped_neighbors() {
        // A row sums to zero when all four neighbors are in-strip; every
        // neighbor outside the strip adds one.
        let a = assemble_operator(3, 3);
        let dense = a.to_dense();
        let center = 3 + 1;
        assert_eq!(dense[center].iter().sum::<f64>(), 0.0);
        assert_eq!(dense[0].iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn rhs_folds_ghost_rows_and_side_columns() {
        let n = 4;
        let spec = ProblemSpec::homogeneous(n, 1, 1e-10, field(|_, _| 0.0));
        let dec = RowDecomposition::new(n, 0, 1);

        // Mark the frame of the 4×4 local field; interior is zero.
        let mut local = vec![0.0; n * n];
        for j in 0..n {
            local[j] = 10.0; // top row
            local[(n - 1) * n + j] = 20.0; // bottom row
        }
        for i in 1..n - 1 {
            local[i * n] = 30.0; // left column
            local[i * n + n - 1] = 40.0; // right column
        }

        let b = assemble_rhs(&local, &dec, &spec);
        // Unknowns are the 2×2 interior; each corner sees one horizontal
        // and one vertical boundary neighbor.
        assert_eq!(b, vec![10.0 + 30.0, 10.0 + 40.0, 20.0 + 30.0, 20.0 + 40.0]);
    }

    #[test]
    fn rhs_carries_source_term_at_global_rows() {
        let n = 4;
        let spec = ProblemSpec::homogeneous(n, 1, 1e-10, field(|x, _| x));
        let h = spec.h();
        let dec = RowDecomposition::new(n, 0, 1);
        let local = vec![0.0; n * n];
        let b = assemble_rhs(&local, &dec, &spec);
        // Row r of the interior sits at global row r + 1.
        assert_abs_diff_eq!(b[0], h * h * (1.0 * h), epsilon = 1e-15);
        assert_abs_diff_eq!(b[2], h * h * (2.0 * h), epsilon = 1e-15);
    }

    #[test]
    fn strip_solve_known_system() {
        // For the 2×2 strip operator with b = 1, symmetry forces all
        // components equal: (4 − 2)x = 1 → x = ½.
        let a = assemble_operator(2, 2);
        let x = solve_strip(&a, &[1.0; 4]).expect("SPD operator must factorize");
        for xk in x {
            assert_abs_diff_eq!(xk, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn strip_solve_matches_spmv_round_trip() {
        let a = assemble_operator(3, 5);
        let b: Vec<f64> = (0..a.nrows).map(|k| (k as f64 * 0.7).sin()).collect();
        let x = solve_strip(&a, &b).unwrap();
        let ax = a.spmv(&x);
        for k in 0..a.nrows {
            assert_abs_diff_eq!(ax[k], b[k], epsilon = 1e-10);
        }
    }

    #[test]
    fn strip_solve_rejects_dimension_mismatch() {
        let a = assemble_operator(2, 2);
        let err = solve_strip(&a, &[1.0; 3]).unwrap_err();
        assert!(err.to_string().contains("dimension"), "got: {err}");
    }
}
