//! End-to-end convergence and equivalence tests for the Poisson solver.

use approx::assert_abs_diff_eq;
use poisson2d::grid;
use poisson2d::problem::{field, ProblemSpec, ScalarField};
use poisson2d::solver::comm::SingleProcessComm;
use poisson2d::solver::Solver;
use std::f64::consts::PI;

fn sine_source() -> ScalarField {
    field(|x, y| 8.0 * PI * PI * (2.0 * PI * x).sin() * (2.0 * PI * y).sin())
}

fn sine_exact() -> ScalarField {
    field(|x, y| (2.0 * PI * x).sin() * (2.0 * PI * y).sin())
}

/// The manufactured-sine spec from the reference problem set.
fn manufactured_sine(n: usize, max_iter: u32, tol: f64) -> ProblemSpec {
    let mut spec = ProblemSpec::homogeneous(n, max_iter, tol, sine_source());
    spec.uex = Some(sine_exact());
    spec
}

/// A non-symmetric spec with data on every edge, used to exercise the
/// boundary and equivalence properties away from trivial zeros.
fn mixed_spec(n: usize, max_iter: u32, tol: f64) -> ProblemSpec {
    let mut spec = ProblemSpec::homogeneous(n, max_iter, tol, field(|x, y| (3.0 * x - y).cos()));
    spec.bc_top = field(|x, y| x + 2.0 * y);
    spec.bc_right = field(|x, y| 1.0 + x * y);
    spec.bc_bottom = field(|x, y| (x - y).sin());
    spec.bc_left = field(|x, y| 0.5 * x + y * y);
    spec
}

fn solved(spec: ProblemSpec) -> Solver {
    let n = spec.n;
    let mut solver = Solver::new(spec, vec![0.0; n * n]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    solver
}

#[test]
fn zero_problem_is_immediately_converged() {
    let spec = ProblemSpec::homogeneous(16, 100, 1e-12, field(|_, _| 0.0));
    let mut solver = Solver::new(spec, vec![0.0; 256]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    assert!(solver.iter() <= 2, "iter = {}", solver.iter());
    assert!(solver.solution().iter().all(|&v| v == 0.0));
}

#[test]
fn manufactured_sine_n32_discretization_error() {
    let mut solver = Solver::new(manufactured_sine(32, 30_000, 1e-15), vec![0.0; 32 * 32]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    assert!(solver.iter() < 30_000, "iter = {}", solver.iter());
    let error = solver.l2_error();
    assert!(error <= 1.2e-2, "L2 error = {error}");
}

#[test]
fn manufactured_sine_second_order_convergence() {
    let mut coarse = solved(manufactured_sine(16, 30_000, 1e-12));
    let mut fine = solved(manufactured_sine(32, 30_000, 1e-12));
    let e16 = coarse.l2_error();
    let e32 = fine.l2_error();
    // Halving h divides the pointwise discretization error by roughly
    // four; the inherited 1/(n−1) norm scale gives back a √2 of that.
    let ratio = e32 / e16;
    assert!(
        (0.25..0.45).contains(&ratio),
        "e16 = {e16}, e32 = {e32}, ratio = {ratio}"
    );
}

#[test]
fn non_convergence_reports_max_iter() {
    // The tolerance is unreachable, so the cap is the exit path.
    let mut spec = ProblemSpec::homogeneous(8, 3, 1e-30, field(|_, _| 0.0));
    spec.bc_top = field(|_, _| 1.0);
    let mut solver = Solver::new(spec, vec![0.0; 64]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    assert_eq!(solver.iter(), 3);
}

#[test]
fn serial_runs_are_bitwise_deterministic() {
    let run = || {
        let mut solver =
            Solver::new(mixed_spec(20, 5_000, 1e-10), vec![0.0; 400]).unwrap();
        solver.solve_jacobi_serial().unwrap();
        (solver.iter(), solver.solution().to_vec())
    };
    let (iter_a, u_a) = run();
    let (iter_b, u_b) = run();
    assert_eq!(iter_a, iter_b);
    assert_eq!(u_a, u_b);
}

#[test]
fn all_jacobi_modes_agree_cellwise() {
    let n = 24;
    let comm = SingleProcessComm;

    let mut serial = Solver::new(mixed_spec(n, 10_000, 1e-10), vec![0.0; n * n]).unwrap();
    serial.solve_jacobi_serial().unwrap();

    let mut shared = Solver::new(mixed_spec(n, 10_000, 1e-10), vec![0.0; n * n]).unwrap();
    shared.solve_jacobi_shared(2).unwrap();

    let mut dist = Solver::new(mixed_spec(n, 10_000, 1e-10), vec![0.0; n * n]).unwrap();
    dist.solve_jacobi_distributed(&comm).unwrap();

    let mut hybrid = Solver::new(mixed_spec(n, 10_000, 1e-10), vec![0.0; n * n]).unwrap();
    hybrid.solve_jacobi_hybrid(&comm, 2).unwrap();

    for other in [&shared, &dist, &hybrid] {
        for (a, b) in serial.solution().iter().zip(other.solution()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }
    // Residual rounding may shift the stopping point by one sweep at most.
    for other in [shared.iter(), dist.iter(), hybrid.iter()] {
        assert!(serial.iter().abs_diff(other) <= 1);
    }
}

#[test]
fn symmetric_problem_yields_symmetric_solution() {
    let n = 24;
    let mut solver = Solver::new(manufactured_sine(n, 10_000, 1e-12), vec![0.0; n * n]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    let u = solver.solution();
    let max = u.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
    for i in 0..n {
        for j in 0..n {
            let skew = (u[i * n + j] - u[j * n + i]).abs();
            assert!(
                skew <= 1e-12 * max,
                "asymmetry at ({i}, {j}): {skew:e}, max = {max:e}"
            );
        }
    }
}

#[test]
fn boundary_cells_survive_the_solve() {
    let n = 16;
    let mut solver = Solver::new(mixed_spec(n, 500, 1e-8), vec![0.0; n * n]).unwrap();
    solver.solve_jacobi_serial().unwrap();

    let spec = mixed_spec(n, 500, 1e-8);
    let mut expected = vec![0.0; n * n];
    grid::apply_boundary(&mut expected, &spec);

    let u = solver.solution();
    for j in 0..n {
        assert_eq!(u[j], expected[j], "top row cell {j}");
        assert_eq!(u[(n - 1) * n + j], expected[(n - 1) * n + j], "bottom row cell {j}");
    }
    for i in 1..n - 1 {
        assert_eq!(u[i * n], expected[i * n], "left column row {i}");
        assert_eq!(u[i * n + n - 1], expected[i * n + n - 1], "right column row {i}");
    }
}

#[test]
fn direct_single_rank_single_step_is_exact() {
    // One outer step with one rank solves the full 5-point system; the
    // iterate must match a tightly converged Jacobi run on the same spec.
    let n = 12;
    let comm = SingleProcessComm;

    let mut direct = Solver::new(manufactured_sine(n, 1, 1e-12), vec![0.0; n * n]).unwrap();
    direct.solve_direct_distributed(&comm).unwrap();
    assert_eq!(direct.iter(), 1);

    let mut jacobi = Solver::new(manufactured_sine(n, 50_000, 1e-14), vec![0.0; n * n]).unwrap();
    jacobi.solve_jacobi_serial().unwrap();
    assert!(jacobi.iter() < 50_000);

    for (d, j) in direct.solution().iter().zip(jacobi.solution()) {
        assert_abs_diff_eq!(d, j, epsilon = 1e-10);
    }
}

#[test]
fn direct_single_rank_converges_on_second_step() {
    // The second outer step re-solves an identical strip system, so the
    // residual collapses and the loop stops.
    let n = 12;
    let comm = SingleProcessComm;
    let mut solver = Solver::new(manufactured_sine(n, 20, 1e-12), vec![0.0; n * n]).unwrap();
    solver.solve_direct_distributed(&comm).unwrap();
    assert_eq!(solver.iter(), 2, "iter = {}", solver.iter());
    assert!(solver.l2_error() <= 6e-2);
}

#[test]
fn direct_matches_iterative_solution() {
    let n = 16;
    let comm = SingleProcessComm;

    let mut direct = Solver::new(manufactured_sine(n, 50, 1e-10), vec![0.0; n * n]).unwrap();
    direct.solve_direct_distributed(&comm).unwrap();

    let mut jacobi = Solver::new(manufactured_sine(n, 50_000, 1e-14), vec![0.0; n * n]).unwrap();
    jacobi.solve_jacobi_serial().unwrap();

    for (d, j) in direct.solution().iter().zip(jacobi.solution()) {
        assert_abs_diff_eq!(d, j, epsilon = 1e-10);
    }
}

#[test]
fn reset_then_resolve_reproduces_the_run() {
    let n = 16;
    let mut solver = Solver::new(mixed_spec(n, 2_000, 1e-9), vec![0.0; n * n]).unwrap();
    solver.solve_jacobi_serial().unwrap();
    let first = solver.solution().to_vec();
    let first_iter = solver.iter();

    solver.reset();
    assert_eq!(solver.iter(), 0);
    solver.solve_jacobi_serial().unwrap();
    assert_eq!(solver.iter(), first_iter);
    assert_eq!(solver.solution(), &first[..]);
}
