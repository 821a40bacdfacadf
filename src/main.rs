use clap::{Parser, ValueEnum};
use poisson2d::datafile;
use poisson2d::problem::{field, ProblemSpec};
use poisson2d::solver::Solver;
use poisson2d::vtk;
use std::f64::consts::PI;
use std::time::Instant;

/// Distributed iterative solver for the 2D Poisson problem
#[derive(Parser)]
#[command(name = "poisson2d", version)]
struct Cli {
    /// Grid dimension (points per side)
    #[arg(short, long, default_value_t = 32)]
    n: usize,

    /// Execution mode
    #[arg(long, value_enum, default_value = "serial")]
    mode: Mode,

    /// Read the problem definition from a key-value datafile
    #[arg(short = 'd', long = "use-datafile", value_name = "FILE")]
    use_datafile: Option<String>,

    /// Worker threads for shared/hybrid modes (0 = all cores)
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Output VTK file
    #[arg(short, long, default_value = "output.vtk")]
    output: String,

    /// Print performance stats to stderr
    #[arg(long)]
    stats: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Serial,
    Shared,
    Distributed,
    Hybrid,
    Direct,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut stats = if cli.stats {
        Some(poisson2d::stats::Stats::new())
    } else {
        None
    };

    let spec = match &cli.use_datafile {
        Some(path) => {
            let parsed = datafile::parse_file(path).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", path, e);
                std::process::exit(1);
            });
            parsed.into_spec(cli.n)
        }
        None => manufactured_sine(cli.n),
    };

    let n = spec.n;
    let mut solver = Solver::new(spec, vec![0.0; n * n]).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let rank = run_solve(&mut solver, cli.mode, cli.workers);
    if let Some(ref mut stats) = stats {
        stats.add_phase("solve", start.elapsed());
        stats.outer_iterations = solver.iter();
    }

    // Only the root rank holds the gathered field; it alone reports.
    if rank == 0 {
        println!("iterations: {}", solver.iter());
        let error = solver.l2_error();
        if error >= 0.0 {
            println!("L2 error:   {:e}", error);
        }
        if let Err(e) = vtk::write_file(solver.solution(), n, &cli.output) {
            eprintln!("Output error: {}", e);
            std::process::exit(1);
        }
        if let Some(ref stats) = stats {
            stats.display();
        }
    }
}

/// Dispatch the requested mode; returns this process's rank.
fn run_solve(solver: &mut Solver, mode: Mode, workers: usize) -> usize {
    let result = match mode {
        Mode::Serial => solver.solve_jacobi_serial().map(|()| 0),
        Mode::Shared => solver.solve_jacobi_shared(workers).map(|()| 0),
        Mode::Distributed | Mode::Hybrid | Mode::Direct => {
            distributed_solve(solver, mode, workers)
        }
    };
    result.unwrap_or_else(|e| {
        eprintln!("Solve error: {}", e);
        std::process::exit(1);
    })
}

#[cfg(feature = "distributed")]
fn distributed_solve(
    solver: &mut Solver,
    mode: Mode,
    workers: usize,
) -> poisson2d::error::Result<usize> {
    use poisson2d::solver::comm::CommunicationBackend;
    use poisson2d::solver::comm_mpi::MpiComm;

    // The universe finalizes MPI when it drops at the end of the solve.
    let _universe = mpi::initialize().expect("MPI init failed");
    let comm = MpiComm::new();
    match mode {
        Mode::Distributed => solver.solve_jacobi_distributed(&comm)?,
        Mode::Hybrid => solver.solve_jacobi_hybrid(&comm, workers)?,
        Mode::Direct => solver.solve_direct_distributed(&comm)?,
        _ => unreachable!(),
    }
    Ok(comm.rank())
}

#[cfg(not(feature = "distributed"))]
fn distributed_solve(
    solver: &mut Solver,
    mode: Mode,
    workers: usize,
) -> poisson2d::error::Result<usize> {
    use poisson2d::solver::comm::{CommunicationBackend, SingleProcessComm};

    // Without an MPI runtime the distributed modes still run, on a
    // single in-process rank.
    eprintln!(
        "note: built without the 'distributed' feature; running {:?} mode on a single rank",
        mode
    );
    let comm = SingleProcessComm;
    match mode {
        Mode::Distributed => solver.solve_jacobi_distributed(&comm)?,
        Mode::Hybrid => solver.solve_jacobi_hybrid(&comm, workers)?,
        Mode::Direct => solver.solve_direct_distributed(&comm)?,
        _ => unreachable!(),
    }
    Ok(comm.rank())
}

/// The default manufactured problem: u = sin(2πx)·sin(2πy) with
/// f = 8π²·sin(2πx)·sin(2πy) and homogeneous boundary data.
fn manufactured_sine(n: usize) -> ProblemSpec {
    let mut spec = ProblemSpec::homogeneous(
        n,
        30_000,
        1e-10,
        field(|x, y| 8.0 * PI * PI * (2.0 * PI * x).sin() * (2.0 * PI * y).sin()),
    );
    spec.uex = Some(field(|x, y| (2.0 * PI * x).sin() * (2.0 * PI * y).sin()));
    spec
}
