//! VTK STRUCTURED_GRID writer for solution fields.
//!
//! Emits the ASCII legacy format: header, point coordinates normalized to
//! the unit square, then the scalar values in the same row-major sweep.
//! Generic over `io::Write` so tests can capture the output in memory.

use crate::error::Result;
use std::io::Write;

/// Write an n×n row-major field as a VTK structured grid.
pub fn write<W: Write>(grid: &[f64], n: usize, writer: &mut W) -> Result<()> {
    debug_assert_eq!(grid.len(), n * n);
    let spacing = 1.0 / (n as f64 - 1.0);

    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "vtk output")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET STRUCTURED_GRID")?;
    writeln!(writer, "DIMENSIONS {} {} 1", n, n)?;
    writeln!(writer, "POINTS {} float", n * n)?;
    for i in 0..n {
        for j in 0..n {
            writeln!(writer, "{} {} 0", i as f64 * spacing, j as f64 * spacing)?;
        }
    }
    writeln!(writer)?;
    writeln!(writer)?;
    writeln!(writer, "POINT_DATA {}", n * n)?;
    writeln!(writer, "SCALARS values float")?;
    writeln!(writer, "LOOKUP_TABLE default")?;
    for i in 0..n {
        for j in 0..n {
            writeln!(writer, "{}", grid[i * n + j])?;
        }
    }
    Ok(())
}

/// Write the field to a file on disk.
pub fn write_file(grid: &[f64], n: usize, path: &str) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write(grid, n, &mut file)
}
