//! Key-value problem datafile.
//!
//! Lets the driver read the problem definition from a text file instead of
//! hard-coded closures (`--use-datafile`). Expressions on the right-hand
//! side are compiled by [`crate::expr`].
//!
//! # Format
//!
//! ```text
//! # Manufactured sine problem
//! f = 8*pi^2*sin(2*pi*x)*sin(2*pi*y)
//! uex = sin(2*pi*x)*sin(2*pi*y)
//! d_bc_top = 0
//! d_bc_right = 0
//! d_bc_bottom = 0
//! d_bc_left = 0
//! tol = 1e-10
//! max_iter = 10000
//! ```
//!
//! `f` is required. Missing boundary keys default to zero, `uex` is
//! optional, `tol` defaults to 1e-10 and `max_iter` to 1000. Blank lines
//! and `#` comments are skipped.

use crate::error::{PoissonError, Result};
use crate::expr;
use crate::problem::{field, ProblemSpec, ScalarField};

/// Solver controls and problem callables read from a datafile.
pub struct Datafile {
    pub f: ScalarField,
    pub uex: Option<ScalarField>,
    pub bc_top: ScalarField,
    pub bc_right: ScalarField,
    pub bc_bottom: ScalarField,
    pub bc_left: ScalarField,
    pub tol: f64,
    pub max_iter: u32,
}

impl std::fmt::Debug for Datafile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datafile")
            .field("tol", &self.tol)
            .field("max_iter", &self.max_iter)
            .finish_non_exhaustive()
    }
}

impl Datafile {
    /// Turn the parsed file into a problem spec on an n-point grid.
    pub fn into_spec(self, n: usize) -> ProblemSpec {
        ProblemSpec {
            n,
            max_iter: self.max_iter,
            tol: self.tol,
            f: self.f,
            bc_top: self.bc_top,
            bc_right: self.bc_right,
            bc_bottom: self.bc_bottom,
            bc_left: self.bc_left,
            uex: self.uex,
        }
    }
}

/// Parse a datafile string.
pub fn parse(input: &str) -> Result<Datafile> {
    let mut f: Option<ScalarField> = None;
    let mut uex: Option<ScalarField> = None;
    let mut bc_top: Option<ScalarField> = None;
    let mut bc_right: Option<ScalarField> = None;
    let mut bc_bottom: Option<ScalarField> = None;
    let mut bc_left: Option<ScalarField> = None;
    let mut tol = 1e-10;
    let mut max_iter = 1000u32;

    for (line_num, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();

        // Skip blank lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| parse_err(line_num, raw_line, "expected 'key = value'"))?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "f" => f = Some(compile_value(line_num, raw_line, value)?),
            "uex" => uex = Some(compile_value(line_num, raw_line, value)?),
            "d_bc_top" => bc_top = Some(compile_value(line_num, raw_line, value)?),
            "d_bc_right" => bc_right = Some(compile_value(line_num, raw_line, value)?),
            "d_bc_bottom" => bc_bottom = Some(compile_value(line_num, raw_line, value)?),
            "d_bc_left" => bc_left = Some(compile_value(line_num, raw_line, value)?),
            "tol" => {
                tol = value
                    .parse()
                    .map_err(|_| parse_err(line_num, raw_line, "invalid tolerance"))?;
            }
            "max_iter" => {
                max_iter = value
                    .parse()
                    .map_err(|_| parse_err(line_num, raw_line, "invalid max_iter"))?;
            }
            other => {
                return Err(parse_err(
                    line_num,
                    raw_line,
                    &format!("unknown key '{other}'"),
                ));
            }
        }
    }

    let f = f.ok_or_else(|| PoissonError::Parse("datafile is missing the 'f' key".into()))?;
    let zero = || field(|_, _| 0.0);

    Ok(Datafile {
        f,
        uex,
        bc_top: bc_top.unwrap_or_else(zero),
        bc_right: bc_right.unwrap_or_else(zero),
        bc_bottom: bc_bottom.unwrap_or_else(zero),
        bc_left: bc_left.unwrap_or_else(zero),
        tol,
        max_iter,
    })
}

/// Parse a datafile from disk.
pub fn parse_file(path: &str) -> Result<Datafile> {
    let input = std::fs::read_to_string(path)?;
    parse(&input)
}

fn compile_value(line_num: usize, raw_line: &str, value: &str) -> Result<ScalarField> {
    expr::compile(value).map_err(|e| parse_err(line_num, raw_line, &e.to_string()))
}

fn parse_err(line_num: usize, raw_line: &str, detail: &str) -> PoissonError {
    PoissonError::Parse(format!("line {}: {} in: {}", line_num + 1, detail, raw_line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_full_datafile() {
        let src = "\
# Manufactured sine problem
f = 8*pi^2*sin(2*pi*x)*sin(2*pi*y)
uex = sin(2*pi*x)*sin(2*pi*y)
d_bc_top = 0
d_bc_right = 0
d_bc_bottom = 0
d_bc_left = 0
tol = 1e-12
max_iter = 30000
";
        let df = parse(src).unwrap();
        assert!(df.uex.is_some());
        assert_abs_diff_eq!(df.tol, 1e-12, epsilon = 1e-24);
        assert_eq!(df.max_iter, 30000);
        let quarter = (df.f)(0.25, 0.25);
        assert_abs_diff_eq!(
            quarter,
            8.0 * std::f64::consts::PI.powi(2),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_defaults_when_keys_absent() {
        let df = parse("f = 1").unwrap();
        assert!(df.uex.is_none());
        assert_eq!(df.max_iter, 1000);
        assert_abs_diff_eq!(df.tol, 1e-10, epsilon = 1e-22);
        assert_eq!((df.bc_top)(0.3, 1.0), 0.0);
        assert_eq!((df.bc_left)(0.3, 0.0), 0.0);
    }

    #[test]
    fn test_missing_source_term_rejected() {
        let err = parse("tol = 1e-8").unwrap_err();
        assert!(err.to_string().contains("'f'"), "got: {err}");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse("f = 1\nbogus = 2").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2") && msg.contains("bogus"), "got: {msg}");
    }

    #[test]
    fn test_missing_equals_rejected() {
        let err = parse("f 1").unwrap_err();
        assert!(err.to_string().contains("key = value"), "got: {err}");
    }

    #[test]
    fn test_bad_expression_reports_line() {
        let err = parse("f = sin(").unwrap_err();
        assert!(err.to_string().contains("line 1"), "got: {err}");
    }

    #[test]
    fn test_into_spec_carries_controls() {
        let spec = parse("f = 0\ntol = 1e-6\nmax_iter = 7").unwrap().into_spec(16);
        assert_eq!(spec.n, 16);
        assert_eq!(spec.max_iter, 7);
        assert_abs_diff_eq!(spec.tol, 1e-6, epsilon = 1e-18);
        assert!(spec.validate().is_ok());
    }
}
