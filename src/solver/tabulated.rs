use super::{BoltzmannSolver, SolverResult, SolverStatus};
use crate::params::ModelParameters;
use crate::FloatType;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde_derive::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct SampleCsvEntry {
    logx: FloatType,
    w: FloatType,
}

/// Serves a solution the solver already wrote to disk, as a csv file with a `logx,w` header.
///
/// The file is re-read on every request, so a solver running next to this process
/// can refresh it between solves.
#[derive(Debug, Clone)]
pub struct TabulatedSolver {
    path: PathBuf,
}

impl TabulatedSolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TabulatedSolver { path: path.into() }
    }
}

impl BoltzmannSolver for TabulatedSolver {
    fn solve(&self, request: &ModelParameters) -> Result<SolverResult> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open solution at {}", self.path.display()))?;

        let mut logxs = vec![];
        let mut ws = vec![];
        for row in reader.deserialize::<SampleCsvEntry>() {
            let entry = row.with_context(|| format!("bad row in {}", self.path.display()))?;
            logxs.push(entry.logx);
            ws.push(entry.w);
        }
        debug!("read {} samples from {}", logxs.len(), self.path.display());

        // The table was produced for some request, only the domain can be cross-checked
        if let (Some(first), Some(last)) = (logxs.first(), logxs.last()) {
            let (lo, hi) = (request.x_start().ln(), request.x_end().ln());
            if (first - lo).abs() > 1e-6 || (last - hi).abs() > 1e-6 {
                warn!(
                    "tabulated solution spans x = [{}, {}], request asked for [{}, {}]",
                    first.exp(),
                    last.exp(),
                    request.x_start(),
                    request.x_end()
                );
            }
        }

        SolverResult::new(SolverStatus::Success, logxs, ws)
    }
}

#[test]
fn test_reads_logx_w_columns() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "logx, w").unwrap();
    writeln!(file, "0.0, -10.0").unwrap();
    writeln!(file, "6.214608098422191, -20.0").unwrap();
    file.flush().unwrap();

    let solver = TabulatedSolver::new(file.path());
    let parameters = crate::params::RawParameters::default().validate().parameters;
    let result = solver.solve(&parameters).unwrap();

    assert!(result.status().is_success());
    assert_eq!(result.size(), 2);
    assert_eq!(result.logx(1), 6.214608098422191);
    assert_eq!(result.w(0), -10.0);
}

#[test]
fn test_header_only_file_is_an_empty_solution() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "logx,w").unwrap();
    file.flush().unwrap();

    let solver = TabulatedSolver::new(file.path());
    let parameters = crate::params::RawParameters::default().validate().parameters;
    let result = solver.solve(&parameters).unwrap();

    assert!(result.status().is_success());
    assert_eq!(result.size(), 0);
}

#[test]
fn test_missing_file_is_an_error() {
    let solver = TabulatedSolver::new("/nonexistent/solution.csv");
    let parameters = crate::params::RawParameters::default().validate().parameters;

    assert!(solver.solve(&parameters).is_err());
}
