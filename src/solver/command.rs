use super::{BoltzmannSolver, SolverResult};
use crate::params::ModelParameters;
use anyhow::{bail, Context, Result};
use log::{debug, trace};
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Runs an external solver program once per request.
///
/// The request is written to the program's stdin as a JSON object with the fields
/// `n`, `sigma`, `x_start`, `x_end` and `mass`. The program must print a JSON
/// `SolverResult` (`{"status": .., "logxs": [..], "ws": [..]}`) on stdout and exit with 0.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandSolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSolver {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl BoltzmannSolver for CommandSolver {
    fn solve(&self, request: &ModelParameters) -> Result<SolverResult> {
        let payload = serde_json::to_vec(request)?;
        trace!("sending {}", String::from_utf8_lossy(&payload));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start solver {}", self.program.display()))?;

        // Dropping stdin closes the pipe so the solver sees end of input
        {
            let mut stdin = child
                .stdin
                .take()
                .context("solver stdin was not captured")?;
            match stdin.write_all(&payload) {
                // A solver that quit early is reported through its exit status below
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
                other => other.context("failed to send request to solver")?,
            }
        }

        let output = child
            .wait_with_output()
            .context("failed to wait for solver")?;
        if !output.status.success() {
            bail!(
                "solver {} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        debug!("solver wrote {} bytes", output.stdout.len());

        serde_json::from_slice(&output.stdout).context("solver output is not a valid result")
    }
}

#[cfg(unix)]
#[test]
fn test_command_solver_reads_json_result() {
    let script = r#"cat > /dev/null; echo '{"status": "Success", "logxs": [0.0, 1.0], "ws": [-10.0, -12.0]}'"#;
    let solver = CommandSolver::new("sh").args(["-c", script]);
    let parameters = crate::params::RawParameters::default().validate().parameters;

    let result = solver.solve(&parameters).unwrap();
    assert!(result.status().is_success());
    assert_eq!(result.size(), 2);
    assert_eq!(result.w(1), -12.0);
}

#[cfg(unix)]
#[test]
fn test_command_solver_passes_request_on_stdin() {
    // Echo the request's mass back as the only w sample
    let script = r#"mass=$(sed -e 's/.*"mass":\([0-9.]*\).*/\1/'); echo "{\"status\": \"Success\", \"logxs\": [0.0], \"ws\": [$mass]}""#;
    let solver = CommandSolver::new("sh").args(["-c", script]);
    let parameters = crate::params::RawParameters::default().validate().parameters;

    let result = solver.solve(&parameters).unwrap();
    assert_eq!(result.w(0), 100.0);
}

#[cfg(unix)]
#[test]
fn test_command_solver_failure_exit_is_an_error() {
    let solver = CommandSolver::new("sh").args(["-c", "echo boom >&2; exit 3"]);
    let parameters = crate::params::RawParameters::default().validate().parameters;

    let error = solver.solve(&parameters).unwrap_err();
    assert!(error.to_string().contains("boom"));
}

#[test]
fn test_missing_program_is_an_error() {
    let solver = CommandSolver::new("/nonexistent/boltzmann-solver");
    let parameters = crate::params::RawParameters::default().validate().parameters;

    assert!(solver.solve(&parameters).is_err());
}
