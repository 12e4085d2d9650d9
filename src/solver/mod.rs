//! This module contains the `BoltzmannSolver` capability through which the external
//! Boltzmann equation solver is reached, the shape of its result, and the backends
//! that talk to concrete solver programs.
pub mod command;
pub mod tabulated;

pub use command::CommandSolver;
pub use tabulated::TabulatedSolver;

use crate::constants::SUCCESS;
use crate::params::ModelParameters;
use crate::FloatType;
use anyhow::{ensure, Result};
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Anything that can integrate the Boltzmann equation for a `ModelParameters` request.
///
/// An `Err` means the backend could not be reached or answered with something that is not a
/// `SolverResult`. A solver that ran but did not converge reports that through `SolverStatus`.
pub trait BoltzmannSolver {
    fn solve(&self, request: &ModelParameters) -> Result<SolverResult>;
}

impl<F> BoltzmannSolver for F
where
    F: Fn(&ModelParameters) -> Result<SolverResult>,
{
    fn solve(&self, request: &ModelParameters) -> Result<SolverResult> {
        self(request)
    }
}

/// Calls the solver exactly once and hands back its result untouched.
pub fn invoke<S: BoltzmannSolver + ?Sized>(
    solver: &S,
    request: &ModelParameters,
) -> Result<SolverResult> {
    info!(
        "solving n = {}, sigma = {:e}, x = [{}, {}], mass = {}",
        request.n(),
        request.sigma(),
        request.x_start(),
        request.x_end(),
        request.mass()
    );
    let result = solver.solve(request)?;
    debug!(
        "solver returned {} samples with status \"{}\"",
        result.size(),
        result.status()
    );
    Ok(result)
}

/// Terminal outcome of a solve, carried over the wire as its plain message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SolverStatus {
    Success,
    TooStiff,
    Failure,
    MaxIterations,
    StepSizeTooSmall,
    SingularJacobian,
    /// Any other message, e.g. a rejected request.
    Other(String),
}

impl SolverStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Success)
    }

    pub fn message(&self) -> &str {
        match self {
            SolverStatus::Success => SUCCESS,
            SolverStatus::TooStiff => "Too stiff",
            SolverStatus::Failure => "Failure",
            SolverStatus::MaxIterations => "Maximum iterations exceeded",
            SolverStatus::StepSizeTooSmall => "Step size too small",
            SolverStatus::SingularJacobian => "Singular jacobian",
            SolverStatus::Other(message) => message,
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl FromStr for SolverStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            SUCCESS => SolverStatus::Success,
            "Too stiff" => SolverStatus::TooStiff,
            "Failure" => SolverStatus::Failure,
            "Maximum iterations exceeded" => SolverStatus::MaxIterations,
            "Step size too small" => SolverStatus::StepSizeTooSmall,
            "Singular jacobian" => SolverStatus::SingularJacobian,
            other => SolverStatus::Other(other.to_owned()),
        })
    }
}

impl From<String> for SolverStatus {
    fn from(message: String) -> Self {
        match message.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<SolverStatus> for String {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Other(message) => message,
            known => known.message().to_owned(),
        }
    }
}

/// Raw output of the solver. `logxs[i]` is ln(x) and `ws[i]` is ln(Y) at sample `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SolverResultWire")]
pub struct SolverResult {
    status: SolverStatus,
    logxs: Vec<FloatType>,
    ws: Vec<FloatType>,
}

// Unchecked mirror used when a result arrives from outside the process
#[derive(Deserialize)]
struct SolverResultWire {
    status: SolverStatus,
    #[serde(default)]
    logxs: Vec<FloatType>,
    #[serde(default)]
    ws: Vec<FloatType>,
}

impl TryFrom<SolverResultWire> for SolverResult {
    type Error = anyhow::Error;

    fn try_from(wire: SolverResultWire) -> Result<Self> {
        SolverResult::new(wire.status, wire.logxs, wire.ws)
    }
}

impl SolverResult {
    pub fn new(status: SolverStatus, logxs: Vec<FloatType>, ws: Vec<FloatType>) -> Result<Self> {
        ensure!(
            logxs.len() == ws.len(),
            "solver returned {} log(x) samples but {} w samples",
            logxs.len(),
            ws.len()
        );
        Ok(SolverResult { status, logxs, ws })
    }

    /// A result that carries no samples, only a status.
    pub fn failed(status: SolverStatus) -> Self {
        SolverResult {
            status,
            logxs: vec![],
            ws: vec![],
        }
    }

    pub fn status(&self) -> &SolverStatus {
        &self.status
    }

    pub fn size(&self) -> usize {
        self.logxs.len()
    }

    pub fn logx(&self, i: usize) -> FloatType {
        self.logxs[i]
    }

    pub fn w(&self, i: usize) -> FloatType {
        self.ws[i]
    }

    /// Iterates over `(ln x, ln Y)` pairs in sample order.
    pub fn samples(&self) -> impl Iterator<Item = (FloatType, FloatType)> + '_ {
        self.logxs.iter().copied().zip(self.ws.iter().copied())
    }
}

#[test]
fn test_status_strings_round_trip_through_serde() {
    let statuses = [
        (SolverStatus::Success, "\"Success\""),
        (SolverStatus::TooStiff, "\"Too stiff\""),
        (SolverStatus::SingularJacobian, "\"Singular jacobian\""),
        (
            SolverStatus::Other("Errored with: Invalid sigma.".to_owned()),
            "\"Errored with: Invalid sigma.\"",
        ),
    ];
    for (status, json) in statuses {
        assert_eq!(serde_json::to_string(&status).unwrap(), json);
        assert_eq!(serde_json::from_str::<SolverStatus>(json).unwrap(), status);
    }
}

#[test]
fn test_unknown_status_is_not_success() {
    let status: SolverStatus = "Diverged".parse().unwrap();
    assert_eq!(status, SolverStatus::Other("Diverged".to_owned()));
    assert!(!status.is_success());
    assert_eq!(status.to_string(), "Diverged");
}

#[test]
fn test_mismatched_lengths_are_rejected() {
    assert!(SolverResult::new(SolverStatus::Success, vec![0.0, 1.0], vec![-1.0]).is_err());

    let json = r#"{"status": "Success", "logxs": [0.0], "ws": []}"#;
    assert!(serde_json::from_str::<SolverResult>(json).is_err());
}

#[test]
fn test_failed_result_deserializes_without_samples() {
    let result: SolverResult = serde_json::from_str(r#"{"status": "Too stiff"}"#).unwrap();
    assert_eq!(result.status(), &SolverStatus::TooStiff);
    assert_eq!(result.size(), 0);
}

#[test]
fn test_invoke_calls_solver_once() {
    use std::cell::Cell;

    let calls = Cell::new(0);
    let solver = |_: &ModelParameters| {
        calls.set(calls.get() + 1);
        SolverResult::new(SolverStatus::Success, vec![0.0], vec![-3.0])
    };
    let parameters = crate::params::RawParameters::default().validate().parameters;

    let result = invoke(&solver, &parameters).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(result.size(), 1);
    assert_eq!(result.logx(0), 0.0);
    assert_eq!(result.w(0), -3.0);
}
