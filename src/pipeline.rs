use crate::chart::{present, ChartRenderer};
use crate::params::{Correction, ModelParameters, RawParameters, Validated};
use crate::solver::{self, BoltzmannSolver};
use crate::transform::{transform, PlotSeries, TransformError};
use anyhow::Result;
use log::{info, warn};

/// How a single solve ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The series was handed to the renderer. It may be empty.
    Plotted(PlotSeries),
    /// Terminal failure for this request, either the solver's status or why it could not be run.
    Failed(String),
}

/// Everything one run of the pipeline produced, for the caller to surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub parameters: ModelParameters,
    pub corrections: Vec<Correction>,
    pub outcome: Outcome,
}

impl Report {
    pub fn series(&self) -> Option<&PlotSeries> {
        match &self.outcome {
            Outcome::Plotted(series) => Some(series),
            Outcome::Failed(_) => None,
        }
    }

    /// User-facing notices in the order they arose: one per correction, then the failure.
    pub fn notices(&self) -> Vec<String> {
        let mut notices: Vec<String> = self.corrections.iter().map(ToString::to_string).collect();
        if let Outcome::Failed(message) = &self.outcome {
            notices.push(message.clone());
        }
        notices
    }
}

/// Validator, gateway, transformer and presenter wired together. Each `run` is one
/// user action and completes before the next can start.
pub struct Pipeline<S, R> {
    solver: S,
    renderer: R,
}

impl<S: BoltzmannSolver, R: ChartRenderer> Pipeline<S, R> {
    pub fn new(solver: S, renderer: R) -> Self {
        Pipeline { solver, renderer }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs the whole pipeline on a snapshot of the form.
    ///
    /// Only rendering I/O errors are returned as `Err`. Input violations end up in
    /// `Report::corrections` and solver problems in `Outcome::Failed`.
    pub fn run(&mut self, form: &RawParameters) -> Result<Report> {
        let Validated {
            parameters,
            corrections,
        } = form.validate();

        let outcome = match solver::invoke(&self.solver, &parameters) {
            Err(err) => {
                warn!("solver could not be run: {err:#}");
                Outcome::Failed(format!("Solver error: {err:#}"))
            }
            Ok(result) => match transform(&result, parameters.mass()) {
                Err(TransformError::SolverFailed(status)) => Outcome::Failed(status.to_string()),
                Ok(series) => {
                    self.renderer.render(&present(&series))?;
                    if let Some(relic_density) = series.relic_density() {
                        info!("Omega h^2 = {relic_density:e}");
                    }
                    Outcome::Plotted(series)
                }
            },
        };

        Ok(Report {
            parameters,
            corrections,
            outcome,
        })
    }
}

#[cfg(test)]
#[derive(Default)]
struct Recorder(Vec<crate::chart::ChartSpec>);

#[cfg(test)]
impl ChartRenderer for Recorder {
    fn render(&mut self, spec: &crate::chart::ChartSpec) -> Result<()> {
        self.0.push(spec.clone());
        Ok(())
    }
}

#[cfg(test)]
fn freeze_out(_: &ModelParameters) -> Result<crate::solver::SolverResult> {
    crate::solver::SolverResult::new(
        crate::solver::SolverStatus::Success,
        vec![0.0, 500.0_f64.ln()],
        vec![-10.0, -20.0],
    )
}

#[test]
fn test_default_form_is_plotted() {
    let mut pipeline = Pipeline::new(freeze_out, Recorder::default());
    let report = pipeline.run(&RawParameters::default()).unwrap();

    assert!(report.corrections.is_empty());
    assert!(report.notices().is_empty());
    let series = report.series().unwrap();
    assert_eq!(
        series.relic_density(),
        Some((2891.2 / 1.05375e-5) * 100.0 * (-20.0_f64).exp())
    );

    let rendered = &pipeline.renderer().0;
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].trace().unwrap().y, series.ys().to_vec());
}

#[test]
fn test_relic_density_uses_validated_mass() {
    let mut form = RawParameters::default();
    form.set(crate::params::Field::Mass, "-5");
    let mut pipeline = Pipeline::new(freeze_out, Recorder::default());
    let report = pipeline.run(&form).unwrap();

    assert_eq!(report.corrections.len(), 1);
    assert_eq!(
        report.series().unwrap().relic_density(),
        Some(crate::transform::relic_density(100.0, (-20.0_f64).exp()))
    );
}

#[test]
fn test_solver_failure_is_a_terminal_notice() {
    let diverged = |_: &ModelParameters| -> Result<crate::solver::SolverResult> {
        Ok(crate::solver::SolverResult::failed(
            crate::solver::SolverStatus::Other("Diverged".to_owned()),
        ))
    };
    let mut pipeline = Pipeline::new(diverged, Recorder::default());
    let report = pipeline.run(&RawParameters::default()).unwrap();

    assert!(report.series().is_none());
    assert_eq!(report.notices(), vec![String::from("Diverged")]);
    assert!(pipeline.renderer().0.is_empty());
}

#[test]
fn test_unreachable_solver_is_a_terminal_notice() {
    let broken = |_: &ModelParameters| -> Result<crate::solver::SolverResult> {
        Err(anyhow::anyhow!("connection refused"))
    };
    let mut pipeline = Pipeline::new(broken, Recorder::default());
    let report = pipeline.run(&RawParameters::default()).unwrap();

    let notices = report.notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("connection refused"));
    assert!(pipeline.renderer().0.is_empty());
}

#[test]
fn test_empty_domain_is_reset_before_solving() {
    use std::cell::RefCell;

    let seen = RefCell::new(vec![]);
    let solver = |request: &ModelParameters| {
        seen.borrow_mut().push((request.x_start(), request.x_end()));
        freeze_out(request)
    };
    let mut form = RawParameters::default();
    form.set(crate::params::Field::XStart, 10.0);
    form.set(crate::params::Field::XEnd, 10.0);

    let mut pipeline = Pipeline::new(solver, Recorder::default());
    let report = pipeline.run(&form).unwrap();

    assert_eq!(report.notices().len(), 1);
    assert_eq!(*seen.borrow(), vec![(1.0, 500.0)]);
}

#[test]
fn test_empty_solve_renders_an_empty_chart() {
    let empty = |_: &ModelParameters| {
        crate::solver::SolverResult::new(crate::solver::SolverStatus::Success, vec![], vec![])
    };
    let mut pipeline = Pipeline::new(empty, Recorder::default());
    let report = pipeline.run(&RawParameters::default()).unwrap();

    assert!(report.series().unwrap().is_empty());
    assert!(report.notices().is_empty());
    assert_eq!(pipeline.renderer().0.len(), 1);
}

#[test]
fn test_repeated_runs_are_identical() {
    let mut pipeline = Pipeline::new(freeze_out, Recorder::default());
    let form = RawParameters::default();
    let first = pipeline.run(&form).unwrap();
    let second = pipeline.run(&form).unwrap();

    assert_eq!(first, second);
    assert_eq!(pipeline.renderer().0[0], pipeline.renderer().0[1]);
}
