use crate::chart::ChartRenderer;
use crate::params::{Field, RawParameters};
use crate::pipeline::{Outcome, Pipeline, Report};
use crate::solver::BoltzmannSolver;
use anyhow::{anyhow, Result};
use log::debug;
use std::io::{BufRead, Write};
use std::str::FromStr;

const HELP: &str = "\
commands:
  <field> = <value>   edit the form (fields: n, sigma, x-start, x-end, mass)
  solve               run the solver on the current form (an empty line does the same)
  show                print the current form
  help                print this message
  quit                leave";

/// One line of user input in an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(Field, String),
    Solve,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        match line {
            "" | "solve" => return Ok(Command::Solve),
            "show" => return Ok(Command::Show),
            "help" | "?" => return Ok(Command::Help),
            "quit" | "exit" => return Ok(Command::Quit),
            _ => {}
        }
        let (field, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow!("unknown command `{line}`, try `help`"))?;
        Ok(Command::Set(field.parse()?, value.trim().to_owned()))
    }
}

/// Writes the notices of a report followed by its result.
pub fn write_report<W: Write>(mut output: W, report: &Report) -> Result<()> {
    for notice in report.notices() {
        writeln!(output, "! {notice}")?;
    }
    if let Outcome::Plotted(series) = &report.outcome {
        match series.relic_density() {
            Some(relic_density) => writeln!(
                output,
                "Omega h^2 = {relic_density:e} ({} samples)",
                series.len()
            )?,
            None => writeln!(output, "the solver returned no samples")?,
        }
    }
    Ok(())
}

/// Holds the form between solves. Each solve runs on a snapshot of the form at that moment.
pub struct Session<S, R> {
    pipeline: Pipeline<S, R>,
    form: RawParameters,
}

impl<S: BoltzmannSolver, R: ChartRenderer> Session<S, R> {
    pub fn new(pipeline: Pipeline<S, R>, form: RawParameters) -> Self {
        Session { pipeline, form }
    }

    pub fn form(&self) -> &RawParameters {
        &self.form
    }

    pub fn pipeline(&self) -> &Pipeline<S, R> {
        &self.pipeline
    }

    pub fn solve(&mut self) -> Result<Report> {
        let snapshot = self.form.clone();
        self.pipeline.run(&snapshot)
    }

    /// Solves once, then reads commands from `input` until `quit` or end of input.
    /// `after_solve` sees every report, e.g. to export the series.
    pub fn run<I, O, F>(&mut self, input: I, mut output: O, mut after_solve: F) -> Result<()>
    where
        I: BufRead,
        O: Write,
        F: FnMut(&Report) -> Result<()>,
    {
        let report = self.solve()?;
        write_report(&mut output, &report)?;
        after_solve(&report)?;

        for line in input.lines() {
            let line = line?;
            debug!("session input: {line}");
            match line.parse::<Command>() {
                Err(err) => writeln!(output, "{err}")?,
                Ok(Command::Set(field, value)) => self.form.set(field, value),
                Ok(Command::Solve) => {
                    let report = self.solve()?;
                    write_report(&mut output, &report)?;
                    after_solve(&report)?;
                }
                Ok(Command::Show) => {
                    for field in Field::ALL {
                        writeln!(output, "{field} = {}", self.form.get(field))?;
                    }
                }
                Ok(Command::Help) => writeln!(output, "{HELP}")?,
                Ok(Command::Quit) => break,
            }
        }
        Ok(())
    }
}

#[test]
fn test_commands_parse() {
    assert_eq!("".parse::<Command>().unwrap(), Command::Solve);
    assert_eq!(" solve ".parse::<Command>().unwrap(), Command::Solve);
    assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    assert_eq!(
        "x-start = 3.5".parse::<Command>().unwrap(),
        Command::Set(Field::XStart, "3.5".to_owned())
    );
    assert_eq!(
        "mass=".parse::<Command>().unwrap(),
        Command::Set(Field::Mass, String::new())
    );
    assert!("temperature = 3".parse::<Command>().is_err());
    assert!("plot".parse::<Command>().is_err());
}

#[cfg(test)]
struct Count(usize);

#[cfg(test)]
impl ChartRenderer for Count {
    fn render(&mut self, _spec: &crate::chart::ChartSpec) -> Result<()> {
        self.0 += 1;
        Ok(())
    }
}

#[cfg(test)]
fn two_samples(
    request: &crate::params::ModelParameters,
) -> Result<crate::solver::SolverResult> {
    crate::solver::SolverResult::new(
        crate::solver::SolverStatus::Success,
        vec![request.x_start().ln(), request.x_end().ln()],
        vec![-10.0, -20.0],
    )
}

#[test]
fn test_session_solves_at_load_and_on_request() {
    let pipeline = Pipeline::new(two_samples, Count(0));
    let mut session = Session::new(pipeline, RawParameters::default());
    let input = "mass = -1\nsolve\nbogus\nn = 2\n\nquit\nsolve\n";
    let mut output = Vec::new();
    let mut reports = vec![];

    session
        .run(input.as_bytes(), &mut output, |report| {
            reports.push(report.clone());
            Ok(())
        })
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    // Load, explicit solve, empty line. Nothing after quit.
    assert_eq!(reports.len(), 3);
    assert_eq!(session.pipeline().renderer().0, 3);
    assert!(output.contains("! Invalid mass = \"-1\". Must be > 0. Using 100."));
    assert!(output.contains("unknown command `bogus`"));
    assert_eq!(reports[2].parameters.n(), 2);
    assert_eq!(reports[2].corrections.len(), 1);
}

#[test]
fn test_session_reports_solver_failure() {
    let failing = |_: &crate::params::ModelParameters| -> Result<crate::solver::SolverResult> {
        Ok(crate::solver::SolverResult::failed(
            crate::solver::SolverStatus::TooStiff,
        ))
    };
    let mut session = Session::new(Pipeline::new(failing, Count(0)), RawParameters::default());
    let mut output = Vec::new();

    session.run("".as_bytes(), &mut output, |_| Ok(())).unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(output, "! Too stiff\n");
    assert_eq!(session.pipeline().renderer().0, 0);
}

#[test]
fn test_show_prints_the_form() {
    let mut form = RawParameters::default();
    form.set(Field::Sigma, "2e-9");
    let mut session = Session::new(Pipeline::new(two_samples, Count(0)), form);
    let mut output = Vec::new();

    session.run("show\n".as_bytes(), &mut output, |_| Ok(())).unwrap();
    let output = String::from_utf8(output).unwrap();

    assert!(output.contains("sigma = \"2e-9\""));
    assert!(output.contains("x-end = 500"));
    assert_eq!(
        session.form().sigma,
        crate::params::RawValue::Text("2e-9".to_owned())
    );
}
