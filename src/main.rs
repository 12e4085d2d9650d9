use anyhow::{bail, Result};
use clap::Parser;
use relic_abundance::chart::{BitmapRenderer, ChartRenderer, JsonRenderer};
use relic_abundance::params::{Field, ModelParameters, RawParameters};
use relic_abundance::pipeline::{Pipeline, Report};
use relic_abundance::session::{write_report, Session};
use relic_abundance::solver::{
    BoltzmannSolver, CommandSolver, SolverResult, TabulatedSolver,
};
use relic_abundance::utils::io::{load_parameters, save_series_csv};
use std::io::{stdin, stdout};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "relic",
    version,
    about = "Plot the freeze-out of a dark matter species and its relic density Omega h^2"
)]
struct Cli {
    /// Power of x in the annihilation cross section (non-negative integer).
    #[arg(long, allow_hyphen_values = true)]
    n: Option<String>,
    /// Cross section scale.
    #[arg(long, allow_hyphen_values = true)]
    sigma: Option<String>,
    /// First x = m / T of the integration.
    #[arg(long, allow_hyphen_values = true)]
    x_start: Option<String>,
    /// Last x = m / T of the integration.
    #[arg(long, allow_hyphen_values = true)]
    x_end: Option<String>,
    /// Particle mass.
    #[arg(long, allow_hyphen_values = true)]
    mass: Option<String>,
    /// TOML file with any of n, sigma, x_start, x_end, mass. Flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// External solver program, fed the request as JSON on stdin.
    #[arg(long, conflicts_with = "solution")]
    solver_cmd: Option<PathBuf>,
    /// Extra argument for the solver program (repeatable).
    #[arg(long = "solver-arg", requires = "solver_cmd", allow_hyphen_values = true)]
    solver_args: Vec<String>,
    /// Precomputed solution written by the solver, as csv with a `logx,w` header.
    #[arg(long)]
    solution: Option<PathBuf>,

    /// Image to draw the chart into (.png or .svg).
    #[arg(long, default_value = "relic.png")]
    out: PathBuf,
    /// Also write each chart specification as a line of JSON.
    #[arg(long)]
    spec_json: Option<PathBuf>,
    /// Also write the plotted (x, Y) pairs as csv.
    #[arg(long)]
    series_csv: Option<PathBuf>,

    /// Keep the form open and re-solve on request, reading commands from stdin.
    #[arg(long)]
    interactive: bool,
    /// Write the log to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Starting form: defaults, then the config file, then explicit flags.
    fn form(&self) -> Result<RawParameters> {
        let mut form = match &self.config {
            Some(path) => load_parameters(path)?,
            None => RawParameters::default(),
        };
        let flags = [
            (Field::N, &self.n),
            (Field::Sigma, &self.sigma),
            (Field::XStart, &self.x_start),
            (Field::XEnd, &self.x_end),
            (Field::Mass, &self.mass),
        ];
        for (field, value) in flags {
            if let Some(value) = value {
                form.set(field, value.as_str());
            }
        }
        Ok(form)
    }

    fn solver(&self) -> Result<Backend> {
        match (&self.solver_cmd, &self.solution) {
            (Some(program), None) => Ok(Backend::Command(
                CommandSolver::new(program).args(&self.solver_args),
            )),
            (None, Some(path)) => Ok(Backend::Tabulated(TabulatedSolver::new(path))),
            _ => bail!("choose a solver with --solver-cmd or --solution"),
        }
    }

    fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// The solver backends selectable from the command line.
enum Backend {
    Command(CommandSolver),
    Tabulated(TabulatedSolver),
}

impl BoltzmannSolver for Backend {
    fn solve(&self, request: &ModelParameters) -> Result<SolverResult> {
        match self {
            Backend::Command(solver) => solver.solve(request),
            Backend::Tabulated(solver) => solver.solve(request),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => simple_logging::log_to_file(path, cli.log_level())?,
        None => env_logger::builder().filter_level(cli.log_level()).init(),
    }

    let form = cli.form()?;
    let solver = cli.solver()?;
    let json = match &cli.spec_json {
        Some(path) => Some(JsonRenderer::create(path)?),
        None => None,
    };
    let renderer = (BitmapRenderer::new(&cli.out), json);

    let export = |report: &Report| -> Result<()> {
        if let (Some(path), Some(series)) = (&cli.series_csv, report.series()) {
            save_series_csv(path, series)?;
        }
        Ok(())
    };

    if cli.interactive {
        run_session(solver, renderer, form, export)
    } else {
        let mut pipeline = Pipeline::new(solver, renderer);
        let report = pipeline.run(&form)?;
        write_report(stdout().lock(), &report)?;
        export(&report)
    }
}

fn run_session<R: ChartRenderer>(
    solver: Backend,
    renderer: R,
    form: RawParameters,
    export: impl FnMut(&Report) -> Result<()>,
) -> Result<()> {
    let mut session = Session::new(Pipeline::new(solver, renderer), form);
    session.run(stdin().lock(), stdout().lock(), export)
}
