use super::{ChartRenderer, ChartSpec};
use crate::FloatType;
use anyhow::{anyhow, Result};
use itertools::{Itertools, MinMaxResult};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::PathBuf;

const CHART_WIDTH: u32 = 1024;

/// Draws the chart into an image file with plotters. A `.svg` path gets an SVG,
/// anything else a PNG.
#[derive(Debug, Clone)]
pub struct BitmapRenderer {
    path: PathBuf,
    width: u32,
}

impl BitmapRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        BitmapRenderer {
            path: path.into(),
            width: CHART_WIDTH,
        }
    }

    fn is_svg(&self) -> bool {
        self.path
            .extension()
            .map_or(false, |extension| extension.eq_ignore_ascii_case("svg"))
    }
}

impl ChartRenderer for BitmapRenderer {
    fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        let size = (self.width, spec.height);
        if self.is_svg() {
            let root = SVGBackend::new(&self.path, size).into_drawing_area();
            draw_chart(&root, spec)?;
        } else {
            let root = BitMapBackend::new(&self.path, size).into_drawing_area();
            draw_chart(&root, spec)?;
        }
        info!("chart has been saved to {}", self.path.display());
        Ok(())
    }
}

fn plot_err(err: impl Display) -> anyhow::Error {
    anyhow!("failed to draw chart: {err}")
}

/// Smallest and largest strictly positive value, the only ones a log axis can show.
pub(crate) fn positive_range(values: &[FloatType]) -> Option<(FloatType, FloatType)> {
    match values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .minmax()
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

/// Widens a degenerate log range by a decade on each side.
pub(crate) fn log_span((lo, hi): (FloatType, FloatType)) -> (FloatType, FloatType) {
    if lo < hi {
        (lo, hi)
    } else {
        (lo / 10.0, hi * 10.0)
    }
}

fn draw_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()> {
    root.fill(&WHITE).map_err(plot_err)?;

    let (xs, ys) = match spec.trace() {
        Some(trace) => (trace.x.as_slice(), trace.y.as_slice()),
        None => (&[][..], &[][..]),
    };
    let ticks = spec.y_axis.tick_values.clone().unwrap_or_default();

    let x_range = log_span(positive_range(xs).unwrap_or((1.0, 10.0)));
    let y_range = match ticks.as_slice() {
        [first, .., last] => (*first, *last),
        _ => log_span(positive_range(ys).unwrap_or((0.1, 1.0))),
    };
    let key_points = if ticks.is_empty() {
        vec![y_range.0, y_range.1]
    } else {
        ticks
    };

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(
            (x_range.0..x_range.1).log_scale(),
            (y_range.0..y_range.1).log_scale().with_key_points(key_points),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_axis.title.as_str())
        .y_desc(spec.y_axis.title.as_str())
        .y_label_formatter(&|y: &FloatType| format!("{y:.0e}"))
        .axis_style(BLACK.stroke_width(spec.y_axis.line_width))
        .axis_desc_style(("sans-serif", 20))
        .draw()
        .map_err(plot_err)?;

    let points: Vec<(FloatType, FloatType)> = xs
        .iter()
        .copied()
        .zip(ys.iter().copied())
        .filter(|(x, y)| *x > 0.0 && *y > 0.0)
        .collect();
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&point| Circle::new(point, 3, BLUE.filled())),
        )
        .map_err(plot_err)?;

    // To avoid the IO failure being ignored silently, we manually call the present function
    root.present().map_err(plot_err)?;
    Ok(())
}

#[test]
fn test_positive_range_skips_unplottable_values() {
    assert_eq!(
        positive_range(&[0.0, 3.0, -1.0, 1e-20, FloatType::NAN, 7.0]),
        Some((1e-20, 7.0))
    );
    assert_eq!(positive_range(&[0.0, -2.0]), None);
    assert_eq!(positive_range(&[4.0]), Some((4.0, 4.0)));
}

#[test]
fn test_log_span_widens_single_points() {
    assert_eq!(log_span((1.0, 500.0)), (1.0, 500.0));
    assert_eq!(log_span((5.0, 5.0)), (0.5, 50.0));
}

#[test]
fn test_svg_is_chosen_by_extension() {
    assert!(BitmapRenderer::new("omega.SVG").is_svg());
    assert!(!BitmapRenderer::new("omega.png").is_svg());
    assert!(!BitmapRenderer::new("omega").is_svg());
}

#[test]
fn test_render_writes_an_svg() {
    use crate::solver::{SolverResult, SolverStatus};

    let result =
        SolverResult::new(SolverStatus::Success, vec![0.0, 500.0_f64.ln()], vec![-10.0, -20.0])
            .unwrap();
    let spec = super::present(&crate::transform::transform(&result, 100.0).unwrap());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("omega.svg");
    BitmapRenderer::new(&path).render(&spec).unwrap();

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains(super::Y_TITLE));
}

#[test]
fn test_render_empty_chart() {
    use crate::solver::{SolverResult, SolverStatus};

    let result = SolverResult::new(SolverStatus::Success, vec![], vec![]).unwrap();
    let spec = super::present(&crate::transform::transform(&result, 100.0).unwrap());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.svg");

    BitmapRenderer::new(&path).render(&spec).unwrap();
    assert!(path.exists());
}
