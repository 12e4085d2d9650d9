//! The chart presenter maps a `PlotSeries` onto a display specification, and the
//! `ChartRenderer` implementations hand that specification to something that draws it.
pub mod bitmap;
pub mod json;

pub use bitmap::BitmapRenderer;
pub use json::JsonRenderer;

use crate::transform::PlotSeries;
use crate::FloatType;
use anyhow::Result;
use serde_derive::Serialize;

pub const X_TITLE: &str = "x = m_χ / T";
pub const Y_TITLE: &str = "Y = n_χ(T) / s(T)";
pub const CHART_HEIGHT: u32 = 640;

/// Anything that displays a `ChartSpec`. Rendering is a terminal side effect,
/// nothing flows back into the pipeline except I/O failures.
pub trait ChartRenderer {
    fn render(&mut self, spec: &ChartSpec) -> Result<()>;
}

impl<R: ChartRenderer + ?Sized> ChartRenderer for &mut R {
    fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        (**self).render(spec)
    }
}

impl<R: ChartRenderer> ChartRenderer for Option<R> {
    fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        match self {
            Some(renderer) => renderer.render(spec),
            None => Ok(()),
        }
    }
}

impl<A: ChartRenderer, B: ChartRenderer> ChartRenderer for (A, B) {
    fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        self.0.render(spec)?;
        self.1.render(spec)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub x: Vec<FloatType>,
    pub y: Vec<FloatType>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Linear,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    #[serde(rename = "type")]
    pub axis_type: AxisType,
    pub autorange: bool,
    /// Explicit tick positions. When set the axis shows exactly these.
    #[serde(rename = "tickvals", skip_serializing_if = "Option::is_none")]
    pub tick_values: Option<Vec<FloatType>>,
    #[serde(rename = "tickformat", skip_serializing_if = "Option::is_none")]
    pub tick_format: Option<String>,
    #[serde(rename = "linewidth")]
    pub line_width: u32,
    #[serde(rename = "showline")]
    pub show_line: bool,
    pub mirror_ticks: bool,
}

/// Display toggles that are not part of the data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Chrome {
    #[serde(rename = "displayModeBar")]
    pub display_mode_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub data: Vec<Trace>,
    #[serde(rename = "xaxis")]
    pub x_axis: Axis,
    #[serde(rename = "yaxis")]
    pub y_axis: Axis,
    pub height: u32,
    pub chrome: Chrome,
}

impl ChartSpec {
    /// The single scatter trace of a presented series.
    pub fn trace(&self) -> Option<&Trace> {
        self.data.first()
    }
}

pub fn title(series: &PlotSeries) -> String {
    match series.relic_density() {
        Some(relic_density) => format!("Ω h² = {relic_density:e}"),
        None => String::from("Ω h² unavailable: the solver returned no samples"),
    }
}

/// Builds the display specification for a series: one scatter trace, the relic density
/// in the title, log axes on both sides and the series' decade ticks on y.
pub fn present(series: &PlotSeries) -> ChartSpec {
    ChartSpec {
        title: title(series),
        data: vec![Trace {
            kind: TraceKind::Scatter,
            x: series.xs().to_vec(),
            y: series.ys().to_vec(),
        }],
        x_axis: Axis {
            title: X_TITLE.to_owned(),
            axis_type: AxisType::Log,
            autorange: true,
            tick_values: None,
            tick_format: None,
            line_width: 2,
            show_line: true,
            mirror_ticks: true,
        },
        y_axis: Axis {
            title: Y_TITLE.to_owned(),
            axis_type: AxisType::Log,
            autorange: false,
            tick_values: Some(series.y_ticks().to_vec()),
            tick_format: Some(String::from("1.0e")),
            line_width: 2,
            show_line: true,
            mirror_ticks: true,
        },
        height: CHART_HEIGHT,
        chrome: Chrome {
            display_mode_bar: false,
        },
    }
}

#[cfg(test)]
fn series(logxs: Vec<FloatType>, ws: Vec<FloatType>) -> PlotSeries {
    use crate::solver::{SolverResult, SolverStatus};

    let result = SolverResult::new(SolverStatus::Success, logxs, ws).unwrap();
    crate::transform::transform(&result, 100.0).unwrap()
}

#[test]
fn test_present_maps_series_unchanged() {
    let series = series(vec![0.0, 2.0, 4.0], vec![-10.0, -15.0, -20.0]);
    let spec = present(&series);

    let trace = spec.trace().unwrap();
    assert_eq!(trace.kind, TraceKind::Scatter);
    assert_eq!(trace.x, series.xs().to_vec());
    assert_eq!(trace.y, series.ys().to_vec());
    assert_eq!(spec.x_axis.axis_type, AxisType::Log);
    assert_eq!(spec.y_axis.axis_type, AxisType::Log);
    assert_eq!(spec.y_axis.tick_values.as_deref(), Some(series.y_ticks()));
    assert!(!spec.chrome.display_mode_bar);
}

#[test]
fn test_title_carries_relic_density() {
    let series = series(vec![0.0, 6.2], vec![-10.0, -20.0]);
    let spec = present(&series);
    let relic_density = series.relic_density().unwrap();

    assert!(spec.title.starts_with("Ω h² = "));
    assert!(spec.title.contains(&format!("{relic_density:e}")));
}

#[test]
fn test_empty_series_presents_an_empty_chart() {
    let spec = present(&series(vec![], vec![]));

    assert!(spec.trace().unwrap().x.is_empty());
    assert_eq!(spec.y_axis.tick_values, Some(vec![]));
    assert!(spec.title.contains("no samples"));
}

#[test]
fn test_spec_serializes_with_chart_library_keys() {
    let spec = present(&series(vec![0.0], vec![-1.0]));
    let json = serde_json::to_value(&spec).unwrap();

    assert_eq!(json["data"][0]["type"], "scatter");
    assert_eq!(json["xaxis"]["type"], "log");
    assert_eq!(json["yaxis"]["tickformat"], "1.0e");
    assert!(json["xaxis"].get("tickvals").is_none());
    assert_eq!(json["chrome"]["displayModeBar"], false);
    assert_eq!(json["height"], 640);
}

#[test]
fn test_combined_renderers_all_run() {
    struct Counter(usize);
    impl ChartRenderer for Counter {
        fn render(&mut self, _spec: &ChartSpec) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    let spec = present(&series(vec![0.0], vec![-1.0]));
    let mut first = Counter(0);
    let mut second = Counter(0);
    let mut skipped: Option<Counter> = None;
    (&mut first, (&mut second, &mut skipped)).render(&spec).unwrap();

    assert_eq!(first.0, 1);
    assert_eq!(second.0, 1);
}
