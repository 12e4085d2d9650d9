use crate::params::RawParameters;
use crate::transform::PlotSeries;
use anyhow::{Context, Result};
use serde_derive::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SeriesCsvEntry {
    x: f64,
    y: f64,
}

/// Writes the plotted `(x, Y)` pairs as csv with an `x,y` header.
pub fn write_series_csv<W: Write>(writer: W, series: &PlotSeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (&x, &y) in series.xs().iter().zip(series.ys().iter()) {
        writer.serialize(SeriesCsvEntry { x, y })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_series_csv(path: impl AsRef<Path>, series: &PlotSeries) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create series file {}", path.display()))?;
    write_series_csv(file, series)
}

/// Reads a TOML table of raw parameters, e.g. `mass = 250` or `sigma = "1e-8"`.
/// Missing keys keep their default values.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<RawParameters> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read parameters from {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid parameter file {}", path.display()))
}

#[test]
fn test_series_csv_has_header_and_rows() {
    use crate::solver::{SolverResult, SolverStatus};

    let result = SolverResult::new(SolverStatus::Success, vec![0.0, 1.0], vec![0.0, -1.0]).unwrap();
    let series = crate::transform::transform(&result, 1.0).unwrap();

    let mut buffer = Vec::new();
    write_series_csv(&mut buffer, &series).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "x,y");
    assert_eq!(lines[1], "1.0,1.0");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_load_parameters_keeps_defaults() {
    use crate::params::RawValue;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "mass = 250\nx_end = \"1000\"").unwrap();
    file.flush().unwrap();

    let raw = load_parameters(file.path()).unwrap();
    assert_eq!(raw.mass, RawValue::Number(250.0));
    assert_eq!(raw.x_end, RawValue::Text("1000".to_owned()));
    assert_eq!(raw.n, RawParameters::default().n);
}

#[test]
fn test_load_parameters_rejects_unknown_shapes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "mass = [1, 2]").unwrap();
    file.flush().unwrap();

    assert!(load_parameters(file.path()).is_err());
}
