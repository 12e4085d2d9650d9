use super::{ChartRenderer, ChartSpec};
use anyhow::{Context, Result};
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes each chart specification as one line of JSON, for a browser-side chart library to draw.
#[derive(Debug)]
pub struct JsonRenderer<W: Write> {
    writer: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(writer: W) -> Self {
        JsonRenderer { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonRenderer<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create chart spec file {}", path.display()))?;
        Ok(JsonRenderer::new(BufWriter::new(file)))
    }
}

impl<W: Write> ChartRenderer for JsonRenderer<W> {
    fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        serde_json::to_writer(&mut self.writer, spec).context("failed to write chart spec")?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        debug!("wrote chart spec \"{}\"", spec.title);
        Ok(())
    }
}

#[test]
fn test_one_line_per_render() {
    use crate::solver::{SolverResult, SolverStatus};

    let result = SolverResult::new(SolverStatus::Success, vec![0.0, 1.0], vec![-2.0, -3.0]).unwrap();
    let series = crate::transform::transform(&result, 100.0).unwrap();
    let spec = super::present(&series);

    let mut renderer = JsonRenderer::new(Vec::new());
    renderer.render(&spec).unwrap();
    renderer.render(&spec).unwrap();
    let written = String::from_utf8(renderer.into_inner()).unwrap();

    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["title"], spec.title.as_str());
    let y = value["data"][0]["y"][1].as_f64().unwrap();
    assert!(crate::utils::rclose(y, (-3.0_f64).exp(), 1e-15));
}

#[test]
fn test_create_writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chart.json");
    let spec = super::present(
        &crate::transform::transform(
            &crate::solver::SolverResult::new(crate::solver::SolverStatus::Success, vec![], vec![])
                .unwrap(),
            1.0,
        )
        .unwrap(),
    );

    let mut renderer = JsonRenderer::create(&path).unwrap();
    renderer.render(&spec).unwrap();
    drop(renderer);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"type\":\"log\""));
}
