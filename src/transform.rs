use crate::constants::{RHOC, S0};
use crate::solver::{SolverResult, SolverStatus};
use crate::utils::decade_ticks;
use crate::{FloatType, Series};
use itertools::{Itertools, MinMaxResult};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The solver finished without converging. Terminal for the request, not retried.
    #[error("{0}")]
    SolverFailed(SolverStatus),
}

/// Plot-ready data built from one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    xs: Series,
    ys: Series,
    relic_density: Option<FloatType>,
    y_ticks: Vec<FloatType>,
}

impl PlotSeries {
    fn empty() -> Self {
        PlotSeries {
            xs: Series::zeros(0),
            ys: Series::zeros(0),
            relic_density: None,
            y_ticks: vec![],
        }
    }

    /// x = m / T at each sample.
    pub fn xs(&self) -> &Series {
        &self.xs
    }

    /// Y = n / s at each sample.
    pub fn ys(&self) -> &Series {
        &self.ys
    }

    /// Omega h^2 at the last sample, `None` when there are no samples.
    pub fn relic_density(&self) -> Option<FloatType> {
        self.relic_density
    }

    /// Powers of ten bounding `ys` on a log axis.
    pub fn y_ticks(&self) -> &[FloatType] {
        &self.y_ticks
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Omega h^2 = (s0 / rho_c) m Y, evaluated at the final abundance.
pub fn relic_density(mass: FloatType, final_abundance: FloatType) -> FloatType {
    (S0 / RHOC) * mass * final_abundance
}

/// Converts the solver's log-space samples into a `PlotSeries`.
///
/// `mass` must be the validated mass the solver was called with. A result that did not
/// succeed yields `TransformError::SolverFailed`; a successful result without samples
/// yields an empty series with no ticks and no relic density.
pub fn transform(result: &SolverResult, mass: FloatType) -> Result<PlotSeries, TransformError> {
    if !result.status().is_success() {
        warn!("solver failed: {}", result.status());
        return Err(TransformError::SolverFailed(result.status().clone()));
    }

    let size = result.size();
    let xs: Series = (0..size).map(|i| result.logx(i).exp()).collect();
    let ys: Series = (0..size).map(|i| result.w(i).exp()).collect();

    // Bounds are taken on w itself, exp(w) may have under/overflowed
    let (w_min, w_max) = match (0..size).map(|i| result.w(i)).minmax() {
        MinMaxResult::NoElements => {
            debug!("solver returned no samples, nothing to plot");
            return Ok(PlotSeries::empty());
        }
        MinMaxResult::OneElement(w) => (w, w),
        MinMaxResult::MinMax(w_min, w_max) => (w_min, w_max),
    };

    let relic_density = relic_density(mass, ys[size - 1]);

    let y_ticks = if w_min.is_finite() && w_max.is_finite() {
        decade_ticks(w_min, w_max)
    } else {
        warn!("w spans [{w_min}, {w_max}], leaving the y axis without ticks");
        vec![]
    };
    debug!(
        "{} samples, Omega h^2 = {:e}, {} y ticks",
        size,
        relic_density,
        y_ticks.len()
    );

    Ok(PlotSeries {
        xs,
        ys,
        relic_density: Some(relic_density),
        y_ticks,
    })
}

#[cfg(test)]
fn success(logxs: Vec<FloatType>, ws: Vec<FloatType>) -> SolverResult {
    SolverResult::new(SolverStatus::Success, logxs, ws).unwrap()
}

#[test]
fn test_two_sample_freeze_out() {
    use crate::utils::rclose;

    let result = success(vec![0.0, 500.0_f64.ln()], vec![-10.0, -20.0]);
    let series = transform(&result, 100.0).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.xs()[0], 1.0);
    assert!(rclose(series.xs()[1], 500.0, 1e-12));
    assert_eq!(series.ys()[0], (-10.0_f64).exp());
    assert_eq!(series.ys()[1], (-20.0_f64).exp());
    assert_eq!(
        series.relic_density(),
        Some((2891.2 / 1.05375e-5) * 100.0 * (-20.0_f64).exp())
    );

    // log10(e^-20) = -8.69 and log10(e^-10) = -4.34
    let expected = [1e-10, 1e-9, 1e-8, 1e-7, 1e-6, 1e-5, 1e-4];
    assert_eq!(series.y_ticks().len(), expected.len());
    for (tick, expected) in series.y_ticks().iter().zip(expected) {
        assert!(rclose(*tick, expected, 1e-12), "{tick} != {expected}");
    }
}

#[test]
fn test_samples_are_exponentiated_exactly() {
    let logxs = vec![0.0, 0.5, 1.7, 3.2, 6.2];
    let ws = vec![-3.0, -7.25, -15.5, -21.0, -21.01];
    let result = success(logxs.clone(), ws.clone());
    let series = transform(&result, 10.0).unwrap();

    for i in 0..result.size() {
        assert_eq!(series.xs()[i], result.logx(i).exp());
        assert_eq!(series.ys()[i], result.w(i).exp());
    }
    assert_eq!(
        series.relic_density(),
        Some((S0 / RHOC) * 10.0 * ws[4].exp())
    );
}

#[test]
fn test_ticks_bound_the_series_with_margin() {
    let cases = [
        vec![-10.0, -20.0],
        vec![0.0],
        vec![2.0, -0.5, -45.0, -44.9],
        vec![-100.0, -90.0],
        vec![5.0, 5.0, 5.0],
    ];
    for ws in cases {
        let logxs = (0..ws.len()).map(|i| i as FloatType).collect();
        let series = transform(&success(logxs, ws.clone()), 1.0).unwrap();
        let ticks = series.y_ticks();
        assert!(ticks.len() >= 2, "{ws:?}");

        // Geometric with ratio ten
        for pair in ticks.windows(2) {
            assert!(crate::utils::rclose(pair[1] / pair[0], 10.0, 1e-9), "{ws:?}");
        }

        let w_min = ws.iter().cloned().fold(FloatType::INFINITY, FloatType::min);
        let w_max = ws.iter().cloned().fold(FloatType::NEG_INFINITY, FloatType::max);
        let decade_min = crate::utils::ln_to_log10(w_min).floor();
        let decade_max = crate::utils::ln_to_log10(w_max).floor();
        let first = ticks[0].log10().round();
        let last = ticks[ticks.len() - 1].log10().round();
        assert!(first <= decade_min - 1.0, "{ws:?}");
        assert!(last >= decade_max, "{ws:?}");
    }
}

#[test]
fn test_failed_status_produces_no_series() {
    let result = SolverResult::failed("Diverged".parse().unwrap());
    let error = transform(&result, 100.0).unwrap_err();

    assert_eq!(
        error,
        TransformError::SolverFailed(SolverStatus::Other("Diverged".to_owned()))
    );
    assert!(error.to_string().contains("Diverged"));
}

#[test]
fn test_failed_status_ignores_samples() {
    let result = SolverResult::new(SolverStatus::TooStiff, vec![0.0], vec![-1.0]).unwrap();
    assert!(transform(&result, 100.0).is_err());
}

#[test]
fn test_empty_solve_is_an_empty_series() {
    let series = transform(&success(vec![], vec![]), 100.0).unwrap();

    assert!(series.is_empty());
    assert!(series.y_ticks().is_empty());
    assert_eq!(series.relic_density(), None);
}

#[test]
fn test_single_sample() {
    let series = transform(&success(vec![1.0], vec![-5.0]), 2.0).unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series.relic_density(), Some(relic_density(2.0, (-5.0_f64).exp())));
    // log10(e^-5) = -2.17, so decades -4, -3 and -2
    assert_eq!(series.y_ticks().len(), 3);
}

#[test]
fn test_infinite_w_leaves_ticks_empty() {
    let result = success(vec![0.0, 1.0], vec![-1.0, FloatType::NEG_INFINITY]);
    let series = transform(&result, 1.0).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.ys()[1], 0.0);
    assert!(series.y_ticks().is_empty());
}

#[test]
fn test_extreme_abundances_keep_ticks_plottable() {
    for ws in [vec![-5.0, -800.0], vec![-5.0, 800.0], vec![0.0, -1e12]] {
        let series = transform(&success(vec![0.0, 1.0], ws.clone()), 1.0).unwrap();
        let ticks = series.y_ticks();

        assert!(!ticks.is_empty(), "{ws:?}");
        assert!(ticks.iter().all(|t| t.is_finite() && *t > 0.0), "{ws:?}");
        assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]), "{ws:?}");
    }
}
