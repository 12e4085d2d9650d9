pub mod chart;
pub mod constants;
pub mod params;
pub mod pipeline;
pub mod session;
pub mod solver;
pub mod transform;
pub mod utils;

// Precision shared by the solver contract, the transformer and the chart
pub type FloatType = f64;

pub type Series = ndarray::Array1<FloatType>;
