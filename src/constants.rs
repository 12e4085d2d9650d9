/// Present-day entropy density normalization used in Omega h^2.
pub const S0: f64 = 2891.2;

/// Critical density normalization used in Omega h^2.
pub const RHOC: f64 = 1.05375e-5;

/// Status string an external solver reports when the integration finished.
pub const SUCCESS: &str = "Success";

// Fallback values substituted for invalid user input
pub const DEFAULT_N: u32 = 0;
pub const DEFAULT_SIGMA: f64 = 1e-9;
pub const DEFAULT_X_START: f64 = 1.0;
pub const DEFAULT_X_END: f64 = 500.0;
pub const DEFAULT_MASS: f64 = 100.0;
