//! Default constants for adstock, fitting and critique thresholds.

pub const DEFAULT_DECAY: f64 = 0.5;
pub const DEFAULT_RIDGE_LAMBDA: f64 = 0.0;
pub const DEFAULT_OVERFIT_R2: f64 = 0.98;
pub const DEFAULT_MIN_OBS_PER_FEATURE: f64 = 3.0;
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 12;
pub const DEFAULT_MEANINGFUL_R2_GAIN: f64 = 0.01;
pub const DEFAULT_LOW_R2: f64 = 0.5;
pub const DEFAULT_SEASONALITY_PERIODS: usize = 24;
pub const VARIANCE_EPS: f64 = 1e-12;

/// Feature name of the brand-health regressor in the full model.
pub const BRAND_HEALTH_FEATURE: &str = "brand_health";
/// Suffix appended to channel names for adstocked features.
pub const ADSTOCK_SUFFIX: &str = "_adstock";
