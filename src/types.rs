use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_DECAY, DEFAULT_LOW_R2, DEFAULT_MEANINGFUL_R2_GAIN, DEFAULT_MIN_OBS_PER_FEATURE,
    DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_OVERFIT_R2, DEFAULT_RIDGE_LAMBDA,
    DEFAULT_SEASONALITY_PERIODS,
};
use crate::data::Period;

/// The three nested model variants, from simplest to richest feature set.
///
/// * `Immediate` — raw per-channel spend only.
/// * `Adstock` — carryover-adjusted spend per channel.
/// * `Full` — adstocked spend plus the brand-health regressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Immediate,
    Adstock,
    Full,
}

impl ModelVariant {
    /// Variants in nesting order (each adds features over the previous).
    pub const NESTING_ORDER: [ModelVariant; 3] = [
        ModelVariant::Immediate,
        ModelVariant::Adstock,
        ModelVariant::Full,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Immediate => "immediate",
            ModelVariant::Adstock => "adstock",
            ModelVariant::Full => "full",
        }
    }

    /// Whether this variant's channel features are adstocked.
    pub fn uses_adstock(self) -> bool {
        !matches!(self, ModelVariant::Immediate)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-channel decay rates with a scalar fallback.
///
/// The original single-rate behavior is `DecayConfig::uniform(rate)`;
/// individual channels can be overridden with [`DecayConfig::with_channel`].
/// All rates must lie in `[0, 1)`.
///
/// # Example
/// ```
/// use mmx_engine::DecayConfig;
/// let decay = DecayConfig::uniform(0.5)?.with_channel("tv", 0.7)?;
/// assert_eq!(decay.rate_for("tv"), 0.7);
/// assert_eq!(decay.rate_for("radio"), 0.5);
/// # Ok::<(), mmx_engine::MmmError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    default_rate: f64,
    per_channel: BTreeMap<String, f64>,
}

impl DecayConfig {
    /// A single decay rate shared by every channel.
    pub fn uniform(rate: f64) -> Result<Self, MmmError> {
        crate::adstock::validate_decay(rate)?;
        Ok(Self {
            default_rate: rate,
            per_channel: BTreeMap::new(),
        })
    }

    /// Override the rate for one channel.
    pub fn with_channel(mut self, channel: impl Into<String>, rate: f64) -> Result<Self, MmmError> {
        crate::adstock::validate_decay(rate)?;
        self.per_channel.insert(channel.into(), rate);
        Ok(self)
    }

    /// Rate applied to the given channel.
    pub fn rate_for(&self, channel: &str) -> f64 {
        self.per_channel
            .get(channel)
            .copied()
            .unwrap_or(self.default_rate)
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            default_rate: DEFAULT_DECAY,
            per_channel: BTreeMap::new(),
        }
    }
}

/// Options for the shared least-squares primitive.
#[derive(Clone, Debug)]
pub struct FitOptions {
    /// Estimate an intercept. Default: true.
    pub intercept: bool,
    /// Optional ridge (L2) strength; 0.0 means plain least squares.
    pub ridge_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            intercept: true,
            ridge_lambda: DEFAULT_RIDGE_LAMBDA,
        }
    }
}

/// Result of one regression run. Never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedModel {
    pub variant: ModelVariant,
    pub intercept: f64,
    /// Feature name -> coefficient. Adstocked features are named
    /// `{channel}_adstock`; the brand regressor is `brand_health`.
    pub coefficients: BTreeMap<String, f64>,
    pub n_samples: usize,
    pub n_features: usize,
    /// R² on the fit window.
    pub r2: f64,
    /// R² adjusted for the number of features.
    pub adj_r2: f64,
    /// Root mean squared error on the fit window.
    pub rmse: f64,
    /// Decay configuration the features were built with.
    pub decay: DecayConfig,
}

/// One fitted model per variant, all trained on the same target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSet {
    pub immediate: FittedModel,
    pub adstock: FittedModel,
    pub full: FittedModel,
}

impl ModelSet {
    pub fn get(&self, variant: ModelVariant) -> &FittedModel {
        match variant {
            ModelVariant::Immediate => &self.immediate,
            ModelVariant::Adstock => &self.adstock,
            ModelVariant::Full => &self.full,
        }
    }

    /// Models in nesting order: immediate, adstock, full.
    pub fn in_nesting_order(&self) -> [&FittedModel; 3] {
        [&self.immediate, &self.adstock, &self.full]
    }
}

/// Immediate vs. carryover split of a channel's total ROI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiSplit {
    pub immediate: f64,
    pub carryover: f64,
}

impl RoiSplit {
    pub fn total(&self) -> f64 {
        self.immediate + self.carryover
    }
}

/// Business metrics derived for a single channel from a fitted model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMetrics {
    /// Marginal sales per unit of (adstocked) spend.
    pub roi: f64,
    /// Share of fitted sales attributable to this channel, in percent.
    pub contribution_pct: f64,
    /// Present for adstock-based variants only.
    pub roi_split: Option<RoiSplit>,
}

/// Severity of a critique finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// Short machine-readable code identifying a critique rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    NegativeRoi,
    OverfitRisk,
    SmallSample,
    LowFit,
    ShortHistory,
    ModelComparison,
}

impl FindingCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingCode::NegativeRoi => "negative_roi",
            FindingCode::OverfitRisk => "overfit_risk",
            FindingCode::SmallSample => "small_sample",
            FindingCode::LowFit => "low_fit",
            FindingCode::ShortHistory => "short_history",
            FindingCode::ModelComparison => "model_comparison",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One advisory produced by the critique pass. Never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CritiqueFinding {
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
}

/// Thresholds for the critique rules. Defaults match the documented
/// heuristics; callers with stronger priors can tighten or loosen them.
#[derive(Clone, Debug)]
pub struct CritiqueConfig {
    /// R² above this is suspicious when the sample is thin.
    pub overfit_r2: f64,
    /// Observations-per-feature ratio under which a high R² is not trusted.
    pub min_obs_per_feature: f64,
    /// Sample sizes below this get a blanket reliability warning.
    pub min_sample_size: usize,
    /// R² gain required to call added model complexity an improvement.
    pub meaningful_r2_gain: f64,
    /// R² under this is reported as a weak fit.
    pub low_r2: f64,
    /// Histories shorter than this cannot capture seasonality.
    pub seasonality_periods: usize,
}

impl Default for CritiqueConfig {
    fn default() -> Self {
        Self {
            overfit_r2: DEFAULT_OVERFIT_R2,
            min_obs_per_feature: DEFAULT_MIN_OBS_PER_FEATURE,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            meaningful_r2_gain: DEFAULT_MEANINGFUL_R2_GAIN,
            low_r2: DEFAULT_LOW_R2,
            seasonality_periods: DEFAULT_SEASONALITY_PERIODS,
        }
    }
}

/// Input-validation failures detected before any fitting happens.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("table must contain at least 2 records, got {0}")]
    TooFewRecords(usize),
    #[error("periods must be strictly increasing: {prev} followed by {next}")]
    PeriodOrder { prev: Period, next: Period },
    #[error("month {0} is outside 1..=12")]
    MonthOutOfRange(u32),
    #[error("record at {period} has a different channel set than the first record")]
    ChannelSetMismatch { period: Period },
    #[error("negative or non-finite spend {amount} for channel {channel} at {period}")]
    NegativeSpend {
        channel: String,
        amount: f64,
        period: Period,
    },
    #[error("negative or non-finite sales {amount} at {period}")]
    NegativeSales { amount: f64, period: Period },
    #[error("negative or non-finite value {value} at index {index} of spend series")]
    NegativeSeriesValue { index: usize, value: f64 },
    #[error("decay rate {0} is outside [0, 1)")]
    DecayOutOfRange(f64),
    #[error("brand health score missing at {period}")]
    MissingBrandHealth { period: Period },
    #[error("unknown channel {0}")]
    UnknownChannel(String),
}

/// Library error type: distinct, matchable failure classes plus solver
/// errors. Nothing is ever coerced into a best-effort numeric result.
#[derive(thiserror::Error, Debug)]
pub enum MmmError {
    #[error("input validation failed: {0}")]
    InputValidation(#[from] ValidationError),
    #[error("insufficient data: {observations} observations for {features} features")]
    DataInsufficiency {
        observations: usize,
        features: usize,
    },
    #[error("degenerate input: feature {feature} has zero variance")]
    DegenerateInput { feature: String },
    #[error("{operation} is not supported for the {variant} model")]
    UnsupportedVariant {
        variant: ModelVariant,
        operation: &'static str,
    },
    #[error("linear algebra failure: {0}")]
    Linalg(String),
}
