//! # mmx-engine
//!
//! A marketing mix modeling (MMM) engine for short monthly series: it turns
//! sales, per-channel media spend and brand-health scores into
//! carryover-adjusted features, three nested regression models, per-channel
//! ROI and contribution decompositions, and a rule-based critique of the
//! result.
//!
//! The pipeline is strictly left to right:
//!
//! 1. **Adstock** — geometric carryover transform of each spend series
//! 2. **Fit** — `Immediate`, `Adstock` and `Full` OLS models over the same target
//! 3. **Metrics** — ROI, contribution shares, immediate/carryover ROI split
//! 4. **Critique** — advisory findings over fit quality and coefficient signs
//!
//! Everything is a pure function of immutable inputs; concurrent analysis
//! requests need no synchronization.
//!
//! ## Example
//!
//! ```
//! use mmx_engine::{
//!     best_channel_by_roi, derive_metrics, fit_all_models, run_critique, CritiqueConfig,
//!     DecayConfig, MonthlyRecord, Period, TimeSeriesTable,
//! };
//! use std::collections::BTreeMap;
//!
//! let mut records = Vec::new();
//! for m in 1..=12u32 {
//!     let tv = 100.0 + 10.0 * m as f64 + (m % 3) as f64 * 8.0;
//!     let web = 40.0 + 5.0 * m as f64 + (m % 4) as f64 * 6.0;
//!     let nps = 40.0 + m as f64 + (m % 2) as f64 * 3.0;
//!     let mut spend = BTreeMap::new();
//!     spend.insert("tv".to_string(), tv);
//!     spend.insert("web".to_string(), web);
//!     records.push(MonthlyRecord {
//!         period: Period::new(2024, m)?,
//!         sales: 3.0 * tv + 1.5 * web + 2.0 * nps + 250.0,
//!         spend,
//!         brand_health: Some(nps),
//!     });
//! }
//! let table = TimeSeriesTable::new(records)?;
//!
//! let decay = DecayConfig::uniform(0.5)?;
//! let models = fit_all_models(&table, &decay)?;
//!
//! let metrics = derive_metrics(&table, &models.adstock)?;
//! let (channel, roi) = best_channel_by_roi(&metrics).unwrap();
//! println!("best channel: {channel} (ROI {roi:.2})");
//!
//! let findings = run_critique(&table, &models, &CritiqueConfig::default());
//! for f in &findings {
//!     println!("[{}] {}: {}", f.severity, f.code, f.message);
//! }
//! # Ok::<(), mmx_engine::MmmError>(())
//! ```

// Module declarations
pub mod adstock;
pub mod critique;
pub mod data;
mod defaults;
pub mod fit;
pub mod metrics;
mod types;

// Re-export public types
pub use types::{
    ChannelMetrics, CritiqueConfig, CritiqueFinding, DecayConfig, FindingCode, FitOptions,
    FittedModel, MmmError, ModelSet, ModelVariant, RoiSplit, Severity, ValidationError,
};

// Re-export main public functions
pub use adstock::{adstock_table, decay_curve, geometric_adstock};
pub use critique::{critique_model, run_critique};
pub use data::{MonthlyRecord, Period, TimeSeriesTable};
pub use fit::{fit_all_models, fit_model};
pub use metrics::{
    baseline_share, best_channel_by_contribution, best_channel_by_roi, decompose_roi,
    derive_metrics, rank_by_contribution, rank_by_roi,
};
