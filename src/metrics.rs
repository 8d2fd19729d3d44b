use std::collections::BTreeMap;

use crate::adstock::geometric_adstock;
use crate::data::TimeSeriesTable;
use crate::defaults::{ADSTOCK_SUFFIX, BRAND_HEALTH_FEATURE, VARIANCE_EPS};
use crate::types::{ChannelMetrics, FittedModel, MmmError, ModelVariant, RoiSplit, ValidationError};

/// Feature name a channel maps to under the given variant.
pub(crate) fn feature_name(variant: ModelVariant, channel: &str) -> String {
    if variant.uses_adstock() {
        format!("{channel}{ADSTOCK_SUFFIX}")
    } else {
        channel.to_string()
    }
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series.iter().sum::<f64>() / series.len() as f64
    }
}

/// Rebuild every feature series the model was fitted on, keyed by feature
/// name. Uses the decay configuration recorded on the model.
fn feature_series(
    table: &TimeSeriesTable,
    model: &FittedModel,
) -> Result<BTreeMap<String, Vec<f64>>, MmmError> {
    let mut series = BTreeMap::new();
    for channel in table.channels() {
        let spend = table.spend_series(channel)?;
        let values = if model.variant.uses_adstock() {
            geometric_adstock(&spend, model.decay.rate_for(channel))?
        } else {
            spend
        };
        series.insert(feature_name(model.variant, channel), values);
    }
    if model.variant == ModelVariant::Full {
        series.insert(BRAND_HEALTH_FEATURE.to_string(), table.require_brand_health()?);
    }
    Ok(series)
}

fn coefficient(model: &FittedModel, feature: &str) -> Result<f64, MmmError> {
    model
        .coefficients
        .get(feature)
        .copied()
        .ok_or_else(|| ValidationError::UnknownChannel(feature.to_string()).into())
}

/// Mean fitted sales: intercept + Σ coef·mean(feature).
fn fitted_mean_sales(
    model: &FittedModel,
    series: &BTreeMap<String, Vec<f64>>,
) -> Result<f64, MmmError> {
    let mut total = model.intercept;
    for (feature, values) in series {
        total += coefficient(model, feature)? * mean(values);
    }
    if total.abs() < VARIANCE_EPS {
        return Err(MmmError::DegenerateInput {
            feature: "fitted_mean_sales".to_string(),
        });
    }
    Ok(total)
}

/// Derive ROI and contribution share per channel from a fitted model.
///
/// ROI is the channel feature's coefficient; the contribution share is
/// coef·mean(feature) / fitted-mean-sales, in percent. For adstock-based
/// variants the ROI split from [`decompose_roi`] is attached.
pub fn derive_metrics(
    table: &TimeSeriesTable,
    model: &FittedModel,
) -> Result<BTreeMap<String, ChannelMetrics>, MmmError> {
    let series = feature_series(table, model)?;
    let fitted_mean = fitted_mean_sales(model, &series)?;

    let splits = if model.variant.uses_adstock() {
        Some(decompose_roi(table, model)?)
    } else {
        None
    };

    let mut out = BTreeMap::new();
    for channel in table.channels() {
        let feature = feature_name(model.variant, channel);
        let roi = coefficient(model, &feature)?;
        let contribution_pct = roi * mean(&series[&feature]) / fitted_mean * 100.0;
        out.insert(
            channel.clone(),
            ChannelMetrics {
                roi,
                contribution_pct,
                roi_split: splits.as_ref().map(|s| s[channel]),
            },
        );
    }
    Ok(out)
}

/// Share of fitted sales not attributed to any channel: intercept, the
/// brand-health regressor where present, and unexplained variation.
/// Channel shares plus this baseline sum to 100 by construction.
pub fn baseline_share(table: &TimeSeriesTable, model: &FittedModel) -> Result<f64, MmmError> {
    let metrics = derive_metrics(table, model)?;
    Ok(100.0 - metrics.values().map(|m| m.contribution_pct).sum::<f64>())
}

/// Split each channel's total ROI into immediate and carryover components.
///
/// Holding every other feature's fitted coefficient fixed, the target's
/// partial residual is regressed (through the fitted intercept) on the
/// channel's raw, unlagged spend; the slope is the immediate ROI and the
/// remainder of the fitted adstock coefficient is carryover, so the two
/// always sum to the total.
///
/// # Errors
/// `MmmError::UnsupportedVariant` for the immediate model, which has no
/// carryover component to separate.
pub fn decompose_roi(
    table: &TimeSeriesTable,
    model: &FittedModel,
) -> Result<BTreeMap<String, RoiSplit>, MmmError> {
    if !model.variant.uses_adstock() {
        return Err(MmmError::UnsupportedVariant {
            variant: model.variant,
            operation: "ROI decomposition",
        });
    }

    let series = feature_series(table, model)?;
    let sales = table.sales();

    let mut out = BTreeMap::new();
    for channel in table.channels() {
        let own_feature = feature_name(model.variant, channel);
        let total = coefficient(model, &own_feature)?;

        // Partial residual: target minus intercept and every other
        // feature's fitted contribution.
        let mut residual: Vec<f64> = sales.iter().map(|&y| y - model.intercept).collect();
        for (feature, values) in &series {
            if feature == &own_feature {
                continue;
            }
            let coef = coefficient(model, feature)?;
            for (r, v) in residual.iter_mut().zip(values.iter()) {
                *r -= coef * v;
            }
        }

        let spend = table.spend_series(channel)?;
        let sxx: f64 = spend.iter().map(|&s| s * s).sum();
        let sxy: f64 = residual.iter().zip(spend.iter()).map(|(&r, &s)| r * s).sum();
        let immediate = if sxx > VARIANCE_EPS { sxy / sxx } else { 0.0 };

        out.insert(
            channel.clone(),
            RoiSplit {
                immediate,
                carryover: total - immediate,
            },
        );
    }
    Ok(out)
}

/// Channels sorted by descending ROI; exact ties break by ascending
/// channel name, so repeated runs always agree.
pub fn rank_by_roi(metrics: &BTreeMap<String, ChannelMetrics>) -> Vec<(String, f64)> {
    rank_by(metrics, |m| m.roi)
}

/// Channels sorted by descending contribution share; ties break by
/// ascending channel name.
pub fn rank_by_contribution(metrics: &BTreeMap<String, ChannelMetrics>) -> Vec<(String, f64)> {
    rank_by(metrics, |m| m.contribution_pct)
}

fn rank_by(
    metrics: &BTreeMap<String, ChannelMetrics>,
    key: impl Fn(&ChannelMetrics) -> f64,
) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = metrics
        .iter()
        .map(|(channel, m)| (channel.clone(), key(m)))
        .collect();
    // total_cmp gives a strict total order even over non-finite values.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Highest-ROI channel, deterministic under ties.
pub fn best_channel_by_roi(metrics: &BTreeMap<String, ChannelMetrics>) -> Option<(String, f64)> {
    rank_by_roi(metrics).into_iter().next()
}

/// Highest-contribution channel, deterministic under ties.
pub fn best_channel_by_contribution(
    metrics: &BTreeMap<String, ChannelMetrics>,
) -> Option<(String, f64)> {
    rank_by_contribution(metrics).into_iter().next()
}
