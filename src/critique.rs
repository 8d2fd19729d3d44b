use tracing::debug;

use crate::data::TimeSeriesTable;
use crate::defaults::BRAND_HEALTH_FEATURE;
use crate::types::{
    CritiqueConfig, CritiqueFinding, FindingCode, FittedModel, ModelSet, Severity,
};

fn finding(severity: Severity, code: FindingCode, message: String) -> CritiqueFinding {
    CritiqueFinding {
        severity,
        code,
        message,
    }
}

/// Evaluate the per-model rules against one fitted model.
///
/// Rules are additive and independent: every rule is evaluated and no
/// finding suppresses another. The model itself is never modified.
pub fn critique_model(model: &FittedModel, config: &CritiqueConfig) -> Vec<CritiqueFinding> {
    let mut findings = Vec::new();

    // Coefficient map iteration is sorted, so finding order is stable.
    for (feature, &coef) in &model.coefficients {
        if feature == BRAND_HEALTH_FEATURE {
            continue;
        }
        if coef < 0.0 {
            findings.push(finding(
                Severity::Error,
                FindingCode::NegativeRoi,
                format!(
                    "{} model: {} has a negative coefficient ({:.4}); \
                     marketing response is expected to be non-negative",
                    model.variant, feature, coef
                ),
            ));
        }
    }

    let thin_sample =
        (model.n_samples as f64) < config.min_obs_per_feature * model.n_features as f64;
    if model.r2 > config.overfit_r2 && thin_sample {
        findings.push(finding(
            Severity::Warning,
            FindingCode::OverfitRisk,
            format!(
                "{} model: R² = {:.4} with only {} observations for {} features \
                 (below {:.0}x); the fit is probably memorizing noise",
                model.variant,
                model.r2,
                model.n_samples,
                model.n_features,
                config.min_obs_per_feature
            ),
        ));
    }

    if model.n_samples < config.min_sample_size {
        findings.push(finding(
            Severity::Warning,
            FindingCode::SmallSample,
            format!(
                "{} model: {} observations is below the minimum of {}; \
                 all derived coefficients are statistically unreliable",
                model.variant, model.n_samples, config.min_sample_size
            ),
        ));
    }

    if model.r2 < config.low_r2 {
        findings.push(finding(
            Severity::Info,
            FindingCode::LowFit,
            format!(
                "{} model: R² = {:.4} explains less than {:.0}% of sales variation",
                model.variant,
                model.r2,
                config.low_r2 * 100.0
            ),
        ));
    }

    findings
}

fn compare_models(
    simpler: &FittedModel,
    richer: &FittedModel,
    config: &CritiqueConfig,
) -> CritiqueFinding {
    let gain = richer.r2 - simpler.r2;
    let verdict = if gain > config.meaningful_r2_gain {
        "a meaningful improvement"
    } else {
        "no meaningful improvement"
    };
    finding(
        Severity::Info,
        FindingCode::ModelComparison,
        format!(
            "{} (R² = {:.4}) vs {} (R² = {:.4}): added complexity gave {} ({:+.4})",
            simpler.variant, simpler.r2, richer.variant, richer.r2, verdict, gain
        ),
    )
}

/// Run the full critique over a completed fit.
///
/// Ordering: data-level findings first, then each model's findings in
/// nesting order, then the model-to-model comparisons. Read-only: neither
/// the table nor the models are modified.
pub fn run_critique(
    table: &TimeSeriesTable,
    models: &ModelSet,
    config: &CritiqueConfig,
) -> Vec<CritiqueFinding> {
    let mut findings = Vec::new();

    if table.len() < config.seasonality_periods {
        findings.push(finding(
            Severity::Info,
            FindingCode::ShortHistory,
            format!(
                "{} monthly observations (below {}); seasonal effects cannot be separated \
                 from media response",
                table.len(),
                config.seasonality_periods
            ),
        ));
    }

    for model in models.in_nesting_order() {
        findings.extend(critique_model(model, config));
    }

    findings.push(compare_models(&models.immediate, &models.adstock, config));
    findings.push(compare_models(&models.adstock, &models.full, config));

    debug!(
        errors = findings.iter().filter(|f| f.severity == Severity::Error).count(),
        warnings = findings.iter().filter(|f| f.severity == Severity::Warning).count(),
        total = findings.len(),
        "critique complete"
    );

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecayConfig, ModelVariant};
    use std::collections::BTreeMap;

    fn model(variant: ModelVariant, r2: f64, n_samples: usize, coefs: &[(&str, f64)]) -> FittedModel {
        let coefficients: BTreeMap<String, f64> = coefs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        FittedModel {
            variant,
            intercept: 100.0,
            n_features: coefficients.len(),
            coefficients,
            n_samples,
            r2,
            adj_r2: r2,
            rmse: 1.0,
            decay: DecayConfig::default(),
        }
    }

    #[test]
    fn test_overfit_warning_emitted() {
        // 12 observations, 9 channel features, R² = 0.995.
        let coefs: Vec<(String, f64)> = (0..9).map(|c| (format!("ch{c}_adstock"), 1.0)).collect();
        let coef_refs: Vec<(&str, f64)> = coefs.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let m = model(ModelVariant::Adstock, 0.995, 12, &coef_refs);

        let findings = critique_model(&m, &CritiqueConfig::default());
        assert!(findings
            .iter()
            .any(|f| f.code == FindingCode::OverfitRisk && f.severity == Severity::Warning));
    }

    #[test]
    fn test_high_r2_with_ample_sample_is_clean() {
        let m = model(ModelVariant::Immediate, 0.995, 40, &[("tv", 2.0)]);
        let findings = critique_model(&m, &CritiqueConfig::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_negative_roi_is_an_error() {
        let m = model(
            ModelVariant::Adstock,
            0.9,
            24,
            &[("tv_adstock", 2.0), ("web_adstock", -0.4)],
        );
        let findings = critique_model(&m, &CritiqueConfig::default());
        let negative: Vec<_> = findings
            .iter()
            .filter(|f| f.code == FindingCode::NegativeRoi)
            .collect();
        assert_eq!(negative.len(), 1);
        assert_eq!(negative[0].severity, Severity::Error);
        assert!(negative[0].message.contains("web_adstock"));
    }

    #[test]
    fn test_brand_health_sign_is_exempt() {
        let m = model(
            ModelVariant::Full,
            0.9,
            24,
            &[("tv_adstock", 2.0), ("brand_health", -3.0)],
        );
        let findings = critique_model(&m, &CritiqueConfig::default());
        assert!(findings.iter().all(|f| f.code != FindingCode::NegativeRoi));
    }

    #[test]
    fn test_small_sample_warning() {
        let m = model(ModelVariant::Immediate, 0.7, 8, &[("tv", 2.0)]);
        let findings = critique_model(&m, &CritiqueConfig::default());
        assert!(findings.iter().any(|f| f.code == FindingCode::SmallSample));
    }

    #[test]
    fn test_rules_do_not_suppress_each_other() {
        // Negative coefficient, overfit R², and a tiny sample all at once.
        let m = model(
            ModelVariant::Adstock,
            0.999,
            6,
            &[("tv_adstock", -1.0), ("web_adstock", 2.0)],
        );
        let findings = critique_model(&m, &CritiqueConfig::default());
        let codes: Vec<FindingCode> = findings.iter().map(|f| f.code).collect();
        assert!(codes.contains(&FindingCode::NegativeRoi));
        assert!(codes.contains(&FindingCode::OverfitRisk));
        assert!(codes.contains(&FindingCode::SmallSample));
    }

    #[test]
    fn test_low_fit_info() {
        let m = model(ModelVariant::Immediate, 0.3, 24, &[("tv", 2.0)]);
        let findings = critique_model(&m, &CritiqueConfig::default());
        assert!(findings
            .iter()
            .any(|f| f.code == FindingCode::LowFit && f.severity == Severity::Info));
    }

    #[test]
    fn test_comparison_verdicts() {
        let immediate = model(ModelVariant::Immediate, 0.80, 24, &[("tv", 2.0)]);
        let adstock = model(ModelVariant::Adstock, 0.90, 24, &[("tv_adstock", 2.0)]);
        let improved = compare_models(&immediate, &adstock, &CritiqueConfig::default());
        assert_eq!(improved.code, FindingCode::ModelComparison);
        assert!(improved.message.contains("a meaningful improvement"));

        let stagnant = compare_models(&adstock, &adstock, &CritiqueConfig::default());
        assert!(stagnant.message.contains("no meaningful improvement"));
    }

    #[test]
    fn test_custom_thresholds() {
        let m = model(ModelVariant::Immediate, 0.95, 30, &[("tv", 2.0)]);
        let strict = CritiqueConfig {
            overfit_r2: 0.9,
            min_obs_per_feature: 40.0,
            ..Default::default()
        };
        let findings = critique_model(&m, &strict);
        assert!(findings.iter().any(|f| f.code == FindingCode::OverfitRisk));
    }
}
