use linfa::dataset::Dataset;
use linfa::traits::Fit;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::adstock::geometric_adstock;
use crate::data::TimeSeriesTable;
use crate::defaults::{ADSTOCK_SUFFIX, BRAND_HEALTH_FEATURE, VARIANCE_EPS};
use crate::types::{DecayConfig, FitOptions, FittedModel, MmmError, ModelSet, ModelVariant};

/// Build the design matrix and parallel feature names for one variant.
///
/// Columns are the table's channels in sorted order: raw spend for
/// `Immediate`, adstocked spend otherwise, with the brand-health regressor
/// appended last for `Full`.
pub(crate) fn build_design(
    table: &TimeSeriesTable,
    variant: ModelVariant,
    decay: &DecayConfig,
) -> Result<(Array2<f64>, Vec<String>), MmmError> {
    let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(table.channels().len() + 1);

    for channel in table.channels() {
        let spend = table.spend_series(channel)?;
        if variant.uses_adstock() {
            let adstocked = geometric_adstock(&spend, decay.rate_for(channel))?;
            columns.push((format!("{channel}{ADSTOCK_SUFFIX}"), adstocked));
        } else {
            columns.push((channel.clone(), spend));
        }
    }
    if variant == ModelVariant::Full {
        columns.push((BRAND_HEALTH_FEATURE.to_string(), table.require_brand_health()?));
    }

    let rows = table.len();
    let mut x = Array2::<f64>::zeros((rows, columns.len()));
    let mut names = Vec::with_capacity(columns.len());
    for (j, (name, series)) in columns.into_iter().enumerate() {
        for (i, value) in series.into_iter().enumerate() {
            x[[i, j]] = value;
        }
        names.push(name);
    }
    Ok((x, names))
}

/// Augment design matrix and target for ridge regression via the Tikhonov
/// method: min ||[X; sqrt(λ)I]β − [y; 0]||², equivalent to
/// min ||Xβ − y||² + λ||β||², solved with the same OLS primitive.
fn augment_for_ridge(x: &Array2<f64>, y: &Array1<f64>, lambda: f64) -> (Array2<f64>, Array1<f64>) {
    let (n, p) = x.dim();
    let sqrt_l = lambda.sqrt();

    let mut x_aug = Array2::<f64>::zeros((n + p, p));
    x_aug.slice_mut(ndarray::s![0..n, ..]).assign(x);
    for j in 0..p {
        x_aug[[n + j, j]] = sqrt_l;
    }

    let mut y_aug = Array1::<f64>::zeros(n + p);
    y_aug.slice_mut(ndarray::s![0..n]).assign(y);
    // Tail stays zeros (penalizes large coefficients)

    (x_aug, y_aug)
}

/// Compute R², adjusted R² and RMSE on the fit window.
pub(crate) fn fit_metrics(
    y_actual: &Array1<f64>,
    y_pred: &Array1<f64>,
    n_features: usize,
) -> (f64, f64, f64) {
    let n = y_actual.len() as f64;

    let ss_res: f64 = y_actual
        .iter()
        .zip(y_pred.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum();
    let rmse = (ss_res / n).sqrt();

    let y_mean = y_actual.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_actual.iter().map(|&v| (v - y_mean).powi(2)).sum();
    let r2 = 1.0 - ss_res / ss_tot.max(1e-12);

    let p = n_features as f64;
    let adj_r2 = if n > p + 1.0 {
        1.0 - (1.0 - r2) * (n - 1.0) / (n - p - 1.0)
    } else {
        r2
    };

    (r2, adj_r2, rmse)
}

/// Fit one model variant over the table's total-sales target.
///
/// A pure function of (table, variant, decay, options): repeated calls with
/// identical inputs produce bit-identical coefficients, and nothing is
/// shared between calls.
///
/// # Errors
/// * `MmmError::DataInsufficiency` when observations ≤ features.
/// * `MmmError::DegenerateInput` when a feature column has zero variance.
/// * `MmmError::InputValidation` when `Full` is requested without a
///   brand-health score on every record.
/// * `MmmError::Linalg` if the least-squares solve itself fails.
pub fn fit_model(
    table: &TimeSeriesTable,
    variant: ModelVariant,
    decay: &DecayConfig,
    opts: &FitOptions,
) -> Result<FittedModel, MmmError> {
    let (x, names) = build_design(table, variant, decay)?;
    let y = Array1::from(table.sales());
    let n = x.nrows();
    let p = x.ncols();

    if n <= p {
        return Err(MmmError::DataInsufficiency {
            observations: n,
            features: p,
        });
    }

    for (j, name) in names.iter().enumerate() {
        let column = x.column(j);
        let mean = column.mean().unwrap_or(0.0);
        let variance = column.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        if variance < VARIANCE_EPS {
            return Err(MmmError::DegenerateInput {
                feature: name.clone(),
            });
        }
    }

    let (x_used, y_used) = if opts.ridge_lambda > 0.0 {
        augment_for_ridge(&x, &y, opts.ridge_lambda)
    } else {
        (x.clone(), y.clone())
    };

    let dataset = Dataset::new(x_used, y_used);
    let linreg = LinearRegression::new().with_intercept(opts.intercept);
    let fitted = linreg
        .fit(&dataset)
        .map_err(|e| MmmError::Linalg(format!("{e:?}")))?;

    let beta = fitted.params().to_owned();
    let intercept = if opts.intercept { fitted.intercept() } else { 0.0 };

    let y_hat = x.dot(&beta) + intercept;
    let (r2, adj_r2, rmse) = fit_metrics(&y, &y_hat, p);

    debug!(
        variant = variant.as_str(),
        n_samples = n,
        n_features = p,
        r2,
        "model fitted"
    );

    Ok(FittedModel {
        variant,
        intercept,
        coefficients: names.into_iter().zip(beta).collect(),
        n_samples: n,
        n_features: p,
        r2,
        adj_r2,
        rmse,
        decay: decay.clone(),
    })
}

/// Fit all three nested variants independently over the same target,
/// with default options (intercept, no ridge).
pub fn fit_all_models(table: &TimeSeriesTable, decay: &DecayConfig) -> Result<ModelSet, MmmError> {
    info!(
        n_records = table.len(),
        n_channels = table.channels().len(),
        "fitting immediate, adstock and full models"
    );
    let opts = FitOptions::default();
    Ok(ModelSet {
        immediate: fit_model(table, ModelVariant::Immediate, decay, &opts)?,
        adstock: fit_model(table, ModelVariant::Adstock, decay, &opts)?,
        full: fit_model(table, ModelVariant::Full, decay, &opts)?,
    })
}
