use std::collections::BTreeMap;

use crate::data::TimeSeriesTable;
use crate::types::{DecayConfig, MmmError, ValidationError};

/// Reject decay rates outside `[0, 1)` (NaN included).
pub(crate) fn validate_decay(rate: f64) -> Result<(), MmmError> {
    if !(0.0..1.0).contains(&rate) {
        return Err(ValidationError::DecayOutOfRange(rate).into());
    }
    Ok(())
}

/// Geometric adstock: `A[0] = s[0]`, `A[t] = s[t] + decay * A[t-1]`.
///
/// A fraction `decay` of a channel's prior carryover effect persists into
/// the next period, added to current-period spend. Deterministic, allocates
/// a fresh output per call, and reduces to the identity at `decay == 0`.
///
/// # Errors
/// `ValidationError::DecayOutOfRange` for rates outside `[0, 1)`;
/// `ValidationError::NegativeSeriesValue` for negative spend (rejected, not
/// clamped).
///
/// # Example
/// ```
/// use mmx_engine::geometric_adstock;
/// let a = geometric_adstock(&[10.0, 20.0, 30.0], 0.5)?;
/// assert_eq!(a, vec![10.0, 25.0, 42.5]);
/// # Ok::<(), mmx_engine::MmmError>(())
/// ```
pub fn geometric_adstock(series: &[f64], decay: f64) -> Result<Vec<f64>, MmmError> {
    validate_decay(decay)?;

    let mut out = Vec::with_capacity(series.len());
    let mut carry = 0.0;
    for (index, &value) in series.iter().enumerate() {
        if !(value >= 0.0) {
            return Err(ValidationError::NegativeSeriesValue { index, value }.into());
        }
        let adstocked = value + decay * carry;
        out.push(adstocked);
        carry = adstocked;
    }
    Ok(out)
}

/// Adstock every channel of a table, using the channel's configured rate.
///
/// Computed fresh on every call; nothing is cached between requests.
pub fn adstock_table(
    table: &TimeSeriesTable,
    decay: &DecayConfig,
) -> Result<BTreeMap<String, Vec<f64>>, MmmError> {
    let mut out = BTreeMap::new();
    for channel in table.channels() {
        let spend = table.spend_series(channel)?;
        let adstocked = geometric_adstock(&spend, decay.rate_for(channel))?;
        out.insert(channel.clone(), adstocked);
    }
    Ok(out)
}

/// Residual effect of one unit of spend over `periods` months:
/// `[1, d, d², ...]`. Intended for downstream visualization.
pub fn decay_curve(decay: f64, periods: usize) -> Result<Vec<f64>, MmmError> {
    validate_decay(decay)?;
    Ok((0..periods).map(|t| decay.powi(t as i32)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MonthlyRecord, Period};

    #[test]
    fn test_adstock_worked_example() {
        // A[1] = 20 + 0.5*10 = 25, A[2] = 30 + 0.5*25 = 42.5
        let result = geometric_adstock(&[10.0, 20.0, 30.0], 0.5).unwrap();
        assert_eq!(result, vec![10.0, 25.0, 42.5]);
    }

    #[test]
    fn test_zero_decay_is_identity() {
        let spend = vec![5.0, 0.0, 12.5, 7.0];
        let result = geometric_adstock(&spend, 0.0).unwrap();
        assert_eq!(result, spend);
    }

    #[test]
    fn test_empty_series() {
        let result = geometric_adstock(&[], 0.5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_output_dominates_input() {
        let spend = vec![3.0, 9.0, 1.0, 0.0, 4.0];
        let result = geometric_adstock(&spend, 0.8).unwrap();
        assert_eq!(result.len(), spend.len());
        for (a, s) in result.iter().zip(spend.iter()) {
            assert!(a >= s);
        }
    }

    #[test]
    fn test_negative_spend_rejected() {
        let result = geometric_adstock(&[1.0, -2.0, 3.0], 0.5);
        assert!(matches!(
            result,
            Err(MmmError::InputValidation(
                ValidationError::NegativeSeriesValue { index: 1, .. }
            ))
        ));
    }

    #[test]
    fn test_decay_out_of_range() {
        for bad in [-0.1, 1.0, 1.5, f64::NAN] {
            let result = geometric_adstock(&[1.0], bad);
            assert!(matches!(
                result,
                Err(MmmError::InputValidation(ValidationError::DecayOutOfRange(_)))
            ));
        }
    }

    #[test]
    fn test_per_channel_rates() {
        let mut records = Vec::new();
        for month in 1..=3u32 {
            let mut spend = std::collections::BTreeMap::new();
            spend.insert("tv".to_string(), 10.0);
            spend.insert("web".to_string(), 10.0);
            records.push(MonthlyRecord {
                period: Period::new(2024, month).unwrap(),
                sales: 100.0,
                spend,
                brand_health: None,
            });
        }
        let table = TimeSeriesTable::new(records).unwrap();
        let decay = DecayConfig::uniform(0.0)
            .unwrap()
            .with_channel("tv", 0.5)
            .unwrap();

        let adstocked = adstock_table(&table, &decay).unwrap();
        assert_eq!(adstocked["tv"], vec![10.0, 15.0, 17.5]);
        assert_eq!(adstocked["web"], vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_decay_curve() {
        let curve = decay_curve(0.5, 4).unwrap();
        assert_eq!(curve, vec![1.0, 0.5, 0.25, 0.125]);
        assert!(decay_curve(1.0, 4).is_err());
    }
}
