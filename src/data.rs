use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{MmmError, ValidationError};

/// A year-month period identifier, ordered by (year, month).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Month must lie in `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self, MmmError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::MonthOutOfRange(month).into());
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One month of observed data: total sales, per-channel spend, and an
/// optional brand-health score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub period: Period,
    pub sales: f64,
    pub spend: BTreeMap<String, f64>,
    pub brand_health: Option<f64>,
}

/// An immutable, validated monthly table.
///
/// Construction enforces: at least two records, strictly increasing periods,
/// an identical channel set in every record, and non-negative sales and
/// spend. The engine never mutates a table after construction, so one table
/// can back any number of concurrent analysis requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    records: Vec<MonthlyRecord>,
    channels: Vec<String>,
}

impl TimeSeriesTable {
    /// Validate and freeze a sequence of monthly records.
    ///
    /// # Errors
    /// Returns `MmmError::InputValidation` describing the first violation
    /// found. Negative spend is rejected, never clamped.
    pub fn new(records: Vec<MonthlyRecord>) -> Result<Self, MmmError> {
        if records.len() < 2 {
            return Err(ValidationError::TooFewRecords(records.len()).into());
        }

        // BTreeMap keys are already sorted and deduplicated.
        let channels: Vec<String> = records[0].spend.keys().cloned().collect();

        for pair in records.windows(2) {
            if pair[0].period >= pair[1].period {
                return Err(ValidationError::PeriodOrder {
                    prev: pair[0].period,
                    next: pair[1].period,
                }
                .into());
            }
        }

        for record in &records {
            if !record.spend.keys().eq(channels.iter()) {
                return Err(ValidationError::ChannelSetMismatch {
                    period: record.period,
                }
                .into());
            }
            if !(record.sales >= 0.0) {
                return Err(ValidationError::NegativeSales {
                    amount: record.sales,
                    period: record.period,
                }
                .into());
            }
            for (channel, &amount) in &record.spend {
                if !(amount >= 0.0) {
                    return Err(ValidationError::NegativeSpend {
                        channel: channel.clone(),
                        amount,
                        period: record.period,
                    }
                    .into());
                }
            }
        }

        Ok(Self { records, channels })
    }

    /// Number of monthly observations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Channel names, sorted lexicographically.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn records(&self) -> &[MonthlyRecord] {
        &self.records
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.records.iter().map(|r| r.period)
    }

    /// Total-sales series, one value per record.
    pub fn sales(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.sales).collect()
    }

    /// Raw spend series for one channel.
    ///
    /// # Errors
    /// `ValidationError::UnknownChannel` if the channel is not in the table.
    pub fn spend_series(&self, channel: &str) -> Result<Vec<f64>, MmmError> {
        if !self.channels.iter().any(|c| c == channel) {
            return Err(ValidationError::UnknownChannel(channel.to_string()).into());
        }
        Ok(self
            .records
            .iter()
            .map(|r| r.spend[channel])
            .collect())
    }

    /// Brand-health series, or `None` if any record lacks a score.
    pub fn brand_health_series(&self) -> Option<Vec<f64>> {
        self.records.iter().map(|r| r.brand_health).collect()
    }

    /// Brand-health series, failing with the first missing period.
    pub fn require_brand_health(&self) -> Result<Vec<f64>, MmmError> {
        let mut out = Vec::with_capacity(self.records.len());
        for record in &self.records {
            match record.brand_health {
                Some(score) => out.push(score),
                None => {
                    return Err(ValidationError::MissingBrandHealth {
                        period: record.period,
                    }
                    .into())
                }
            }
        }
        Ok(out)
    }
}
