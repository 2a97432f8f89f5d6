use serde::{Deserialize, Serialize};
use crate::data::types::HistoryPoint;

/// Fewer points than this and the series is too short to classify.
const MIN_POINTS: usize = 7;
const TREND_WINDOW: usize = 7;
const TREND_DEAD_ZONE: f64 = 5.0;
const VOLATILITY_WINDOW: usize = 14;
const HIGH_STD_DEV: f64 = 15.0;
const MODERATE_STD_DEV: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    High,
    Moderate,
    Low,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Rising => write!(f, "rising"),
            Trend::Falling => write!(f, "falling"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

impl std::fmt::Display for Volatility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Volatility::High => write!(f, "high"),
            Volatility::Moderate => write!(f, "moderate"),
            Volatility::Low => write!(f, "low"),
        }
    }
}

/// Coarse discrete derivative over the last week.
///
/// Compares the mean of the first three and last three of the last seven
/// points; moves inside +/-5 count as noise.
pub fn determine_trend(history: &[HistoryPoint]) -> Trend {
    if history.len() < MIN_POINTS {
        return Trend::Stable;
    }

    let recent = &history[history.len() - TREND_WINDOW..];
    let first = mean(recent[..3].iter().map(|p| p.value));
    let last = mean(recent[TREND_WINDOW - 3..].iter().map(|p| p.value));
    let diff = last - first;

    if diff > TREND_DEAD_ZONE {
        Trend::Rising
    } else if diff < -TREND_DEAD_ZONE {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Population standard deviation of up to the last 14 points.
pub fn determine_volatility(history: &[HistoryPoint]) -> Volatility {
    if history.len() < MIN_POINTS {
        return Volatility::Moderate;
    }

    let start = history.len().saturating_sub(VOLATILITY_WINDOW);
    let std_dev = std_dev(history[start..].iter().map(|p| p.value));

    if std_dev > HIGH_STD_DEV {
        Volatility::High
    } else if std_dev > MODERATE_STD_DEV {
        Volatility::Moderate
    } else {
        Volatility::Low
    }
}

/// Reject real series that break the [0, 100] / chronological invariants.
pub fn validate_series(history: &[HistoryPoint]) -> Result<(), SeriesError> {
    for (i, point) in history.iter().enumerate() {
        if !point.value.is_finite() || !(0.0..=100.0).contains(&point.value) {
            return Err(SeriesError::ValueOutOfRange {
                index: i,
                value: point.value,
            });
        }
        if i > 0 && history[i - 1].date >= point.date {
            return Err(SeriesError::NotChronological { index: i });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("point {index} has value {value} outside [0, 100]")]
    ValueOutOfRange { index: usize, value: f64 },

    #[error("point {index} is not after its predecessor")]
    NotChronological { index: usize },
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let avg = mean(values.clone());
    let variance = mean(values.map(|v| (v - avg).powi(2)));
    variance.sqrt()
}
