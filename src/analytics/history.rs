use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use crate::data::types::{HistoryPoint, TimeSeries};

/// 30 days ago through today.
pub const DEFAULT_POINTS: usize = 31;

/// Walk magnitude used when a real probability exists but no real history.
pub const GAP_FILL_VOLATILITY: f64 = 8.0;

/// Walk magnitude used for fully synthetic fallback series.
pub const FALLBACK_VOLATILITY: f64 = 10.0;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Generate a placeholder series when no real history is available.
///
/// Bounded random walk: each step moves by a uniform amount in
/// `[-volatility/2, +volatility/2]` and is clamped to [0, 100]. Emitted values
/// are rounded to two decimals; the walk itself continues unrounded. The last
/// point is dated `end`, earlier points one day apart.
///
/// This is not a forecast. It only gives a metric with partial data a bounded,
/// non-empty series to render.
pub fn synthesize_history<R: Rng + ?Sized>(
    rng: &mut R,
    base_value: f64,
    volatility: f64,
    points: usize,
    end: NaiveDate,
) -> TimeSeries {
    let volatility = if volatility.is_finite() { volatility.abs() } else { 0.0 };
    let mut current = if base_value.is_finite() {
        base_value.clamp(0.0, 100.0)
    } else {
        50.0
    };

    (0..points)
        .map(|i| {
            let days_back = (points - 1 - i) as i64;
            let change = (rng.gen::<f64>() - 0.5) * volatility;
            current = (current + change).clamp(0.0, 100.0);

            HistoryPoint {
                date: end - Duration::days(days_back),
                value: round2(current),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
