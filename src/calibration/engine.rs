use crate::calibration::extractor::{resolved, ResolvedForecast};
use crate::config::{BIN_WIDTH, NUM_BINS};
use crate::types::{CalibrationBin, Forecast, StatsReport};

/// Per-bin running totals, rebuilt on every call.
#[derive(Debug, Clone, Copy, Default)]
struct BinAccumulator {
    count: usize,
    occurred: usize,
    probability_sum: f64,
}

/// Build the statistics report for a snapshot.
///
/// Precondition: every forecast already satisfies the `Forecast` invariants
/// (probability in [0, 1], outcome present iff resolved). The result never
/// carries an `ai_summary`; that is attached afterwards by the narrative step.
pub fn compute_report(snapshot: &[Forecast]) -> StatsReport {
    let resolved_set = resolved(snapshot);

    StatsReport {
        total_predictions: snapshot.len(),
        resolved_predictions: resolved_set.len(),
        brier_score: brier_score(&resolved_set),
        calibration_bins: calibration_bins(&resolved_set),
        ai_summary: None,
    }
}

/// Mean of `(p - y)^2` over resolved forecasts. `None` for an empty set.
pub fn brier_score(resolved_set: &[ResolvedForecast<'_>]) -> Option<f64> {
    if resolved_set.is_empty() {
        return None;
    }
    let sum: f64 = resolved_set
        .iter()
        .map(|r| (r.probability() - r.observed()).powi(2))
        .sum();
    Some(sum / resolved_set.len() as f64)
}

/// Bin index for a probability: `min(floor(p * 10), 9)`.
///
/// Bins 0..=8 are upper-exclusive; the last bin is closed so p = 1.0 lands in it.
#[inline]
pub fn bin_index(p: f64) -> usize {
    ((p * NUM_BINS as f64).floor() as usize).min(NUM_BINS - 1)
}

/// "{lower}%-{upper}%" with edges at multiples of `BIN_WIDTH`.
pub fn bin_label(index: usize) -> String {
    let lower = (index as f64 * BIN_WIDTH * 100.0).round();
    let upper = ((index + 1) as f64 * BIN_WIDTH * 100.0).round();
    format!("{lower:.0}%-{upper:.0}%")
}

/// Non-empty bins in ascending probability order.
pub fn calibration_bins(resolved_set: &[ResolvedForecast<'_>]) -> Vec<CalibrationBin> {
    let mut acc = [BinAccumulator::default(); NUM_BINS];

    for r in resolved_set {
        let bin = &mut acc[bin_index(r.probability())];
        bin.count += 1;
        bin.probability_sum += r.probability();
        if r.outcome {
            bin.occurred += 1;
        }
    }

    acc.iter()
        .enumerate()
        .filter(|(_, b)| b.count > 0)
        .map(|(i, b)| CalibrationBin {
            range: bin_label(i),
            count: b.count,
            actual_frequency: 100.0 * b.occurred as f64 / b.count as f64,
            avg_predicted: 100.0 * b.probability_sum / b.count as f64,
        })
        .collect()
}
