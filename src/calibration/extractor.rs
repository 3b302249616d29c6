use crate::types::{Forecast, Resolution};

/// A forecast that has passed the resolution gate. The outcome is a plain
/// `bool` here, so the scoring code never sees an undefined outcome.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedForecast<'a> {
    pub forecast: &'a Forecast,
    pub outcome: bool,
}

impl ResolvedForecast<'_> {
    #[inline]
    pub fn probability(&self) -> f64 {
        self.forecast.probability.value()
    }

    /// 1.0 if the event occurred, else 0.0.
    #[inline]
    pub fn observed(&self) -> f64 {
        if self.outcome { 1.0 } else { 0.0 }
    }
}

/// Filter a snapshot down to its resolved forecasts, preserving relative order.
pub fn resolved(snapshot: &[Forecast]) -> Vec<ResolvedForecast<'_>> {
    snapshot
        .iter()
        .filter_map(|forecast| match forecast.resolution {
            Resolution::Resolved { outcome } => Some(ResolvedForecast { forecast, outcome }),
            Resolution::Unresolved => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::test_support::forecast;

    #[test]
    fn empty_snapshot_yields_empty_set() {
        assert!(resolved(&[]).is_empty());
    }

    #[test]
    fn drops_unresolved_and_keeps_order() {
        let snapshot = vec![
            forecast(0.2, Some(false)),
            forecast(0.5, None),
            forecast(0.9, Some(true)),
            forecast(0.4, None),
            forecast(0.7, Some(false)),
        ];
        let out = resolved(&snapshot);
        let probs: Vec<f64> = out.iter().map(|r| r.probability()).collect();
        assert_eq!(probs, vec![0.2, 0.9, 0.7]);
        assert!(out[1].outcome);
        assert_eq!(out[1].observed(), 1.0);
        assert_eq!(out[2].observed(), 0.0);
    }

    #[test]
    fn borrows_from_the_snapshot() {
        let snapshot = vec![forecast(0.6, Some(true))];
        let out = resolved(&snapshot);
        assert!(std::ptr::eq(out[0].forecast, &snapshot[0]));
    }
}
