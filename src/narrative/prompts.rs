use crate::config::{MAX_PAST_FORECASTS_IN_PROMPT, MAX_SUGGESTIONS};
use crate::error::{AppError, Result};
use crate::types::{Forecast, Resolution, StatsReport, Suggestion};

pub fn calibration_summary_prompt(report: &StatsReport) -> String {
    let brier = report
        .brier_score
        .map_or("n/a".to_string(), |b| format!("{b:.4}"));

    let bins = if report.calibration_bins.is_empty() {
        "No resolved forecasts yet.".to_string()
    } else {
        report
            .calibration_bins
            .iter()
            .map(|b| {
                format!(
                    "{}: stated {:.1}% on average, came true {:.1}% of the time ({} forecasts)",
                    b.range, b.avg_predicted, b.actual_frequency, b.count
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are reviewing someone's forecasting track record.\n\
         \n\
         Total forecasts: {total}\n\
         Resolved forecasts: {resolved}\n\
         Brier score: {brier} (0 is perfect, 0.25 is what always saying 50% gets you)\n\
         \n\
         Calibration by stated confidence:\n\
         {bins}\n\
         \n\
         In 3-4 plain-text sentences (no markdown), explain what the Brier score says about \
         their accuracy, which confidence ranges look over- or under-confident, and give one \
         concrete tip. Keep it friendly.",
        total = report.total_predictions,
        resolved = report.resolved_predictions,
    )
}

pub fn forecast_insight_prompt(forecast: &Forecast) -> String {
    let pct = forecast.probability.percent();
    match forecast.resolution {
        Resolution::Resolved { outcome } => {
            let happened = if outcome { "happened" } else { "did not happen" };
            format!(
                "Forecast: \"{desc}\"\n\
                 Stated confidence: {pct:.0}%\n\
                 Result: it {happened}\n\
                 \n\
                 In 2-3 plain-text sentences (no markdown), say whether {pct:.0}% was a \
                 reasonable confidence and offer one takeaway.",
                desc = forecast.description,
            )
        }
        Resolution::Unresolved => format!(
            "Open forecast: \"{desc}\"\n\
             Stated confidence: {pct:.0}%\n\
             \n\
             In 1-2 plain-text sentences (no markdown), comment on whether the confidence \
             looks reasonable and what to watch before it resolves.",
            desc = forecast.description,
        ),
    }
}

pub fn suggestions_prompt(past: &[String]) -> String {
    let context = if past.is_empty() {
        String::new()
    } else {
        let listed = past
            .iter()
            .take(MAX_PAST_FORECASTS_IN_PROMPT)
            .map(|d| format!("- {d}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\n\nForecasts they already made:\n{listed}\n\nPick different topics in a similar style.")
    };

    format!(
        "Suggest {MAX_SUGGESTIONS} forecasts someone could make to practise calibration. \
         Each must have a clear yes/no outcome, resolve within days to months, and not be \
         obvious. Vary the topics.{context}\n\
         \n\
         Reply with ONLY a JSON array, for example:\n\
         [{{\"description\": \"...\", \"confidence\": 60}}]\n\
         where confidence is a starting percentage between 30 and 80."
    )
}

/// Parse the generator's reply into at most `MAX_SUGGESTIONS` entries.
/// Accepts a bare JSON array or one wrapped in a ``` / ```json fence.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>> {
    let body = strip_code_fence(text.trim());
    let mut suggestions: Vec<Suggestion> = serde_json::from_str(body)?;
    suggestions.retain(|s| !s.description.trim().is_empty());
    if suggestions.is_empty() {
        return Err(AppError::Narrative("generator returned no suggestions".to_string()));
    }
    suggestions.truncate(MAX_SUGGESTIONS);
    Ok(suggestions)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let inner = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    inner.trim()
}

/// Used whenever the generator cannot produce suggestions.
pub fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion {
            description: "It will rain in my city this week".to_string(),
            confidence: 50.0,
        },
        Suggestion {
            description: "I will complete my main work project by the end of this month".to_string(),
            confidence: 70.0,
        },
        Suggestion {
            description: "A major tech company will announce a new product in the next 30 days"
                .to_string(),
            confidence: 60.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::compute_report;
    use crate::calibration::test_support::forecast;

    #[test]
    fn summary_prompt_lists_bins_and_score() {
        let report = compute_report(&[forecast(0.9, Some(true)), forecast(0.1, Some(false))]);
        let prompt = calibration_summary_prompt(&report);
        assert!(prompt.contains("Resolved forecasts: 2"));
        assert!(prompt.contains("Brier score: 0.0100"));
        assert!(prompt.contains("10%-20%: stated 10.0% on average, came true 0.0%"));
        assert!(prompt.contains("90%-100%"));
    }

    #[test]
    fn summary_prompt_handles_empty_report() {
        let prompt = calibration_summary_prompt(&compute_report(&[]));
        assert!(prompt.contains("Brier score: n/a"));
        assert!(prompt.contains("No resolved forecasts yet."));
    }

    #[test]
    fn insight_prompt_depends_on_resolution() {
        let open = forecast_insight_prompt(&forecast(0.65, None));
        assert!(open.starts_with("Open forecast"));
        assert!(open.contains("65%"));

        let missed = forecast_insight_prompt(&forecast(0.8, Some(false)));
        assert!(missed.contains("it did not happen"));
    }

    #[test]
    fn suggestions_prompt_caps_past_context() {
        let past: Vec<String> = (0..15).map(|i| format!("topic {i}")).collect();
        let prompt = suggestions_prompt(&past);
        assert!(prompt.contains("- topic 9"));
        assert!(!prompt.contains("- topic 10"));
        assert!(!suggestions_prompt(&[]).contains("already made"));
    }

    #[test]
    fn parses_bare_and_fenced_arrays() {
        let bare = r#"[{"description": "a", "confidence": 40}]"#;
        assert_eq!(parse_suggestions(bare).unwrap()[0].confidence, 40.0);

        let fenced = "```json\n[{\"description\": \"b\", \"confidence\": 55.5}]\n```";
        let parsed = parse_suggestions(fenced).unwrap();
        assert_eq!(parsed[0].description, "b");

        let plain_fence = "```\n[{\"description\": \"c\", \"confidence\": 70}]\n```";
        assert_eq!(parse_suggestions(plain_fence).unwrap()[0].description, "c");
    }

    #[test]
    fn parse_truncates_and_rejects_garbage() {
        let many = r#"[
            {"description": "1", "confidence": 30},
            {"description": "2", "confidence": 40},
            {"description": "3", "confidence": 50},
            {"description": "4", "confidence": 60}
        ]"#;
        assert_eq!(parse_suggestions(many).unwrap().len(), MAX_SUGGESTIONS);
        assert!(parse_suggestions("Sure! Here are some ideas").is_err());
        assert!(parse_suggestions("[]").is_err());
    }

    #[test]
    fn fallback_has_three_entries() {
        assert_eq!(fallback_suggestions().len(), MAX_SUGGESTIONS);
    }
}
