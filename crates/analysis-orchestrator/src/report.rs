use analysis_core::{AssetClass, CompleteAnalysis};

/// Plain-text rendering of a complete report.
pub fn render_text(analysis: &CompleteAnalysis) -> String {
    let mut lines = Vec::new();

    let title = match &analysis.name {
        Some(name) => format!("{} ({})", analysis.symbol, name),
        None => analysis.symbol.clone(),
    };
    let class = match analysis.asset_class {
        AssetClass::Equity => "equity",
        AssetClass::Crypto => "crypto",
    };
    lines.push(format!("=== {} [{}] ===", title, class));
    lines.push(format!(
        "Generated {}",
        analysis.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    if let Some(quote) = &analysis.quote {
        let mut price = format!("Price: {:.2}", quote.price);
        if let Some(currency) = &quote.currency {
            price.push(' ');
            price.push_str(currency);
        }
        if let Some(pct) = quote.change_percent {
            price.push_str(&format!(" ({:+.2}%)", pct));
        }
        lines.push(price);
    }

    lines.push(format!(
        "Overall: {} / {}  score {:+.0}  confidence {:.0}%",
        analysis.overall_rating,
        analysis.overall_signal.to_label(),
        analysis.overall_score,
        analysis.overall_confidence * 100.0
    ));
    lines.push(format!("Risk-free rate: {:.2}%", analysis.risk_free_rate * 100.0));

    if !analysis.summary.is_empty() {
        lines.push(String::new());
        lines.push("Summary".to_string());
        lines.extend(analysis.summary.iter().map(|s| format!("  - {}", s)));
    }

    for section in &analysis.sections {
        lines.push(String::new());
        lines.push(format!(
            "[{}] {}  score {:+.0}  confidence {:.0}%",
            section.kind.title(),
            section.rating,
            section.score,
            section.confidence * 100.0
        ));
        lines.extend(section.narrative.iter().map(|n| format!("  - {}", n)));
        if !section.signals.is_empty() {
            lines.push(format!("  Signals: {}", section.reason()));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ReportInputs};
    use analysis_core::{AnalysisSection, Quote, SectionKind, SignalSet};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn renders_header_summary_and_sections() {
        let mut signals = SignalSet::new();
        signals.push("Low P/E Ratio", 3, true);
        signals.push("High EV/EBITDA", 1, false);
        let valuation = AnalysisSection::from_signals(
            SectionKind::Valuation,
            signals,
            vec!["A trailing P/E of 12.0 is below 15, a value-range multiple.".to_string()],
            json!({}),
            0.6,
        );

        let report = compose(ReportInputs {
            symbol: "KO".to_string(),
            name: Some("The Coca-Cola Company".to_string()),
            asset_class: AssetClass::Equity,
            quote: Some(Quote {
                symbol: "KO".to_string(),
                price: 60.5,
                previous_close: Some(60.0),
                change: None,
                change_percent: None,
                currency: Some("USD".to_string()),
                exchange: None,
                timestamp: Utc::now(),
            }
            .with_derived_change()),
            sections: vec![valuation],
            yield_curve: None,
            risk_free_rate: 0.0425,
            generated_at: Utc.with_ymd_and_hms(2024, 5, 24, 14, 30, 0).unwrap(),
        });

        let text = render_text(&report);
        assert!(text.starts_with("=== KO (The Coca-Cola Company) [equity] ==="));
        assert!(text.contains("Generated 2024-05-24 14:30 UTC"));
        assert!(text.contains("Price: 60.50 USD (+0.83%)"));
        assert!(text.contains("Risk-free rate: 4.25%"));
        assert!(text.contains("[Valuation] Strong  score +50  confidence 60%"));
        assert!(text.contains("  Signals: + Low P/E Ratio, - High EV/EBITDA"));
    }
}
