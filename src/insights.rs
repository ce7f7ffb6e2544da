//! Rule-based narrative insights.
//!
//! Each rule reads only the shared inputs and emits at most one sentence.
//! Rules run in a fixed order, so the same inputs always give the same text.

use chrono::Month;
use log::debug;

use crate::config::InsightConfig;
use crate::stats::kpi::KpiSet;
use crate::time_series::anomaly::AnomalyReport;
use crate::time_series::decomposition::DecompositionResult;

/// Inputs shared by every rule
struct Context<'a> {
    kpis: &'a KpiSet,
    anomalies: &'a AnomalyReport,
    decomposition: Option<&'a DecompositionResult>,
    config: &'a InsightConfig,
}

type Rule = fn(&Context<'_>) -> Option<String>;

const RULES: [(&str, Rule); 8] = [
    ("no_data", no_data),
    ("overall_growth", overall_growth),
    ("top_metric", top_metric),
    ("volatility", volatility),
    ("anomalies", anomaly_count),
    ("seasonality", seasonality),
    ("trend", trend),
    ("peak_month", peak_month),
];

/// Generate insights from analysis results, in rule priority order
pub fn generate_insights(
    kpis: &KpiSet,
    anomalies: &AnomalyReport,
    decomposition: Option<&DecompositionResult>,
    config: &InsightConfig,
) -> Vec<String> {
    let ctx = Context {
        kpis,
        anomalies,
        decomposition,
        config,
    };
    RULES
        .iter()
        .filter_map(|(name, rule)| {
            let insight = rule(&ctx);
            if insight.is_some() {
                debug!("insight rule '{}' fired", name);
            }
            insight
        })
        .collect()
}

fn no_data(ctx: &Context<'_>) -> Option<String> {
    ctx.kpis
        .is_empty()
        .then(|| "Not enough data to generate insights".to_string())
}

fn overall_growth(ctx: &Context<'_>) -> Option<String> {
    let growth = ctx.kpis.aggregate.growth_rate.get()?;
    let threshold = ctx.config.growth_threshold;
    if growth >= threshold {
        Some(format!(
            "Positive trend: total sales grew by {:.1}%",
            growth * 100.0
        ))
    } else if growth <= -threshold {
        Some(format!(
            "Negative trend: total sales fell by {:.1}%",
            growth.abs() * 100.0
        ))
    } else {
        None
    }
}

fn top_metric(ctx: &Context<'_>) -> Option<String> {
    let (metric, total) = ctx
        .kpis
        .metrics
        .iter()
        .filter_map(|k| k.total.get().map(|t| (k.metric.as_str(), t)))
        .fold(None, |best: Option<(&str, f64)>, (m, t)| match best {
            Some((_, b)) if b >= t => best,
            _ => Some((m, t)),
        })?;
    Some(format!(
        "Top seller: {} with a total volume of {}",
        metric,
        group_thousands(total)
    ))
}

fn volatility(ctx: &Context<'_>) -> Option<String> {
    let volatile: Vec<String> = ctx
        .kpis
        .metrics
        .iter()
        .filter_map(|k| {
            let cv = k.coefficient_of_variation.get()?;
            (cv > ctx.config.volatility_cv_threshold).then(|| format!("{} (CV = {:.2})", k.metric, cv))
        })
        .collect();
    if volatile.is_empty() {
        None
    } else {
        Some(format!("High sales volatility: {}", volatile.join(", ")))
    }
}

fn anomaly_count(ctx: &Context<'_>) -> Option<String> {
    let total = ctx.anomalies.total();
    let (metric, count) = ctx.anomalies.most_affected()?;
    let noun = if total == 1 { "anomaly" } else { "anomalies" };
    if count == total {
        Some(format!("{} {} detected in {}", total, noun, metric))
    } else {
        Some(format!(
            "{} {} detected; {} has the most ({})",
            total, noun, metric, count
        ))
    }
}

fn seasonality(ctx: &Context<'_>) -> Option<String> {
    let result = ctx.decomposition?;
    let strength = result.metrics.seasonal_strength.get()?;
    (strength > ctx.config.strength_threshold).then(|| {
        format!(
            "{} shows a strong seasonal pattern (period {}, strength {:.2})",
            result.metric, result.period, strength
        )
    })
}

fn trend(ctx: &Context<'_>) -> Option<String> {
    let result = ctx.decomposition?;
    let strength = result.metrics.trend_strength.get()?;
    if strength <= ctx.config.strength_threshold {
        return None;
    }
    let direction = result.trend_direction()?;
    let word = if direction > 0.0 {
        "rising"
    } else if direction < 0.0 {
        "falling"
    } else {
        return None;
    };
    Some(format!(
        "{} has a strong {} trend (strength {:.2})",
        result.metric, word, strength
    ))
}

fn peak_month(ctx: &Context<'_>) -> Option<String> {
    let month = ctx.kpis.aggregate.peak_month?;
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    Some(format!("Peak sales month: {}", month.name()))
}

/// Round to an integer and group digits by thousands: `1234567.4` -> `1,234,567`
fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, c) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}
