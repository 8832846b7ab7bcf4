//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the model/metric code stays free of presentation concerns
//! - output changes are localized

use crate::diagnostic::{DifferentialDiagnosis, FactorShare};
use crate::domain::{Criterion, Dataset, FactorSet};
use crate::models::Elasticities;
use crate::selection::ComparisonTable;

/// Dataset header: source, size, per-column statistics.
pub fn format_dataset_summary(data: &Dataset, source: &str, skipped_rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== saviesa - Saviesa model comparison ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!("Observations: n={}", data.len()));
    if skipped_rows > 0 {
        out.push_str(&format!(" ({skipped_rows} rows skipped)"));
    }
    out.push('\n');

    let stats = data.stats();
    out.push_str(&format!(
        "{:<10} {:>8} {:>8} {:>8} {:>8}\n",
        "column", "mean", "std", "min", "max"
    ));
    let columns = data
        .factors
        .names()
        .iter()
        .map(String::as_str)
        .zip(stats.factors.iter())
        .chain(std::iter::once(("F", &stats.target)));
    for (name, s) in columns {
        out.push_str(&format!(
            "{:<10} {:>8.4} {:>8.4} {:>8.4} {:>8.4}\n",
            truncate(name, 10),
            s.mean,
            s.std,
            s.min,
            s.max
        ));
    }
    out
}

/// Comparison table; the preferred model under `criterion` is starred.
pub fn format_comparison(table: &ComparisonTable, criterion: Criterion) -> String {
    let mut out = String::new();
    let preferred = table.preferred(criterion).map(|r| r.model.clone());
    let with_loocv = table.rows().iter().any(|r| r.loocv.is_some());

    out.push_str("\nModel comparison:\n");
    let mut header = format!(
        "  {:<16} {:>3} {:>8} {:>8} {:>8} {:>11} {:>11}",
        "model", "k", "R2", "RMSE", "MAE", "AIC", "BIC"
    );
    if with_loocv {
        header.push_str(&format!(" {:>8} {:>8} {:>8}", "R2_cv", "RMSE_cv", "gap"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for r in table.rows() {
        let mark = if preferred.as_deref() == Some(r.model.as_str()) { "*" } else { " " };
        let m = &r.metrics;
        let mut line = format!(
            "{mark} {:<16} {:>3} {:>8.4} {:>8.4} {:>8.4} {:>11} {:>11}",
            truncate(&r.model, 16),
            r.n_params,
            m.r2,
            m.rmse,
            m.mae,
            fmt_opt(m.aic, 2),
            fmt_opt(m.bic, 2),
        );
        if let Some(cv) = r.loocv {
            line.push_str(&format!(" {:>8.4} {:>8.4} {:>8.4}", cv.r2, cv.rmse, cv.overfit_gap));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let label = match criterion {
        Criterion::Aic => "AIC",
        Criterion::Bic => "BIC",
    };
    match preferred {
        Some(name) => out.push_str(&format!("\nPreferred by {label} (simpler within 2.0): {name}\n")),
        None => out.push_str(&format!("\nNo model has a finite {label}.\n")),
    }
    out
}

/// Elasticities of the multiplicative fit.
pub fn format_elasticities(el: &Elasticities, factors: &FactorSet) -> String {
    let mut out = String::from("\nElasticities (multiplicative model):\n");
    for (name, beta) in factors.names().iter().zip(el.elasticities.iter()) {
        out.push_str(&format!("  beta_{name:<8} {beta:>9.4}\n"));
    }
    out.push_str(&format!("  intercept     {:>9.4}\n", el.intercept));
    out
}

/// Differential diagnosis: agreement, gains, label distributions.
pub fn format_diagnosis(diag: &DifferentialDiagnosis) -> String {
    let mut out = String::new();
    let d = &diag.divergence;

    out.push_str("\nLimiting-factor diagnosis (multiplicative vs additive):\n");
    out.push_str(&format!(
        "  additive weights: {}\n",
        diag.factors
            .iter()
            .zip(diag.additive_weights.iter())
            .map(|(n, w)| format!("{n}={w:.4}"))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    out.push_str(&format!(
        "  convergent: {} ({:.1}%)\n  divergent : {} ({:.1}%)\n",
        d.n_convergent, d.convergence_rate, d.n_divergent, d.divergence_rate
    ));

    match &diag.gain_summary {
        Some(g) => out.push_str(&format!(
            "  efficiency gain on divergent rows: mean={:.3} median={:.3} min={:.3} max={:.3}\n",
            g.mean, g.median, g.min, g.max
        )),
        None => out.push_str("  efficiency gain: no divergent rows\n"),
    }

    out.push_str(&format!("\n  {:<10} {:>16} {:>16}\n", "factor", "multiplicative", "additive"));
    for (m, a) in diag
        .distribution_multiplicative
        .iter()
        .zip(diag.distribution_additive.iter())
    {
        out.push_str(&format!("  {:<10} {:>16} {:>16}\n", truncate(&m.factor, 10), fmt_share(m), fmt_share(a)));
    }
    out
}

fn fmt_share(s: &FactorShare) -> String {
    format!("{} ({:.1}%)", s.count, s.pct)
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{v:.decimals$}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
