//! Formatted terminal output.
//!
//! Formatting lives in one place so the batch/fit code stays clean and
//! output changes are localized.

use crate::domain::{FitOutput, JobOutcome, JobStatus};
use crate::models::PhysicalModel;

/// Plain-text table of the model's parameters: name, element count, free
/// flag, initial value(s), prior, units.
pub fn format_model_table(model: &PhysicalModel) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Model parameters ({}):\n",
        model.model_type.display_name()
    ));
    out.push_str(&format!(
        "{:<18} {:>3} {:>5}  {:<22} {:<38} {}\n",
        "parameter", "N", "free", "init", "prior", "units"
    ));

    for p in &model.params {
        let prior = p
            .prior
            .as_ref()
            .map(|pr| pr.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<18} {:>3} {:>5}  {:<22} {:<38} {}\n",
            p.name,
            p.n,
            if p.free { "yes" } else { "no" },
            fmt_vec(&p.init),
            prior,
            p.units
        ));
    }

    out
}

/// One-job fit summary.
pub fn format_fit_summary(dataset: &str, fit: &FitOutput) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== {dataset}: {} engine ===\n",
        fit.engine.display_name()
    ));
    out.push_str(&format!(
        "chi2={:.3} over n={} | ln_prob={:.3} | evaluations={}\n",
        fit.chi2, fit.n_valid, fit.ln_prob, fit.evaluations
    ));
    if let Some(log_z) = fit.log_evidence {
        out.push_str(&format!("log_evidence={log_z:.3}\n"));
    }
    for p in &fit.parameters {
        out.push_str(&format!("- {:<18} {}\n", p.name, fmt_vec(&p.values)));
    }

    out
}

/// Per-worker batch summary enumerating successes and failures by dataset.
pub fn format_batch_summary(worker_index: usize, outcomes: &[JobOutcome]) -> String {
    let mut out = String::new();

    let n_ok = outcomes.iter().filter(|o| o.is_success()).count();
    let n_fail = outcomes.len() - n_ok;

    out.push_str(&format!(
        "=== worker {worker_index}: {} job(s), {n_ok} succeeded, {n_fail} failed ===\n",
        outcomes.len()
    ));

    for outcome in outcomes {
        match &outcome.status {
            JobStatus::Success(fit) => {
                out.push_str(&format!(
                    "ok    {:<24} chi2={:<12.3} {:>8.1}s\n",
                    outcome.dataset,
                    fit.chi2,
                    outcome.duration.as_secs_f64()
                ));
            }
            JobStatus::Failure { kind, message } => {
                out.push_str(&format!(
                    "FAIL  {:<24} [{kind}] {message} ({:.1}s)\n",
                    outcome.dataset,
                    outcome.duration.as_secs_f64()
                ));
            }
        }
    }

    out
}

/// Compact vector formatting; long vectors are elided after four entries.
fn fmt_vec(values: &[f64]) -> String {
    const SHOWN: usize = 4;
    let shown: Vec<String> = values.iter().take(SHOWN).map(|v| format!("{v:.3}")).collect();
    if values.len() > SHOWN {
        format!("{}, … ({})", shown.join(", "), values.len())
    } else {
        shown.join(", ")
    }
}
