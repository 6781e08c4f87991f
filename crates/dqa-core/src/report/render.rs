use std::collections::BTreeMap;

use crate::TOOL_NAME;
use crate::diff::{DiffPartition, DiffResult};
use crate::findings::{FindingId, Severity};
use crate::report::model::{FlagsArtifact, SeverityCounts, Summary};

fn counts_line(counts: &SeverityCounts) -> String {
    Severity::DESCENDING
        .iter()
        .map(|s| format!("{}={}", s, counts.get(*s)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_summary_text(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, summary.run.tool_version));
    out.push_str(&format!("Dataset: {}\n", summary.dataset.root));
    for (split, c) in &summary.dataset.splits {
        out.push_str(&format!(
            "  {split}: {} images ({} labeled, {} unlabeled)\n",
            c.images, c.labeled, c.unlabeled
        ));
    }
    out.push_str(&format!("Classes: {}\n", summary.dataset.classes.count));
    out.push_str("Checks:\n");
    for (kind, check) in &summary.checks {
        out.push_str(&format!(
            "  - {:<18} {:<9} {}",
            kind.as_str(),
            check.status.as_str(),
            counts_line(&check.counts)
        ));
        if let Some(reason) = &check.reason {
            out.push_str(&format!(" ({reason})"));
        }
        out.push('\n');
    }
    let totals = &summary.totals;
    out.push_str(&format!(
        "Findings: {} [{}]\n",
        totals.findings,
        counts_line(&totals.by_severity)
    ));
    out.push_str(&format!(
        "Gate: fail_on={} -> {}\n",
        totals.fail_threshold,
        if totals.build_failed { "FAILED" } else { "passed" }
    ));
    out
}

/// Totals, the most frequent ids and what to do about the most severe ones.
pub fn render_explain(summary: &Summary, flags: &FlagsArtifact, top: usize) -> String {
    let mut by_id: BTreeMap<FindingId, (usize, Severity)> = BTreeMap::new();
    for f in &flags.findings {
        let slot = by_id.entry(f.id).or_insert((0, f.severity));
        slot.0 += 1;
        slot.1 = slot.1.max(f.severity);
    }

    let mut frequent: Vec<(FindingId, usize, Severity)> =
        by_id.into_iter().map(|(id, (n, s))| (id, n, s)).collect();
    frequent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    let mut out = String::new();
    out.push_str(&format!(
        "Run {}: {} findings [{}], gate {}\n",
        summary.run.run_id,
        summary.totals.findings,
        counts_line(&summary.totals.by_severity),
        if summary.totals.build_failed { "FAILED" } else { "passed" }
    ));
    if frequent.is_empty() {
        out.push_str("No findings.\n");
        return out;
    }

    out.push_str("Top findings:\n");
    for (id, n, severity) in frequent.iter().take(top) {
        out.push_str(&format!("  {:>5}  {:<8} {}\n", n, severity, id));
    }

    let mut severe = frequent.clone();
    severe.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    out.push_str("Suggested actions:\n");
    for (id, _, severity) in severe.iter().take(top) {
        let entry = id.entry();
        out.push_str(&format!(
            "  [{}] {} ({}): {}\n",
            severity, id, entry.title, entry.suggested_action
        ));
    }
    out
}

fn partition_lines(out: &mut String, title: &str, part: &DiffPartition) {
    out.push_str(&format!(
        "{}: {} [{}]\n",
        title,
        part.findings.len(),
        counts_line(&part.counts)
    ));
    for f in &part.findings {
        out.push_str(&format!("  {} {:<8} {} {}\n", f.fingerprint, f.severity, f.id, f.message));
    }
}

pub fn render_diff_text(diff: &DiffResult) -> String {
    let mut out = String::new();
    partition_lines(&mut out, "Introduced", &diff.introduced);
    partition_lines(&mut out, "Resolved", &diff.resolved);
    out.push_str(&format!(
        "Persisting: {} [{}]\n",
        diff.persisting.findings.len(),
        counts_line(&diff.persisting.counts)
    ));
    out.push_str(&format!(
        "Regression (>= {}): {}\n",
        diff.regression_threshold,
        if diff.regression { "yes" } else { "no" }
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::diff::diff_findings;
    use crate::findings::Finding;
    use crate::report::aggregate::aggregate;
    use crate::report::model::RunInfo;
    use crate::split::Split;
    use crate::testing::{entry, index_of};

    fn sample() -> (Summary, FlagsArtifact) {
        let index = index_of(vec![
            entry(Split::Train, "train/images/a.png", Some("h"), None),
            entry(Split::Val, "val/images/b.png", Some("h"), None),
        ]);
        let config = AuditConfig::default();
        let outcomes = crate::checks::run_checks(&index, &config);
        let report = aggregate(
            &index,
            &config,
            outcomes,
            RunInfo::new("20260101_000000", "t0", "t1", 0.0, &config),
        );
        (report.summary, report.flags)
    }

    #[test]
    fn summary_text_lists_checks_and_gate() {
        let (summary, _) = sample();
        let text = render_summary_text(&summary);
        assert!(text.contains("near_duplicates"));
        assert!(text.contains("(disabled)"));
        assert!(text.contains("Gate: fail_on=high -> FAILED"));
    }

    #[test]
    fn explain_puts_most_severe_action_first() {
        let (summary, flags) = sample();
        let text = render_explain(&summary, &flags, 3);
        let actions = text.split("Suggested actions:").nth(1).unwrap();
        let first = actions.lines().nth(1).unwrap();
        assert!(first.contains("[critical]"), "{first}");
        assert!(first.contains("LEAKAGE_EXACT_TRAIN_VAL"));
    }

    #[test]
    fn diff_text_reports_regression() {
        let new = vec![Finding::new(FindingId::IntegrityMissingLabel, "m", "fp".into())];
        let text = render_diff_text(&diff_findings(&[], &new, Severity::High));
        assert!(text.contains("Introduced: 1"));
        assert!(text.contains("Regression (>= high): yes"));
    }
}
