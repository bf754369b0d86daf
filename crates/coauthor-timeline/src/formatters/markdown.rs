//! Markdown report formatting.

use crate::pipeline::{BatchSummary, HarvestSummary, TargetIssue};

/// Format a batch summary as Markdown.
#[must_use]
pub fn format_batch_markdown(summary: &BatchSummary) -> String {
    if summary.total() == 0 {
        return "No targets processed.".to_string();
    }

    let mut output = format!("# Coauthor Timeline Batch ({} targets)\n\n", summary.total());

    output.push_str(&format!(
        "**Processed**: {} | **Skipped**: {} | **Failed**: {} | **Records written**: {}\n\n",
        summary.processed.len(),
        summary.skipped.len(),
        summary.failed.len(),
        summary.records_written()
    ));

    // Labels
    let written = summary.records_written();
    output.push_str("## Relationships\n\n| Label | Records | Share |\n|---|---:|---:|\n");
    for (kind, count) in summary.label_counts() {
        output.push_str(&format!("| `{kind}` | {count} | {} |\n", percent(count, written)));
    }
    output.push('\n');

    if !summary.processed.is_empty() {
        output.push_str("## Targets\n\n| Target | Years | Written | Already stored | Author rows |\n|---|---:|---:|---:|---:|\n");
        for report in &summary.processed {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                report.target_id, report.years, report.records_written, report.already_stored, report.author_rows
            ));
        }
        output.push('\n');
    }

    output.push_str(&format_issues("Skipped", &summary.skipped));
    output.push_str(&format_issues("Failed", &summary.failed));
    output
}

/// Format a harvest summary as Markdown.
#[must_use]
pub fn format_harvest_markdown(summary: &HarvestSummary) -> String {
    let mut output = String::from("# Harvest\n\n");
    output.push_str(&format!(
        "**Harvested**: {} | **Already covered**: {} | **Works accepted**: {} | **Inserted**: {} | **Coalesced**: {}\n\n",
        summary.harvested, summary.covered, summary.accepted, summary.inserted, summary.coalesced
    ));
    output.push_str(&format_issues("Failed", &summary.failed));
    output
}

fn format_issues(heading: &str, issues: &[TargetIssue]) -> String {
    if issues.is_empty() {
        return String::new();
    }

    let mut output = format!("## {heading} ({})\n\n", issues.len());
    for issue in issues {
        let retry = if issue.retryable { " _(retryable)_" } else { "" };
        match issue.year {
            Some(year) => output.push_str(&format!("- **{}** ({year}): {}{retry}\n", issue.target_id, issue.reason)),
            None => output.push_str(&format!("- **{}**: {}{retry}\n", issue.target_id, issue.reason)),
        }
    }
    output.push('\n');
    output
}

fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::CollaborationKind;
    use crate::pipeline::TargetReport;

    #[test]
    fn test_empty_batch() {
        assert_eq!(format_batch_markdown(&BatchSummary::default()), "No targets processed.");
    }

    fn issue(target_id: &str, year: Option<i32>, reason: &str, retryable: bool) -> TargetIssue {
        TargetIssue { target_id: target_id.into(), year, reason: reason.into(), retryable }
    }

    #[test]
    fn test_batch_sections() {
        let summary = BatchSummary {
            processed: vec![TargetReport {
                target_id: "A1".into(),
                years: 4,
                records_written: 4,
                labels: BTreeMap::from([
                    (CollaborationKind::NewCollaboration, 3),
                    (CollaborationKind::ExistingCollaboration, 1),
                ]),
                ..TargetReport::default()
            }],
            skipped: vec![issue("A2", None, "no career span", false)],
            failed: vec![issue("A3", Some(2019), "bad record", false), issue("A4", None, "API error", true)],
        };

        let md = format_batch_markdown(&summary);
        assert!(md.contains("(4 targets)"));
        assert!(md.contains("| `new_collaboration` | 3 | 75.0% |"));
        assert!(md.contains("| `new_via_mutual_connection` | 0 | 0.0% |"));
        assert!(md.contains("- **A2**: no career span"));
        assert!(md.contains("- **A3** (2019): bad record\n"));
        assert!(md.contains("- **A4**: API error _(retryable)_"));
    }
}
