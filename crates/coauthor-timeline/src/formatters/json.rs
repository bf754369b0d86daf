//! JSON report formatting.

use serde_json::{Value, json};

use crate::pipeline::{BatchSummary, HarvestSummary};

/// Compact JSON view of a batch summary.
#[must_use]
pub fn batch_json(summary: &BatchSummary) -> Value {
    json!({
        "targets": summary.total(),
        "processed": summary.processed.len(),
        "skipped": summary.skipped,
        "failed": summary.failed,
        "records_written": summary.records_written(),
        "labels": summary.label_counts(),
        "per_target": summary.processed,
    })
}

/// Compact JSON view of a harvest summary.
#[must_use]
pub fn harvest_json(summary: &HarvestSummary) -> Value {
    json!(summary)
}

/// Pretty-print a value.
#[must_use]
pub fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimelineError;
    use crate::pipeline::TargetReport;

    #[test]
    fn test_batch_json_shape() {
        let mut summary = BatchSummary::default();
        summary.record("A1", Ok(TargetReport { target_id: "A1".into(), records_written: 2, ..TargetReport::default() }));
        summary.record("A2", Err(TimelineError::malformed("A2", 2010, "publication W1 is dated 2011")));

        let value = batch_json(&summary);
        assert_eq!(value["targets"], 2);
        assert_eq!(value["records_written"], 2);
        assert_eq!(value["failed"][0]["year"], 2010);
        assert_eq!(value["labels"]["existing_collaboration"], 0);
    }
}
