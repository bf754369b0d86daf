//! Batch report rendering.

pub mod json;
pub mod markdown;

use crate::models::ResponseFormat;
use crate::pipeline::{BatchSummary, HarvestSummary};

/// Render a batch summary in the requested format.
#[must_use]
pub fn render_batch(summary: &BatchSummary, format: ResponseFormat) -> String {
    match format {
        ResponseFormat::Markdown => markdown::format_batch_markdown(summary),
        ResponseFormat::Json => json::to_pretty(&json::batch_json(summary)),
    }
}

/// Render a harvest summary in the requested format.
#[must_use]
pub fn render_harvest(summary: &HarvestSummary, format: ResponseFormat) -> String {
    match format {
        ResponseFormat::Markdown => markdown::format_harvest_markdown(summary),
        ResponseFormat::Json => json::to_pretty(&json::harvest_json(summary)),
    }
}
