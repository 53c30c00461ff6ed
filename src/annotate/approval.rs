use chrono::NaiveDateTime;
use tracing::debug;

use super::{Category, code_text, overlay};
use crate::error::{ExportError, ExportResult};
use crate::model::{AnnotatedPoint, Interval, RawApproval};
use crate::parser::parse_bound;

/// Builds approval intervals, filling open bounds with `range`.
///
/// `range` is the `(min, max)` timestamp of the point series; `None` when the
/// series is empty, in which case open bounds stay open.
pub fn approval_intervals(
    raw: &[RawApproval],
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> ExportResult<Vec<Interval>> {
    raw.iter()
        .enumerate()
        .map(|(i, approval)| {
            let code = approval
                .approval_level
                .as_ref()
                .and_then(code_text)
                .ok_or_else(|| {
                    ExportError::Annotation(format!("approval interval {i} has no ApprovalLevel"))
                })?;

            let start = parse_bound(approval.start_time.as_deref()).or(range.map(|r| r.0));
            let end = parse_bound(approval.end_time.as_deref()).or(range.map(|r| r.1));

            Ok(Interval {
                start,
                end,
                code,
                label: approval.level_description.clone().unwrap_or_default(),
            })
        })
        .collect()
}

/// Overlays approval level and description onto `points`.
pub fn apply_approvals(points: &mut [AnnotatedPoint], raw: &[RawApproval]) -> ExportResult<()> {
    let range = observed_range(points);
    let intervals = approval_intervals(raw, range)?;
    debug!(intervals = intervals.len(), ?range, "Applying approval intervals");
    overlay(points, &intervals, Category::Approval);
    Ok(())
}

fn observed_range(points: &[AnnotatedPoint]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let min = points.iter().map(AnnotatedPoint::timestamp).min()?;
    let max = points.iter().map(AnnotatedPoint::timestamp).max()?;
    Some((min, max))
}
