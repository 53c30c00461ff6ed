use tracing::debug;

use super::{Category, code_text, overlay};
use crate::error::{ExportError, ExportResult};
use crate::model::{AnnotatedPoint, Interval, RawGrade};
use crate::parser::parse_bound;

/// Builds overlay intervals from the raw `Grades` list, dropping the first
/// and last entries (the store's leading and trailing boundary intervals).
///
/// Bounds that fail to parse leave the interval open, so it matches nothing.
pub fn grade_intervals(raw: &[RawGrade]) -> ExportResult<Vec<Interval>> {
    if raw.len() <= 2 {
        return Ok(Vec::new());
    }

    raw[1..raw.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, grade)| {
            let code = grade
                .grade_code
                .as_ref()
                .and_then(code_text)
                .ok_or_else(|| {
                    ExportError::Annotation(format!("grade interval {} has no GradeCode", i + 1))
                })?;

            Ok(Interval {
                start: parse_bound(grade.start_time.as_deref()),
                end: parse_bound(grade.end_time.as_deref()),
                code,
                label: String::new(),
            })
        })
        .collect()
}

/// Overlays grade codes onto `points`.
pub fn apply_grades(points: &mut [AnnotatedPoint], raw: &[RawGrade]) -> ExportResult<()> {
    let intervals = grade_intervals(raw)?;
    debug!(
        raw = raw.len(),
        retained = intervals.len(),
        "Applying grade intervals"
    );
    overlay(points, &intervals, Category::Grade);
    Ok(())
}
