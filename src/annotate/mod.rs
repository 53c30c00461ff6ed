//! Interval overlay engine shared by grades, approvals and notes.
//!
//! For every point, the last interval in list order whose inclusive range
//! contains the point's timestamp wins. A narrower interval listed earlier
//! loses to a wider one listed later.

pub mod approval;
pub mod grade;
pub mod note;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::model::{AnnotatedPoint, Interval};

pub use approval::apply_approvals;
pub use grade::apply_grades;
pub use note::apply_notes;

/// Which metadata fields an overlay writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Writes the grade code. The name is filled later by the definition join.
    Grade,
    /// Writes approval code and approval name.
    Approval,
    /// Writes the note text.
    Note,
}

impl Category {
    fn assign(self, point: &mut AnnotatedPoint, interval: &Interval) {
        match self {
            Category::Grade => point.grade_code = interval.code.clone(),
            Category::Approval => {
                point.approval_code = interval.code.clone();
                point.approval_name = interval.label.clone();
            }
            Category::Note => point.note_text = interval.label.clone(),
        }
    }
}

/// Returns the interval that determines the annotation at `ts`: the last one
/// in `intervals` containing it.
pub fn resolve(ts: NaiveDateTime, intervals: &[Interval]) -> Option<&Interval> {
    intervals.iter().rev().find(|iv| iv.contains(ts))
}

/// Applies `intervals` to `points`. Points no interval covers keep whatever
/// the category's fields held before.
pub fn overlay(points: &mut [AnnotatedPoint], intervals: &[Interval], category: Category) {
    if intervals.is_empty() {
        return;
    }
    for point in points.iter_mut() {
        if let Some(interval) = resolve(point.timestamp(), intervals) {
            category.assign(point, interval);
        }
    }
}

/// Renders a code field (number or string) as the text stored on points.
///
/// Whole floats print without a fraction so `41.0` and `41` join the same
/// grade definition.
pub(crate) fn code_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::model::{AnnotatedPoint, ObservationPoint};

    pub fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    /// Store-formatted timestamp for the same instant as [`ts`].
    pub fn stamp(day: u32, hour: u32) -> String {
        format!("2021-01-{day:02}T{hour:02}:00:00.0000000-07:00")
    }

    pub fn points(times: &[(u32, u32)]) -> Vec<AnnotatedPoint> {
        times
            .iter()
            .map(|&(d, h)| {
                AnnotatedPoint::from(ObservationPoint {
                    site: "ABCD_001".into(),
                    timestamp: ts(d, h),
                    utc_offset: "-07:00".into(),
                    value: Some(1.0),
                })
            })
            .collect()
    }
}
