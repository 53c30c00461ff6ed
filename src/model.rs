use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

/// The corrected-series payload returned by the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorrectedSeries {
    #[serde(default)]
    pub points: Vec<RawPoint>,
    #[serde(default)]
    pub grades: Vec<RawGrade>,
    #[serde(default)]
    pub approvals: Vec<RawApproval>,
    #[serde(default)]
    pub notes: Vec<RawNote>,
}

/// One entry of the `Points` array.
///
/// `value` is kept as a JSON value: the store nests the number inside an
/// object (`{"Numeric": 12.5, "Display": "12.5"}`), and some exports carry
/// that object stringified.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPoint {
    pub timestamp: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGrade {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Integer on current servers, string on some older ones.
    pub grade_code: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawApproval {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub approval_level: Option<Value>,
    pub level_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawNote {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub note_text: Option<String>,
}

/// A single observation after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationPoint {
    pub site: String,
    /// Wall-clock time with the offset stripped. All comparisons use this.
    pub timestamp: NaiveDateTime,
    /// Offset as written by the store, e.g. `-07:00`. Provenance only.
    pub utc_offset: String,
    pub value: Option<f64>,
}

/// An observation with the three metadata overlays applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedPoint {
    pub point: ObservationPoint,
    pub grade_code: String,
    pub grade_name: String,
    pub approval_code: String,
    pub approval_name: String,
    pub note_text: String,
}

impl From<ObservationPoint> for AnnotatedPoint {
    fn from(point: ObservationPoint) -> Self {
        AnnotatedPoint {
            point,
            grade_code: String::new(),
            grade_name: String::new(),
            approval_code: String::new(),
            approval_name: String::new(),
            note_text: String::new(),
        }
    }
}

impl AnnotatedPoint {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.point.timestamp
    }
}

/// An interval-scoped annotation ready for overlay.
///
/// A bound of `None` is open; an interval with an open bound matches no
/// point unless the category fills it in first.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub code: String,
    pub label: String,
}

impl Interval {
    /// Inclusive containment test. Open intervals never contain anything.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= ts && ts <= end,
            _ => false,
        }
    }
}
