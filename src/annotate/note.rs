use super::{Category, overlay};
use crate::error::{ExportError, ExportResult};
use crate::model::{AnnotatedPoint, Interval, RawNote};
use crate::parser::parse_bound;

pub fn note_intervals(raw: &[RawNote]) -> ExportResult<Vec<Interval>> {
    raw.iter()
        .enumerate()
        .map(|(i, note)| {
            let text = note.note_text.clone().ok_or_else(|| {
                ExportError::Annotation(format!("note interval {i} has no NoteText"))
            })?;
            Ok(Interval {
                start: parse_bound(note.start_time.as_deref()),
                end: parse_bound(note.end_time.as_deref()),
                code: String::new(),
                label: text,
            })
        })
        .collect()
}

/// Overlays note text onto `points`. An empty note list clears nothing and
/// leaves every note empty.
pub fn apply_notes(points: &mut [AnnotatedPoint], raw: &[RawNote]) -> ExportResult<()> {
    if raw.is_empty() {
        return Ok(());
    }
    let intervals = note_intervals(raw)?;
    overlay(points, &intervals, Category::Note);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::test_support::{points, stamp};

    fn raw(start: (u32, u32), end: (u32, u32), text: &str) -> RawNote {
        RawNote {
            start_time: Some(stamp(start.0, start.1)),
            end_time: Some(stamp(end.0, end.1)),
            note_text: Some(text.into()),
        }
    }

    #[test]
    fn test_empty_notes_leave_text_empty() {
        let mut pts = points(&[(1, 0), (2, 0)]);
        apply_notes(&mut pts, &[]).unwrap();
        assert!(pts.iter().all(|p| p.note_text.is_empty()));
    }

    #[test]
    fn test_notes_overlay_last_wins() {
        let mut pts = points(&[(1, 0), (2, 0), (4, 0)]);
        let list = vec![
            raw((1, 0), (2, 0), "logger swapped"),
            raw((2, 0), (3, 0), "sensor buried"),
        ];
        apply_notes(&mut pts, &list).unwrap();

        assert_eq!(pts[0].note_text, "logger swapped");
        assert_eq!(pts[1].note_text, "sensor buried");
        assert_eq!(pts[2].note_text, "");
    }

    #[test]
    fn test_open_note_is_not_filled() {
        let mut pts = points(&[(1, 0)]);
        let open = RawNote {
            start_time: None,
            end_time: Some(stamp(5, 0)),
            note_text: Some("never applied".into()),
        };
        apply_notes(&mut pts, &[open]).unwrap();
        assert_eq!(pts[0].note_text, "");
    }

    #[test]
    fn test_missing_note_text_is_annotation_error() {
        let mut pts = points(&[(1, 0)]);
        let broken = RawNote {
            note_text: None,
            ..raw((1, 0), (1, 0), "")
        };
        assert!(matches!(
            apply_notes(&mut pts, &[broken]),
            Err(ExportError::Annotation(_))
        ));
    }
}
