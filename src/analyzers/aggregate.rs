use crate::analyzers::types::{Bucket, Granularity};
use crate::analyzers::utility::{mean, sample_stddev};
use crate::error::{ExportError, ExportResult};
use crate::model::AnnotatedPoint;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Returns the label of the calendar period containing `ts`.
///
/// Daily, weekly and monthly periods are labelled by their last day (the
/// day itself, the Sunday closing a Monday–Sunday week, the month's last
/// day). Yearly periods are labelled by 1 January, their first day. All
/// anchors are at midnight.
pub fn period_anchor(ts: NaiveDateTime, granularity: Granularity) -> ExportResult<NaiveDateTime> {
    let date = ts.date();
    let anchor = match granularity {
        Granularity::Raw => {
            return Err(ExportError::Aggregation(
                "raw series have no aggregation period".into(),
            ));
        }
        Granularity::Daily => Some(date),
        Granularity::Weekly => {
            let to_sunday = 6 - date.weekday().num_days_from_monday();
            date.checked_add_days(Days::new(to_sunday.into()))
        }
        Granularity::Monthly => {
            let (year, month) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.pred_opt())
        }
        Granularity::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    };

    anchor
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ExportError::Aggregation(format!("no {granularity} period for {ts}")))
}

/// Resamples an annotated series into one [`Bucket`] per calendar period
/// that holds at least one value.
///
/// Absent and NaN values are ignored. Empty periods produce no bucket; the
/// result is never zero-filled. Buckets come back in ascending anchor order.
pub fn aggregate(points: &[AnnotatedPoint], granularity: Granularity) -> ExportResult<Vec<Bucket>> {
    if !granularity.is_aggregated() {
        return Err(ExportError::Aggregation(
            "cannot aggregate at the Raw time step".into(),
        ));
    }

    let mut periods: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    let mut site = None;

    for p in points {
        let Some(value) = p.point.value.filter(|v| !v.is_nan()) else {
            continue;
        };
        site.get_or_insert_with(|| p.point.site.clone());
        periods
            .entry(period_anchor(p.timestamp(), granularity)?)
            .or_default()
            .push(value);
    }

    let site = site.unwrap_or_default();

    Ok(periods
        .into_iter()
        .map(|(anchor, values)| {
            let avg = mean(&values);
            Bucket {
                site: site.clone(),
                anchor,
                mean: avg,
                stddev: sample_stddev(&values, avg),
                count: values.len(),
            }
        })
        .collect())
}
