//! Grade resolution and temporal aggregation.
//!
//! This module joins grade names onto annotated points and resamples a
//! point series into daily, weekly, monthly or yearly statistics.

pub mod aggregate;
pub mod grade;
pub mod types;
pub mod utility;

pub use aggregate::{aggregate, period_anchor};
pub use grade::join_grade_names;
pub use types::{Bucket, Granularity};
