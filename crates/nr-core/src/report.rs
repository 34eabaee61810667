//! Offline report over saved session summaries.
//!
//! Reads every `*.json` summary in a directory and projects the rate of one
//! reward field onto longer periods:
//!
//! - PS: per second
//! - PH: per hour (PS × 3600)
//! - PD: per day (PH × `per_day`, hours of play per day)
//! - PW: per week (PD × `days_per_week`)
//! - PM: per month (PW × `weeks_per_month`)

use std::fmt::{Display, Write};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rayon::prelude::*;

use crate::summary::{SessionSummary, SummaryError};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Multipliers used to project the per-hour rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Play hours per day.
    pub per_day: f64,
    pub days_per_week: f64,
    pub weeks_per_month: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            per_day: 3.0,
            days_per_week: 7.0,
            weeks_per_month: 4.0,
        }
    }
}

/// Projected rates for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub per_second: f64,
    pub per_hour: f64,
    pub per_day: f64,
    pub per_week: f64,
    pub per_month: f64,
}

impl Rates {
    /// Projects `total` over `duration` seconds; `None` when no time elapsed.
    #[expect(
        clippy::cast_precision_loss,
        reason = "reward totals stay far below 2^52"
    )]
    pub fn project(total: u64, duration: f64, projection: &Projection) -> Option<Self> {
        if duration.is_nan() || duration <= 0.0 {
            return None;
        }
        let per_second = total as f64 / duration;
        let per_hour = per_second * 3600.0;
        let per_day = per_hour * projection.per_day;
        let per_week = per_day * projection.days_per_week;
        let per_month = per_week * projection.weeks_per_month;
        Some(Self {
            per_second,
            per_hour,
            per_day,
            per_week,
            per_month,
        })
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration: f64,
    pub total: u64,
    pub rates: Option<Rates>,
}

impl ReportRow {
    /// Builds a row for `field`. A missing field counts as zero.
    pub fn compute(
        summary: &SessionSummary,
        field: &str,
        projection: &Projection,
    ) -> Result<Self, SummaryError> {
        let total = summary.rewards.get(field).copied().unwrap_or(0);
        Ok(Self {
            started_at: summary.started_at()?,
            ended_at: summary.ended_at()?,
            duration: summary.duration,
            total,
            rates: Rates::project(total, summary.duration, projection),
        })
    }
}

/// Loads every `*.json` summary in `dir`, ordered by start time.
///
/// Files that cannot be read or parsed are skipped with a warning.
pub fn load_summaries(dir: &Path) -> Result<Vec<SessionSummary>, SummaryError> {
    let paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    let mut summaries: Vec<SessionSummary> = paths
        .par_iter()
        .filter_map(|path| match SessionSummary::load(path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "skipping invalid session summary");
                None
            }
        })
        .collect();

    summaries.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(summaries)
}

/// Builds report rows, skipping summaries with unusable timestamps.
pub fn build_rows(
    summaries: &[SessionSummary],
    field: &str,
    projection: &Projection,
) -> Vec<ReportRow> {
    summaries
        .iter()
        .filter_map(|summary| match ReportRow::compute(summary, field, projection) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(start = summary.start, error = %e, "skipping session summary");
                None
            }
        })
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders rows as CSV with dates shown in `tz`.
///
/// Rate columns are left empty for sessions with zero duration.
pub fn format_csv<Tz>(rows: &[ReportRow], field: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Start Date,End Date,Duration,{},PS,PH,PD,PW,PM",
        csv_field(field)
    );

    for row in rows {
        let rates = row.rates.map_or_else(
            || ",,,,".to_string(),
            |r| {
                format!(
                    "{:?},{:?},{:?},{:?},{:?}",
                    r.per_second, r.per_hour, r.per_day, r.per_week, r.per_month
                )
            },
        );
        let _ = writeln!(
            out,
            "{},{},{:?},{},{rates}",
            row.started_at.with_timezone(tz).format(DATE_FORMAT),
            row.ended_at.with_timezone(tz).format(DATE_FORMAT),
            row.duration,
            row.total,
        );
    }

    out
}
