// src/trend.rs

use crate::model::{ClassMetricRecord, Revision, Summary, TrendRow, TrendSeries};
use rayon::prelude::*;

const PRECISION: f64 = 10_000.0;

fn round4(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

/// Mean, median and population variance, rounded to four places. `None` when empty.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(Summary {
        mean: round4(mean),
        median: round4(median),
        variance: round4(variance),
    })
}

/// Builds the per-revision series for `metrics`, ordered by revision ordinal.
///
/// Revisions are summarized independently, so the work is spread over the rayon pool.
pub fn trend_series(metrics: &[String], tables: Vec<(Revision, Vec<ClassMetricRecord>)>) -> TrendSeries {
    let mut rows: Vec<TrendRow> = tables
        .into_par_iter()
        .map(|(revision, records)| {
            let summaries = metrics
                .iter()
                .map(|metric| {
                    let values: Vec<f64> = records
                        .iter()
                        .filter_map(|r| r.metrics.get(metric).copied())
                        .collect();
                    summarize(&values)
                })
                .collect();
            TrendRow {
                revision,
                summaries,
            }
        })
        .collect();
    rows.sort_by_key(|row| row.revision.ordinal);

    TrendSeries {
        metrics: metrics.to_vec(),
        rows,
    }
}
