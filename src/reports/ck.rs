// src/reports/ck.rs

use super::schema::{self, Column, RawTable};
use crate::error::Result;
use crate::model::ClassMetricRecord;
use crate::normalize::ClassKeyNormalizer;
use std::collections::BTreeMap;

/// Rows of a CK class table describing concrete classes.
///
/// When the table has a `type` column, rows whose type is not `class` (interfaces, enums,
/// anonymous types) are dropped. Every metric in `metrics` must be present as a column;
/// empty or non-numeric cells are left out of the record.
pub fn class_metrics(
    table: &RawTable,
    metrics: &[String],
    normalizer: &ClassKeyNormalizer,
) -> Result<Vec<ClassMetricRecord>> {
    let class_idx = table.require(schema::CLASS)?;
    let type_idx = table.find(schema::TYPE);
    let metric_idx = metrics
        .iter()
        .map(|m| table.require(Column::named(m)).map(|idx| (m.to_lowercase(), idx)))
        .collect::<Result<Vec<_>>>()?;

    let records = table
        .rows()
        .iter()
        .filter(|row| {
            type_idx.map_or(true, |idx| schema::field(row, idx).eq_ignore_ascii_case("class"))
        })
        .filter(|row| !schema::field(row, class_idx).is_empty())
        .map(|row| ClassMetricRecord {
            class_key: normalizer.normalize(schema::field(row, class_idx)),
            metrics: metric_idx
                .iter()
                .filter_map(|(name, idx)| {
                    let value = schema::field(row, *idx).parse::<f64>().ok()?;
                    value.is_finite().then(|| (name.clone(), value))
                })
                .collect::<BTreeMap<_, _>>(),
        })
        .collect();
    Ok(records)
}
