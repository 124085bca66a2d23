// src/join.rs

use crate::error::{Error, Result};
use crate::model::{AggregateTable, Cell, MergedDataset, MergedRow};
use std::collections::HashSet;

/// Which part of an aggregate a merged column shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Count,
    Labels,
}

/// One aggregate table plus the columns it contributes to the merged output.
///
/// A table with no columns still restricts the join to the classes it contains.
#[derive(Debug, Clone)]
pub struct JoinInput<'a> {
    pub table: &'a AggregateTable,
    pub columns: Vec<(String, Field)>,
}

impl<'a> JoinInput<'a> {
    pub fn membership(table: &'a AggregateTable) -> Self {
        JoinInput {
            table,
            columns: Vec::new(),
        }
    }

    pub fn count(table: &'a AggregateTable, column: impl Into<String>) -> Self {
        JoinInput {
            table,
            columns: vec![(column.into(), Field::Count)],
        }
    }

    pub fn count_and_labels(
        table: &'a AggregateTable,
        count: impl Into<String>,
        labels: impl Into<String>,
    ) -> Self {
        JoinInput {
            table,
            columns: vec![(count.into(), Field::Count), (labels.into(), Field::Labels)],
        }
    }
}

/// Strict inner join on `ClassKey`.
///
/// A class survives only if every input has it. Rows come out in key order and columns in
/// input order. Column names must be unique across inputs.
pub fn inner_join(tag: &str, inputs: &[JoinInput<'_>]) -> Result<MergedDataset> {
    if inputs.is_empty() {
        return Err(Error::schema(tag, "join needs at least one input table"));
    }

    let columns: Vec<String> = inputs
        .iter()
        .flat_map(|input| input.columns.iter().map(|(name, _)| name.clone()))
        .collect();
    {
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(Error::schema(tag, format!("duplicate merged column `{dup}`")));
        }
    }

    // Probe from the smallest table; the output is re-sorted by key anyway.
    let (probe_idx, probe) = inputs
        .iter()
        .enumerate()
        .min_by_key(|(_, input)| input.table.len())
        .map(|(idx, input)| (idx, input.table))
        .ok_or_else(|| Error::schema(tag, "join needs at least one input table"))?;

    let mut rows = Vec::new();
    for key in probe.keys() {
        let matched: Option<Vec<_>> = inputs
            .iter()
            .enumerate()
            .map(|(idx, input)| {
                if idx == probe_idx {
                    probe.get(key)
                } else {
                    input.table.get(key)
                }
            })
            .collect();
        let Some(aggregates) = matched else { continue };

        let cells = inputs
            .iter()
            .zip(aggregates)
            .flat_map(|(input, aggregate)| {
                input.columns.iter().map(move |(_, field)| match field {
                    Field::Count => Cell::Count(aggregate.count),
                    Field::Labels => Cell::Labels(aggregate.labels.clone()),
                })
            })
            .collect();
        rows.push(MergedRow {
            class_key: key.clone(),
            cells,
        });
    }

    tracing::debug!(tag, inputs = inputs.len(), rows = rows.len(), "joined tables");
    Ok(MergedDataset {
        tag: tag.to_string(),
        columns,
        rows,
    })
}
