// src/output.rs

use crate::error::Result;
use crate::model::{AggregateTable, DefectRecord, MergedDataset, RefactoringEvent, TrendSeries};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

pub fn write_defects<W: Write>(out: W, records: &[DefectRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    if records.is_empty() {
        wtr.write_record([
            "class",
            "bug_type",
            "priority",
            "category",
            "sourcefile",
            "sourcepath",
            "start_line",
            "end_line",
        ])?;
    }
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per (event, affected class).
pub fn write_refactorings<W: Write>(out: W, events: &[RefactoringEvent]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    wtr.write_record(["commit", "refactoring_type", "description", "class"])?;
    for event in events {
        for key in &event.affected_class_keys {
            wtr.write_record([
                event.commit_id.as_str(),
                event.refactoring_type.as_str(),
                event.description.as_str(),
                key.as_str(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// `class,qtd_refactorings`, most refactored classes first.
pub fn write_counts<W: Write>(out: W, table: &AggregateTable) -> Result<()> {
    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    wtr.write_record(["class", "qtd_refactorings"])?;
    for (key, aggregate) in rows {
        wtr.write_record([key.as_str(), aggregate.count.to_string().as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_merged<W: Write>(out: W, dataset: &MergedDataset) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    let header = std::iter::once("class").chain(dataset.columns.iter().map(String::as_str));
    wtr.write_record(header)?;
    for row in &dataset.rows {
        let cells = std::iter::once(row.class_key.to_string())
            .chain(row.cells.iter().map(ToString::to_string));
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `release,<metric>_mean,<metric>_median,<metric>_var,...`; empty cells mean no data.
pub fn write_trend<W: Write>(out: W, series: &TrendSeries) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    let mut header = vec!["release".to_string()];
    for metric in &series.metrics {
        header.push(format!("{metric}_mean"));
        header.push(format!("{metric}_median"));
        header.push(format!("{metric}_var"));
    }
    wtr.write_record(&header)?;

    for row in &series.rows {
        let mut record = vec![row.revision.tag.clone()];
        for summary in &row.summaries {
            match summary {
                Some(s) => {
                    record.push(s.mean.to_string());
                    record.push(s.median.to_string());
                    record.push(s.variance.to_string());
                }
                None => record.extend(std::iter::repeat(String::new()).take(3)),
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_defects(path: &Path, records: &[DefectRecord]) -> Result<()> {
    write_defects(create(path)?, records)
}

pub fn save_refactorings(path: &Path, events: &[RefactoringEvent]) -> Result<()> {
    write_refactorings(create(path)?, events)
}

pub fn save_counts(path: &Path, table: &AggregateTable) -> Result<()> {
    write_counts(create(path)?, table)
}

pub fn save_merged(path: &Path, dataset: &MergedDataset) -> Result<()> {
    write_merged(create(path)?, dataset)
}

pub fn save_trend(path: &Path, series: &TrendSeries) -> Result<()> {
    write_trend(create(path)?, series)
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}
