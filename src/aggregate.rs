// src/aggregate.rs

use crate::error::{Error, Result};
use crate::model::{
    Aggregate, AggregateTable, ClassKey, ClassMetricRecord, DefectRecord, RefactoringEvent,
};
use crate::normalize::ClassKeyNormalizer;
use crate::reports::schema::{self, Column, RawTable};

/// The three fixed source shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Metrics,
    Defects,
    Refactorings,
}

impl Source {
    fn label_column(self) -> Option<Column<'static>> {
        match self {
            Source::Metrics => None,
            Source::Defects => Some(schema::BUG_TYPE),
            Source::Refactorings => Some(schema::REFACTORING_TYPE),
        }
    }
}

/// Groups labelled observations by class. Empty labels count but are not recorded.
fn tally<I, L>(observations: I) -> AggregateTable
where
    I: IntoIterator<Item = (ClassKey, Option<L>)>,
    L: AsRef<str>,
{
    let mut table = AggregateTable::new();
    for (key, label) in observations {
        let entry = table.entry(key).or_insert_with(Aggregate::default);
        entry.count += 1;
        if let Some(label) = label {
            let label = label.as_ref();
            if !label.is_empty() && !entry.labels.contains(label) {
                entry.labels.insert(label.to_string());
            }
        }
    }
    table
}

pub fn aggregate_defects(records: &[DefectRecord]) -> AggregateTable {
    tally(
        records
            .iter()
            .map(|r| (r.class_key.clone(), Some(r.bug_type.as_str()))),
    )
}

/// Each affected class gets one increment per event, however many locations it spans.
pub fn aggregate_refactorings(events: &[RefactoringEvent]) -> AggregateTable {
    tally(events.iter().flat_map(|event| {
        event
            .affected_class_keys
            .iter()
            .map(move |key| (key.clone(), Some(event.refactoring_type.as_str())))
    }))
}

pub fn aggregate_metrics(records: &[ClassMetricRecord]) -> AggregateTable {
    tally(records.iter().map(|r| (r.class_key.clone(), None::<&str>)))
}

/// Aggregates a normalized per-event CSV (one row per observation) of the given source.
pub fn aggregate_table(
    source: Source,
    table: &RawTable,
    normalizer: &ClassKeyNormalizer,
) -> Result<AggregateTable> {
    let class_idx = table.require(schema::CLASS)?;
    let label_idx = source.label_column().and_then(|c| table.find(c));
    let type_idx = match source {
        Source::Metrics => table.find(schema::TYPE),
        _ => None,
    };

    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            type_idx.map_or(true, |idx| schema::field(row, idx).eq_ignore_ascii_case("class"))
        })
        .filter(|row| !schema::field(row, class_idx).is_empty())
        .map(|row| {
            (
                normalizer.normalize(schema::field(row, class_idx)),
                label_idx.map(|idx| schema::field(row, idx)),
            )
        });
    Ok(tally(rows))
}

/// Reads an already counted `class,qtd_refactorings` table. Repeated classes are summed.
pub fn counts_from_table(table: &RawTable, normalizer: &ClassKeyNormalizer) -> Result<AggregateTable> {
    let class_idx = table.require(schema::CLASS)?;
    let count_idx = table.require(schema::QTD_REFACTORINGS)?;

    let mut out = AggregateTable::new();
    for (line, row) in table.rows().iter().enumerate() {
        let class = schema::field(row, class_idx);
        if class.is_empty() {
            continue;
        }
        let raw = schema::field(row, count_idx);
        let count: u64 = raw.parse().map_err(|_| {
            Error::schema(
                table.name(),
                format!("row {}: `{raw}` is not a refactoring count", line + 1),
            )
        })?;
        out.entry(normalizer.normalize(class))
            .or_insert_with(Aggregate::default)
            .count += count;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn n() -> ClassKeyNormalizer {
        ClassKeyNormalizer::default()
    }

    fn defect(class: &str, bug_type: &str) -> DefectRecord {
        DefectRecord {
            class_key: n().normalize(class),
            bug_type: bug_type.into(),
            priority: "2".into(),
            category: "STYLE".into(),
            source_file: String::new(),
            source_path: String::new(),
            start_line: None,
            end_line: None,
        }
    }

    #[test]
    fn defects_count_and_collect_sorted_types() {
        let records = vec![
            defect("a.b.Foo", "SE_BAD_FIELD"),
            defect("a.b.Foo", "DM_DEFAULT_ENCODING"),
            defect("a.b.Foo$Inner", "SE_BAD_FIELD"),
            defect("a.b.Bar", "URF_UNREAD_FIELD"),
        ];
        let table = aggregate_defects(&records);
        let foo = &table[&n().normalize("a.b.Foo")];
        assert_eq!(foo.count, 3);
        let labels: Vec<_> = foo.labels.iter().map(String::as_str).collect();
        assert_eq!(labels, vec!["DM_DEFAULT_ENCODING", "SE_BAD_FIELD"]);
        assert_eq!(table.values().map(|a| a.count).sum::<u64>(), records.len() as u64);
    }

    #[test]
    fn refactoring_event_touching_two_classes_counts_once_each() {
        let keys: BTreeSet<_> = ["a.A", "a.B"].iter().map(|k| n().normalize(k)).collect();
        let events = vec![
            RefactoringEvent {
                commit_id: "1".into(),
                refactoring_type: "Move Method".into(),
                description: String::new(),
                affected_class_keys: keys,
            },
            RefactoringEvent {
                commit_id: "2".into(),
                refactoring_type: "Rename Method".into(),
                description: String::new(),
                affected_class_keys: [n().normalize("a.A")].into_iter().collect(),
            },
        ];
        let table = aggregate_refactorings(&events);
        assert_eq!(table[&n().normalize("a.A")].count, 2);
        assert_eq!(table[&n().normalize("a.B")].count, 1);
    }

    #[test]
    fn normalized_defect_csv_groups_by_class_key() {
        let raw = RawTable::from_reader(
            "spotbugs_5.3.csv",
            "class,bug_type\na.b.Foo,X\na.b.Foo$1,Y\na.b.Bar,X\n,Z\n".as_bytes(),
        )
        .unwrap();
        let table = aggregate_table(Source::Defects, &raw, &n()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&n().normalize("a.b.Foo")].count, 2);
    }

    #[test]
    fn metrics_table_excludes_non_class_rows() {
        let raw = RawTable::from_reader(
            "class.csv",
            "class,type\na.A,class\na.I,interface\na.E,enum\n".as_bytes(),
        )
        .unwrap();
        let table = aggregate_table(Source::Metrics, &raw, &n()).unwrap();
        assert_eq!(table.keys().map(|k| k.as_str()).collect::<Vec<_>>(), vec!["a.A"]);
    }

    #[test]
    fn table_without_class_column_fails() {
        let raw = RawTable::from_reader("x.csv", "klass,bug_type\na,X\n".as_bytes()).unwrap();
        let err = aggregate_table(Source::Defects, &raw, &n()).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn counted_table_accepts_dotted_header() {
        let raw = RawTable::from_reader(
            "refactoring_v5.3_to_v5.4_count.csv",
            "Class,Qtd.Refactorings\na.b.Foo,4\na.b.Bar,1\na.b.Foo,1\n".as_bytes(),
        )
        .unwrap();
        let table = counts_from_table(&raw, &n()).unwrap();
        assert_eq!(table[&n().normalize("a.b.Foo")].count, 5);
    }

    #[test]
    fn counted_table_rejects_non_numeric_count() {
        let raw = RawTable::from_reader("c.csv", "class,qtd_refactorings\na,many\n".as_bytes())
            .unwrap();
        assert!(matches!(
            counts_from_table(&raw, &n()),
            Err(Error::Schema { .. })
        ));
    }
}
