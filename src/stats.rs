// src/stats.rs

use crate::model::{BugFinding, RefactoringEvent};
use serde::Serialize;
use std::collections::BTreeMap;

/// Tallies for one revision or interval, kept in sequence order when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub label: String,
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

impl Tally {
    fn new(label: impl Into<String>, counts: BTreeMap<String, u64>) -> Self {
        Tally {
            label: label.into(),
            total: counts.values().sum(),
            counts,
        }
    }
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Findings per category, leaving out `excluded` categories.
pub fn category_counts(label: &str, records: &[BugFinding], excluded: &[String]) -> Tally {
    let keys = records
        .iter()
        .map(|r| if r.category.is_empty() { "Unknown" } else { r.category.as_str() })
        .filter(|c| !excluded.iter().any(|e| e.as_str() == *c));
    Tally::new(label, count_by(keys))
}

/// Bug-type distribution within one category.
pub fn category_type_counts(label: &str, records: &[BugFinding], category: &str) -> Tally {
    let keys = records
        .iter()
        .filter(|r| r.category == category)
        .map(|r| r.bug_type.as_str());
    Tally::new(label, count_by(keys))
}

/// Refactorings per type. Every event counts once, whatever it touches.
pub fn refactoring_type_counts(label: &str, events: &[RefactoringEvent]) -> Tally {
    Tally::new(
        label,
        count_by(events.iter().map(|e| e.refactoring_type.as_str())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defect(category: &str, bug_type: &str) -> BugFinding {
        BugFinding {
            bug_type: bug_type.into(),
            category: category.into(),
        }
    }

    #[test]
    fn experimental_is_left_out() {
        let records = vec![
            defect("STYLE", "A"),
            defect("STYLE", "B"),
            defect("EXPERIMENTAL", "C"),
            defect("MALICIOUS_CODE", "EI_EXPOSE_REP"),
        ];
        let tally = category_counts("5.3", &records, &["EXPERIMENTAL".to_string()]);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.counts.get("STYLE"), Some(&2));
        assert!(!tally.counts.contains_key("EXPERIMENTAL"));

        let types = category_type_counts("5.3", &records, "MALICIOUS_CODE");
        assert_eq!(types.counts.get("EI_EXPOSE_REP"), Some(&1));
        assert_eq!(types.total, 1);
    }

    #[test]
    fn refactoring_types_count_events() {
        let event = |t: &str| RefactoringEvent {
            commit_id: "c".into(),
            refactoring_type: t.into(),
            description: String::new(),
            affected_class_keys: Default::default(),
        };
        let tally = refactoring_type_counts(
            "v1_to_v2",
            &[event("Rename Method"), event("Rename Method"), event("Move Class")],
        );
        assert_eq!(tally.total, 3);
        assert_eq!(tally.counts["Rename Method"], 2);
    }
}
