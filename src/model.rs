// src/model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Canonical dotted identifier of a top-level class, the join key across sources
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassKey(String);

impl ClassKey {
    /// Wraps an already canonical key. Use `ClassKeyNormalizer` for raw references.
    pub(crate) fn from_canonical(key: String) -> Self {
        ClassKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One analyzed snapshot of the target codebase (a tagged release)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub tag: String,
    /// Position in the sequence, oldest = 0
    pub ordinal: usize,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Revision {
    /// The tag without its leading `v`, as used in report file names.
    pub fn version(&self) -> &str {
        version_of(&self.tag)
    }
}

pub fn version_of(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Revisions in ascending ordinal order. Built once, then passed around explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionSequence(Vec<Revision>);

impl RevisionSequence {
    /// Assigns ordinals in the given (oldest first) order.
    pub fn from_ordered_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RevisionSequence(
            tags.into_iter()
                .enumerate()
                .map(|(ordinal, tag)| Revision {
                    tag: tag.into(),
                    ordinal,
                    timestamp: None,
                })
                .collect(),
        )
    }

    /// Sorts tagged commits by timestamp (tag name breaks ties) and keeps the newest `limit`.
    pub fn from_dated_tags(mut tags: Vec<(String, DateTime<Utc>)>, limit: usize) -> Self {
        tags.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let skip = tags.len().saturating_sub(limit);
        RevisionSequence(
            tags.into_iter()
                .skip(skip)
                .enumerate()
                .map(|(ordinal, (tag, ts))| Revision {
                    tag,
                    ordinal,
                    timestamp: Some(ts),
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.0.iter()
    }

    /// Adjacent `(previous, current)` pairs in ascending order.
    pub fn intervals(&self) -> impl Iterator<Item = (&Revision, &Revision)> {
        self.0.windows(2).map(|w| (&w[0], &w[1]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn by_version(&self, version: &str) -> Option<&Revision> {
        let version = version_of(version);
        self.0.iter().find(|r| r.version() == version)
    }

    pub fn predecessor(&self, revision: &Revision) -> Option<&Revision> {
        revision
            .ordinal
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
    }
}

/// A single static-analysis finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefectRecord {
    #[serde(rename = "class")]
    pub class_key: ClassKey,
    pub bug_type: String,
    pub priority: String,
    pub category: String,
    #[serde(rename = "sourcefile")]
    pub source_file: String,
    #[serde(rename = "sourcepath")]
    pub source_path: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}

/// Type and category of a finding, whether or not it could be placed in a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugFinding {
    pub bug_type: String,
    pub category: String,
}

/// One logical refactoring operation and every class it touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactoringEvent {
    pub commit_id: String,
    pub refactoring_type: String,
    pub description: String,
    pub affected_class_keys: BTreeSet<ClassKey>,
}

/// Structural metrics of one concrete class at one revision
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetricRecord {
    pub class_key: ClassKey,
    /// Missing or non-numeric values are absent
    pub metrics: BTreeMap<String, f64>,
}

/// Per-class rollup of one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub count: u64,
    /// Sorted-unique type labels; empty for count-only sources
    pub labels: BTreeSet<String>,
}

/// ClassKey -> aggregate for one revision or interval
pub type AggregateTable = BTreeMap<ClassKey, Aggregate>;

/// A single cell of a merged row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Count(u64),
    Labels(BTreeSet<String>),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Count(n) => write!(f, "{n}"),
            Cell::Labels(labels) => {
                let joined: Vec<&str> = labels.iter().map(String::as_str).collect();
                f.write_str(&joined.join(";"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub class_key: ClassKey,
    pub cells: Vec<Cell>,
}

/// Inner join of several aggregate tables for one revision or interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDataset {
    /// Revision tag or interval identifier
    pub tag: String,
    pub columns: Vec<String>,
    pub rows: Vec<MergedRow>,
}

/// Summary statistics of one metric at one revision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    /// Population variance (divisor N)
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub revision: Revision,
    /// One entry per tracked metric, in metric order; `None` means no data
    pub summaries: Vec<Option<Summary>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub metrics: Vec<String>,
    pub rows: Vec<TrendRow>,
}
