// src/reports/refactoring_miner.rs

use crate::error::{Error, Result};
use crate::model::RefactoringEvent;
use crate::normalize::ClassKeyNormalizer;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReportShape {
    Wrapped {
        #[serde(default)]
        commits: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Commit {
    sha1: String,
    refactorings: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Refactoring {
    #[serde(rename = "type")]
    kind: String,
    description: String,
    left_side_locations: Vec<Location>,
    right_side_locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Location {
    file_path: String,
}

pub fn read_refactoring_report(
    path: &Path,
    normalizer: &ClassKeyNormalizer,
) -> Result<Vec<RefactoringEvent>> {
    if !path.is_file() {
        return Err(Error::missing(path));
    }
    let text = std::fs::read_to_string(path)?;
    parse_refactoring_report(path, &text, normalizer)
}

/// One event per refactoring; its affected classes are the union of both location sides.
///
/// Entries that are not objects are ignored, as are locations without a file path.
pub fn parse_refactoring_report(
    path: &Path,
    text: &str,
    normalizer: &ClassKeyNormalizer,
) -> Result<Vec<RefactoringEvent>> {
    let malformed = |e: serde_json::Error| Error::MalformedReport {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let shape: ReportShape = serde_json::from_str(text).map_err(malformed)?;
    let commits = match shape {
        ReportShape::Wrapped { commits } | ReportShape::Bare(commits) => commits,
    };

    let mut events = Vec::new();
    for commit in commits.into_iter().filter(serde_json::Value::is_object) {
        let commit: Commit = serde_json::from_value(commit).map_err(malformed)?;
        for refactoring in commit.refactorings.into_iter().filter(serde_json::Value::is_object) {
            let refactoring: Refactoring = serde_json::from_value(refactoring).map_err(malformed)?;
            let affected_class_keys: BTreeSet<_> = refactoring
                .left_side_locations
                .iter()
                .chain(&refactoring.right_side_locations)
                .filter(|loc| !loc.file_path.trim().is_empty())
                .map(|loc| normalizer.normalize(&loc.file_path))
                .collect();
            events.push(RefactoringEvent {
                commit_id: commit.sha1.clone(),
                refactoring_type: if refactoring.kind.is_empty() {
                    "Unknown".to_string()
                } else {
                    refactoring.kind
                },
                description: refactoring.description,
                affected_class_keys,
            });
        }
    }

    tracing::debug!(report = %path.display(), events = events.len(), "parsed refactoring report");
    Ok(events)
}
