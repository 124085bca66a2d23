// src/layout.rs

use crate::error::{Error, Result};
use crate::model::{version_of, Revision, RevisionSequence};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File locations under the output root, shared by the orchestrator and the aggregation commands
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OutputLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join("revisions.json")
    }

    /// Held exclusively while `run` drives the checkout
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".qualtrack.lock")
    }

    pub fn defect_report(&self, revision: &Revision) -> PathBuf {
        self.root
            .join("spotbugs")
            .join(format!("spotbugs_{}.xml", revision.version()))
    }

    pub fn metrics_dir(&self, revision: &Revision) -> PathBuf {
        self.root.join("ck").join(&revision.tag)
    }

    pub fn refactoring_report(&self, prev: &Revision, revision: &Revision) -> PathBuf {
        self.root
            .join("refactoring-miner")
            .join(format!("refactoring_{}_to_{}.json", prev.tag, revision.tag))
    }

    pub fn normalized_dir(&self) -> PathBuf {
        self.root.join("normalized")
    }

    pub fn normalized_defects(&self, revision: &Revision) -> PathBuf {
        self.normalized_dir()
            .join(format!("spotbugs_{}.csv", revision.version()))
    }

    pub fn normalized_refactorings(&self, revision: &Revision) -> PathBuf {
        self.normalized_dir()
            .join(format!("refactorings_{}.csv", revision.version()))
    }

    pub fn refactoring_counts(&self, prev: &Revision, revision: &Revision) -> PathBuf {
        self.normalized_dir()
            .join(format!("refactoring_{}_to_{}_count.csv", prev.tag, revision.tag))
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.root.join("merged")
    }

    pub fn trend_dir(&self) -> PathBuf {
        self.root.join("trend")
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.root.join("stats")
    }

    /// First file in the revision's metrics directory matching `pattern`, in name order.
    pub fn metrics_report(&self, revision: &Revision, pattern: &str) -> Result<PathBuf> {
        let dir = self.metrics_dir(revision);
        let full = dir.join(pattern);
        let full = full.to_string_lossy();
        let paths = glob::glob(&full)
            .map_err(|e| Error::Config(format!("invalid source_report_glob `{pattern}`: {e}")))?;
        let mut matches: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
        matches.sort();
        matches
            .into_iter()
            .next()
            .ok_or_else(|| Error::missing(dir.join(pattern)))
    }

    pub fn write_manifest(&self, revisions: &RevisionSequence) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.manifest();
        std::fs::write(&path, serde_json::to_string_pretty(revisions)?)?;
        Ok(path)
    }

    pub fn read_manifest(&self) -> Result<RevisionSequence> {
        let path = self.manifest();
        if !path.is_file() {
            return Err(Error::missing(path));
        }
        let text = std::fs::read_to_string(&path)?;
        let revisions: RevisionSequence = serde_json::from_str(&text)?;
        let in_order = revisions.iter().enumerate().all(|(i, r)| r.ordinal == i);
        if !in_order {
            return Err(Error::MalformedReport {
                path,
                message: "revision ordinals must be 0, 1, 2, ... in file order".into(),
            });
        }
        Ok(revisions)
    }
}

/// An ordered pair of revision versions named in a file name, e.g. `v5.3_to_v5.4`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalId {
    pub from: String,
    pub to: String,
}

fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?(?P<from>[0-9]+(?:\.[0-9]+)*)_to_v?(?P<to>[0-9]+(?:\.[0-9]+)*)$")
            .expect("interval pattern is valid")
    })
}

impl IntervalId {
    /// Accepts `v<a>_to_v<b>` and `v<a>_to_<b>`.
    pub fn parse(id: &str) -> Option<Self> {
        let caps = interval_pattern().captures(id)?;
        Some(IntervalId {
            from: caps["from"].to_string(),
            to: caps["to"].to_string(),
        })
    }

    /// Parses `<prefix><id><suffix>`, e.g. `refactoring_v5.3_to_5.4_count.csv`.
    pub fn from_file_name(name: &str, prefix: &str, suffix: &str) -> Option<Self> {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .and_then(IntervalId::parse)
    }
}

/// Interval files found in `dir`, resolved against `revisions` and ordered by ordinal.
///
/// Names that do not parse, or whose versions are not in the sequence, are skipped with a
/// warning.
pub fn discover_intervals<'r>(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    revisions: &'r RevisionSequence,
) -> Result<Vec<(&'r Revision, &'r Revision, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::missing(dir));
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !(name.starts_with(prefix) && name.ends_with(suffix)) {
            continue;
        }
        let Some(id) = IntervalId::from_file_name(name, prefix, suffix) else {
            tracing::warn!(file = name, "interval file name does not parse as <from>_to_<to>");
            continue;
        };
        match (revisions.by_version(&id.from), revisions.by_version(&id.to)) {
            (Some(from), Some(to)) => found.push((from, to, entry.path())),
            _ => tracing::warn!(
                file = name,
                from = version_of(&id.from),
                to = version_of(&id.to),
                "interval names a revision outside the sequence"
            ),
        }
    }
    found.sort_by_key(|(from, to, _)| (from.ordinal, to.ordinal));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_interval_spellings_parse() {
        let expected = Some(IntervalId {
            from: "5.3".into(),
            to: "5.4".into(),
        });
        assert_eq!(IntervalId::parse("v5.3_to_v5.4"), expected);
        assert_eq!(IntervalId::parse("v5.3_to_5.4"), expected);
        assert_eq!(IntervalId::parse("v5.3-to-5.4"), None);
        assert_eq!(
            IntervalId::from_file_name("refactoring_v6.0_to_6.1_count.csv", "refactoring_", "_count.csv")
                .map(|id| id.to),
            Some("6.1".to_string())
        );
    }

    #[test]
    fn discovery_orders_by_ordinal_not_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "refactoring_v9_to_v10_count.csv",
            "refactoring_v8_to_9_count.csv",
            "refactoring_v10_to_v11_count.csv",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "class,qtd_refactorings\n").unwrap();
        }
        let seq = RevisionSequence::from_ordered_tags(["v8", "v9", "v10"]);
        let found = discover_intervals(dir.path(), "refactoring_", "_count.csv", &seq).unwrap();
        let pairs: Vec<_> = found
            .iter()
            .map(|(a, b, _)| (a.tag.as_str(), b.tag.as_str()))
            .collect();
        assert_eq!(pairs, vec![("v8", "v9"), ("v9", "v10")]);
    }

    #[test]
    fn manifest_round_trips_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let seq = RevisionSequence::from_ordered_tags(["v1", "v2"]);
        layout.write_manifest(&seq).unwrap();
        assert_eq!(layout.read_manifest().unwrap(), seq);
    }

    #[test]
    fn metrics_report_uses_glob() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let seq = RevisionSequence::from_ordered_tags(["v1"]);
        let rev = seq.iter().next().unwrap();
        let ck = layout.metrics_dir(rev);
        std::fs::create_dir_all(&ck).unwrap();
        std::fs::write(ck.join("method.csv"), "").unwrap();
        assert!(matches!(
            layout.metrics_report(rev, "*class.csv"),
            Err(Error::MissingInput { .. })
        ));
        std::fs::write(ck.join("ck_metrics.csvclass.csv"), "").unwrap();
        assert!(layout.metrics_report(rev, "*class.csv").is_ok());
    }
}
