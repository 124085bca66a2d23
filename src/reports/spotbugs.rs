// src/reports/spotbugs.rs

use crate::error::{Error, Result};
use crate::model::{BugFinding, DefectRecord};
use crate::normalize::ClassKeyNormalizer;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

#[derive(Default)]
struct PendingBug {
    attrs: HashMap<String, String>,
    class_name: Option<String>,
    source_line: Option<HashMap<String, String>>,
}

fn read_report(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::missing(path));
    }
    Ok(std::fs::read_to_string(path)?)
}

pub fn read_defect_report(path: &Path, normalizer: &ClassKeyNormalizer) -> Result<Vec<DefectRecord>> {
    parse_defect_report(path, &read_report(path)?, normalizer)
}

pub fn read_bug_findings(path: &Path) -> Result<Vec<BugFinding>> {
    parse_bug_findings(path, &read_report(path)?)
}

/// Extracts every `BugInstance` that carries a source location.
///
/// The first nested `Class` and the first nested `SourceLine` describe the finding. A
/// bug without a `Class` element falls back to its source path for identity.
pub fn parse_defect_report(
    path: &Path,
    xml: &str,
    normalizer: &ClassKeyNormalizer,
) -> Result<Vec<DefectRecord>> {
    let records: Vec<_> = scan(path, xml)?
        .into_iter()
        .filter_map(|bug| locate(bug, normalizer))
        .collect();
    tracing::debug!(report = %path.display(), bugs = records.len(), "parsed defect report");
    Ok(records)
}

/// Type and category of every `BugInstance`, located or not.
pub fn parse_bug_findings(path: &Path, xml: &str) -> Result<Vec<BugFinding>> {
    let findings = scan(path, xml)?
        .into_iter()
        .map(|mut bug| BugFinding {
            bug_type: bug.attrs.remove("type").unwrap_or_default(),
            category: bug.attrs.remove("category").unwrap_or_default(),
        })
        .collect();
    Ok(findings)
}

fn scan(path: &Path, xml: &str) -> Result<Vec<PendingBug>> {
    let malformed = |message: String| Error::MalformedReport {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut bugs = Vec::new();
    let mut current: Option<PendingBug> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(format!("at byte {}: {e}", reader.buffer_position())));
            }
        };
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"BugInstance" => {
                        let bug = PendingBug {
                            attrs: attributes(e).map_err(malformed)?,
                            ..PendingBug::default()
                        };
                        if self_closing {
                            bugs.push(bug);
                        } else {
                            current = Some(bug);
                        }
                    }
                    b"Class" => {
                        if let Some(bug) = current.as_mut().filter(|b| b.class_name.is_none()) {
                            bug.class_name = attributes(e).map_err(malformed)?.remove("classname");
                        }
                    }
                    b"SourceLine" => {
                        if let Some(bug) = current.as_mut().filter(|b| b.source_line.is_none()) {
                            bug.source_line = Some(attributes(e).map_err(malformed)?);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"BugInstance" => {
                bugs.extend(current.take());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if current.is_some() {
        return Err(malformed("unterminated BugInstance".to_string()));
    }
    Ok(bugs)
}

fn locate(mut bug: PendingBug, normalizer: &ClassKeyNormalizer) -> Option<DefectRecord> {
    let mut line = bug.source_line.take()?;
    let source_path = line.remove("sourcepath").unwrap_or_default();
    let identity = bug
        .class_name
        .take()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| Some(source_path.clone()).filter(|p| !p.is_empty()))?;

    let mut take = |key: &str| bug.attrs.remove(key).unwrap_or_default();
    Some(DefectRecord {
        class_key: normalizer.normalize(&identity),
        bug_type: take("type"),
        priority: take("priority"),
        category: take("category"),
        source_file: line.remove("sourcefile").unwrap_or_default(),
        source_path,
        start_line: line.get("start").and_then(|v| v.parse().ok()),
        end_line: line.get("end").and_then(|v| v.parse().ok()),
    })
}

fn attributes(e: &BytesStart<'_>) -> std::result::Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        out.insert(key, value.into_owned());
    }
    Ok(out)
}
