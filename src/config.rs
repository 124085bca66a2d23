// src/config.rs

use crate::error::{Error, Result};
use crate::normalize::ClassKeyNormalizer;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Everything the orchestrator and the aggregation commands need, supplied at construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Working tree of the analyzed project
    pub repository_path: PathBuf,
    /// Cloned into `repository_path` when that directory does not exist
    pub repository_url: Option<String>,
    /// Root of every artifact and derived table
    pub output_root: PathBuf,
    /// Pattern selecting the class-level table inside a revision's metrics directory
    pub source_report_glob: String,
    /// Number of most recent tags to analyze
    pub max_revisions: usize,
    pub source_roots: Vec<String>,
    pub source_extension: String,
    /// Structural metrics summarized per revision (CK column names)
    pub metrics: Vec<String>,
    /// Defect categories left out of category tallies
    pub excluded_categories: Vec<String>,
    /// Category whose bug-type distribution is reported separately
    pub highlight_category: String,
    pub tools: ToolsConfig,
}

/// Argv templates for the driven tools.
///
/// Placeholders: `{repo}`, `{tag}`, `{version}`, `{prev}`, `{output}` (artifact file) and
/// `{output_dir}` (artifact directory).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub fetch_tags: bool,
    pub checkout: Vec<String>,
    pub build: Option<Vec<String>>,
    pub defects: Option<Vec<String>>,
    pub metrics: Option<Vec<String>>,
    pub refactorings: Option<Vec<String>>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            fetch_tags: true,
            checkout: argv(&["git", "checkout", "{tag}"]),
            build: Some(argv(&["./gradlew", "assemble"])),
            defects: Some(argv(&[
                "spotbugs",
                "-textui",
                "-effort:max",
                "-xml={output}",
                "{repo}/target/tracker-server.jar",
            ])),
            metrics: Some(argv(&[
                "java",
                "-jar",
                "ck.jar",
                "{repo}/src/main/java",
                "true",
                "0",
                "true",
                "{output_dir}/",
            ])),
            refactorings: Some(argv(&[
                "RefactoringMiner",
                "-bt",
                "{repo}",
                "{prev}",
                "{tag}",
                "-json",
                "{output}",
            ])),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            repository_path: PathBuf::from("repo"),
            repository_url: None,
            output_root: PathBuf::from("output"),
            source_report_glob: "*class.csv".to_string(),
            max_revisions: 20,
            source_roots: vec!["src/main/java/".to_string()],
            source_extension: ".java".to_string(),
            metrics: ["loc", "wmc", "dit", "noc", "cbo", "lcom", "rfc"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            excluded_categories: vec!["EXPERIMENTAL".to_string()],
            highlight_category: "MALICIOUS_CODE".to_string(),
            tools: ToolsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML file, or falls back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::missing(path));
                }
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            None => PipelineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_revisions == 0 {
            return Err(Error::Config("max_revisions must be at least 1".into()));
        }
        if self.metrics.is_empty() {
            return Err(Error::Config("at least one metric must be tracked".into()));
        }
        if self.source_report_glob.trim().is_empty() {
            return Err(Error::Config("source_report_glob must not be empty".into()));
        }
        let templates = [
            ("checkout", Some(&self.tools.checkout)),
            ("build", self.tools.build.as_ref()),
            ("defects", self.tools.defects.as_ref()),
            ("metrics", self.tools.metrics.as_ref()),
            ("refactorings", self.tools.refactorings.as_ref()),
        ];
        for (name, template) in templates {
            if template.is_some_and(|t| t.first().map_or(true, |p| p.trim().is_empty())) {
                return Err(Error::Config(format!("tools.{name} needs a program name")));
            }
        }
        Ok(())
    }

    pub fn normalizer(&self) -> ClassKeyNormalizer {
        ClassKeyNormalizer::new(self.source_roots.clone(), &self.source_extension)
    }
}
