// src/pipeline.rs

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::layout::OutputLayout;
use crate::model::{Revision, RevisionSequence};
use fd_lock::RwLock;
use indicatif::ProgressBar;
use std::fmt;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One external process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a finished process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

/// Blocking process launcher. The orchestrator waits for every call to return.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> std::io::Result<ToolOutcome>;
}

/// Runs invocations as child processes, inheriting stdio.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> std::io::Result<ToolOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }
        let status = cmd.status()?;
        Ok(ToolOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchTags,
    Checkout,
    Build,
    Defects,
    Metrics,
    Refactorings,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::FetchTags => "fetch tags",
            Step::Checkout => "checkout",
            Step::Build => "build",
            Step::Defects => "defect scan",
            Step::Metrics => "structural metrics",
            Step::Refactorings => "refactoring detection",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    RepoReady,
    Checkout { ordinal: usize },
    Built { ordinal: usize },
    ToolsRun { ordinal: usize },
    Advanced { ordinal: usize },
    Done,
    Failed { ordinal: Option<usize> },
}

/// What a completed run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    pub revisions: usize,
    pub artifacts: Vec<PathBuf>,
}

/// Values substituted into an argv template
struct Placeholders<'a> {
    repo: &'a Path,
    revision: &'a Revision,
    prev: Option<&'a Revision>,
    output: Option<&'a Path>,
}

impl Placeholders<'_> {
    fn expand(&self, part: &str) -> String {
        let mut s = part
            .replace("{repo}", &self.repo.to_string_lossy())
            .replace("{tag}", &self.revision.tag)
            .replace("{version}", self.revision.version());
        if let Some(prev) = self.prev {
            s = s.replace("{prev}", &prev.tag);
        }
        if let Some(output) = self.output {
            s = s.replace("{output}", &output.to_string_lossy());
            let dir = output.parent().unwrap_or(output);
            s = s.replace("{output_dir}", &dir.to_string_lossy());
        }
        s
    }
}

/// Walks revisions oldest first: checkout, build, per-revision tools, then the diff tool
/// against the predecessor. The first failure stops the run.
///
/// The orchestrator is the only writer of the checkout; [`Orchestrator::run`] locks the
/// output root to keep it that way.
pub struct Orchestrator<R: CommandRunner> {
    config: PipelineConfig,
    layout: OutputLayout,
    runner: R,
    state: PipelineState,
    show_progress: bool,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        let layout = OutputLayout::new(&config.output_root);
        Orchestrator {
            config,
            layout,
            runner,
            state: PipelineState::Idle,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    /// Marks the checkout usable and optionally refreshes its tags.
    pub fn prepare(&mut self) -> Result<()> {
        if !self.config.repository_path.is_dir() {
            self.transition(PipelineState::Failed { ordinal: None });
            return Err(Error::missing(&self.config.repository_path));
        }
        if self.config.tools.fetch_tags {
            let invocation = Invocation {
                program: "git".into(),
                args: vec!["fetch".into(), "--tags".into()],
                cwd: Some(self.config.repository_path.clone()),
            };
            if let Err(e) = self.invoke(Step::FetchTags, &invocation) {
                self.transition(PipelineState::Failed { ordinal: None });
                return Err(e);
            }
        }
        self.transition(PipelineState::RepoReady);
        Ok(())
    }

    /// Runs every revision in ascending ordinal order and records the manifest.
    ///
    /// Holds an exclusive lock on the output root for the whole run, so a second run
    /// against the same checkout and outputs fails with [`Error::Locked`] before touching
    /// anything.
    pub fn run(&mut self, revisions: &RevisionSequence) -> Result<RunSummary> {
        std::fs::create_dir_all(self.layout.root())?;
        let lock_path = self.layout.lock_file();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = match lock.try_write() {
            Ok(guard) => guard,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                return Err(Error::Locked { path: lock_path });
            }
            Err(e) => return Err(e.into()),
        };

        if self.state == PipelineState::Idle {
            self.prepare()?;
        }
        if self.state != PipelineState::RepoReady {
            return Err(Error::Config(format!(
                "pipeline cannot start from state {:?}",
                self.state
            )));
        }

        let mut summary = RunSummary::default();
        summary
            .artifacts
            .push(self.layout.write_manifest(revisions)?);

        let bar = if self.show_progress {
            ProgressBar::new(revisions.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        for revision in revisions.iter() {
            bar.set_message(revision.tag.clone());
            let prev = revisions.predecessor(revision);
            match self.run_revision(revision, prev) {
                Ok(artifacts) => summary.artifacts.extend(artifacts),
                Err(cause) => {
                    bar.abandon_with_message(format!("failed at {}", revision.tag));
                    self.transition(PipelineState::Failed {
                        ordinal: Some(revision.ordinal),
                    });
                    tracing::error!(tag = %revision.tag, ordinal = revision.ordinal, error = %cause, "pipeline aborted");
                    return Err(Error::RevisionFailed {
                        tag: revision.tag.clone(),
                        ordinal: revision.ordinal,
                        cause: Box::new(cause),
                    });
                }
            }
            self.transition(PipelineState::Advanced {
                ordinal: revision.ordinal,
            });
            summary.revisions += 1;
            bar.inc(1);
        }

        bar.finish_with_message("all revisions processed");
        self.transition(PipelineState::Done);
        Ok(summary)
    }

    fn run_revision(&mut self, revision: &Revision, prev: Option<&Revision>) -> Result<Vec<PathBuf>> {
        let ordinal = revision.ordinal;
        let repo = self.config.repository_path.clone();
        let tools = self.config.tools.clone();
        let mut artifacts = Vec::new();
        tracing::info!(tag = %revision.tag, ordinal, "processing revision");

        // 1. Checkout
        self.transition(PipelineState::Checkout { ordinal });
        let place = Placeholders {
            repo: &repo,
            revision,
            prev,
            output: None,
        };
        self.invoke_template(Step::Checkout, &tools.checkout, &place)?;

        // 2. Build
        if let Some(build) = &tools.build {
            self.invoke_template(Step::Build, build, &place)?;
        }
        self.transition(PipelineState::Built { ordinal });

        // 3. Per-revision tools
        if let Some(defects) = &tools.defects {
            let output = self.layout.defect_report(revision);
            self.ensure_parent(&output)?;
            remove_stale(&output)?;
            let place = Placeholders {
                output: Some(&output),
                ..place
            };
            self.invoke_template(Step::Defects, defects, &place)?;
            require_artifact(&output)?;
            artifacts.push(output);
        }
        if let Some(metrics) = &tools.metrics {
            let dir = self.layout.metrics_dir(revision);
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;
            let output = dir.join("ck_metrics.csv");
            let place = Placeholders {
                output: Some(&output),
                ..place
            };
            self.invoke_template(Step::Metrics, metrics, &place)?;
            artifacts.push(
                self.layout
                    .metrics_report(revision, &self.config.source_report_glob)?,
            );
        }
        self.transition(PipelineState::ToolsRun { ordinal });

        // 4. Diff tool against the predecessor
        if let (Some(refactorings), Some(prev_rev)) = (&tools.refactorings, prev) {
            let output = self.layout.refactoring_report(prev_rev, revision);
            self.ensure_parent(&output)?;
            remove_stale(&output)?;
            let place = Placeholders {
                output: Some(&output),
                ..place
            };
            self.invoke_template(Step::Refactorings, refactorings, &place)?;
            require_artifact(&output)?;
            artifacts.push(output);
        }

        Ok(artifacts)
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn invoke_template(&mut self, step: Step, template: &[String], place: &Placeholders<'_>) -> Result<()> {
        let mut parts = template.iter().map(|p| place.expand(p));
        let program = parts
            .next()
            .ok_or_else(|| Error::Config(format!("empty command template for {step}")))?;
        let invocation = Invocation {
            program,
            args: parts.collect(),
            cwd: Some(place.repo.to_path_buf()),
        };
        self.invoke(step, &invocation)
    }

    fn invoke(&mut self, step: Step, invocation: &Invocation) -> Result<()> {
        tracing::info!(%step, command = %invocation, "running");
        let failure = |status: String| Error::ExternalTool {
            step: step.to_string(),
            command: invocation.to_string(),
            status,
        };
        match self.runner.run(invocation) {
            Ok(outcome) if outcome.success => Ok(()),
            Ok(outcome) => Err(failure(match outcome.code {
                Some(code) => format!("exited with status {code}"),
                None => "was terminated by a signal".to_string(),
            })),
            Err(e) => Err(failure(format!("could not be started: {e}"))),
        }
    }
}

/// A report left by an earlier run must not satisfy the check after the tool runs.
fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn require_artifact(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::missing(path))
    }
}
