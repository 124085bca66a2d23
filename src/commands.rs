// src/commands.rs

//! Post-processing stages over the artifacts of a run: normalize, merge, trend, stats.
//!
//! Every stage walks the explicit revision sequence. A unit (one revision or interval)
//! whose inputs are missing or unreadable by schema is skipped with a warning; other
//! errors end the stage.

use crate::aggregate::{self, Source};
use crate::config::PipelineConfig;
use crate::error::{skip_unit, Result};
use crate::join::{inner_join, JoinInput};
use crate::layout::{discover_intervals, OutputLayout};
use crate::model::{AggregateTable, ClassMetricRecord, Revision, RevisionSequence, TrendSeries};
use crate::normalize::ClassKeyNormalizer;
use crate::reports::{self, ck, RawTable};
use crate::{output, stats, trend};
use std::path::PathBuf;

/// Shared inputs of the post-processing stages
pub struct Context {
    pub config: PipelineConfig,
    pub layout: OutputLayout,
    pub normalizer: ClassKeyNormalizer,
    pub revisions: RevisionSequence,
}

impl Context {
    pub fn new(config: PipelineConfig, revisions: RevisionSequence) -> Self {
        Context {
            layout: OutputLayout::new(&config.output_root),
            normalizer: config.normalizer(),
            config,
            revisions,
        }
    }
}

/// Files written and units skipped by a stage
#[derive(Debug, Default)]
pub struct Outcome {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

impl Outcome {
    fn record(&mut self, unit: String, result: Result<Vec<PathBuf>>) -> Result<()> {
        match skip_unit(&unit, result)? {
            Some(paths) => self.written.extend(paths),
            None => self.skipped.push(unit),
        }
        Ok(())
    }

    pub fn absorb(&mut self, other: Outcome) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
    }
}

/// Raw reports to normalized per-revision and per-interval CSVs.
pub fn normalize(ctx: &Context) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for revision in ctx.revisions.iter() {
        let result = (|| -> Result<Vec<PathBuf>> {
            let records = reports::read_defect_report(&ctx.layout.defect_report(revision), &ctx.normalizer)?;
            let path = ctx.layout.normalized_defects(revision);
            output::save_defects(&path, &records)?;
            tracing::info!(tag = %revision.tag, defects = records.len(), file = %path.display(), "normalized defects");
            Ok(vec![path])
        })();
        outcome.record(format!("defects {}", revision.tag), result)?;
    }

    for (prev, revision) in ctx.revisions.intervals() {
        let result = (|| -> Result<Vec<PathBuf>> {
            let report = ctx.layout.refactoring_report(prev, revision);
            let events = reports::read_refactoring_report(&report, &ctx.normalizer)?;
            let counts_path = ctx.layout.refactoring_counts(prev, revision);
            output::save_counts(&counts_path, &aggregate::aggregate_refactorings(&events))?;
            let rows_path = ctx.layout.normalized_refactorings(revision);
            output::save_refactorings(&rows_path, &events)?;
            tracing::info!(from = %prev.tag, to = %revision.tag, events = events.len(), "normalized refactorings");
            Ok(vec![counts_path, rows_path])
        })();
        outcome.record(format!("refactorings {}_to_{}", prev.tag, revision.tag), result)?;
    }

    Ok(outcome)
}

fn read_aggregate(ctx: &Context, source: Source, path: PathBuf) -> Result<AggregateTable> {
    let table = RawTable::read(&path)?;
    aggregate::aggregate_table(source, &table, &ctx.normalizer)
}

fn merge_interval(ctx: &Context, from: &Revision, to: &Revision, counts: PathBuf) -> Result<Vec<PathBuf>> {
    let refactorings = aggregate::counts_from_table(&RawTable::read(&counts)?, &ctx.normalizer)?;
    let bugs_from = read_aggregate(ctx, Source::Defects, ctx.layout.normalized_defects(from))?;
    let bugs_to = read_aggregate(ctx, Source::Defects, ctx.layout.normalized_defects(to))?;

    let tag = format!("{}_to_{}", from.version(), to.version());
    let merged = inner_join(
        &tag,
        &[
            JoinInput::count(&refactorings, "qtd_refactorings"),
            JoinInput::count(&bugs_from, format!("bugs_{}", from.version())),
            JoinInput::count(&bugs_to, format!("bugs_{}", to.version())),
        ],
    )?;
    let path = ctx
        .layout
        .merged_dir()
        .join(format!("merged_refactorings_spotbugs_{tag}.csv"));
    output::save_merged(&path, &merged)?;
    tracing::info!(interval = %tag, rows = merged.rows.len(), "merged interval");
    Ok(vec![path])
}

fn merge_revision(ctx: &Context, revision: &Revision, outcome: &mut Outcome) -> Result<Vec<PathBuf>> {
    let version = revision.version();
    let metrics_path = ctx
        .layout
        .metrics_report(revision, &ctx.config.source_report_glob)?;
    let classes = read_aggregate(ctx, Source::Metrics, metrics_path)?;
    let refactorings = read_aggregate(ctx, Source::Refactorings, ctx.layout.normalized_refactorings(revision))?;

    let with_refactorings = inner_join(
        version,
        &[
            JoinInput::membership(&classes),
            JoinInput::count_and_labels(&refactorings, "refactoring_count", "refactorings"),
        ],
    )?;
    let first = ctx.layout.merged_dir().join(format!("ck_refactorings_{version}.csv"));
    output::save_merged(&first, &with_refactorings)?;
    let mut written = vec![first];

    let defects = skip_unit(
        &format!("defects {}", revision.tag),
        read_aggregate(ctx, Source::Defects, ctx.layout.normalized_defects(revision)),
    )?;
    match defects {
        Some(defects) => {
            let with_defects = inner_join(
                version,
                &[
                    JoinInput::membership(&classes),
                    JoinInput::count_and_labels(&refactorings, "refactoring_count", "refactorings"),
                    JoinInput::count_and_labels(&defects, "bug_count", "bug_types"),
                ],
            )?;
            let second = ctx
                .layout
                .merged_dir()
                .join(format!("ck_refactorings_spotbugs_{version}.csv"));
            output::save_merged(&second, &with_defects)?;
            written.push(second);
        }
        None => outcome.skipped.push(format!("ck+refactorings+defects {}", revision.tag)),
    }
    tracing::info!(tag = %revision.tag, rows = with_refactorings.rows.len(), "merged revision");
    Ok(written)
}

/// Counts table of each consecutive interval: the name `normalize` writes, or else a
/// file spelled `refactoring_v<a>_to_<b>_count.csv` found in the normalized directory.
fn interval_counts(ctx: &Context) -> Result<Vec<(&Revision, &Revision, PathBuf)>> {
    let mut intervals: Vec<_> = ctx
        .revisions
        .intervals()
        .map(|(prev, revision)| (prev, revision, ctx.layout.refactoring_counts(prev, revision)))
        .collect();
    if intervals.iter().all(|(_, _, path)| path.is_file()) {
        return Ok(intervals);
    }

    let discovered = skip_unit(
        "interval discovery",
        discover_intervals(
            &ctx.layout.normalized_dir(),
            "refactoring_",
            "_count.csv",
            &ctx.revisions,
        ),
    )?
    .unwrap_or_default();
    for (prev, revision, path) in intervals.iter_mut().filter(|(_, _, p)| !p.is_file()) {
        let found = discovered
            .iter()
            .find(|(from, to, _)| from.ordinal == prev.ordinal && to.ordinal == revision.ordinal);
        if let Some((_, _, alternative)) = found {
            *path = alternative.clone();
        }
    }
    Ok(intervals)
}

/// Interval merges (refactoring counts with both endpoints' defects) and per-revision
/// merges of metrics, refactorings and defects.
pub fn merge(ctx: &Context) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for (from, to, counts) in interval_counts(ctx)? {
        let result = merge_interval(ctx, from, to, counts);
        outcome.record(format!("interval {}_to_{}", from.tag, to.tag), result)?;
    }

    for revision in ctx.revisions.iter() {
        let mut nested = Outcome::default();
        let result = merge_revision(ctx, revision, &mut nested);
        outcome.record(format!("ck+refactorings {}", revision.tag), result)?;
        outcome.absorb(nested);
    }

    Ok(outcome)
}

/// Mean, median and population variance of the tracked metrics per revision.
pub fn trend(ctx: &Context) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    let metrics = &ctx.config.metrics;

    let mut tables = Vec::new();
    for revision in ctx.revisions.iter() {
        let loaded = (|| -> Result<Vec<ClassMetricRecord>> {
            let path = ctx
                .layout
                .metrics_report(revision, &ctx.config.source_report_glob)?;
            ck::class_metrics(&RawTable::read(&path)?, metrics, &ctx.normalizer)
        })();
        match skip_unit(&format!("metrics {}", revision.tag), loaded)? {
            Some(records) => tables.push((revision.clone(), records)),
            None => outcome.skipped.push(format!("metrics {}", revision.tag)),
        }
    }

    let series = trend::trend_series(metrics, tables);
    for row in &series.rows {
        let single = TrendSeries {
            metrics: series.metrics.clone(),
            rows: vec![row.clone()],
        };
        let path = ctx
            .layout
            .trend_dir()
            .join(format!("ck_summary_metrics_{}.csv", row.revision.tag));
        output::save_trend(&path, &single)?;
        outcome.written.push(path);
    }
    let combined = ctx.layout.trend_dir().join("ck_summary_metrics_all_releases.csv");
    output::save_trend(&combined, &series)?;
    tracing::info!(revisions = series.rows.len(), file = %combined.display(), "wrote trend series");
    outcome.written.push(combined);

    Ok(outcome)
}

/// Category tallies, the highlighted category's type distribution, and refactoring type
/// counts per interval.
pub fn stats(ctx: &Context) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    let mut categories = Vec::new();
    let mut highlighted = Vec::new();
    let mut refactorings = Vec::new();

    for revision in ctx.revisions.iter() {
        let unit = format!("defects {}", revision.tag);
        let report = ctx.layout.defect_report(revision);
        match skip_unit(&unit, reports::read_bug_findings(&report))? {
            Some(records) => {
                categories.push(stats::category_counts(
                    revision.version(),
                    &records,
                    &ctx.config.excluded_categories,
                ));
                highlighted.push(stats::category_type_counts(
                    revision.version(),
                    &records,
                    &ctx.config.highlight_category,
                ));
            }
            None => outcome.skipped.push(unit),
        }
    }

    for (prev, revision) in ctx.revisions.intervals() {
        let unit = format!("{}_to_{}", prev.tag, revision.tag);
        let report = ctx.layout.refactoring_report(prev, revision);
        match skip_unit(&unit, reports::read_refactoring_report(&report, &ctx.normalizer))? {
            Some(events) => {
                let tally = stats::refactoring_type_counts(&unit, &events);
                tracing::info!(interval = %unit, total = tally.total, types = tally.counts.len(), "refactoring types");
                refactorings.push(tally);
            }
            None => outcome.skipped.push(unit),
        }
    }

    let dir = ctx.layout.stats_dir();
    let files = [
        (dir.join("spotbugs_category_counts.json"), &categories),
        (
            dir.join(format!(
                "{}_type_counts.json",
                ctx.config.highlight_category.to_lowercase()
            )),
            &highlighted,
        ),
        (dir.join("refactoring_counts.json"), &refactorings),
    ];
    for (path, tallies) in files {
        output::save_json(&path, tallies)?;
        outcome.written.push(path);
    }

    Ok(outcome)
}

/// `normalize`, `merge`, `trend` and `stats` in order.
pub fn analyze(ctx: &Context) -> Result<Outcome> {
    let mut outcome = normalize(ctx)?;
    outcome.absorb(merge(ctx)?);
    outcome.absorb(trend(ctx)?);
    outcome.absorb(stats(ctx)?);
    Ok(outcome)
}
