// src/main.rs

use anyhow::Context as _;
use clap::Parser;
use qualtrack::cli::{Args, Command};
use qualtrack::commands::{self, Context, Outcome};
use qualtrack::layout::OutputLayout;
use qualtrack::pipeline::{Orchestrator, ProcessRunner};
use qualtrack::{logging, revisions, PipelineConfig, RevisionSequence};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);
    let start_time = Instant::now();

    match execute(&args) {
        Ok(()) => {
            tracing::info!("finished in {:.2?}", start_time.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load(args.config.as_deref()).with_context(|| {
        match &args.config {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "building default configuration".to_string(),
        }
    })?;
    if let Some(repo) = &args.repo {
        config.repository_path = repo.clone();
    }
    if let Some(output) = &args.output {
        config.output_root = output.clone();
    }
    Ok(config)
}

/// The explicit `--revisions` list wins; otherwise the manifest written by `run`.
fn resolve_revisions(args: &Args, config: &PipelineConfig) -> anyhow::Result<RevisionSequence> {
    if !args.revisions.is_empty() {
        return Ok(RevisionSequence::from_ordered_tags(args.revisions.iter().cloned()));
    }
    let layout = OutputLayout::new(&config.output_root);
    layout.read_manifest().with_context(|| {
        "no revision list: run `qualtrack run` first or pass --revisions".to_string()
    })
}

fn report(stage: &str, outcome: &Outcome) {
    tracing::info!(
        stage,
        written = outcome.written.len(),
        skipped = outcome.skipped.len(),
        "stage complete"
    );
    for unit in &outcome.skipped {
        tracing::warn!(stage, unit = %unit, "skipped");
    }
}

fn run_pipeline(args: &Args, config: PipelineConfig) -> anyhow::Result<()> {
    let repo = revisions::open_or_clone(&config.repository_path, config.repository_url.as_deref())
        .context("preparing repository")?;
    let sequence = if args.revisions.is_empty() {
        revisions::enumerate_revisions(&repo, config.max_revisions).context("enumerating tags")?
    } else {
        RevisionSequence::from_ordered_tags(args.revisions.iter().cloned())
    };
    drop(repo);

    let mut orchestrator = Orchestrator::new(config, ProcessRunner).with_progress(!args.no_progress);
    let summary = orchestrator.run(&sequence)?;
    tracing::info!(
        revisions = summary.revisions,
        artifacts = summary.artifacts.len(),
        "run complete"
    );
    Ok(())
}

fn execute(args: &Args) -> anyhow::Result<()> {
    let config = load_config(args)?;

    let stage: fn(&Context) -> qualtrack::Result<Outcome> = match args.command {
        Command::Run => return run_pipeline(args, config),
        Command::Normalize => commands::normalize,
        Command::Merge => commands::merge,
        Command::Trend => commands::trend,
        Command::Stats => commands::stats,
        Command::Analyze => commands::analyze,
    };

    let sequence = resolve_revisions(args, &config)?;
    let ctx = Context::new(config, sequence);
    let outcome = stage(&ctx)?;
    report(&format!("{:?}", args.command).to_lowercase(), &outcome);
    Ok(())
}
