use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dqa_core::config::AuditConfig;
use dqa_core::decode::default_decoder;
use dqa_core::diff::diff_findings;
use dqa_core::error::AuditError;
use dqa_core::index::{IndexCache, IndexOptions};
use dqa_core::report::model::Summary;
use dqa_core::report::render;
use dqa_core::report::write::{INDEX_FILE, SUMMARY_FILE, read_flags, read_json, to_json, write_run};
use dqa_core::report::RunInfo;
use dqa_core::{AuditRequest, audit};

mod args;

use args::{AuditArgs, Command, DiffArgs, ExplainArgs, OutputFormat};

fn main() {
    let args = args::Args::parse();
    init_tracing();

    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Typed errors carry their own code; anything else failed while producing
/// output.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<AuditError>()
        .map(AuditError::exit_code)
        .unwrap_or(3)
}

fn run(args: args::Args) -> Result<i32> {
    match args.command {
        Command::Audit(args) => run_audit(args),
        Command::Diff(args) => run_diff(args),
        Command::Explain(args) => run_explain(args),
    }
}

fn run_audit(args: AuditArgs) -> Result<i32> {
    let mut config = match &args.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if let Some(fail_on) = args.fail_on {
        config.fail_on = fail_on;
    }
    if args.near_dup {
        config.checks.near_duplicates.enabled = true;
    }

    let cache = if args.no_cache {
        IndexCache::empty()
    } else {
        IndexCache::load(&args.out.join(INDEX_FILE))
    };
    let decoder = default_decoder();

    let started = Utc::now();
    let run = audit(&AuditRequest {
        data_yaml: &args.data,
        splits: &args.splits,
        config: &config,
        options: IndexOptions {
            workers: args.workers,
            max_images: args.max_images,
        },
        decoder: decoder.as_ref(),
        cache: &cache,
    })?;
    let finished = Utc::now();

    let run_info = RunInfo::new(
        started.format("%Y%m%d_%H%M%S").to_string(),
        started.to_rfc3339_opts(SecondsFormat::Secs, true),
        finished.to_rfc3339_opts(SecondsFormat::Secs, true),
        (finished - started).num_milliseconds() as f64 / 1000.0,
        &config,
    );
    let report = run.report(&config, run_info);
    write_run(&args.out, &run.index, &report)?;

    match args.format {
        OutputFormat::Json => print!("{}", to_json(&report.summary)?),
        OutputFormat::Text => print!("{}", render::render_summary_text(&report.summary)),
    }
    Ok(report.exit_code())
}

fn run_diff(args: DiffArgs) -> Result<i32> {
    let old = read_flags(&args.old)?;
    let new = read_flags(&args.new)?;
    let diff = diff_findings(&old.findings, &new.findings, args.fail_on_regression);

    match args.format {
        OutputFormat::Json => print!("{}", to_json(&diff)?),
        OutputFormat::Text => print!("{}", render::render_diff_text(&diff)),
    }
    Ok(if diff.regression { 1 } else { 0 })
}

fn run_explain(args: ExplainArgs) -> Result<i32> {
    let summary: Summary = read_json(&args.run.join(SUMMARY_FILE))?;
    let flags = read_flags(&args.run)?;
    print!("{}", render::render_explain(&summary, &flags, args.top));
    Ok(0)
}
