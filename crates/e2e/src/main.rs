//! Scenario runner entry point
//!
//! Exit status: 0 when every scenario ran to completion (individual visibility
//! checks may still have missed), 1 when a scenario hit a fatal error, 2 when
//! the harness itself could not be set up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use adventure_e2e::browser::{PlaywrightEngine, PlaywrightSettings};
use adventure_e2e::config::TranscriptEncoding;
use adventure_e2e::report::Reporter;
use adventure_e2e::{preflight, scenarios, HarnessConfig, Scenario, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "adventure-e2e")]
#[command(about = "End-to-end scenarios for the birthday adventure site")]
#[command(version)]
struct Args {
    /// Harness configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "e2e.toml")]
    config: PathBuf,

    /// Base URL of the running app
    #[arg(long, env = "ADVENTURE_BASE_URL")]
    base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Screenshot directory
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Write the JSON suite report here
    #[arg(long)]
    results: Option<PathBuf>,

    /// Scenario to run, by name or prefix (repeatable; default: all)
    #[arg(short, long = "scenario")]
    scenarios: Vec<String>,

    /// Directory of additional YAML scenarios
    #[arg(long)]
    scenarios_dir: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,

    /// Override a named animation delay, e.g. `--delay bloom=1500` (repeatable)
    #[arg(long = "delay", value_name = "PHASE=MS", value_parser = parse_delay)]
    delays: Vec<(String, u64)>,

    /// Transcript output encoding
    #[arg(long, value_enum)]
    encoding: Option<TranscriptEncoding>,

    /// Wait up to this many seconds for the app to answer before running (0 = skip)
    #[arg(long, default_value = "0")]
    preflight_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Diagnostics on stderr; stdout carries the transcript
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")
        .and_then(|rt| rt.block_on(async_main(args)));

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<i32> {
    let mut config = HarnessConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }
    if let Some(path) = &args.results {
        config.results_path = Some(path.clone());
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }
    for (phase, ms) in &args.delays {
        config.delays.set(phase.clone(), *ms);
    }
    config.validate()?;

    let selected = select_scenarios(&args)?;

    if args.list {
        for scenario in &selected {
            println!(
                "{:<20} {:<18} {:>3} steps  [{}]",
                scenario.name,
                scenario.entry_url,
                scenario.steps.len(),
                scenario.tags.join(", ")
            );
        }
        println!();
        println!("Delay phases:");
        for phase in config.delays.phases() {
            if let Some(duration) = config.delays.get(phase) {
                println!("  {:<20} {:>5} ms", phase, duration.as_millis());
            }
        }
        return Ok(0);
    }

    if args.preflight_secs > 0 {
        preflight::wait_until_reachable(&config.base_url, Duration::from_secs(args.preflight_secs))
            .await?;
    }

    let engine = Arc::new(PlaywrightEngine::new(PlaywrightSettings::from_config(&config)));
    let reporter = Reporter::stdout(config.encoding);
    let results_path = config.results_path.clone();
    let mut runner = ScenarioRunner::new(engine, config, reporter)?;

    let suite = runner.run_suite(&selected).await;

    if let Some(path) = results_path {
        suite.write_json(&path)?;
    }

    Ok(suite.exit_code())
}

fn select_scenarios(args: &Args) -> anyhow::Result<Vec<Scenario>> {
    let mut catalog = scenarios::builtin();
    if let Some(dir) = &args.scenarios_dir {
        let loaded = Scenario::load_all(dir)
            .with_context(|| format!("loading scenarios from {}", dir.display()))?;
        catalog.extend(loaded);
    }

    let mut selected = if args.scenarios.is_empty() {
        catalog
    } else {
        let mut picked = Vec::new();
        for query in &args.scenarios {
            match catalog.iter().find(|s| scenarios::matches(s, query)) {
                Some(s) => picked.push(s.clone()),
                None => bail!("no scenario named '{}'", query),
            }
        }
        picked
    };

    if let Some(tag) = &args.tag {
        selected = Scenario::filter_by_tag(&selected, tag)
            .into_iter()
            .cloned()
            .collect();
    }

    if selected.is_empty() {
        bail!("no scenarios selected");
    }
    Ok(selected)
}

fn parse_delay(raw: &str) -> Result<(String, u64), String> {
    let (phase, ms) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PHASE=MS, got '{}'", raw))?;
    let phase = phase.trim();
    if phase.is_empty() {
        return Err(format!("missing phase name in '{}'", raw));
    }
    let ms = ms
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration in '{}': {}", raw, e))?;
    Ok((phase.to_string(), ms))
}
