use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flate2::read::GzDecoder;
use log::{error, info};
use serde::Serialize;

use post_lin_smooth::config::{Method, SlrMethod, SmootherConfig};
use post_lin_smooth::runner::{run_scenario, RunReport};
use post_lin_smooth::scenario::{Scenario, ScenarioFile};

#[derive(Parser, Debug)]
#[command(name = "smooth")]
#[command(about = "Iterated Kalman smoothers (IEKS / IPLS and their LM and line search variants)", long_about = None)]
struct Args {
    /// Scenario file (.json or .json.gz)
    #[arg(long, conflicts_with = "scenario_dir")]
    scenario: Option<PathBuf>,

    /// Directory of scenario files to run in parallel
    #[arg(long)]
    scenario_dir: Option<PathBuf>,

    /// Smoother configuration JSON; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Number of outer iterations
    #[arg(long)]
    num_iter: Option<usize>,

    /// Initial LM damping
    #[arg(long)]
    lambda: Option<f64>,

    /// LM damping update factor
    #[arg(long)]
    nu: Option<f64>,

    /// LM candidates per iteration before giving up
    #[arg(long)]
    cost_improv_iter_lim: Option<usize>,

    /// Armijo sufficient decrease constant
    #[arg(long)]
    c1: Option<f64>,

    #[arg(long)]
    max_backtracks: Option<usize>,

    /// SLR estimator for the IPLS family
    #[arg(long, value_enum)]
    slr: Option<SlrMethod>,

    /// Monte Carlo SLR sample count
    #[arg(long)]
    num_samples: Option<usize>,

    /// Monte Carlo SLR seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct BatchEntry {
    scenario: PathBuf,
    #[serde(flatten)]
    report: RunReport,
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let parsed: ScenarioFile = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        serde_json::from_reader(BufReader::new(GzDecoder::new(file)))
    } else {
        serde_json::from_reader(BufReader::new(file))
    }
    .with_context(|| format!("parsing {}", path.display()))?;
    Ok(parsed.into_scenario()?)
}

fn build_config(args: &Args) -> Result<SmootherConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SmootherConfig::default(),
    };
    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(num_iter) = args.num_iter {
        config.num_iter = num_iter;
    }
    if let Some(lambda) = args.lambda {
        config.lm.lambda = lambda;
    }
    if let Some(nu) = args.nu {
        config.lm.nu = nu;
    }
    if let Some(lim) = args.cost_improv_iter_lim {
        config.lm.cost_improv_iter_lim = lim;
    }
    if let Some(c1) = args.c1 {
        config.line_search.c1 = c1;
    }
    if let Some(max_backtracks) = args.max_backtracks {
        config.line_search.max_backtracks = max_backtracks;
    }
    if let Some(slr) = args.slr {
        config.slr.method = slr;
    }
    if let Some(num_samples) = args.num_samples {
        config.slr.num_samples = num_samples;
    }
    if let Some(seed) = args.seed {
        config.slr.seed = seed;
    }
    Ok(config)
}

fn run_file(path: &Path, config: &SmootherConfig) -> Result<RunReport> {
    let scenario = load_scenario(path)?;
    run_scenario(&scenario, config).with_context(|| format!("smoothing {}", path.display()))
}

fn is_scenario_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

fn run_batch(dir: &Path, config: &SmootherConfig, workers: usize) -> Result<Vec<BatchEntry>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if is_scenario_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    info!("Running {} scenarios from {} on {workers} threads", paths.len(), dir.display());

    let mut entries = Vec::new();
    for chunk in paths.chunks(workers.max(1)) {
        let results = crossbeam::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|path| s.spawn(move |_| (path.clone(), run_file(path, config))))
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        })
        .map_err(|_| anyhow::anyhow!("scenario worker panicked"))?;

        for result in results {
            match result {
                Ok((scenario, Ok(report))) => entries.push(BatchEntry { scenario, report }),
                Ok((scenario, Err(e))) => error!("Failed {}: {e:#}", scenario.display()),
                Err(_) => error!("Scenario worker panicked"),
            }
        }
    }
    Ok(entries)
}

fn write_report<T: Serialize>(report: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.flush()?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    if let Some(dir) = args.scenario_dir.as_ref() {
        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        let entries = run_batch(dir, &config, workers)?;
        write_report(&entries, args.output.as_deref())
    } else if let Some(path) = args.scenario.as_ref() {
        let report = run_file(path, &config)?;
        write_report(&report, args.output.as_deref())
    } else {
        bail!("Provide --scenario or --scenario-dir");
    }
}
