use crate::config::load_config;
use crate::dataset::TransitionDataset;
use crate::dump::write_graph_dump;
use crate::layout::DagreLayoutEngine;
use crate::pipeline::{JourneyPipeline, PipelineError};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "journey", version, about = "Customer journey Sankey graph builder")]
pub struct Args {
    /// Transition triples (.csv with header, or .json rows)
    #[arg(short = 'i', long = "triples")]
    pub triples: PathBuf,

    /// Touchpoint names JSON ([{"Id": .., "Name": ..}])
    #[arg(short = 'n', long = "names")]
    pub names: Option<PathBuf>,

    /// Transition statistics JSON ([{"Transition": "M1>M2", ..}])
    #[arg(short = 's', long = "stats")]
    pub stats: Option<PathBuf>,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Frequency threshold; overrides the config file
    #[arg(short = 't', long = "threshold")]
    pub threshold: Option<f64>,

    /// Request an incremental layout
    #[arg(long = "incremental")]
    pub incremental: bool,

    /// Run a second layout pass on the finished graph
    #[arg(long = "relayout")]
    pub relayout: bool,

    /// Output JSON file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.pipeline.threshold);
    let dataset = TransitionDataset::load(&args.triples, args.names.as_deref(), args.stats.as_deref())?;
    info!(records = dataset.records.len(), threshold, "loaded transitions");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let engine = DagreLayoutEngine::new(config.layout.clone());
    let pipeline = JourneyPipeline::new(dataset, config, engine);
    let graph = runtime.block_on(async {
        let graph = pipeline.rebuild(threshold, args.incremental).await?;
        if args.relayout {
            return pipeline.relayout(args.incremental).await;
        }
        Ok::<_, PipelineError>(graph)
    })?;

    write_graph_dump(args.output.as_deref(), &graph)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
