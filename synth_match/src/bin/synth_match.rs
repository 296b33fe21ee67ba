use std::path::PathBuf;

use clap::Parser;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use synth_match::{
    args::{self, Plan},
    config::{self, Config, Telemetry},
    run::{self, Run},
};
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Args(#[from] args::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Run(#[from] run::Error),
    #[error("Failed to install prometheus recorder: {0}")]
    Prometheus(#[from] BuildError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// match identifier and track number, format MATCH_ID:TRACK
    match_track: String,
    /// number of events to send, at least 1
    #[clap(allow_negative_numbers = true)]
    total_events: i64,
    /// number of players in the match, 1 through 8
    #[clap(allow_negative_numbers = true)]
    num_player_ids: i64,
    /// path on disk to the configuration file, ignored when SYNTH_MATCH_CONFIG
    /// is set
    #[clap(long)]
    config_path: Option<PathBuf>,
}

async fn inner_main(plan: Plan, config: Config) -> Result<(), Error> {
    if let Some(Telemetry::Prometheus {
        addr,
        global_labels,
    }) = &config.telemetry
    {
        let mut builder = PrometheusBuilder::new().with_http_listener(*addr);
        for (k, v) in global_labels {
            builder = builder.add_global_label(k, v);
        }
        builder.install()?;
        info!("Serving prometheus metrics on {addr}");
    }

    Run::from_plan(plan, &config)?.spin().await?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(false)
        .finish()
        .init();

    let cli = Cli::parse();

    if let Err(err) = start(cli) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn start(cli: Cli) -> Result<(), Error> {
    let plan = args::validate(&cli.match_track, cli.total_events, cli.num_player_ids)?;

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting synth-match {version} run.");

    let config = Config::load(cli.config_path.as_deref())?;
    info!("Sending to table {}", config.endpoint.table);

    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(inner_main(plan, config))
}
