use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tilecrop::actor;
use tilecrop::actor::reactor::{Event, Reactor};
use tilecrop::common::config::{Config, config_file};
use tilecrop::common::log::init_logging;
use tilecrop::ipc::forward_lines;
use tilecrop::layout_engine::{CropCalculator, Frame, crops_to_rects};
use tilecrop::sys::compositor::LoggingCompositor;
use tilecrop::sys::participants::FileParticipants;
use tilecrop::sys::upstream::LoggingUpstream;
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tilecrop", version, about = "Cut a video-call gallery into per-participant tiles")]
struct Cli {
    /// Configuration file. Defaults to the user's config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the crops for a gallery of `count` tiles as JSON.
    Layout {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        count: usize,
        /// Print the visible rectangle of each tile instead of its margins.
        #[arg(long)]
        rects: bool,
    },
    /// Drive the dry-run compositor with JSON-lines events read from stdin.
    Run,
    /// Print the effective configuration.
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config_file);
    let config = Config::read_or_default(&config_path)?;

    match cli.command {
        Commands::Layout { width, height, count, rects } => {
            let frame = Frame::new(width, height);
            let crops = CropCalculator::new(config.layout).calculate(frame, count)?;
            let json = if rects {
                serde_json::to_string_pretty(&crops_to_rects(frame, &crops))?
            } else {
                serde_json::to_string_pretty(&crops)?
            };
            println!("{json}");
        }
        Commands::Run => run(config).await?,
        Commands::Config => print!("{}", config.to_toml()?),
    }
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    init_logging("info");

    let compositor = Arc::new(LoggingCompositor::new(&config.dry_run, &config.scenes));
    let participants = FileParticipants::new(config.participants.path.clone());
    info!(path = %participants.path().display(), "reading participants");
    let (broadcast_tx, mut broadcast_rx) = actor::channel();
    let (events_tx, events_rx) = actor::channel();
    let reactor = Reactor::new(config, compositor, participants, LoggingUpstream)
        .with_broadcast(broadcast_tx);

    let printer = tokio::spawn(async move {
        while let Some((_, event)) = broadcast_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(%e, "could not serialize broadcast event"),
            }
        }
    });

    events_tx.send(Event::CompositorConnected);
    let input = async move {
        let stdin = BufReader::new(tokio::io::stdin());
        forward_lines(stdin, &events_tx).await
    };
    let ((), forwarded) = tokio::join!(reactor.run(events_rx), input);
    let forwarded = forwarded.context("failed to read events from stdin")?;
    info!(forwarded, "input closed");

    printer.await?;
    Ok(())
}
