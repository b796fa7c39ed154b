// SPDX-License-Identifier: GPL-3.0-only

use camera_broker::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-broker")]
#[command(about = "Shares cameras and an exclusive display between client processes")]
#[command(version = camera_broker::constants::version())]
struct Cli {
    /// Config file (default: ~/.config/camera-broker/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Act as this uid instead of the first allowed one
    #[arg(long, global = true)]
    uid: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cameras exposed by the provider
    List,

    /// Print the broker status as JSON
    Status,

    /// Print the effective configuration as JSON
    ShowConfig,

    /// Run two concurrent clients against one camera and hand the display over
    Demo {
        /// Camera id to share (default: first listed camera)
        #[arg(short = 'd', long)]
        camera: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=camera_broker=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::List => cli::list_cameras(&config, args.uid),
        Commands::Status => cli::print_status(&config, args.uid),
        Commands::ShowConfig => cli::show_config(&config),
        Commands::Demo { camera } => cli::run_demo(&config, args.uid, camera),
    }
}
