mod config;
mod error;
mod player;
mod signals;
mod terminal;

use crate::config::{default_config_dir, Config};
use crate::error::App;
use crate::player::controller::{Controller, Exit};
use crate::player::graph;
use crate::player::gst_pipeline::GstPipeline;
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::{error, info, warn};
use std::io;
use std::path::PathBuf;
use std::process;
use tokio::fs;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "camplay",
    about = "Live camera viewer. Space pauses and resumes, Ctrl+C quits.",
    version
)]
struct Cli {
    #[arg(short = 'c', long = "config", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(short = 'd', long = "device", help = "Video device, overrides the configuration")]
    device: Option<String>,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        help = "Log level or flexi_logger specification"
    )]
    log_level: String,

    #[arg(long = "no-keyboard", help = "Do not read commands from standard input")]
    no_keyboard: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(exit) => {
            if let Err(e) = exit.report(&mut io::stderr()) {
                error!("Failed to report exit status: {}", e);
            }
            exit.code()
        }
        Err(e) => {
            eprintln!("camplay: {e}");
            1
        }
    };
    process::exit(code);
}

async fn start_logger(level: &str, log_dir: Option<PathBuf>) -> Result<LoggerHandle, App> {
    let logger = Logger::try_with_str(level)?;
    let handle = match log_dir {
        Some(dir) => {
            fs::create_dir_all(&dir).await?;
            logger
                .log_to_file(FileSpec::default().directory(dir))
                .rotate(
                    Criterion::Size(1_000_000),
                    Naming::Timestamps,
                    Cleanup::KeepLogFiles(3),
                )
                .duplicate_to_stderr(Duplicate::Info)
                .start()?
        }
        None => logger.log_to_stderr().start()?,
    };
    Ok(handle)
}

async fn run(cli: Cli) -> Result<Exit, App> {
    let config_dir = default_config_dir();
    let mut config = Config::load(cli.config.as_deref(), config_dir.as_deref()).await?;
    if let Some(device) = cli.device {
        config.pipeline.device = device;
        config.validate()?;
    }

    let log_dir = config
        .log_dir
        .clone()
        .or_else(|| config_dir.map(|dir| dir.join("logs")));
    let _logger = start_logger(&cli.log_level, log_dir).await?;

    gstreamer::init()?;
    let pipeline = GstPipeline::new(graph::build(&config.pipeline)?)?;
    info!("GStreamer pipeline created for {}", config.pipeline.device);

    let (pause_sender, pause_receiver) = mpsc::channel(1);
    let (quit_sender, quit_receiver) = mpsc::channel(1);
    signals::listen(&quit_sender)?;

    let keyboard = if cli.no_keyboard {
        None
    } else {
        match terminal::spawn_keyboard(pause_sender, quit_sender) {
            Ok(guard) => {
                terminal::restore_on_panic(&guard);
                Some(guard)
            }
            Err(e) => {
                warn!("{}; keyboard control unavailable", e);
                None
            }
        }
    };

    let result = match Controller::start(
        pipeline,
        pause_receiver,
        quit_receiver,
        config.poll_interval(),
    ) {
        Ok(controller) => Ok(controller.run().await),
        Err(e) => Err(e),
    };

    // The reader thread still holds the guard, so Drop alone would not run
    // before process::exit.
    if let Some(guard) = keyboard {
        if let Err(e) = guard.release() {
            warn!("{}", e);
        }
    }
    result
}
