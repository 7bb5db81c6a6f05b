mod script;

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use match3_core::protocol::{FRAME_LEN, Frame, RxLine};
use match3_core::session::{Device, FirmwareConfig};
use match3_core::storage::{FileFlash, FlashInterface, MockFlash};
use match3_core::transport::{Clock, SerialPort, StdClock, TransportError};
use tracing::{error, info, warn};

use script::{Action, HELP, HostView, describe, parse_line};

#[derive(Parser, Debug)]
#[command(author, version, about = "Match-3 controller simulator", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Flash image file (saves persist across runs)
    #[arg(long)]
    flash: Option<String>,

    /// Read commands from a file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// No frame gap or animation delay
    #[arg(long)]
    fast: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Serial line whose output goes to the printing thread.
struct ChannelSerial {
    tx: Sender<Vec<u8>>,
}

impl SerialPort for ChannelSerial {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }
}

fn load_config(args: &Args) -> Result<FirmwareConfig> {
    let mut config = match &args.config {
        Some(path) => FirmwareConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => FirmwareConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.flash.is_some() {
        config.flash_image = args.flash.clone();
    }
    if args.fast {
        config.frame_gap_ms = 0;
        config.anim_step_ms = 0;
    }
    Ok(config)
}

fn open_flash(config: &FirmwareConfig) -> Result<Box<dyn FlashInterface>> {
    Ok(match &config.flash_image {
        Some(path) => Box::new(FileFlash::open(path).with_context(|| format!("opening {path}"))?),
        None => Box::new(MockFlash::new()),
    })
}

/// Collect reply bytes until the line has been quiet for `quiet`.
fn collect_replies(replies: &Receiver<Vec<u8>>, quiet: Duration, view: &mut HostView) -> bool {
    let mut buf = Vec::new();
    loop {
        match replies.recv_timeout(quiet) {
            Ok(bytes) => buf.extend_from_slice(&bytes),
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
        while buf.len() >= FRAME_LEN {
            let raw: Vec<u8> = buf.drain(..FRAME_LEN).collect();
            match Frame::decode(&raw) {
                Ok(frame) => {
                    if !view.apply(&frame) {
                        println!("< {}", describe(&frame));
                    }
                }
                Err(e) => println!("< {:02X?}  {}", raw, e),
            }
        }
    }
    if !buf.is_empty() {
        println!("< {:02X?}  (partial)", buf);
    }
    true
}

/// Producer side: read commands, feed the receive line, print replies.
fn host_loop(
    input: Box<dyn BufRead + Send>,
    rx: Arc<RxLine>,
    replies: Receiver<Vec<u8>>,
    clock: Arc<StdClock>,
    quiet: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut view = HostView::default();

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Input error: {}", e);
                break;
            }
        };
        let action = match parse_line(&line) {
            Ok(action) => action,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };
        match action {
            Action::Send(groups) => {
                for group in groups {
                    println!("> {:02X?}", group);
                    for byte in group {
                        rx.on_byte(byte, clock.now_ms());
                    }
                    if !collect_replies(&replies, quiet, &mut view) {
                        warn!("Device stopped");
                        shutdown.store(true, Ordering::Release);
                        return;
                    }
                }
            }
            Action::ShowBoard => print!("{}", view.board()),
            Action::Help => println!("{HELP}"),
            Action::Quit => break,
            Action::Nothing => {}
        }
    }
    shutdown.store(true, Ordering::Release);
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        info!(path = %path.display(), "Configuration written");
        return Ok(());
    }

    let input: Box<dyn BufRead + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let quiet = Duration::from_millis(
        (config.anim_step_ms + config.frame_gap_ms) as u64 + 50,
    );
    let flash = open_flash(&config)?;
    let (tx, replies) = mpsc::channel();
    let clock = Arc::new(StdClock::new());
    let mut device = Device::new(config, ChannelSerial { tx }, flash, Arc::clone(&clock));
    info!(uptime_ms = device.clock().now_ms(), "Device ready");

    let shutdown = Arc::new(AtomicBool::new(false));
    let host = {
        let rx = device.rx_line();
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || host_loop(input, rx, replies, clock, quiet, shutdown))
    };

    let stats = device.run(&shutdown);
    if host.join().is_err() {
        anyhow::bail!("host thread panicked");
    }
    info!(
        frames = stats.frames_handled,
        bad_crc = stats.checksum_errors,
        dropped = stats.rx.dropped_busy + stats.rx.dropped_suspended,
        "Session finished"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting match3 simulator...");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
