//! Sweep Scope
//!
//! Host-side toolkit for an ESP32 frequency-sweep analyzer:
//!
//! - **Live viewer**: plots the coarse and fine sweep passes as they arrive
//! - **Headless monitor**: colored terminal echo with per-sweep summaries and
//!   capture logging (no display required)
//! - **Port discovery**: list and auto-detect USB serial adapters
//!   (requires the `serial` feature and libudev on Linux)
//! - **Map cropper**: cut a lat/lon window out of an equirectangular map
//!
//! # Usage
//!
//! ```bash
//! # Live plots from an auto-detected port
//! sweep-scope view
//!
//! # Headless monitoring with a capture log
//! sweep-scope monitor -p /dev/ttyUSB0 --log sweep.log
//!
//! # Replay a capture without hardware
//! sweep-scope view --replay sweep.log
//!
//! # List serial ports
//! sweep-scope ports list
//!
//! # Crop a map region for a 320x240 display
//! sweep-scope map crop --image map.png --output crop.png \
//!     --west -12.71 --east 52.8 --north 71.7 --south 34.8
//! ```

mod config;
mod map;
mod serial;
mod sweep;
mod viewer;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use config::AppConfig;
use serial::monitor::{MonitorConfig, SweepMonitor};
use sweep::session::{FileReplay, LineSource, SweepSession};

#[cfg(feature = "serial")]
use serial::port::{self, PortConfig, SerialConnection};

/// Sweep Scope
///
/// Capture and visualization toolkit for ESP32 antenna analyzers
#[derive(Parser)]
#[command(name = "sweep-scope")]
#[command(version = "0.1.0")]
#[command(about = "Sweep capture and visualization toolkit for ESP32 antenna analyzers")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Live plot viewer
    View(ViewArgs),

    /// Headless terminal monitor
    Monitor(MonitorArgs),

    /// Serial port operations (requires --features serial)
    #[cfg(feature = "serial")]
    #[command(subcommand)]
    Ports(PortCommands),

    /// Equirectangular map operations
    #[command(subcommand)]
    Map(MapCommands),
}

/// Options shared by the viewer and the monitor
#[derive(Args)]
struct SourceArgs {
    /// Serial port path (e.g. /dev/ttyUSB0); auto-detected when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Replay a capture log instead of opening a serial port
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ViewArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Polling interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[derive(Args)]
struct MonitorArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write received lines to a capture log (replayable with --replay)
    #[arg(short, long)]
    log: Option<String>,

    /// Disable timestamps
    #[arg(long)]
    no_timestamps: bool,
}

#[cfg(feature = "serial")]
#[derive(Subcommand)]
enum PortCommands {
    /// List available serial ports
    List,

    /// Auto-detect the analyzer's USB serial adapter
    Detect,
}

#[derive(Subcommand)]
enum MapCommands {
    /// Crop a lat/lon window out of an equirectangular map image
    Crop(CropArgs),
}

#[derive(Args)]
struct CropArgs {
    /// Source equirectangular map image
    #[arg(long)]
    image: PathBuf,

    /// Output path for the cropped image
    #[arg(long)]
    output: PathBuf,

    /// Western longitude bound in degrees
    #[arg(long, allow_hyphen_values = true)]
    west: f64,

    /// Eastern longitude bound in degrees
    #[arg(long, allow_hyphen_values = true)]
    east: f64,

    /// Northern latitude bound in degrees
    #[arg(long, allow_hyphen_values = true)]
    north: f64,

    /// Southern latitude bound in degrees
    #[arg(long, allow_hyphen_values = true)]
    south: f64,

    /// Output width in pixels
    #[arg(long, default_value_t = map::DEFAULT_OUTPUT_SIZE.0)]
    width: u32,

    /// Output height in pixels
    #[arg(long, default_value_t = map::DEFAULT_OUTPUT_SIZE.1)]
    height: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::View(args) => handle_view(args),
        Commands::Monitor(args) => handle_monitor(args),
        #[cfg(feature = "serial")]
        Commands::Ports(cmd) => handle_ports(cmd),
        Commands::Map(cmd) => handle_map(cmd),
    }
}

fn handle_view(args: ViewArgs) -> Result<()> {
    let cfg = load_config(&args.source)?;
    let tick_ms = args.tick_ms.unwrap_or(cfg.tick_interval_ms);

    let source = open_source(&args.source, &cfg)?;
    let session = SweepSession::new(source);
    viewer::run_viewer(session, Duration::from_millis(tick_ms))
}

fn handle_monitor(args: MonitorArgs) -> Result<()> {
    let cfg = load_config(&args.source)?;
    let source = open_source(&args.source, &cfg)?;
    let session = SweepSession::new(source);

    let monitor_config = MonitorConfig {
        show_timestamps: !args.no_timestamps,
        log_file: args.log,
    };
    SweepMonitor::new(session, monitor_config).run()
}

#[cfg(feature = "serial")]
fn handle_ports(cmd: PortCommands) -> Result<()> {
    match cmd {
        PortCommands::List => port::print_ports(),

        PortCommands::Detect => {
            println!(
                "{} Detecting analyzer serial connections...",
                "[*]".cyan().bold()
            );

            let ports = port::detect_instrument_ports()?;

            if ports.is_empty() {
                println!("{}", "No USB-to-serial adapters detected".yellow());
                println!("\n{}", "Troubleshooting:".white().bold());
                println!("  1. Connect the analyzer's USB cable");
                println!("  2. Check permissions: sudo usermod -aG dialout $USER");
                println!("  3. Check dmesg for connection events");
            } else {
                println!("\n{}", "Detected serial ports:".green().bold());
                for port_info in &ports {
                    println!("\n  {}", port_info.path.white().bold());
                    if let Some(ref prod) = port_info.product {
                        println!("    Product: {}", prod);
                    }
                    if let (Some(vid), Some(pid)) = (port_info.vid, port_info.pid) {
                        println!("    VID:PID: {:04x}:{:04x}", vid, pid);
                    }
                }
                println!("\n{}", "To monitor:".cyan());
                println!("  sweep-scope monitor -p {}", ports[0].path.white());
            }

            Ok(())
        }
    }
}

fn handle_map(cmd: MapCommands) -> Result<()> {
    match cmd {
        MapCommands::Crop(args) => {
            let bounds = map::GeoBounds::new(args.west, args.east, args.north, args.south)?;
            map::crop_equirectangular(
                &args.image,
                &bounds,
                &args.output,
                (args.width, args.height),
            )?;

            println!(
                "{} Cropped map written to {}",
                "[OK]".green().bold(),
                args.output.display().to_string().white()
            );
            Ok(())
        }
    }
}

/// Merge the optional config file with command-line overrides.
fn load_config(args: &SourceArgs) -> Result<AppConfig> {
    let mut cfg = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    if let Some(ref port) = args.port {
        cfg.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        cfg.baud_rate = baud;
    }
    Ok(cfg)
}

/// Open the line source: a replay file when requested, otherwise the serial
/// port (auto-detected when no path is configured).
#[cfg_attr(not(feature = "serial"), allow(unused_variables))]
fn open_source(args: &SourceArgs, cfg: &AppConfig) -> Result<Box<dyn LineSource>> {
    if let Some(ref replay) = args.replay {
        let replay_source = FileReplay::open(replay)?;
        println!(
            "{} Replaying {} lines from {}",
            "[*]".cyan().bold(),
            replay_source.remaining(),
            replay.display()
        );
        return Ok(Box::new(replay_source));
    }

    #[cfg(feature = "serial")]
    {
        let port_path = match cfg.port.clone() {
            Some(p) => p,
            None => {
                let detected = port::detect_instrument_ports()?;
                if detected.is_empty() {
                    anyhow::bail!("no USB serial adapters detected; use --port to specify one");
                }
                println!(
                    "{} Auto-detected: {}",
                    "[OK]".green().bold(),
                    detected[0].path.white()
                );
                detected[0].path.clone()
            }
        };

        println!(
            "{} Connecting to {} at {} baud",
            "[*]".cyan().bold(),
            port_path.white(),
            cfg.baud_rate
        );

        let port_config = PortConfig::new(&port_path)
            .with_baud_rate(cfg.baud_rate)
            .with_timeout(Duration::from_millis(cfg.read_timeout_ms));
        let connection = SerialConnection::open(port_config)?;
        Ok(Box::new(connection))
    }

    #[cfg(not(feature = "serial"))]
    {
        anyhow::bail!("built without serial support; use --replay or rebuild with --features serial")
    }
}
