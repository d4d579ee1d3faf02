// src/main.rs
//
// canwatch CLI: runs the connection monitor against a SocketCAN interface
// (or the simulated driver), streams received frames to stdout and logs
// status transitions until Ctrl-C.

use clap::Parser;
use std::path::PathBuf;

use canwatch::io::{now_us, CanDriver, CanFrame, SimDriver};
use canwatch::settings::{self, MonitorSettings};
use canwatch::{logging, status, tlog, CommandSurface, ConnectionMonitor};

#[derive(Parser)]
#[command(name = "canwatch", version, about = "CAN adapter connection monitor")]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SocketCAN interface to monitor (e.g. can0)
    #[arg(long)]
    interface: Option<String>,

    /// Run against the simulated driver instead of real hardware
    #[arg(long)]
    sim: bool,

    /// Baud-rate table index (0-13; out-of-range clamps to 13)
    #[arg(long)]
    baud: Option<u8>,

    /// Print received frames and status events as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the baud-rate table and exit
    #[arg(long)]
    baud_table: bool,

    /// Directory for log files (enables file logging)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn build_driver(settings: &MonitorSettings) -> Result<Box<dyn CanDriver>, String> {
    if settings.driver == settings::DRIVER_SIM {
        let (driver, _handle) = SimDriver::new();
        return Ok(Box::new(driver));
    }
    if settings.driver == settings::DRIVER_SOCKETCAN {
        #[cfg(target_os = "linux")]
        {
            return Ok(Box::new(canwatch::io::SocketCanDriver::new(
                settings.interface.clone(),
            )));
        }
        #[cfg(not(target_os = "linux"))]
        {
            return Err("the socketcan driver is only available on Linux; use --sim".to_string());
        }
    }
    Err(format!("unknown driver kind: {}", settings.driver))
}

fn print_frame(frame: &CanFrame, json: bool) {
    if json {
        let line = serde_json::json!({
            "timestamp_us": now_us(),
            "id": frame.id,
            "len": frame.len,
            "data": frame.payload(),
        });
        println!("{}", line);
    } else {
        println!(
            "{:>16} 0x{:03X} [{}] {}",
            now_us(),
            frame.id,
            frame.len,
            hex::encode(frame.payload())
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => settings::load_settings(path).map_err(|e| e.to_string())?,
        None => MonitorSettings::default(),
    };
    if let Some(interface) = cli.interface.clone() {
        settings.interface = interface;
    }
    if cli.sim {
        settings.driver = settings::DRIVER_SIM.to_string();
    }
    if let Some(baud) = cli.baud {
        settings.baud_index = baud;
    }
    if let Some(log_dir) = cli.log_dir.clone() {
        settings.log_dir = Some(log_dir);
    }

    if cli.baud_table {
        println!("{}", status::baud_rate_table(settings.baud_rate()));
        return Ok(());
    }

    if let Some(log_dir) = &settings.log_dir {
        logging::init_file_logging(log_dir)?;
    }

    let driver = build_driver(&settings)?;
    let mut monitor = ConnectionMonitor::new(driver, settings.baud_rate(), settings.tick());
    let surface = CommandSurface::new(&monitor);

    // In JSON mode, status events go to stdout alongside the frames
    if cli.json {
        let mut events = monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Ok(line) = serde_json::to_string(&event) {
                            println!("{}", line);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        });
    }

    monitor.start();
    tlog!(
        "[canwatch] monitoring {} ({}, {})",
        settings.interface,
        settings.driver,
        settings.baud_rate()
    );

    let mut poll = tokio::time::interval(settings.tick());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tlog!("[canwatch] shutdown requested");
                break;
            }
            _ = poll.tick() => {
                // Drain everything the adapter has queued this tick
                while let Ok(Some(frame)) = surface.read_frame() {
                    print_frame(&frame, cli.json);
                }
            }
        }
    }

    monitor.shutdown().await;
    logging::stop_file_logging();
    Ok(())
}
