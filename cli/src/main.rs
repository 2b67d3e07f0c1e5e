mod target;

use anyhow::{bail, Context, Result};
use checkfs_core::{
    CheckParameters, CheckFsStatus, DeviceId, DeviceOpener, ErrorKind, FilesystemKind, GateConfig, MountStateProbe,
};
use checkfs_filesystems::detect_filesystem_kind;
use checkfs_platform::{gate_from_config, MountInfoProbe, PlatformDeviceOpener};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "checkfs")]
#[command(about = "Offline-change gate for persistent changed block tracking", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture check parameters for unmounted devices
    Store {
        /// Devices as major:minor or device node
        #[arg(required = true)]
        devices: Vec<String>,
        /// Directory receiving one <major>_<minor>.params file per device
        #[arg(short, long)]
        out_dir: PathBuf,
    },
    /// Check whether tracking may resume on devices
    Check {
        #[arg(required = true)]
        devices: Vec<String>,
        /// Directory holding the stored .params files
        #[arg(short, long)]
        params_dir: PathBuf,
    },
    /// Show filesystem kind and mount state of devices
    Probe {
        #[arg(required = true)]
        devices: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum Report {
    Stored {
        device_id: DeviceId,
        params: String,
        file: PathBuf,
    },
    NotStored {
        status: CheckFsStatus,
    },
    Available {
        device_id: DeviceId,
    },
    Unavailable {
        device_id: DeviceId,
        error_code: ErrorKind,
        error: String,
    },
    Probed {
        device_id: DeviceId,
        filesystem: FilesystemKind,
        mounted: bool,
    },
    Failed {
        device_id: DeviceId,
        error_code: ErrorKind,
        error: String,
    },
}

impl Report {
    fn is_success(&self) -> bool {
        matches!(self, Report::Stored { .. } | Report::Available { .. } | Report::Probed { .. })
    }

    fn print_text(&self) {
        match self {
            Report::Stored { device_id, params, file } => {
                println!("[{}] stored {} -> {}", device_id, params, file.display())
            }
            Report::NotStored { status } => println!("{}", status),
            Report::Available { device_id } => println!("[{}] available: no offline changes", device_id),
            Report::Unavailable { device_id, error, .. } => println!("[{}] unavailable: {}", device_id, error),
            Report::Probed {
                device_id,
                filesystem,
                mounted,
            } => println!(
                "[{}] filesystem: {}, mounted: {}",
                device_id,
                filesystem,
                if *mounted { "yes" } else { "no" }
            ),
            Report::Failed { device_id, error, .. } => println!("[{}] error: {}", device_id, error),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GateConfig> {
    match path {
        Some(path) => GateConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(GateConfig::default()),
    }
}

fn store(config: &GateConfig, device_id: DeviceId, out_dir: &Path) -> Report {
    let gate = gate_from_config(config);
    match gate.check_store_available(device_id) {
        Ok(params) => {
            let file = target::params_file(out_dir, device_id);
            if let Err(e) = std::fs::write(&file, params.as_bytes()) {
                return Report::Failed {
                    device_id,
                    error_code: ErrorKind::Io,
                    error: format!("{}: {}", file.display(), e),
                };
            }
            Report::Stored {
                device_id,
                params: params.to_hex(),
                file,
            }
        }
        Err(status) => {
            status.log();
            Report::NotStored { status }
        }
    }
}

fn check(config: &GateConfig, device_id: DeviceId, params_dir: &Path) -> Report {
    let file = target::params_file(params_dir, device_id);
    // A missing record is an absent buffer, which the gate rejects
    let params = match std::fs::read(&file) {
        Ok(bytes) => Some(CheckParameters::from_bytes(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Report::Failed {
                device_id,
                error_code: ErrorKind::Io,
                error: format!("{}: {}", file.display(), e),
            }
        }
    };

    let gate = gate_from_config(config);
    match gate.check_tracker_available(device_id, params.as_ref()) {
        Ok(()) => Report::Available { device_id },
        Err(e) => Report::Unavailable {
            device_id,
            error_code: e.kind(),
            error: e.to_string(),
        },
    }
}

fn probe(config: &GateConfig, device_id: DeviceId) -> Report {
    let opener = PlatformDeviceOpener::from_config(config);
    let mounts = MountInfoProbe::new(&config.mountinfo_path).with_sysfs_root(&config.sysfs_root);

    let result = opener.open(device_id).and_then(|mut device| {
        let mounted = mounts.is_mounted(device.as_ref())?;
        let filesystem = detect_filesystem_kind(device.as_mut())?;
        Ok((filesystem, mounted))
    });
    match result {
        Ok((filesystem, mounted)) => Report::Probed {
            device_id,
            filesystem,
            mounted,
        },
        Err(e) => Report::Failed {
            device_id,
            error_code: e.kind(),
            error: e.to_string(),
        },
    }
}

/// Runs `op` for every device on the blocking pool, one task per device.
async fn run_all<F>(devices: Vec<DeviceId>, op: F) -> Result<Vec<Report>>
where
    F: Fn(DeviceId) -> Report + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let handles: Vec<_> = devices
        .into_iter()
        .map(|device| {
            let op = Arc::clone(&op);
            tokio::task::spawn_blocking(move || op(device))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("device task panicked")?);
    }
    Ok(reports)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Arc::new(load_config(cli.config.as_deref())?);

    let reports = match cli.command {
        Commands::Store { devices, out_dir } => {
            let devices = target::parse_devices(&devices)?;
            std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
            let config = Arc::clone(&config);
            run_all(devices, move |id| store(&config, id, &out_dir)).await?
        }
        Commands::Check { devices, params_dir } => {
            let devices = target::parse_devices(&devices)?;
            let config = Arc::clone(&config);
            run_all(devices, move |id| check(&config, id, &params_dir)).await?
        }
        Commands::Probe { devices } => {
            let devices = target::parse_devices(&devices)?;
            let config = Arc::clone(&config);
            run_all(devices, move |id| probe(&config, id)).await?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            report.print_text();
        }
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{} of {} device(s) failed", failed, reports.len());
    }
    Ok(())
}
