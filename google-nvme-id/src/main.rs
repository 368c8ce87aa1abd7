// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Names Google Compute Engine NVMe devices for udev.
//!
//! Invoked from a udev rule with the device node, either printing the
//! `ID_SERIAL_SHORT`/`ID_SERIAL` properties or creating the matching
//! `/dev/disk/by-id/google-*` symlink.

use std::{
    io,
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{error::ErrorKind, Parser};
use gce_nvme::{output, resolve, AdminCommand, NvmeCli};
use log::{debug, info};

/// Print or link the stable identifier of a Google Compute Engine NVMe device
#[derive(Debug, Parser)]
#[command(name = "google_nvme_id")]
struct Cli {
    /// Path to an NVMe controller, namespace or partition device node
    #[arg(short = 'd', value_name = "DEVICE_PATH")]
    device: PathBuf,

    /// Create a symlink under the by-id directory instead of printing udev properties
    #[arg(short = 's')]
    symlink: bool,

    /// The nvme-cli binary to query the device with
    #[arg(long, env = "GOOGLE_NVME_ID_NVME", default_value = "nvme")]
    nvme: PathBuf,

    /// Directory the symlink is created in
    #[arg(long, hide = true, default_value = output::BY_ID_DIR)]
    by_id_dir: PathBuf,

    /// Abort a device query that takes longer than this many seconds
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    timeout: Option<Duration>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };

    // udev captures stderr, so stay quiet unless RUST_LOG asks otherwise
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Error)
        .parse_default_env()
        .init();

    let result = NvmeCli::locate(&cli.nvme)
        .map(|nvme| nvme.with_timeout(cli.timeout))
        .and_then(|nvme| run(&cli, &nvme, io::stdout().lock()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", diagnostic(&e));
            ExitCode::FAILURE
        }
    }
}

/// Resolves the device and publishes the result in the requested mode.
fn run<A: AdminCommand, W: io::Write>(cli: &Cli, admin: &A, out: W) -> Result<(), gce_nvme::Error> {
    let identity = resolve(admin, &cli.device)?;
    debug!("resolved {} to {identity:?}", cli.device.display());

    if cli.symlink {
        if let Some(link) = output::link_best_effort(&cli.by_id_dir, &identity, &cli.device) {
            info!("created {}", link.display());
        }
    } else {
        output::write_properties(&identity, out)?;
    }

    Ok(())
}

/// Help exits cleanly, every other argument problem is a usage error.
fn usage_exit_code(e: &clap::Error) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn parse_timeout(secs: &str) -> Result<Duration, String> {
    let secs: f64 = secs.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

/// Formats a fatal error as a single dated line.
fn diagnostic(e: &gce_nvme::Error) -> String {
    format!("[{}]: {e}", chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z"))
}
