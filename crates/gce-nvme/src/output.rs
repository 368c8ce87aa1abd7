// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Publishing a resolved identity
//!
//! An identity is either printed as udev properties for `IMPORT{program}` or
//! published as a symlink under `/dev/disk/by-id`.

use std::{
    io::{self, Write},
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{matchers, DiskIdentity};

/// Directory holding the stable device symlinks
pub const BY_ID_DIR: &str = "/dev/disk/by-id";

/// Writes `ID_SERIAL_SHORT` and `ID_SERIAL`, in that order, one per line.
pub fn write_properties<W: Write>(identity: &DiskIdentity, mut out: W) -> io::Result<()> {
    writeln!(out, "ID_SERIAL_SHORT={}", identity.short_serial())?;
    writeln!(out, "ID_SERIAL={}", identity.full_serial())?;
    out.flush()
}

/// Returns the symlink path for `device`: `google-<short>` or `google-<short>-part<N>`.
pub fn symlink_path(by_id_dir: &Path, identity: &DiskIdentity, device: &Path) -> PathBuf {
    let name = match matchers::partition_number(&device.to_string_lossy()) {
        Some(partition) => format!("google-{}-part{partition}", identity.short_serial()),
        None => format!("google-{}", identity.short_serial()),
    };
    by_id_dir.join(name)
}

/// Creates the symlink for `device` inside `by_id_dir`.
pub fn create_symlink(by_id_dir: &Path, identity: &DiskIdentity, device: &Path) -> io::Result<PathBuf> {
    let link = symlink_path(by_id_dir, identity, device);
    symlink(device, &link)?;
    debug!("linked {} -> {}", link.display(), device.display());
    Ok(link)
}

/// Creates the symlink for `device`, logging rather than returning any failure.
///
/// An existing link or a permission problem must not fail the udev rule.
pub fn link_best_effort(by_id_dir: &Path, identity: &DiskIdentity, device: &Path) -> Option<PathBuf> {
    match create_symlink(by_id_dir, identity, device) {
        Ok(link) => Some(link),
        Err(e) => {
            warn!(
                "failed to create {}: {e}",
                symlink_path(by_id_dir, identity, device).display()
            );
            None
        }
    }
}
