// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Identification of NVMe block devices exposed by the Google Compute Engine hypervisor.
//!
//! Two classes of device are recognised: network-attached persistent disks, whose
//! name is embedded by the hypervisor in the vendor region of the identify-namespace
//! data, and local ephemeral SSDs, whose name is derived from the controller and
//! namespace numbers.

use std::{fmt, io, path::Path};

use log::debug;
use thiserror::Error;

pub mod admin;
pub mod classify;
pub mod matchers;
pub mod metadata;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod output;
pub mod resolver;

pub use admin::{AdminCommand, NvmeCli};
pub use classify::{classify, Class};

/// Errors that can occur while identifying a device
#[derive(Debug, Error)]
pub enum Error {
    /// The nvme admin binary could not be located or is not executable
    #[error("nvme cli is not installed or is not executable ({0}); try running as root or install nvme-cli")]
    ToolUnavailable(#[source] which::Error),

    /// The controller identity query failed, so this is not an NVMe device
    #[error("{device} does not appear to be an NVMe device: {source}")]
    NotAnNvmeDevice {
        device: String,
        #[source]
        source: Box<Error>,
    },

    /// The controller model matched neither a persistent disk nor a local SSD
    #[error("{0}: device is not a recognized NVMe device")]
    UnrecognizedController(String),

    /// The identify-namespace query failed
    #[error("failed to read namespace metadata for {device}: {source}")]
    MetadataUnavailable {
        device: String,
        #[source]
        source: Box<Error>,
    },

    /// The vendor extension region of the namespace data was empty
    #[error("vendor extension region of {0} is empty")]
    MetadataEmpty(String),

    /// No usable `device_name` was present in the vendor extension region
    #[error("no device_name found in the namespace metadata of {0}")]
    DeviceNameEmpty(String),

    /// A local SSD path carried no usable namespace number
    #[error("failed to determine the namespace number of {0}")]
    NamespaceNotFound(String),

    /// The admin command ran but reported failure
    #[error("`{command}` failed: {reason}")]
    AdminFailed { command: String, reason: String },

    /// An I/O error occurred
    #[error("io: {0}")]
    IO(#[from] io::Error),
}

/// The class of a resolved device, which determines the full serial prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskKind {
    /// Network-attached persistent disk
    PersistentDisk,
    /// Local ephemeral SSD
    LocalSsd,
}

impl DiskKind {
    /// Prefix prepended to the short serial to form `ID_SERIAL`
    pub fn serial_prefix(&self) -> &'static str {
        match self {
            DiskKind::PersistentDisk => "Google_PersistentDisk_",
            DiskKind::LocalSsd => "Google_EphemeralDisk_",
        }
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskKind::PersistentDisk => f.write_str("persistent disk"),
            DiskKind::LocalSsd => f.write_str("local ssd"),
        }
    }
}

/// The resolved identity of a single device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskIdentity {
    kind: DiskKind,
    short_serial: String,
}

impl DiskIdentity {
    pub fn new(kind: DiskKind, short_serial: impl Into<String>) -> Self {
        Self {
            kind,
            short_serial: short_serial.into(),
        }
    }

    /// Returns the class of device that produced this identity.
    pub fn kind(&self) -> DiskKind {
        self.kind
    }

    /// Returns the short serial, used for `ID_SERIAL_SHORT` and the symlink name.
    pub fn short_serial(&self) -> &str {
        &self.short_serial
    }

    /// Returns the class-prefixed serial, used for `ID_SERIAL`.
    pub fn full_serial(&self) -> String {
        format!("{}{}", self.kind.serial_prefix(), self.short_serial)
    }
}

/// Resolves the identity of `device` by querying its controller, classifying it
/// and running the matching resolver.
///
/// # Errors
///
/// * [`Error::NotAnNvmeDevice`] if the controller cannot be queried
/// * [`Error::UnrecognizedController`] if the controller is neither class
/// * Any error of the class-specific resolver
pub fn resolve<A: AdminCommand + ?Sized>(admin: &A, device: &Path) -> Result<DiskIdentity, Error> {
    let controller = admin.id_ctrl(device).map_err(|e| Error::NotAnNvmeDevice {
        device: device.display().to_string(),
        source: Box::new(e),
    })?;

    let class = classify(&controller);
    debug!("{} classified as {class:?}", device.display());

    match class {
        Class::PersistentDisk => resolver::resolve_persistent_disk(admin, device),
        Class::LocalSsd => resolver::resolve_local_ssd(&controller, device),
        Class::Unknown => Err(Error::UnrecognizedController(device.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAdmin;
    use test_log::test;

    #[test]
    fn test_resolve_persistent_disk() {
        let admin = MockAdmin::persistent_disk("pd-disk-123");
        let identity = resolve(&admin, Path::new("/dev/nvme0n1")).unwrap();
        assert_eq!(identity.kind(), DiskKind::PersistentDisk);
        assert_eq!(identity.short_serial(), "pd-disk-123");
        assert_eq!(identity.full_serial(), "Google_PersistentDisk_pd-disk-123");
    }

    #[test]
    fn test_resolve_local_ssd() {
        let admin = MockAdmin::local_ssd("nvme_card2");
        let identity = resolve(&admin, Path::new("/dev/nvme2n3")).unwrap();
        assert_eq!(identity.kind(), DiskKind::LocalSsd);
        assert_eq!(identity.short_serial(), "local-nvme-ssd-4");
        assert_eq!(identity.full_serial(), "Google_EphemeralDisk_local-nvme-ssd-4");
        // Local SSDs never need the namespace data
        assert_eq!(admin.id_ns_calls(), 0);
    }

    #[test]
    fn test_resolve_unknown_never_reaches_resolvers() {
        let admin = MockAdmin::with_controller("mn        : Samsung SSD 980 PRO");
        let err = resolve(&admin, Path::new("/dev/nvme0n1")).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedController(_)));
        assert_eq!(admin.id_ns_calls(), 0);
    }

    #[test]
    fn test_resolve_not_nvme() {
        let admin = MockAdmin::failing();
        let err = resolve(&admin, Path::new("/dev/sda")).unwrap_err();
        assert!(matches!(err, Error::NotAnNvmeDevice { .. }));
        assert!(err.to_string().contains("/dev/sda does not appear to be an NVMe device"));
    }
}
