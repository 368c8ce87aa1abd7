// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Per-class identity resolution

use std::path::Path;

use log::debug;

use crate::{matchers, metadata, AdminCommand, DiskIdentity, DiskKind, Error};

/// Resolves a persistent disk, whose short serial is the device name assigned by the hypervisor.
pub fn resolve_persistent_disk<A: AdminCommand + ?Sized>(admin: &A, device: &Path) -> Result<DiskIdentity, Error> {
    let name = metadata::read_device_name(admin, device)?;
    debug!("{} is persistent disk {name}", device.display());
    Ok(DiskIdentity::new(DiskKind::PersistentDisk, name))
}

/// Resolves a local SSD namespace to `local-nvme-ssd-<index>`.
///
/// Namespaces are 1-based, so `index = controller + namespace - 1` maps every
/// controller's namespaces onto one flat, zero-based index space. Deployed
/// symlink names depend on this exact arithmetic.
pub fn resolve_local_ssd(controller: &str, device: &Path) -> Result<DiskIdentity, Error> {
    let path = device.to_string_lossy();
    let controller = matchers::controller_number(controller);
    let index = matchers::namespace_number(&path)
        .and_then(|namespace| controller.checked_add(namespace)?.checked_sub(1))
        .ok_or_else(|| Error::NamespaceNotFound(path.to_string()))?;

    debug!("{path} is local ssd {index} (controller {controller})");
    Ok(DiskIdentity::new(DiskKind::LocalSsd, format!("local-nvme-ssd-{index}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAdmin;
    use test_log::test;

    #[test]
    fn test_local_ssd_index() {
        let identity = resolve_local_ssd("nvme_card2", Path::new("/dev/nvme2n3")).unwrap();
        assert_eq!(identity.short_serial(), "local-nvme-ssd-4");

        let identity = resolve_local_ssd("nvme_card", Path::new("/dev/nvme0n1")).unwrap();
        assert_eq!(identity.short_serial(), "local-nvme-ssd-0");
        assert_eq!(identity.full_serial(), "Google_EphemeralDisk_local-nvme-ssd-0");
    }

    #[test]
    fn test_local_ssd_partition_shares_namespace_serial() {
        let identity = resolve_local_ssd("nvme_card1", Path::new("/dev/nvme1n1p2")).unwrap();
        assert_eq!(identity.short_serial(), "local-nvme-ssd-1");
    }

    #[test]
    fn test_local_ssd_without_namespace() {
        let err = resolve_local_ssd("nvme_card", Path::new("/dev/nvme0")).unwrap_err();
        assert!(matches!(err, Error::NamespaceNotFound(_)));

        // Namespace 0 on controller 0 has no valid index
        let err = resolve_local_ssd("nvme_card", Path::new("/dev/nvme0n0")).unwrap_err();
        assert!(matches!(err, Error::NamespaceNotFound(_)));
    }

    #[test]
    fn test_persistent_disk() {
        let admin = MockAdmin::persistent_disk("pd-disk-123");
        let identity = resolve_persistent_disk(&admin, Path::new("/dev/nvme0n2")).unwrap();
        assert_eq!(identity.kind(), DiskKind::PersistentDisk);
        assert_eq!(identity.short_serial(), "pd-disk-123");
        assert_eq!(identity.full_serial(), "Google_PersistentDisk_pd-disk-123");
    }

    #[test]
    fn test_persistent_disk_propagates_reader_errors() {
        let admin = MockAdmin::with_controller("nvme_card-pd").with_namespace(vec![0u8; 4096]);
        let err = resolve_persistent_disk(&admin, Path::new("/dev/nvme0n1")).unwrap_err();
        assert!(matches!(err, Error::MetadataEmpty(_)));
    }
}
