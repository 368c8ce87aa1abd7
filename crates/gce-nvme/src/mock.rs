// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Mock admin interface for testing.
//!
//! This module provides an [`AdminCommand`] implementation that returns canned
//! controller and namespace data, so identification can be tested without
//! actual hardware devices.

use std::{cell::Cell, path::Path};

use crate::{metadata::VENDOR_EXTENSION_OFFSET, AdminCommand, Error};

/// Size of an identify-namespace response
const IDENTIFY_SIZE: usize = 4096;

/// Canned responses for a single device.
#[derive(Debug, Default)]
pub struct MockAdmin {
    controller: Option<String>,
    namespace: Option<Vec<u8>>,
    id_ns_calls: Cell<usize>,
}

impl MockAdmin {
    /// A device whose controller queries fail
    pub fn failing() -> Self {
        Self::default()
    }

    /// A device reporting `controller` as its identity, with no namespace data
    pub fn with_controller(controller: impl Into<String>) -> Self {
        Self {
            controller: Some(controller.into()),
            ..Default::default()
        }
    }

    /// A persistent disk whose vendor extension names it `device_name`
    pub fn persistent_disk(device_name: &str) -> Self {
        Self::with_controller("mn        : nvme_card-pd\n")
            .with_namespace(namespace_data(&format!(r#"{{"device_name":"{device_name}"}}"#)))
    }

    /// A local SSD controller reporting `model`
    pub fn local_ssd(model: &str) -> Self {
        Self::with_controller(format!("mn        : {model}\n"))
    }

    /// Sets the raw identify-namespace response
    pub fn with_namespace(self, raw: Vec<u8>) -> Self {
        Self {
            namespace: Some(raw),
            ..self
        }
    }

    /// Number of identify-namespace queries issued so far
    pub fn id_ns_calls(&self) -> usize {
        self.id_ns_calls.get()
    }
}

impl AdminCommand for MockAdmin {
    fn id_ctrl(&self, device: &Path) -> Result<String, Error> {
        self.controller.clone().ok_or_else(|| Error::AdminFailed {
            command: format!("nvme id-ctrl -v {}", device.display()),
            reason: "Inappropriate ioctl for device".to_owned(),
        })
    }

    fn id_ns_raw(&self, device: &Path) -> Result<Vec<u8>, Error> {
        self.id_ns_calls.set(self.id_ns_calls.get() + 1);
        self.namespace.clone().ok_or_else(|| Error::AdminFailed {
            command: format!("nvme id-ns -b {}", device.display()),
            reason: "Invalid argument".to_owned(),
        })
    }
}

/// Builds a zero padded identify-namespace response with `vendor` in the extension region.
pub fn namespace_data(vendor: &str) -> Vec<u8> {
    let mut raw = vec![0u8; IDENTIFY_SIZE];
    let end = (VENDOR_EXTENSION_OFFSET + vendor.len()).min(IDENTIFY_SIZE);
    raw[VENDOR_EXTENSION_OFFSET..end].copy_from_slice(&vendor.as_bytes()[..end - VENDOR_EXTENSION_OFFSET]);
    raw
}
