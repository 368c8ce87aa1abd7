// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Persistent disk metadata embedded in the identify-namespace data
//!
//! The hypervisor stores a small JSON document in the vendor extension region of
//! the identify-namespace response. Only the `device_name` key is consumed, and
//! its value is restricted to `[A-Za-z0-9._-]`.

use std::{path::Path, sync::LazyLock};

use log::debug;
use regex::Regex;

use crate::{AdminCommand, Error};

/// Offset of the vendor extension region within the identify-namespace data
pub const VENDOR_EXTENSION_OFFSET: usize = 384;

static DEVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""device_name"\s*:\s*"([A-Za-z0-9._-]*)""#).unwrap());

/// Reads the hypervisor-assigned device name of a persistent disk namespace.
///
/// # Errors
///
/// * [`Error::MetadataUnavailable`] if the identify-namespace query fails
/// * [`Error::MetadataEmpty`] if the vendor extension region holds no data
/// * [`Error::DeviceNameEmpty`] if `device_name` is absent or empty
pub fn read_device_name<A: AdminCommand + ?Sized>(admin: &A, device: &Path) -> Result<String, Error> {
    let raw = admin.id_ns_raw(device).map_err(|e| Error::MetadataUnavailable {
        device: device.display().to_string(),
        source: Box::new(e),
    })?;

    let region = vendor_extension(&raw).ok_or_else(|| Error::MetadataEmpty(device.display().to_string()))?;
    debug!("vendor extension of {}: {region}", device.display());

    parse_device_name(&region).ok_or_else(|| Error::DeviceNameEmpty(device.display().to_string()))
}

/// Returns the vendor extension region as text, or `None` when it carries no data.
///
/// The region is zero padded, so trailing NUL bytes are not part of the payload.
fn vendor_extension(raw: &[u8]) -> Option<String> {
    let region = raw.get(VENDOR_EXTENSION_OFFSET..)?;
    let end = region.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = String::from_utf8_lossy(&region[..end]).trim().to_owned();
    (!text.is_empty()).then_some(text)
}

/// Extracts a non-empty `device_name` value from the vendor extension text.
fn parse_device_name(region: &str) -> Option<String> {
    DEVICE_NAME
        .captures(region)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}
