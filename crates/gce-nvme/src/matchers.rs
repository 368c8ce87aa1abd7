// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Field extraction from device paths and controller model strings
//!
//! NVMe namespaces are named `nvmeXnY` where X is the controller and Y the namespace,
//! with partitions appending `pZ`. Local SSD controllers report a model of
//! `nvme_card` optionally followed by the controller number.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"nvme\d+n(\d+)").unwrap());
static PARTITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"nvme\d+n\d+p(\d+)$").unwrap());
static CONTROLLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"nvme_card(\d+)").unwrap());

/// Returns the namespace number of an `nvmeXnY[...]` path, if it has one.
pub fn namespace_number(path: &str) -> Option<u64> {
    parse_digits("namespace", NAMESPACE.captures(path)?.get(1)?.as_str())
}

/// Returns the partition number of an `nvmeXnYpZ` path.
///
/// A path naming a whole namespace yields `None`, which is the common case.
pub fn partition_number(path: &str) -> Option<u64> {
    parse_digits("partition", PARTITION.captures(path)?.get(1)?.as_str())
}

/// Returns the controller number encoded in a `nvme_cardN` model.
///
/// The first `nvme_card` carrying digits wins. A bare `nvme_card` (or a model
/// without the marker at all) is controller 0.
pub fn controller_number(model: &str) -> u64 {
    CONTROLLER
        .captures(model)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_digits("controller", m.as_str()))
        .unwrap_or(0)
}

/// Parses a matched digit run, reporting values too large to represent.
fn parse_digits(field: &str, digits: &str) -> Option<u64> {
    match digits.parse() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("ignoring {field} number {digits}: {e}");
            None
        }
    }
}
