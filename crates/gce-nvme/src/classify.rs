// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Controller classification

use std::sync::LazyLock;

use regex::Regex;

/// Model marker reported by persistent disk controllers
const PERSISTENT_DISK_MARKER: &str = "nvme_card-pd";

static LOCAL_SSD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"nvme_card\d*").unwrap());

/// The class of controller, as determined by its identity text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    PersistentDisk,
    LocalSsd,
    Unknown,
}

/// Classifies a controller from the output of an `id-ctrl` query.
pub fn classify(controller: &str) -> Class {
    // The persistent disk marker shares the local SSD prefix, so it must win.
    if controller.contains(PERSISTENT_DISK_MARKER) {
        Class::PersistentDisk
    } else if LOCAL_SSD.is_match(controller) {
        Class::LocalSsd
    } else {
        Class::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_classify() {
        assert_eq!(classify("mn        : nvme_card-pd"), Class::PersistentDisk);
        assert_eq!(classify("mn        : nvme_card"), Class::LocalSsd);
        assert_eq!(classify("mn        : nvme_card3"), Class::LocalSsd);
        assert_eq!(classify("mn        : Samsung SSD 980 PRO"), Class::Unknown);
        assert_eq!(classify(""), Class::Unknown);
    }

    #[test]
    fn test_classify_prefers_persistent_disk() {
        let text = "sn        : nvme_card\nmn        : nvme_card-pd\n";
        assert_eq!(classify(text), Class::PersistentDisk);
    }
}
