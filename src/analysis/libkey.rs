// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! The canonical identifier of a shared-library requirement or provision.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::package::ElfClass;

/// Canonical identifier of one shared library: soname, version, word size.
///
/// A proper composite key with value equality and hashing; the rendered form
/// `soname=version-bits` (e.g. `libgpm.so=1.19.0-64`) is the notation used in
/// declared package metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryKey {
    soname: String,
    version: String,
    class: ElfClass,
}

impl LibraryKey {
    /// Derive a key from a raw linkage name (`DT_NEEDED`/`DT_SONAME` value).
    ///
    /// The soname is everything up to and including the first `.so`; the
    /// version is everything after the last `.so.`, or empty when the name
    /// carries no version at all.
    #[must_use]
    pub fn from_link_name(name: &str, class: ElfClass) -> Self {
        let soname = match name.find(".so") {
            Some(idx) => format!("{}.so", &name[..idx]),
            None => name.to_string(),
        };
        let version = match name.rfind(".so.") {
            Some(idx) => name[idx + 4..].to_string(),
            None => String::new(),
        };
        Self {
            soname,
            version,
            class,
        }
    }

    /// Parse the rendered `soname=version-bits` notation used by declared
    /// `depends`/`provides` entries. Returns `None` for entries that do not
    /// follow the notation (including versionless bare sonames).
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let (soname, rest) = entry.split_once('=')?;
        let (version, bits) = rest.rsplit_once('-')?;
        let class = ElfClass::from_bits(bits)?;
        Some(Self {
            soname: soname.to_string(),
            version: version.to_string(),
            class,
        })
    }

    /// The canonical shared-library name (e.g. `libgpm.so`).
    #[must_use]
    pub fn soname(&self) -> &str {
        &self.soname
    }

    /// The version part of the linkage name, empty when unversioned.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The word-size class of the requirement or provision.
    #[must_use]
    pub fn class(&self) -> ElfClass {
        self.class
    }
}

impl fmt::Display for LibraryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}-{}", self.soname, self.version, self.class.bits())
    }
}

impl Serialize for LibraryKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
