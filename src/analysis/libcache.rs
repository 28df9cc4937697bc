// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! System-wide library name→path cache built from the dynamic linker's
//! registry (`ldconfig -p`), partitioned by word-size class.

use path_clean::PathClean;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::package::ElfClass;

/// Marker with which `ldconfig -p` prefixes the architecture field of 64-bit
/// entries on x86 systems.
const LIBC6_64_MARKER: &str = "libc6,x86-64";

/// Per-class mapping from bare library file name (e.g. `libc.so.6`) to its
/// absolute real path.
///
/// Scoped to one analysis run and immutable after construction. An empty
/// cache is valid: every lookup misses and resolution degrades to the
/// raw-name fallback.
#[derive(Debug, Default)]
pub struct LibraryCache {
    lib32: HashMap<String, PathBuf>,
    lib64: HashMap<String, PathBuf>,
}

impl LibraryCache {
    /// An empty cache; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the cache by querying the dynamic linker registry.
    ///
    /// A missing `ldconfig`, a failing invocation, or unparseable output all
    /// yield an empty (or partial) cache rather than an error; dependency
    /// resolution then falls back to raw linkage names, which surface as
    /// orphans.
    #[must_use]
    pub fn from_system() -> Self {
        let output = Command::new("ldconfig")
            .arg("-p")
            .env("LANG", "C")
            .output();
        match output {
            Ok(output) if output.status.success() => {
                Self::parse(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                eprintln!(
                    "ldconfig -p exited with status {}; continuing with an empty library cache",
                    output.status
                );
                Self::empty()
            }
            Err(e) => {
                eprintln!("Failed to run ldconfig -p ({e}); continuing with an empty library cache");
                Self::empty()
            }
        }
    }

    /// Parse dynamic-linker registry listing text (`ldconfig -p` output).
    ///
    /// Entry lines have the form `name (archinfo) => path`. An archinfo
    /// beginning with the 64-bit libc marker files the entry under the 64-bit
    /// class; everything else lands in the 32-bit class. Only those two
    /// classes are distinguished; the archinfo strings of non-x86 systems are
    /// not specially handled, a known limitation inherited from the registry
    /// format.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut cache = Self::empty();
        for line in output.lines() {
            let Some((name, archinfo, path)) = Self::parse_line(line) else {
                continue;
            };
            let path = PathBuf::from(path).clean();
            if archinfo.starts_with(LIBC6_64_MARKER) {
                cache.lib64.insert(name.to_string(), path);
            } else {
                cache.lib32.insert(name.to_string(), path);
            }
        }
        cache
    }

    fn parse_line(line: &str) -> Option<(&str, &str, &str)> {
        let (lhs, path) = line.split_once(" => ")?;
        let lhs = lhs.trim_start();
        let open = lhs.rfind(" (")?;
        let name = &lhs[..open];
        let archinfo = lhs[open + 2..].strip_suffix(')')?;
        Some((name, archinfo, path.trim()))
    }

    /// Look up the real path of a library name within one word-size class.
    ///
    /// Resolution never crosses classes: a 32-bit requirement only consults
    /// the 32-bit entries.
    #[must_use]
    pub(crate) fn lookup(&self, class: ElfClass, name: &str) -> Option<&Path> {
        match class {
            ElfClass::Elf32 => self.lib32.get(name).map(PathBuf::as_path),
            ElfClass::Elf64 => self.lib64.get(name).map(PathBuf::as_path),
        }
    }

    /// Total number of cached entries across both classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lib32.len() + self.lib64.len()
    }

    /// Whether the cache holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lib32.is_empty() && self.lib64.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
271 libs found in cache `/etc/ld.so.cache'
\tlibz.so.1 (libc6,x86-64) => /usr/lib/libz.so.1
\tlibz.so.1 (libc6) => /usr/lib32/libz.so.1
\tlibssl.so.3 (libc6,x86-64) => /usr/lib/libssl.so.3
\tlibssl.so.3 (libc6) => /usr/lib32/libssl.so.3
\tlibc.so.6 (libc6,x86-64, OS ABI: Linux 4.4.0) => /usr/lib/libc.so.6
";

    #[test]
    fn test_parse_partitions_by_class() {
        let cache = LibraryCache::parse(SAMPLE);
        assert_eq!(cache.len(), 5);
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libz.so.1"),
            Some(Path::new("/usr/lib/libz.so.1"))
        );
        assert_eq!(
            cache.lookup(ElfClass::Elf32, "libz.so.1"),
            Some(Path::new("/usr/lib32/libz.so.1"))
        );
    }

    #[test]
    fn test_lookup_never_crosses_classes() {
        let cache = LibraryCache::parse(
            "\tlibssl.so.3 (libc6,x86-64) => /usr/lib/libssl.so.3\n\
             \tlibonly32.so.1 (libc6) => /usr/lib32/libonly32.so.1\n",
        );
        // A 64-bit requirement never resolves via a 32-bit entry of the same
        // name, and vice versa.
        assert_eq!(cache.lookup(ElfClass::Elf32, "libssl.so.3"), None);
        assert_eq!(cache.lookup(ElfClass::Elf64, "libonly32.so.1"), None);
    }

    #[test]
    fn test_parse_with_hwcap_suffix() {
        let cache = LibraryCache::parse(
            "\tlibm.so.6 (libc6,x86-64, hwcap: 0x0000000000000001) => /usr/lib/libm.so.6\n",
        );
        assert_eq!(
            cache.lookup(ElfClass::Elf64, "libm.so.6"),
            Some(Path::new("/usr/lib/libm.so.6"))
        );
    }

    #[test]
    fn test_parse_skips_header_and_garbage() {
        let cache = LibraryCache::parse("271 libs found in cache\nnot a cache line\n\n");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_cache_lookup() {
        let cache = LibraryCache::empty();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(ElfClass::Elf64, "libc.so.6"), None);
    }
}
