// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads a sync database archive (`<repo>.db`), used to answer whether a
//! package exists in another repository and at which version.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

use super::desc::{parse_sections, single_value};
use super::{DbError, DbResult};
use crate::package::extract_archive;

/// Name→version index of one sync repository.
///
/// A sync database is a (possibly compressed) tar archive of
/// `<name>-<version>/desc` entries; only the name and version are read.
pub struct SyncDatabase {
    versions: HashMap<String, String>,
}

impl SyncDatabase {
    /// Load a sync database archive.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be extracted or walked.
    pub fn load(path: &Path) -> DbResult<Self> {
        let dest = TempDir::new().map_err(|e| DbError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        extract_archive(path, dest.path()).map_err(|e| DbError::ExtractFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut versions = HashMap::new();
        for entry in WalkDir::new(dest.path()).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| DbError::ReadDirFailed {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
            if entry.file_name() != "desc" {
                continue;
            }
            let content = match fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Skipping sync entry {}: {e}", entry.path().display());
                    continue;
                }
            };
            let sections = parse_sections(&content);
            if let (Some(name), Some(version)) = (
                single_value(&sections, "NAME"),
                single_value(&sections, "VERSION"),
            ) {
                versions.insert(name.to_string(), version.to_string());
            }
        }
        Ok(Self { versions })
    }

    /// The version of `name` in this repository, if present.
    #[must_use]
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    /// Number of packages in the repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn new_for_testing(entries: &[(&str, &str)]) -> Self {
        Self {
            versions: entries
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
        }
    }
}
