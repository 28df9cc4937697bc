// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Parses the `.PKGINFO` metadata file shipped inside every binary package.

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when parsing `.PKGINFO`.
#[derive(Debug, Error)]
pub enum PkgInfoError {
    #[error("Failed to read .PKGINFO")]
    ReadFailed {
        #[source]
        source: std::io::Error,
    },
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Declared package metadata.
///
/// `.PKGINFO` is a sequence of `key = value` lines; `#` lines are comments.
/// The dependency-carrying keys (`depend`, `optdepend`, `provides`) may
/// repeat, one value per line.
#[derive(Debug, Clone, Default)]
pub struct PkgInfo {
    name: String,
    version: String,
    depends: Vec<String>,
    optdepends: Vec<String>,
    provides: Vec<String>,
}

impl PkgInfo {
    /// Read and parse a `.PKGINFO` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or lacks required fields.
    pub(crate) fn from_path(path: &Path) -> Result<Self, PkgInfoError> {
        let content =
            fs::read_to_string(path).map_err(|e| PkgInfoError::ReadFailed { source: e })?;
        Self::parse(&content)
    }

    /// Parse `.PKGINFO` content.
    ///
    /// # Errors
    /// Returns an error if `pkgname` or `pkgver` is missing.
    pub(crate) fn parse(content: &str) -> Result<Self, PkgInfoError> {
        let mut info = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "pkgname" => info.name = value.to_string(),
                "pkgver" => info.version = value.to_string(),
                "depend" => info.depends.push(value.to_string()),
                "optdepend" => info.optdepends.push(value.to_string()),
                "provides" => info.provides.push(value.to_string()),
                _ => {}
            }
        }
        if info.name.is_empty() {
            return Err(PkgInfoError::MissingField { field: "pkgname" });
        }
        if info.version.is_empty() {
            return Err(PkgInfoError::MissingField { field: "pkgver" });
        }
        Ok(info)
    }

    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full package version (`pkgver-pkgrel`, possibly with an epoch).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Declared runtime dependencies.
    #[must_use]
    pub fn depends(&self) -> &[String] {
        &self.depends
    }

    /// Declared optional dependencies, with their `: description` suffix intact.
    #[must_use]
    pub fn optdepends(&self) -> &[String] {
        &self.optdepends
    }

    /// Optional dependency names with the `: description` suffix stripped.
    #[must_use]
    pub fn optdepend_names(&self) -> impl Iterator<Item = &str> {
        self.optdepends
            .iter()
            .map(|entry| entry.split_once(':').map_or(entry.as_str(), |(n, _)| n).trim())
    }

    /// Declared provisions.
    #[must_use]
    pub fn provides(&self) -> &[String] {
        &self.provides
    }

    #[cfg(test)]
    pub(crate) fn new_for_testing(
        name: &str,
        version: &str,
        depends: &[&str],
        optdepends: &[&str],
        provides: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            depends: depends.iter().map(|s| s.to_string()).collect(),
            optdepends: optdepends.iter().map(|s| s.to_string()).collect(),
            provides: provides.iter().map(|s| s.to_string()).collect(),
        }
    }
}
