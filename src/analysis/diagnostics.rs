// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! The diagnostic records produced by reconciliation: each variant is a
//! message template with typed substitution values and a fixed severity.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Severity of one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// One-letter tag used in console output.
    #[must_use]
    pub(crate) fn tag(self) -> char {
        match self {
            Self::Info => 'I',
            Self::Warning => 'W',
            Self::Error => 'E',
        }
    }
}

/// One finding about the analyzed package.
///
/// The `Display` implementation renders the human-readable message; the
/// variant itself is the stable message identifier (see [`Diagnostic::code`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("ELF file {file} cannot be analyzed: {reason}")]
    UnrecognizedElfClass { file: String, reason: String },

    #[error("Referenced library {library} has no package associated (needed in files {files:?})")]
    LibraryNoPackageAssociated { library: String, files: Vec<String> },

    #[error("Dependency {library} supplied by {package}, which does not declare the provision (needed in files {files:?})")]
    LibDependsMissingProvides {
        library: String,
        package: String,
        files: Vec<String>,
    },

    #[error("Link-level dependence on {package} in {libraries:?}")]
    LinkLevelDependence {
        package: String,
        libraries: Vec<String>,
    },

    #[error("Dependency {library} detected and satisfied by {package} (needed in files {files:?})")]
    LibDependsSatisfied {
        library: String,
        package: String,
        files: Vec<String>,
    },

    #[error("Dependency {library} detected but optional, satisfied by {package} (needed in files {files:?})")]
    LibDependsOptional {
        library: String,
        package: String,
        files: Vec<String>,
    },

    #[error("Dependency {library} detected but not declared, satisfied by {package} (needed in files {files:?})")]
    LibDependsNotIncluded {
        library: String,
        package: String,
        files: Vec<String>,
    },

    #[error("Declared dependency {entry} was not needed by any binary")]
    LibDependsNotNeeded { entry: String },

    #[error("Declared dependency {entry} lacks a version")]
    LibDependsWithoutVersion { entry: String },

    #[error("Inferred link-level dependencies: depends=({depends})")]
    LibDependsSummary { depends: String },

    #[error("Provision {library} declared and backed by files {files:?}")]
    LibProvidesSatisfied { library: String, files: Vec<String> },

    #[error("Provision {library} found in files {files:?} but not declared")]
    LibProvidesUnsatisfied { library: String, files: Vec<String> },

    #[error("Declared provision {entry} is backed by no library in the package")]
    LibProvidesMissing { entry: String },

    #[error("Declared provision {entry} lacks a version")]
    LibProvidesWithoutVersion { entry: String },

    #[error("Inferred provisions: provides=({provides})")]
    LibProvidesSummary { provides: String },

    #[error("Dependency {package} resolves to a package pending promotion from the testing repository")]
    DependencyIsTestingRelease { package: String },
}

impl Diagnostic {
    /// The fixed severity of this diagnostic kind.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnrecognizedElfClass { .. }
            | Self::LibDependsWithoutVersion { .. }
            | Self::LibProvidesWithoutVersion { .. } => Severity::Error,
            Self::LibraryNoPackageAssociated { .. }
            | Self::LibDependsNotNeeded { .. }
            | Self::LibProvidesMissing { .. }
            | Self::DependencyIsTestingRelease { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Stable identifier of the message template.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnrecognizedElfClass { .. } => "unrecognized-elf-class",
            Self::LibraryNoPackageAssociated { .. } => "library-no-package-associated",
            Self::LibDependsMissingProvides { .. } => "libdepends-missing-provides",
            Self::LinkLevelDependence { .. } => "link-level-dependence",
            Self::LibDependsSatisfied { .. } => "libdepends-detected-satisfied",
            Self::LibDependsOptional { .. } => "libdepends-detected-but-optional",
            Self::LibDependsNotIncluded { .. } => "libdepends-detected-not-included",
            Self::LibDependsNotNeeded { .. } => "libdepends-not-needed",
            Self::LibDependsWithoutVersion { .. } => "libdepends-without-version",
            Self::LibDependsSummary { .. } => "libdepends-as-detected",
            Self::LibProvidesSatisfied { .. } => "libprovides-satisfied",
            Self::LibProvidesUnsatisfied { .. } => "libprovides-unsatisfied",
            Self::LibProvidesMissing { .. } => "libprovides-missing",
            Self::LibProvidesWithoutVersion { .. } => "libprovides-without-version",
            Self::LibProvidesSummary { .. } => "libprovides-as-detected",
            Self::DependencyIsTestingRelease { .. } => "dependency-is-testing-release",
        }
    }

    /// The library a diagnostic is about, where one is named.
    #[must_use]
    pub(crate) fn library(&self) -> Option<&str> {
        match self {
            Self::LibraryNoPackageAssociated { library, .. }
            | Self::LibDependsMissingProvides { library, .. }
            | Self::LibDependsSatisfied { library, .. }
            | Self::LibDependsOptional { library, .. }
            | Self::LibDependsNotIncluded { library, .. }
            | Self::LibProvidesSatisfied { library, .. }
            | Self::LibProvidesUnsatisfied { library, .. } => Some(library),
            _ => None,
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Diagnostic", 3)?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
