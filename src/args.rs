// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sodep_validator")]
#[command(version)]
#[command(about = "Validates shared-library dependencies of binary packages")]
pub(crate) struct Args {
    /// Path to the package file (.pkg.tar.zst/.pkg.tar.xz/...) to validate.
    pub package: PathBuf,

    /// Path to the file to write the analysis results in JSON format.
    pub report: PathBuf,

    /// Path to the local database of installed packages.
    #[arg(long, default_value = "/var/lib/pacman/local")]
    pub pacman_db: PathBuf,

    /// Path to a sync database of the testing repository, used to warn about
    /// dependencies pending promotion.
    #[arg(long)]
    pub testing_db: Option<PathBuf>,

    /// Do not query the dynamic linker registry; requirements then resolve
    /// via search-path overrides only.
    #[arg(long)]
    pub skip_system_cache: bool,
}
