// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inspector configuration loaded from environment variables.
//!
//! Command-line flags override every value read here.

use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::ConfigError;

/// How each import is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Tree,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            "tree" => Ok(Self::Tree),
            _ => Err(ConfigError::InvalidOutput(s.to_string())),
        }
    }
}

/// Inspector configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Extra directories searched for external references and textures.
    pub search_dirs: Vec<PathBuf>,
    /// Number of worker threads for parallel preparation.
    pub worker_threads: usize,
    pub output: OutputFormat,
}

impl Config {
    /// Load configuration from `FLT_SEARCH_DIRS`, `FLT_WORKER_THREADS` and
    /// `FLT_OUTPUT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let search_dirs = std::env::var_os("FLT_SEARCH_DIRS")
            .map(|dirs| {
                std::env::split_paths(&dirs)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let worker_threads = match std::env::var("FLT_WORKER_THREADS") {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidThreads(value)),
            },
            Err(_) => num_cpus::get(),
        };

        let output = match std::env::var("FLT_OUTPUT") {
            Ok(value) => value.parse()?,
            Err(_) => OutputFormat::default(),
        };

        Ok(Self {
            search_dirs,
            worker_threads,
            output,
        })
    }
}
