// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for record parsing
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors. Any of these aborts the parse of one database.
///
/// Recoverable problems (missing palette entries, unresolved files, unknown
/// opcodes) never surface here; they are appended to the
/// [`ImportLog`](crate::ImportLog) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream truncated at offset {offset}: record needs {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Corrupt record at offset {offset}: opcode {opcode} declares length {length}")]
    CorruptRecord {
        offset: usize,
        opcode: i16,
        length: u16,
    },

    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    #[error("Parse cancelled")]
    Cancelled,

    #[error("Cyclic external reference: {}", .0.display())]
    CyclicReference(PathBuf),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
