// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid output format {0:?}: expected summary, json or tree")]
    InvalidOutput(String),

    #[error("Invalid worker thread count {0:?}")]
    InvalidThreads(String),
}
