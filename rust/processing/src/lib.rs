// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import pipeline shared by the FLT-Lite tools
//!
//! Runs the three passes over a root database: `parse` builds the record
//! tree, `prepare` builds meshes off the calling thread, and `emit` hands
//! the result to a host through [`SceneEmitter`].

pub mod batch;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod summary;

pub use batch::{import_many, import_many_with};
pub use emit::{emit, emit_with_cancel, NodeInfo, SceneEmitter};
pub use error::{Error, Result};
pub use pipeline::{
    import_file, import_file_with, parse_async, parse_async_with_cancel, ImportResult,
    MaterialTextures,
};
pub use summary::{ImportSummary, ReferenceCounts, TextureCounts};
