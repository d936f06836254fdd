// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # FLT-Lite Core
//!
//! Streaming parser for OpenFlight (`.flt`) databases that rebuilds the
//! record tree, resolves palettes and follows external references.
//!
//! ## Overview
//!
//! - **Record stream**: bounds-checked big-endian field decoding with
//!   [nom](https://docs.rs/nom) number parsers
//! - **Dispatch**: per-record handler tables with push/pop nesting and
//!   throw-back of sibling records
//! - **Scene graph**: [slotmap](https://docs.rs/slotmap) arena of typed records
//! - **Banks**: one owner per referenced file, one intermediate material per
//!   distinct face appearance
//! - **Diagnostics**: recoverable problems land in an [`ImportLog`] and are
//!   mirrored to `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flt_lite_core::{parse_file, ImportSettings, Opcode};
//!
//! let settings = ImportSettings::default().with_search_directory("/data/models");
//! let out = parse_file("/data/models/airfield.flt", &settings)?;
//!
//! for key in out.graph.find_by_opcode(Opcode::Group) {
//!     println!("group {}", out.graph[key].id);
//! }
//! for entry in out.log.problems() {
//!     eprintln!("{}", entry);
//! }
//! ```
//!
//! ## Scanning
//!
//! For statistics without building a tree:
//!
//! ```rust,ignore
//! use flt_lite_core::RecordScanner;
//!
//! let data = std::fs::read("airfield.flt")?;
//! let counts = RecordScanner::new(&data).count_by_opcode();
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for records, settings and diagnostics

pub mod cancel;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod header;
pub mod log;
pub mod material;
pub mod opcode;
pub mod palette;
pub mod parser;
pub mod records;
pub mod resolve;
pub mod scanner;
pub mod settings;
pub mod stream;
pub mod writer;
pub mod xref;

pub use cancel::CancellationToken;
pub use dispatch::{
    dispatch, HandlerAction, HandlerScope, NodeClass, RecordHandler, ThrowBackPolicy,
    DO_NOT_REPORT_OPCODES, THROW_BACK_OPCODES,
};
pub use error::{Error, Result};
pub use graph::{DepthFirst, NodeKey, SceneGraph};
pub use header::{
    DatabaseOrigin, EarthEllipsoidModel, Header, Projection, VertexCoordinateUnits,
    VertexStorage,
};
pub use log::{Diagnostic, DiagnosticKind, ImportLog, Severity};
pub use material::{
    IntermediateMaterial, MaterialBank, MaterialKey, PaletteLookup, ResolvedTexture,
};
pub use opcode::Opcode;
pub use palette::{
    ColorPalette, MaterialEntry, PackedColor, Palettes, Rgb, TextureCodec, TextureEntry, Vertex,
    VertexFormat, VertexPalette,
};
pub use parser::{parse_file, ParseOutcome, ParseOutput, Parser};
pub use records::{
    Database, Dof, DofRange, DrawType, ExternalReference, Face, Group, LightMode, Lod, Node,
    Object, RecordKind, ReferenceRole, Switch, TemplateBillboard, Unhandled, VertexList,
};
pub use resolve::FileResolver;
pub use scanner::{RecordScanner, ScannedRecord};
pub use settings::ImportSettings;
pub use stream::{Endianness, FieldReader, RecordStream};
pub use writer::{BodyWriter, FltWriter};
pub use xref::ExternalReferenceBank;
