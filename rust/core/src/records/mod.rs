// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed records of the scene tree
//!
//! Every node of the [`SceneGraph`](crate::SceneGraph) carries the common
//! record attributes in [`Node`] and its decoded fields in [`RecordKind`].

mod database;
mod face;
mod nodes;
mod reference;

pub use database::Database;
pub use face::{DrawType, Face, LightMode, TemplateBillboard, VertexList};
pub use nodes::{Dof, DofRange, Group, Lod, Object, Switch, Unhandled};
pub use reference::{ExternalReference, ReferenceRole};

use crate::dispatch::NodeClass;
use crate::graph::NodeKey;
use crate::opcode::Opcode;

/// Decoded record payload
#[derive(Debug, Clone)]
pub enum RecordKind {
    Database(Box<Database>),
    Group(Group),
    Object(Object),
    Lod(Lod),
    Switch(Switch),
    Dof(Box<Dof>),
    ExternalReference(ExternalReference),
    Face(Box<Face>),
    VertexList(VertexList),
    Unhandled(Unhandled),
}

impl RecordKind {
    pub fn class(&self) -> NodeClass {
        match self {
            Self::Database(_) => NodeClass::Database,
            Self::Group(_) => NodeClass::Group,
            Self::Object(_) => NodeClass::Object,
            Self::Lod(_) => NodeClass::Lod,
            Self::Switch(_) => NodeClass::Switch,
            Self::Dof(_) => NodeClass::Dof,
            Self::ExternalReference(_) => NodeClass::ExternalReference,
            Self::Face(_) => NodeClass::Face,
            Self::VertexList(_) => NodeClass::VertexList,
            Self::Unhandled(_) => NodeClass::Unhandled,
        }
    }
}

/// Common record attributes plus the typed payload
#[derive(Debug, Clone)]
pub struct Node {
    pub opcode: Opcode,
    /// Declared record length, header included
    pub length: u16,
    /// Stream nesting level when the record was read
    pub level: i32,
    /// 8-byte id, replaced by a LongId record when present
    pub id: String,
    pub comment: Option<String>,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    /// Database record this node was read from; a database points at itself
    pub database: NodeKey,
    /// Local transform from a Matrix record, 16 floats as stored
    pub matrix: Option<[f32; 16]>,
    pub kind: RecordKind,
}

impl Node {
    pub fn new(opcode: Opcode, length: u16, level: i32, kind: RecordKind) -> Self {
        Self {
            opcode,
            length,
            level,
            id: String::new(),
            comment: None,
            parent: None,
            children: Vec::new(),
            database: NodeKey::default(),
            matrix: None,
            kind,
        }
    }

    #[inline]
    pub fn class(&self) -> NodeClass {
        self.kind.class()
    }

    pub fn as_database(&self) -> Option<&Database> {
        match &self.kind {
            RecordKind::Database(db) => Some(db),
            _ => None,
        }
    }

    pub fn as_database_mut(&mut self) -> Option<&mut Database> {
        match &mut self.kind {
            RecordKind::Database(db) => Some(db),
            _ => None,
        }
    }

    pub fn as_face(&self) -> Option<&Face> {
        match &self.kind {
            RecordKind::Face(face) => Some(face),
            _ => None,
        }
    }

    pub fn as_vertex_list(&self) -> Option<&VertexList> {
        match &self.kind {
            RecordKind::VertexList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ExternalReference> {
        match &self.kind {
            RecordKind::ExternalReference(xref) => Some(xref),
            _ => None,
        }
    }

    pub fn as_reference_mut(&mut self) -> Option<&mut ExternalReference> {
        match &mut self.kind {
            RecordKind::ExternalReference(xref) => Some(xref),
            _ => None,
        }
    }

    /// References that reuse another reference's result
    pub fn is_alias(&self) -> bool {
        self.as_reference().and_then(ExternalReference::owner).is_some()
    }

    /// Interior nodes that can own a mesh and be emitted
    pub fn is_interior(&self) -> bool {
        !matches!(self.kind, RecordKind::Face(_) | RecordKind::VertexList(_))
    }
}
