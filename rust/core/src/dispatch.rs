// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opcode dispatch tables
//!
//! Which records a node accepts depends on its class and on the scope the
//! stream is in: before the first PushLevel a node reads its own ancillary
//! records (root scope); after it, it reads its children (child scope);
//! between PushExtension and PopExtension everything is skipped. An opcode
//! a scope does not handle is either thrown back to the parent or logged,
//! depending on the scope's [`ThrowBackPolicy`].

use crate::opcode::Opcode;

/// Record classes that own a dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeClass {
    Database,
    Group,
    Object,
    Lod,
    Switch,
    Dof,
    ExternalReference,
    Face,
    VertexList,
    /// Pass-through containers (Sound, ClipRegion)
    Unhandled,
    /// Reading vertex records after a VertexPalette header
    VertexPalette,
}

impl NodeClass {
    /// Class a container opcode opens, if any
    pub fn for_opcode(opcode: Opcode) -> Option<Self> {
        Some(match opcode {
            Opcode::Group => Self::Group,
            Opcode::Object => Self::Object,
            Opcode::LevelOfDetail => Self::Lod,
            Opcode::Switch => Self::Switch,
            Opcode::DegreeOfFreedom => Self::Dof,
            Opcode::ExternalReference => Self::ExternalReference,
            Opcode::Face => Self::Face,
            Opcode::Sound | Opcode::ClipRegion => Self::Unhandled,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerScope {
    Root,
    Child,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerAction {
    Push,
    Pop,
    PushExtension,
    PopExtension,
    LongId,
    Comment,
    Matrix,
    Header,
    ColorPalette,
    TexturePalette,
    VertexPalette,
    MaterialPalette,
    Vertex,
    /// Create a child node of the class and parse it
    Open(NodeClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrowBackPolicy {
    /// Every unhandled opcode goes back to the parent
    Everything,
    /// Only opcodes in [`THROW_BACK_OPCODES`]
    Listed,
    /// Unhandled opcodes are logged and skipped
    Never,
}

/// Records that end a sibling's root scope and belong to the parent
pub const THROW_BACK_OPCODES: [Opcode; 10] = [
    Opcode::Group,
    Opcode::LevelOfDetail,
    Opcode::Object,
    Opcode::PopLevel,
    Opcode::Switch,
    Opcode::DegreeOfFreedom,
    Opcode::Sound,
    Opcode::ClipRegion,
    Opcode::ExternalReference,
    Opcode::Face,
];

/// Unhandled opcodes skipped without an info entry
pub const DO_NOT_REPORT_OPCODES: [i16; 23] = [
    76, 78, 79, 80, 81, 82, 94, 83, 33, 112, 100, 101, 102, 97, 31, 103, 104, 117, 118, 120,
    121, 124, 125,
];

pub fn is_throw_back(opcode: Opcode) -> bool {
    THROW_BACK_OPCODES.contains(&opcode)
}

pub fn is_do_not_report(opcode: Opcode) -> bool {
    DO_NOT_REPORT_OPCODES.contains(&opcode.raw())
}

/// Handler lookup keyed by (class, scope, opcode)
///
/// PushExtension is global and accepted in every scope.
pub fn dispatch(class: NodeClass, scope: HandlerScope, opcode: Opcode) -> Option<HandlerAction> {
    use HandlerAction as A;
    use HandlerScope as S;
    use NodeClass as C;
    use Opcode as O;

    if opcode == O::PushExtension {
        return Some(A::PushExtension);
    }

    let open = |op: Opcode| NodeClass::for_opcode(op).map(A::Open);

    match (scope, class) {
        (S::Extension, _) => (opcode == O::PopExtension).then_some(A::PopExtension),

        (S::Root, C::Database) => match opcode {
            O::Header => Some(A::Header),
            O::PushLevel => Some(A::Push),
            O::LongId => Some(A::LongId),
            O::Comment => Some(A::Comment),
            O::ColorPalette => Some(A::ColorPalette),
            O::TexturePalette => Some(A::TexturePalette),
            O::VertexPalette => Some(A::VertexPalette),
            O::MaterialPalette => Some(A::MaterialPalette),
            _ => None,
        },
        (S::Child, C::Database) => match opcode {
            O::PushLevel => Some(A::Push),
            O::PopLevel => Some(A::Pop),
            O::Object
            | O::Switch
            | O::Sound
            | O::ClipRegion
            | O::DegreeOfFreedom
            | O::Group
            | O::ExternalReference
            | O::LevelOfDetail => open(opcode),
            _ => None,
        },

        (S::Root, C::Face) => match opcode {
            O::PushLevel => Some(A::Push),
            O::Comment => Some(A::Comment),
            O::LongId => Some(A::LongId),
            _ => None,
        },
        (S::Child, C::Face) => match opcode {
            O::PushLevel => Some(A::Push),
            O::PopLevel => Some(A::Pop),
            O::VertexList => Some(A::Open(C::VertexList)),
            _ => None,
        },

        (S::Root, C::VertexPalette) => opcode.is_vertex().then_some(A::Vertex),
        (S::Child, C::VertexPalette) | (_, C::VertexList) => None,

        (S::Root, _) => match opcode {
            O::PushLevel => Some(A::Push),
            O::LongId => Some(A::LongId),
            O::Comment => Some(A::Comment),
            O::Matrix => Some(A::Matrix),
            _ => None,
        },

        (S::Child, C::Group | C::Lod | C::Unhandled) => match opcode {
            O::PushLevel => Some(A::Push),
            O::PopLevel => Some(A::Pop),
            O::Face
            | O::ExternalReference
            | O::Group
            | O::Object
            | O::Switch
            | O::Sound
            | O::ClipRegion
            | O::DegreeOfFreedom
            | O::LevelOfDetail => open(opcode),
            _ => None,
        },
        (S::Child, C::Object | C::ExternalReference) => match opcode {
            O::PushLevel => Some(A::Push),
            O::PopLevel => Some(A::Pop),
            O::Face => open(opcode),
            _ => None,
        },
        (S::Child, C::Switch | C::Dof) => match opcode {
            O::PushLevel => Some(A::Push),
            O::PopLevel => Some(A::Pop),
            O::Group
            | O::Object
            | O::Switch
            | O::Sound
            | O::ClipRegion
            | O::LevelOfDetail
            | O::ExternalReference => open(opcode),
            _ => None,
        },
    }
}

/// Dispatch table of one node in one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandler {
    pub class: NodeClass,
    pub scope: HandlerScope,
}

impl RecordHandler {
    pub fn root(class: NodeClass) -> Self {
        Self {
            class,
            scope: HandlerScope::Root,
        }
    }

    pub fn child(class: NodeClass) -> Self {
        Self {
            class,
            scope: HandlerScope::Child,
        }
    }

    pub fn extension(class: NodeClass) -> Self {
        Self {
            class,
            scope: HandlerScope::Extension,
        }
    }

    #[inline]
    pub fn action(&self, opcode: Opcode) -> Option<HandlerAction> {
        dispatch(self.class, self.scope, opcode)
    }

    /// Membership only, no side effects
    #[inline]
    pub fn handles(&self, opcode: Opcode) -> bool {
        self.action(opcode).is_some()
    }

    pub fn throw_back_policy(&self) -> ThrowBackPolicy {
        match (self.scope, self.class) {
            (HandlerScope::Root, NodeClass::VertexPalette) => ThrowBackPolicy::Everything,
            (HandlerScope::Root, NodeClass::Database) => ThrowBackPolicy::Never,
            (HandlerScope::Root, _) => ThrowBackPolicy::Listed,
            _ => ThrowBackPolicy::Never,
        }
    }

    /// Whether an unhandled opcode goes back to the parent
    pub fn throws_back(&self, opcode: Opcode) -> bool {
        match self.throw_back_policy() {
            ThrowBackPolicy::Everything => true,
            ThrowBackPolicy::Listed => is_throw_back(opcode),
            ThrowBackPolicy::Never => false,
        }
    }
}
