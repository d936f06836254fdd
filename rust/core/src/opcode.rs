// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OpenFlight record opcodes
//!
//! Every record starts with a signed 16-bit opcode. Known codes map to
//! named variants; anything else is carried through as [`Opcode::Unknown`]
//! so the parser can skip it structurally.

use std::fmt;

macro_rules! opcodes {
    ($($name:ident = $value:literal,)*) => {
        /// OpenFlight record type codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Opcode {
            $($name,)*
            /// Opcode not in the table
            Unknown(i16),
        }

        impl Opcode {
            /// Decode a raw opcode
            pub fn from_raw(raw: i16) -> Self {
                match raw {
                    $($value => Self::$name,)*
                    other => Self::Unknown(other),
                }
            }

            /// Raw on-disk value
            pub fn raw(self) -> i16 {
                match self {
                    $(Self::$name => $value,)*
                    Self::Unknown(other) => other,
                }
            }

            /// Record name as written in the format documentation
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                    Self::Unknown(_) => "Unknown",
                }
            }
        }
    };
}

opcodes! {
    Header = 1,
    Group = 2,
    Object = 4,
    Face = 5,
    PushLevel = 10,
    PopLevel = 11,
    DegreeOfFreedom = 14,
    PushSubface = 19,
    PopSubface = 20,
    PushExtension = 21,
    PopExtension = 22,
    Continuation = 23,
    Comment = 31,
    ColorPalette = 32,
    LongId = 33,
    Matrix = 49,
    Vector = 50,
    Multitexture = 52,
    UvList = 53,
    BinarySeparatingPlane = 55,
    ReplicationCode = 60,
    InstanceReference = 61,
    InstanceDefinition = 62,
    ExternalReference = 63,
    TexturePalette = 64,
    VertexPalette = 67,
    VertexWithColor = 68,
    VertexWithColorNormal = 69,
    VertexWithColorNormalUv = 70,
    VertexWithColorUv = 71,
    VertexList = 72,
    LevelOfDetail = 73,
    BoundingBox = 74,
    RotateAboutEdge = 76,
    Translate = 78,
    Scale = 79,
    RotateAboutPoint = 80,
    RotateScaleToPoint = 81,
    Put = 82,
    EyepointTrackplanePalette = 83,
    Mesh = 84,
    LocalVertexPool = 85,
    MeshPrimitive = 86,
    RoadSegment = 87,
    RoadZone = 88,
    MorphVertexList = 89,
    LinkagePalette = 90,
    Sound = 91,
    RoadPath = 92,
    SoundPalette = 93,
    GeneralMatrix = 94,
    Text = 95,
    Switch = 96,
    LineStylePalette = 97,
    ClipRegion = 98,
    Extension = 100,
    LightSource = 101,
    LightSourcePalette = 102,
    BoundingSphere = 105,
    BoundingCylinder = 106,
    BoundingConvexHull = 107,
    BoundingVolumeCenter = 108,
    BoundingVolumeOrientation = 109,
    LightPoint = 111,
    TextureMappingPalette = 112,
    MaterialPalette = 113,
    NameTable = 114,
    Cat = 115,
    CatData = 116,
    BoundingHistogram = 119,
    PushAttribute = 122,
    PopAttribute = 123,
    Curve = 126,
    RoadConstruction = 127,
    LightPointAppearancePalette = 128,
    LightPointAnimationPalette = 129,
    IndexedLightPoint = 130,
    LightPointSystem = 131,
    IndexedString = 132,
    ShaderPalette = 133,
}

impl Opcode {
    /// Vertex records that live inside a vertex palette
    pub fn is_vertex(self) -> bool {
        matches!(
            self,
            Self::VertexWithColor
                | Self::VertexWithColorNormal
                | Self::VertexWithColorNormalUv
                | Self::VertexWithColorUv
        )
    }
}

impl From<i16> for Opcode {
    fn from(raw: i16) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "Unknown({})", raw),
            other => write!(f, "{}({})", other.name(), other.raw()),
        }
    }
}
