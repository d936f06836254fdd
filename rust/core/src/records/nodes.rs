// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchy records: Group, Object, LOD, Switch, DOF and pass-through containers

use smallvec::SmallVec;

use crate::error::Result;
use crate::opcode::Opcode;
use crate::stream::FieldReader;

/// Group (opcode 2)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub priority: i16,
    pub flags: i32,
    pub special_effects: [i16; 2],
    pub significance: i16,
    pub layer: i8,
    pub loop_count: i32,
    pub loop_duration: f32,
    pub last_frame_duration: f32,
}

impl Group {
    pub const LAYOUT_LEN: usize = 40;

    pub const FLAG_FORWARD_ANIMATION: i32 = 0x4000_0000;
    pub const FLAG_SWING_ANIMATION: i32 = 0x2000_0000;
    pub const FLAG_BOUNDING_BOX_FOLLOWS: i32 = 0x1000_0000;
    pub const FLAG_FREEZE_BOUNDING_BOX: i32 = 0x0800_0000;
    pub const FLAG_DEFAULT_PARENT: i32 = 0x0400_0000;
    pub const FLAG_BACKWARD_ANIMATION: i32 = 0x0200_0000;
    pub const FLAG_PRESERVE_AT_RUNTIME: i32 = 0x0100_0000;

    /// Returns the record id and the decoded fields
    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        let priority = reader.i16()?;
        reader.skip(2)?;
        let flags = reader.i32()?;
        let special_effects = [reader.i16()?, reader.i16()?];
        let significance = reader.i16()?;
        let layer = reader.i8()?;
        reader.skip(5)?;
        Ok((
            id,
            Self {
                priority,
                flags,
                special_effects,
                significance,
                layer,
                loop_count: reader.i32()?,
                loop_duration: reader.f32()?,
                last_frame_duration: reader.f32()?,
            },
        ))
    }

    pub fn is_animated(&self) -> bool {
        self.flags & (Self::FLAG_FORWARD_ANIMATION | Self::FLAG_BACKWARD_ANIMATION) != 0
    }
}

/// Object (opcode 4)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Object {
    pub flags: i32,
    pub priority: i16,
    pub transparency: u16,
    pub special_effects: [i16; 2],
    pub significance: i16,
}

impl Object {
    pub const LAYOUT_LEN: usize = 22;

    pub const FLAG_NO_DAYLIGHT: i32 = i32::MIN;
    pub const FLAG_NO_DUSK: i32 = 0x4000_0000;
    pub const FLAG_NO_NIGHT: i32 = 0x2000_0000;
    pub const FLAG_NO_ILLUMINATION: i32 = 0x1000_0000;
    pub const FLAG_FLAT_SHADED: i32 = 0x0800_0000;
    pub const FLAG_SHADOW: i32 = 0x0400_0000;
    pub const FLAG_PRESERVE_AT_RUNTIME: i32 = 0x0200_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        Ok((
            id,
            Self {
                flags: reader.i32()?,
                priority: reader.i16()?,
                transparency: reader.u16()?,
                special_effects: [reader.i16()?, reader.i16()?],
                significance: reader.i16()?,
            },
        ))
    }
}

/// Level of detail (opcode 73)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lod {
    pub switch_in: f64,
    pub switch_out: f64,
    pub special_effects: [i16; 2],
    pub flags: i32,
    pub center: [f64; 3],
    pub transition_range: f64,
    pub significant_size: f64,
}

impl Lod {
    pub const LAYOUT_LEN: usize = 76;

    pub const FLAG_USE_PREVIOUS_SLANT_RANGE: i32 = i32::MIN;
    pub const FLAG_ADDITIVE_BELOW: i32 = 0x4000_0000;
    pub const FLAG_FREEZE_CENTER: i32 = 0x2000_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        reader.skip(4)?;
        Ok((
            id,
            Self {
                switch_in: reader.f64()?,
                switch_out: reader.f64()?,
                special_effects: [reader.i16()?, reader.i16()?],
                flags: reader.i32()?,
                center: reader.f64x3()?,
                transition_range: reader.f64()?,
                significant_size: reader.f64()?,
            },
        ))
    }

    /// Visible while the viewer distance is in `[switch_out, switch_in)`
    pub fn is_active_at(&self, distance: f64) -> bool {
        distance >= self.switch_out && distance < self.switch_in
    }
}

/// Switch (opcode 96)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Switch {
    pub current_mask: i32,
    pub mask_count: i32,
    pub words_per_mask: i32,
    pub masks: SmallVec<[u32; 4]>,
}

impl Switch {
    /// Fixed part; masks follow
    pub const LAYOUT_LEN: usize = 24;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        reader.skip(4)?;
        let current_mask = reader.i32()?;
        let mask_count = reader.i32()?;
        let words_per_mask = reader.i32()?;

        let wanted = mask_count.max(0) as usize * words_per_mask.max(1) as usize;
        let available = reader.remaining() / 4;
        let mut masks = SmallVec::with_capacity(wanted.min(available));
        for _ in 0..wanted.min(available) {
            masks.push(reader.u32()?);
        }

        Ok((
            id,
            Self {
                current_mask,
                mask_count,
                words_per_mask,
                masks,
            },
        ))
    }

    /// Whether child `child` is on in mask `mask`
    pub fn is_child_visible(&self, mask: usize, child: usize) -> bool {
        let words = self.words_per_mask.max(1) as usize;
        let word = mask * words + child / 32;
        if child / 32 >= words {
            return false;
        }
        self.masks
            .get(word)
            .is_some_and(|bits| bits & (1 << (child % 32)) != 0)
    }

    /// Visibility of `child` under the current mask
    pub fn is_child_active(&self, child: usize) -> bool {
        usize::try_from(self.current_mask)
            .map(|mask| self.is_child_visible(mask, child))
            .unwrap_or(false)
    }
}

/// One DOF axis: min, max, current, increment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DofRange {
    pub min: f64,
    pub max: f64,
    pub current: f64,
    pub increment: f64,
}

impl DofRange {
    fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            min: reader.f64()?,
            max: reader.f64()?,
            current: reader.f64()?,
            increment: reader.f64()?,
        })
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        }
    }
}

/// Degree of freedom (opcode 14)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dof {
    pub origin: [f64; 3],
    pub point_on_x_axis: [f64; 3],
    pub point_in_xy_plane: [f64; 3],
    pub translate_z: DofRange,
    pub translate_y: DofRange,
    pub translate_x: DofRange,
    pub pitch: DofRange,
    pub roll: DofRange,
    pub yaw: DofRange,
    pub scale_z: DofRange,
    pub scale_y: DofRange,
    pub scale_x: DofRange,
    pub flags: i32,
}

impl Dof {
    pub const LAYOUT_LEN: usize = 8 + 4 + 72 + 9 * 32 + 4;

    pub const FLAG_X_LIMITED: i32 = i32::MIN;
    pub const FLAG_Y_LIMITED: i32 = 0x4000_0000;
    pub const FLAG_Z_LIMITED: i32 = 0x2000_0000;
    pub const FLAG_PITCH_LIMITED: i32 = 0x1000_0000;
    pub const FLAG_ROLL_LIMITED: i32 = 0x0800_0000;
    pub const FLAG_YAW_LIMITED: i32 = 0x0400_0000;
    pub const FLAG_SCALE_X_LIMITED: i32 = 0x0200_0000;
    pub const FLAG_SCALE_Y_LIMITED: i32 = 0x0100_0000;
    pub const FLAG_SCALE_Z_LIMITED: i32 = 0x0080_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        let id = reader.fixed_string(8)?;
        reader.skip(4)?;
        Ok((
            id,
            Self {
                origin: reader.f64x3()?,
                point_on_x_axis: reader.f64x3()?,
                point_in_xy_plane: reader.f64x3()?,
                translate_z: DofRange::read(reader)?,
                translate_y: DofRange::read(reader)?,
                translate_x: DofRange::read(reader)?,
                pitch: DofRange::read(reader)?,
                roll: DofRange::read(reader)?,
                yaw: DofRange::read(reader)?,
                scale_z: DofRange::read(reader)?,
                scale_y: DofRange::read(reader)?,
                scale_x: DofRange::read(reader)?,
                flags: reader.i32()?,
            },
        ))
    }

    pub fn is_limited(&self, flag: i32) -> bool {
        self.flags & flag != 0
    }
}

/// Container record parsed only for its structure (Sound, ClipRegion)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unhandled {
    pub opcode: Opcode,
}

impl Unhandled {
    pub const LAYOUT_LEN: usize = 8;

    pub fn read(opcode: Opcode, reader: &mut FieldReader<'_>) -> Result<(String, Self)> {
        Ok((reader.fixed_string(8)?, Self { opcode }))
    }
}
