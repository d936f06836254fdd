// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Database header record (opcode 1)

use crate::error::Result;
use crate::stream::FieldReader;

/// Units of vertex coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexCoordinateUnits {
    #[default]
    Meters,
    Kilometers,
    Feet,
    Inches,
    NauticalMiles,
    Other(u8),
}

impl VertexCoordinateUnits {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Meters,
            1 => Self::Kilometers,
            4 => Self::Feet,
            5 => Self::Inches,
            8 => Self::NauticalMiles,
            other => Self::Other(other),
        }
    }

    /// Length of one unit in meters
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters | Self::Other(_) => 1.0,
            Self::Kilometers => 1000.0,
            Self::Feet => 0.3048,
            Self::Inches => 0.0254,
            Self::NauticalMiles => 1852.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    #[default]
    FlatEarth,
    Trapezoidal,
    RoundEarth,
    Lambert,
    Utm,
    Geodetic,
    Geocentric,
    Other(i32),
}

impl Projection {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::FlatEarth,
            1 => Self::Trapezoidal,
            2 => Self::RoundEarth,
            3 => Self::Lambert,
            4 => Self::Utm,
            5 => Self::Geodetic,
            6 => Self::Geocentric,
            other => Self::Other(other),
        }
    }
}

/// Tool that originally produced the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatabaseOrigin {
    #[default]
    OpenFlight,
    DigIDigII,
    EvansSutherlandCt5a,
    PspDig,
    GeneralElectricCiv,
    EvansSutherlandGdf,
    Other(i32),
}

impl DatabaseOrigin {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            100 => Self::OpenFlight,
            200 => Self::DigIDigII,
            300 => Self::EvansSutherlandCt5a,
            400 => Self::PspDig,
            600 => Self::GeneralElectricCiv,
            700 => Self::EvansSutherlandGdf,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EarthEllipsoidModel {
    #[default]
    Wgs1984,
    Wgs1972,
    Bessel,
    Clarke1866,
    Nad1927,
    UserDefined,
    Other(i32),
}

impl EarthEllipsoidModel {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Wgs1984,
            1 => Self::Wgs1972,
            2 => Self::Bessel,
            3 => Self::Clarke1866,
            4 => Self::Nad1927,
            -1 => Self::UserDefined,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexStorage {
    #[default]
    DoublePrecision,
    Other(i16),
}

impl VertexStorage {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            1 => Self::DoublePrecision,
            other => Self::Other(other),
        }
    }
}

/// Next-id counters kept by modelling tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NextNodeIds {
    pub group: i16,
    pub lod: i16,
    pub object: i16,
    pub face: i16,
    pub dof: i16,
    pub sound: i16,
    pub path: i16,
    pub clip: i16,
    pub text: i16,
    pub bsp: i16,
    pub switch: i16,
    pub light_source: i16,
    pub light_point: i16,
    pub road: i16,
    pub cat: i16,
    pub adaptive: i16,
    pub curve: i16,
    pub mesh: u16,
    pub light_point_system: u16,
}

/// Global database header
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub id: String,
    pub format_revision: i32,
    pub edit_revision: i32,
    pub last_revision: String,
    pub unit_multiplier: i16,
    pub units: VertexCoordinateUnits,
    pub tex_white: bool,
    pub flags: i32,
    pub projection: Projection,
    pub vertex_storage: VertexStorage,
    pub origin: DatabaseOrigin,
    pub southwest_coordinate: [f64; 2],
    /// Delta x, y, z to place the database
    pub delta: [f64; 3],
    pub southwest_lat_lon: [f64; 2],
    pub northeast_lat_lon: [f64; 2],
    pub origin_lat_lon: [f64; 2],
    /// Lambert upper and lower latitude
    pub lambert_lat: [f64; 2],
    pub ellipsoid: EarthEllipsoidModel,
    pub utm_zone: i16,
    /// Database bounding radius
    pub radius: f64,
    /// Earth major and minor axis
    pub earth_axis: [f64; 2],
    pub next_ids: NextNodeIds,
}

impl Header {
    /// Body size of a current-revision header record
    pub const LAYOUT_LEN: usize = 320;

    pub const FLAG_SAVE_VERTEX_NORMALS: i32 = i32::MIN;
    pub const FLAG_PACKED_COLOR_MODE: i32 = 0x4000_0000;
    pub const FLAG_CAD_VIEW_MODE: i32 = 0x2000_0000;

    pub fn read(reader: &mut FieldReader<'_>) -> Result<Self> {
        let mut h = Header {
            id: reader.fixed_string(8)?,
            format_revision: reader.i32()?,
            edit_revision: reader.i32()?,
            last_revision: reader.fixed_string(32)?,
            ..Default::default()
        };
        h.next_ids.group = reader.i16()?;
        h.next_ids.lod = reader.i16()?;
        h.next_ids.object = reader.i16()?;
        h.next_ids.face = reader.i16()?;
        h.unit_multiplier = reader.i16()?;
        h.units = VertexCoordinateUnits::from_raw(reader.u8()?);
        h.tex_white = reader.bool()?;
        h.flags = reader.i32()?;
        reader.skip(24)?;
        h.projection = Projection::from_raw(reader.i32()?);
        reader.skip(28)?;
        h.next_ids.dof = reader.i16()?;
        h.vertex_storage = VertexStorage::from_raw(reader.i16()?);
        h.origin = DatabaseOrigin::from_raw(reader.i32()?);
        h.southwest_coordinate = [reader.f64()?, reader.f64()?];
        h.delta[0] = reader.f64()?;
        h.delta[1] = reader.f64()?;
        h.next_ids.sound = reader.i16()?;
        h.next_ids.path = reader.i16()?;
        reader.skip(8)?;
        h.next_ids.clip = reader.i16()?;
        h.next_ids.text = reader.i16()?;
        h.next_ids.bsp = reader.i16()?;
        h.next_ids.switch = reader.i16()?;
        reader.skip(4)?;
        h.southwest_lat_lon = [reader.f64()?, reader.f64()?];
        h.northeast_lat_lon = [reader.f64()?, reader.f64()?];
        h.origin_lat_lon = [reader.f64()?, reader.f64()?];
        h.lambert_lat = [reader.f64()?, reader.f64()?];
        h.next_ids.light_source = reader.i16()?;
        h.next_ids.light_point = reader.i16()?;
        h.next_ids.road = reader.i16()?;
        h.next_ids.cat = reader.i16()?;
        reader.skip(8)?;
        h.ellipsoid = EarthEllipsoidModel::from_raw(reader.i32()?);
        h.next_ids.adaptive = reader.i16()?;
        h.next_ids.curve = reader.i16()?;
        h.utm_zone = reader.i16()?;
        reader.skip(6)?;
        h.delta[2] = reader.f64()?;
        h.radius = reader.f64()?;
        h.next_ids.mesh = reader.u16()?;
        h.next_ids.light_point_system = reader.u16()?;
        reader.skip(4)?;
        h.earth_axis = [reader.f64()?, reader.f64()?];
        Ok(h)
    }

    pub fn saves_vertex_normals(&self) -> bool {
        self.flags & Self::FLAG_SAVE_VERTEX_NORMALS != 0
    }

    pub fn packed_color_mode(&self) -> bool {
        self.flags & Self::FLAG_PACKED_COLOR_MODE != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Endianness;

    #[test]
    fn test_layout_len_matches_reader() {
        let body = vec![0u8; Header::LAYOUT_LEN];
        let mut reader = FieldReader::new(&body, Endianness::Big);
        Header::read(&mut reader).unwrap();
        assert_eq!(reader.position(), Header::LAYOUT_LEN);
    }

    #[test]
    fn test_reads_revision_and_units() {
        let mut body = vec![0u8; Header::LAYOUT_LEN];
        body[..3].copy_from_slice(b"db1");
        body[8..12].copy_from_slice(&1640i32.to_be_bytes());
        // vertex units sit after 8 + 4 + 4 + 32 + 5 * 2 bytes
        body[58] = 4;
        let mut reader = FieldReader::new(&body, Endianness::Big);
        let header = Header::read(&mut reader).unwrap();
        assert_eq!(header.id, "db1");
        assert_eq!(header.format_revision, 1640);
        assert_eq!(header.units, VertexCoordinateUnits::Feet);
        assert!((header.units.meters_per_unit() - 0.3048).abs() < 1e-12);
    }

    #[test]
    fn test_reads_tail_after_radius() {
        let mut body = vec![0u8; Header::LAYOUT_LEN];
        body[280..288].copy_from_slice(&2.5f64.to_be_bytes());
        body[288..296].copy_from_slice(&1500.0f64.to_be_bytes());
        body[296..298].copy_from_slice(&7u16.to_be_bytes());
        body[298..300].copy_from_slice(&3u16.to_be_bytes());
        body[304..312].copy_from_slice(&6_378_137.0f64.to_be_bytes());
        body[312..320].copy_from_slice(&6_356_752.3f64.to_be_bytes());
        let mut reader = FieldReader::new(&body, Endianness::Big);
        let header = Header::read(&mut reader).unwrap();
        assert_eq!(header.delta[2], 2.5);
        assert_eq!(header.radius, 1500.0);
        assert_eq!(header.next_ids.mesh, 7);
        assert_eq!(header.next_ids.light_point_system, 3);
        assert_eq!(header.earth_axis, [6_378_137.0, 6_356_752.3]);
    }

    #[test]
    fn test_enum_fallbacks() {
        assert_eq!(Projection::from_raw(9), Projection::Other(9));
        assert_eq!(EarthEllipsoidModel::from_raw(-1), EarthEllipsoidModel::UserDefined);
        assert_eq!(DatabaseOrigin::from_raw(100), DatabaseOrigin::OpenFlight);
    }
}
