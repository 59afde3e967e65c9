//! The closed set of supported cell types.
//!
//! Each variant carries its numeric code (the one used by legacy files and
//! Blueprint-style shape maps) and, for the fixed 3D types, a face table in
//! local point indices. Faces are ordered counter clockwise when seen from
//! outside the cell.

use std::fmt;

use crate::error::{Error, Result};


/// Kind of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Vertex,
    Line,
    Triangle,
    Polygon,
    Quad,
    Tetra,
    Hexahedron,
    Wedge,
    Pyramid,
    Polyhedron,
}

const TETRA_FACES: &[&[usize]] = &[
    &[0, 1, 3],
    &[1, 2, 3],
    &[2, 0, 3],
    &[0, 2, 1],
];

const HEXAHEDRON_FACES: &[&[usize]] = &[
    &[0, 4, 7, 3],
    &[1, 2, 6, 5],
    &[0, 1, 5, 4],
    &[3, 7, 6, 2],
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
];

const WEDGE_FACES: &[&[usize]] = &[
    &[0, 2, 1],
    &[3, 4, 5],
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[2, 0, 3, 5],
];

const PYRAMID_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];

impl CellType {
    /// All cell types, in order of their numeric code.
    pub const ALL: [CellType; 10] = [
        CellType::Vertex,
        CellType::Line,
        CellType::Triangle,
        CellType::Polygon,
        CellType::Quad,
        CellType::Tetra,
        CellType::Hexahedron,
        CellType::Wedge,
        CellType::Pyramid,
        CellType::Polyhedron,
    ];

    /// The numeric code of this type as used in legacy files.
    pub fn code(self) -> u8 {
        match self {
            CellType::Vertex => 1,
            CellType::Line => 3,
            CellType::Triangle => 5,
            CellType::Polygon => 7,
            CellType::Quad => 9,
            CellType::Tetra => 10,
            CellType::Hexahedron => 12,
            CellType::Wedge => 13,
            CellType::Pyramid => 14,
            CellType::Polyhedron => 42,
        }
    }

    /// Inverse of [`CellType::code`]. Fails with
    /// [`Error::UnsupportedShape`] for unknown codes.
    pub fn from_code(code: i64) -> Result<Self> {
        Self::ALL.iter()
            .cloned()
            .find(|t| t.code() as i64 == code)
            .ok_or(Error::UnsupportedShape(code))
    }

    /// Parses a Blueprint shape name (`"tet"`, `"hex"`, `"polyhedral"`, ...).
    pub fn from_shape_name(name: &str) -> Option<Self> {
        let out = match name {
            "point" => CellType::Vertex,
            "line" => CellType::Line,
            "tri" => CellType::Triangle,
            "quad" => CellType::Quad,
            "polygonal" => CellType::Polygon,
            "tet" => CellType::Tetra,
            "hex" => CellType::Hexahedron,
            "wedge" => CellType::Wedge,
            "pyramid" => CellType::Pyramid,
            "polyhedral" => CellType::Polyhedron,
            _ => return None,
        };

        Some(out)
    }

    /// The Blueprint shape name of this type.
    pub fn shape_name(self) -> &'static str {
        match self {
            CellType::Vertex => "point",
            CellType::Line => "line",
            CellType::Triangle => "tri",
            CellType::Polygon => "polygonal",
            CellType::Quad => "quad",
            CellType::Tetra => "tet",
            CellType::Hexahedron => "hex",
            CellType::Wedge => "wedge",
            CellType::Pyramid => "pyramid",
            CellType::Polyhedron => "polyhedral",
        }
    }

    /// Topological dimension.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Vertex => 0,
            CellType::Line => 1,
            CellType::Triangle | CellType::Polygon | CellType::Quad => 2,
            _ => 3,
        }
    }

    /// Number of points for types with a fixed number, `None` for
    /// `Polygon` and `Polyhedron`.
    pub fn fixed_num_points(self) -> Option<usize> {
        match self {
            CellType::Vertex => Some(1),
            CellType::Line => Some(2),
            CellType::Triangle => Some(3),
            CellType::Quad => Some(4),
            CellType::Tetra => Some(4),
            CellType::Hexahedron => Some(8),
            CellType::Wedge => Some(6),
            CellType::Pyramid => Some(5),
            CellType::Polygon | CellType::Polyhedron => None,
        }
    }

    /// Faces of the fixed 3D types in local point indices. Empty for all
    /// other types (polyhedra store their faces explicitly).
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            CellType::Tetra => TETRA_FACES,
            CellType::Hexahedron => HEXAHEDRON_FACES,
            CellType::Wedge => WEDGE_FACES,
            CellType::Pyramid => PYRAMID_FACES,
            _ => &[],
        }
    }

    /// Returns `true` for 3D cells, which can be treated as polyhedra.
    pub fn is_solid(self) -> bool {
        self.dimension() == 3
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.shape_name())
    }
}
