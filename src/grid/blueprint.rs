//! Mixed-shape topologies in the element/subelement layout of the Mesh
//! Blueprint.
//!
//! Cells are described by four parallel arrays: `shapes` (numeric shape id
//! per cell, translated through `shape_map`), `sizes`, `offsets` (one per
//! cell, no trailing entry) and the flat `connectivity`. For polyhedral
//! cells, the connectivity entries are indices of faces in the
//! `subelements` relation, which stores the point ids of each face.

use crate::{
    cell::CellType,
    conn::{Face, O2m},
    error::{Error, Result},
    handle::{Handle, PointId},
    math::Pos,
};
use super::UnstructuredGrid;


/// One `(sizes, offsets, connectivity)` relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementArrays {
    pub sizes: Vec<i64>,
    pub offsets: Vec<i64>,
    pub connectivity: Vec<i64>,
}

impl ElementArrays {
    /// Number of entities.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Validates the arrays and converts them to a canonical [`O2m`].
    /// Entities may start anywhere in `connectivity`, but each one has to
    /// lie completely inside of it.
    pub fn to_o2m(&self, what: &str) -> Result<O2m<i64>> {
        if self.sizes.len() != self.offsets.len() {
            return Err(Error::malformed(format!(
                "{}: {} sizes but {} offsets",
                what,
                self.sizes.len(),
                self.offsets.len(),
            )));
        }

        let mut out = O2m::with_capacity(self.len(), self.connectivity.len());
        for (i, (&size, &offset)) in self.sizes.iter().zip(&self.offsets).enumerate() {
            if size < 0 || offset < 0 {
                return Err(Error::malformed(format!(
                    "{} {}: negative size {} or offset {}",
                    what,
                    i,
                    size,
                    offset,
                )));
            }

            let (start, size) = (offset as u64, size as u64);
            if start + size > self.connectivity.len() as u64 {
                return Err(Error::malformed(format!(
                    "{} {}: range {}..{} exceeds connectivity of length {}",
                    what,
                    i,
                    start,
                    start + size,
                    self.connectivity.len(),
                )));
            }

            let range = start as usize..(start + size) as usize;
            out.push(self.connectivity[range].iter().cloned());
        }

        Ok(out)
    }

    fn push(&mut self, entries: impl IntoIterator<Item = i64>) {
        let start = self.connectivity.len();
        self.connectivity.extend(entries);
        self.offsets.push(start as i64);
        self.sizes.push((self.connectivity.len() - start) as i64);
    }
}

/// A mixed-shape unstructured topology.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixedTopology {
    /// Maps shape names (`"tet"`, `"hex"`, `"polyhedral"`, ...) to the ids
    /// used in `shapes`. If empty, the ids are interpreted as legacy cell
    /// type codes.
    pub shape_map: Vec<(String, i64)>,
    pub shapes: Vec<i64>,
    pub elements: ElementArrays,

    /// Faces of polyhedral cells. Required if there is any polyhedral cell.
    pub subelements: Option<ElementArrays>,
}

impl MixedTopology {
    /// Resolves a shape id.
    fn cell_type(&self, shape: i64) -> Result<CellType> {
        if self.shape_map.is_empty() {
            return CellType::from_code(shape);
        }

        self.shape_map.iter()
            .find(|(_, id)| *id == shape)
            .and_then(|(name, _)| CellType::from_shape_name(name))
            .ok_or(Error::UnsupportedShape(shape))
    }

    /// Builds a grid over `points`.
    ///
    /// Fails with [`Error::MalformedConnectivity`] if the arrays are
    /// inconsistent and with [`Error::UnsupportedShape`] for shape ids that
    /// aren't in the shape map.
    pub fn to_grid(&self, points: Vec<Pos>) -> Result<UnstructuredGrid> {
        if self.shapes.len() != self.elements.len() {
            return Err(Error::malformed(format!(
                "{} shapes for {} elements",
                self.shapes.len(),
                self.elements.len(),
            )));
        }

        let elements = self.elements.to_o2m("element")?;
        let subelements = match &self.subelements {
            Some(sub) => Some(sub.to_o2m("subelement")?),
            None => None,
        };

        let mut grid = UnstructuredGrid::from_points(points);
        for (i, (&shape, entries)) in self.shapes.iter().zip(elements.iter()).enumerate() {
            let ty = self.cell_type(shape)?;
            if ty != CellType::Polyhedron {
                let ids = entries.iter()
                    .map(|&raw| to_point_id(raw, i))
                    .collect::<Result<Vec<_>>>()?;
                grid.add_cell(ty, &ids)?;
                continue;
            }

            let faces_rel = subelements.as_ref().ok_or_else(|| {
                Error::malformed(format!("polyhedral element {} but no subelements", i))
            })?;
            let mut faces = Vec::with_capacity(entries.len());
            for &raw in entries {
                let face = usize_index(raw)
                    .and_then(|f| faces_rel.get(f).ok())
                    .ok_or_else(|| Error::malformed(format!(
                        "element {} refers to face {} (there are {})",
                        i,
                        raw,
                        faces_rel.len(),
                    )))?;
                let face = face.iter()
                    .map(|&raw| to_point_id(raw, i))
                    .collect::<Result<Face>>()?;
                faces.push(face);
            }
            grid.add_polyhedron(&faces)?;
        }

        Ok(grid)
    }

    /// Exports a grid. The shape map lists the shapes present in the grid
    /// with their legacy codes as ids; the faces of polyhedra are written
    /// to the subelements in cell order.
    pub fn from_grid(grid: &UnstructuredGrid) -> Result<Self> {
        let mut out = Self::default();
        let mut subelements = ElementArrays::default();

        for ty in CellType::ALL.iter().cloned() {
            if grid.types().contains(&ty) {
                out.shape_map.push((ty.shape_name().to_string(), ty.code() as i64));
            }
        }

        for cell in grid.cell_ids() {
            let ty = grid.cell_type(cell)?;
            out.shapes.push(ty.code() as i64);
            if ty == CellType::Polyhedron {
                let first = subelements.len() as i64;
                for face in grid.cell_faces(cell)? {
                    subelements.push(face.iter().map(|id| id.idx() as i64));
                }
                out.elements.push(first..subelements.len() as i64);
            } else {
                out.elements.push(grid.cell_points(cell)?.iter().map(|id| id.idx() as i64));
            }
        }

        if !subelements.is_empty() {
            out.subelements = Some(subelements);
        }
        Ok(out)
    }
}

fn usize_index(raw: i64) -> Option<usize> {
    if raw < 0 { None } else { Some(raw as usize) }
}

fn to_point_id(raw: i64, element: usize) -> Result<PointId> {
    PointId::try_from_i64(raw).ok_or_else(|| {
        Error::malformed(format!("invalid point id {} in element {}", raw, element))
    })
}


#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;

    fn points(n: usize) -> Vec<Pos> {
        (0..n).map(|i| Point3::new(i as f64, (i * i) as f64, 1.0)).collect()
    }

    /// A hex and a pyramid-shaped polyhedron on top of it.
    fn topology() -> MixedTopology {
        MixedTopology {
            shape_map: vec![("hex".into(), 12), ("polyhedral".into(), 42)],
            shapes: vec![12, 42],
            elements: ElementArrays {
                sizes: vec![8, 5],
                offsets: vec![0, 8],
                connectivity: vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4],
            },
            subelements: Some(ElementArrays {
                sizes: vec![4, 3, 3, 3, 3],
                offsets: vec![0, 4, 7, 10, 13],
                connectivity: vec![
                    4, 7, 6, 5,
                    4, 5, 8,
                    5, 6, 8,
                    6, 7, 8,
                    7, 4, 8,
                ],
            }),
        }
    }

    #[test]
    fn import_mixed() {
        let grid = topology().to_grid(points(9)).unwrap();
        assert_eq!(grid.num_cells(), 2);
        assert_eq!(grid.types(), &[CellType::Hexahedron, CellType::Polyhedron]);
        assert_eq!(grid.num_faces(), 5);

        let ids: Vec<_> = grid.cell_points(crate::handle::CellId::new(1)).unwrap().iter().map(|p| p.idx()).collect();
        assert_eq!(ids, vec![4, 7, 6, 5, 8]);
    }

    #[test]
    fn roundtrip() {
        let grid = topology().to_grid(points(9)).unwrap();
        let exported = MixedTopology::from_grid(&grid).unwrap();
        assert_eq!(exported.shape_map, topology().shape_map);
        assert_eq!(exported.to_grid(points(9)).unwrap(), grid);
    }

    #[test]
    fn bad_input() {
        let mut topo = topology();
        topo.elements.offsets[1] = 10;
        assert!(matches!(topo.to_grid(points(9)), Err(Error::MalformedConnectivity { .. })));

        let mut topo = topology();
        topo.shapes[0] = 3;
        assert_eq!(topo.to_grid(points(9)), Err(Error::UnsupportedShape(3)));

        let mut topo = topology();
        topo.subelements = None;
        assert!(matches!(topo.to_grid(points(9)), Err(Error::MalformedConnectivity { .. })));

        let mut topo = topology();
        topo.elements.connectivity[12] = 99;
        assert!(matches!(topo.to_grid(points(9)), Err(Error::MalformedConnectivity { .. })));

        let mut topo = topology();
        topo.elements.sizes[0] = -8;
        assert!(matches!(topo.to_grid(points(9)), Err(Error::MalformedConnectivity { .. })));
    }
}
