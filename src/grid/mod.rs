//! Unstructured grids: a flat point arena plus cells referring to it.

use crate::{
    attr::AttributeData,
    cell::CellType,
    conn::{unique_points, Face, FaceStreamBuilder, LegacyFaces, LegacyId, O2m},
    error::{Error, Result},
    handle::{CellId, FaceId, Handle, PointId},
    math::{Pos, Pos3Like},
    polyhedron::{FaceTable, Polyhedron},
};


pub mod blueprint;


/// A grid of mixed cell types.
///
/// Everything is stored in flat arrays:
/// - `points`: positions, indexed by [`PointId`],
/// - `types` and `cells`: type and point ids of each cell, indexed by
///   [`CellId`]. For polyhedra, `cells` holds the distinct points of the
///   cell in order of first appearance in its faces,
/// - `cell_faces`: the faces of each polyhedron (empty for all other
///   cells), indexed by [`CellId`],
/// - `faces`: point ids of each polyhedron face, indexed by [`FaceId`].
///
/// The legacy `faces`/`locations` arrays are derived on demand by
/// [`UnstructuredGrid::legacy_faces`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnstructuredGrid {
    points: Vec<Pos>,
    types: Vec<CellType>,
    cells: O2m<PointId>,
    cell_faces: O2m<FaceId>,
    faces: O2m<PointId>,
    point_data: AttributeData,
    cell_data: AttributeData,
}

impl UnstructuredGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a grid with the given points and no cells.
    pub fn from_points(points: Vec<Pos>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    pub fn add_point(&mut self, p: impl Pos3Like) -> PointId {
        let id = PointId::from_usize(self.points.len());
        self.points.push(p.to_point3());
        id
    }

    /// Adds a cell that is not a polyhedron. The number of points has to
    /// match the cell type (at least three for polygons); all ids have to
    /// refer to existing points.
    pub fn add_cell(&mut self, ty: CellType, ids: &[PointId]) -> Result<CellId> {
        match ty.fixed_num_points() {
            _ if ty == CellType::Polyhedron => {
                return Err(Error::malformed("polyhedra have to be added with their faces"));
            }
            Some(n) if n != ids.len() => {
                return Err(Error::malformed(format!(
                    "{} cell with {} points (expected {})",
                    ty,
                    ids.len(),
                    n,
                )));
            }
            None if ids.len() < 3 => {
                return Err(Error::malformed(format!("{} cell with {} points", ty, ids.len())));
            }
            _ => {}
        }
        self.check_points(ids.iter())?;

        let id = CellId::from_usize(self.types.len());
        self.types.push(ty);
        self.cells.push(ids.iter().cloned());
        self.cell_faces.push(std::iter::empty());
        Ok(id)
    }

    /// Adds a polyhedron given by its faces.
    pub fn add_polyhedron<F: AsRef<[PointId]>>(&mut self, faces: &[F]) -> Result<CellId> {
        if faces.is_empty() {
            return Err(Error::malformed("polyhedron without faces"));
        }
        self.check_points(faces.iter().flat_map(|f| f.as_ref().iter()))?;

        let first_face = self.faces.len();
        for face in faces {
            self.faces.push(face.as_ref().iter().cloned());
        }

        let id = CellId::from_usize(self.types.len());
        self.types.push(CellType::Polyhedron);
        self.cells.push(unique_points(faces));
        self.cell_faces.push((first_face..self.faces.len()).map(FaceId::from_usize));
        Ok(id)
    }

    fn check_points<'a>(&self, mut ids: impl Iterator<Item = &'a PointId>) -> Result<()> {
        match ids.find(|id| id.to_usize() >= self.points.len()) {
            Some(bad) => Err(Error::out_of_range("point", bad.to_usize(), self.points.len())),
            None => Ok(()),
        }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_cells(&self) -> usize {
        self.types.len()
    }

    /// Total number of polyhedron faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn points(&self) -> &[Pos] {
        &self.points
    }

    pub fn types(&self) -> &[CellType] {
        &self.types
    }

    /// Cell to point relation.
    pub fn cells(&self) -> &O2m<PointId> {
        &self.cells
    }

    pub fn point_data(&self) -> &AttributeData {
        &self.point_data
    }

    pub fn point_data_mut(&mut self) -> &mut AttributeData {
        &mut self.point_data
    }

    pub fn cell_data(&self) -> &AttributeData {
        &self.cell_data
    }

    pub fn cell_data_mut(&mut self) -> &mut AttributeData {
        &mut self.cell_data
    }

    /// Iterator over all cell ids.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.num_cells()).map(CellId::from_usize)
    }

    pub fn cell_type(&self, cell: CellId) -> Result<CellType> {
        self.types.get(cell.to_usize())
            .cloned()
            .ok_or_else(|| Error::out_of_range("cell", cell.to_usize(), self.num_cells()))
    }

    pub fn cell_points(&self, cell: CellId) -> Result<&[PointId]> {
        self.cells.get(cell.to_usize())
            .map_err(|_| Error::out_of_range("cell", cell.to_usize(), self.num_cells()))
    }

    /// Face ids of a polyhedron. Empty for all other cells.
    pub fn cell_face_ids(&self, cell: CellId) -> Result<&[FaceId]> {
        self.cell_faces.get(cell.to_usize())
            .map_err(|_| Error::out_of_range("cell", cell.to_usize(), self.num_cells()))
    }

    /// Point ids of a polyhedron face.
    pub fn face(&self, face: FaceId) -> Result<&[PointId]> {
        self.faces.get(face.to_usize())
            .map_err(|_| Error::out_of_range("face", face.to_usize(), self.num_faces()))
    }

    /// The faces of a 3D cell in global point ids: the stored faces for
    /// polyhedra, the type's face table for all other 3D types. Empty for
    /// cells of lower dimension.
    pub fn cell_faces(&self, cell: CellId) -> Result<Vec<Face>> {
        let ty = self.cell_type(cell)?;
        if ty == CellType::Polyhedron {
            return self.cell_face_ids(cell)?
                .iter()
                .map(|&f| self.face(f).map(|ids| ids.iter().cloned().collect()))
                .collect();
        }

        let points = self.cell_points(cell)?;
        Ok(ty.faces().iter().map(|f| f.iter().map(|&l| points[l]).collect()).collect())
    }

    /// A polyhedron view of a 3D cell (fixed types are treated as polyhedra
    /// with their usual faces).
    pub fn polyhedron(&self, cell: CellId) -> Result<Polyhedron<'_>> {
        let ty = self.cell_type(cell)?;
        if !ty.is_solid() {
            return Err(Error::degenerate(format!("{} of type {} is not a solid", cell, ty)));
        }

        let faces = self.cell_faces(cell)?;
        Polyhedron::from_table(&self.points, FaceTable::from_faces(&faces))
    }

    /// Derives the legacy `(faces, locations)` arrays. Cells that aren't
    /// polyhedra have location `-1`.
    pub fn legacy_faces(&self) -> Result<(Vec<LegacyId>, Vec<LegacyId>)> {
        let mut builder = FaceStreamBuilder::new();
        for cell in self.cell_ids() {
            if self.cell_type(cell)? == CellType::Polyhedron {
                builder.push_polyhedron(&self.cell_faces(cell)?);
            } else {
                builder.push_other();
            }
        }

        Ok(builder.finish())
    }

    /// Builds a grid from the legacy arrays: numeric cell type codes, the
    /// cell to point relation and the `faces`/`locations` pair. For
    /// polyhedra, only the face stream is used.
    pub fn from_legacy(
        points: Vec<Pos>,
        types: &[LegacyId],
        cells: &O2m<PointId>,
        faces: &[LegacyId],
        locations: &[LegacyId],
    ) -> Result<Self> {
        if types.len() != cells.len() {
            return Err(Error::malformed(format!(
                "{} cell types but {} cells",
                types.len(),
                cells.len(),
            )));
        }

        let legacy = LegacyFaces::new(faces, locations);
        let mut out = Self::from_points(points);
        for (i, &code) in types.iter().enumerate() {
            let ty = CellType::from_code(code)?;
            if ty != CellType::Polyhedron {
                out.add_cell(ty, cells.get(i)?)?;
                continue;
            }

            let cell_faces = legacy.cell(i)
                .map_err(|e| match e {
                    Error::IndexOutOfRange { .. } => Error::malformed(format!(
                        "no face location for polyhedron {} ({} locations)",
                        i,
                        locations.len(),
                    )),
                    other => other,
                })?
                .ok_or_else(|| Error::malformed(format!("polyhedron {} has location -1", i)))?;
            out.add_polyhedron(&cell_faces)?;
        }

        Ok(out)
    }

    /// Replaces the point data. Panics if the arrays have fewer tuples than
    /// there are points.
    pub fn set_point_data(&mut self, data: AttributeData) {
        assert!(
            data.is_empty() || data.num_tuples() >= self.num_points(),
            "point data has {} tuples for {} points",
            data.num_tuples(),
            self.num_points(),
        );
        self.point_data = data;
    }

    /// Replaces the cell data. Panics if the arrays have fewer tuples than
    /// there are cells.
    pub fn set_cell_data(&mut self, data: AttributeData) {
        assert!(
            data.is_empty() || data.num_tuples() >= self.num_cells(),
            "cell data has {} tuples for {} cells",
            data.num_tuples(),
            self.num_cells(),
        );
        self.cell_data = data;
    }
}


/// Polyhedra generated by clipping: faces per cell and point ids per face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyhedronCells {
    cell_faces: O2m<FaceId>,
    faces: O2m<PointId>,
}

impl PolyhedronCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cell_faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_faces.is_empty()
    }

    /// Total number of faces over all cells.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Appends a cell and returns its index.
    pub fn push<F: AsRef<[PointId]>>(&mut self, faces: &[F]) -> usize {
        let first = self.faces.len();
        for face in faces {
            self.faces.push(face.as_ref().iter().cloned());
        }
        self.cell_faces.push((first..self.faces.len()).map(FaceId::from_usize))
    }

    /// The faces of cell `i`.
    pub fn cell(&self, i: usize) -> Result<Vec<&[PointId]>> {
        self.cell_faces.get(i)?
            .iter()
            .map(|f| self.faces.get(f.to_usize()))
            .collect()
    }

    /// Iterator over all cells' faces.
    pub fn iter(&self) -> impl Iterator<Item = Vec<&[PointId]>> + '_ {
        self.cell_faces.iter()
            .map(move |faces| faces.iter().map(|f| &self.faces[f.to_usize()]).collect())
    }

    /// Appends all cells of `other`, translating point ids with `map`.
    pub fn extend_mapped(&mut self, other: &PolyhedronCells, mut map: impl FnMut(PointId) -> PointId) {
        for cell in other.iter() {
            let faces: Vec<Face> = cell.iter()
                .map(|f| f.iter().map(|&id| map(id)).collect())
                .collect();
            self.push(&faces);
        }
    }

    /// Turns the cells into a grid of polyhedra over the given points.
    pub fn into_grid(self, points: Vec<Pos>) -> Result<UnstructuredGrid> {
        let mut grid = UnstructuredGrid::from_points(points);
        for cell in self.iter() {
            grid.add_polyhedron(&cell)?;
        }
        Ok(grid)
    }
}
