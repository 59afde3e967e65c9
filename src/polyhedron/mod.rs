//! A single polyhedral cell and everything that can be computed on it.
//!
//! A [`Polyhedron`] is a cheap view: it borrows the point arena of a grid
//! and owns the [`FaceTable`] of one cell plus a few cached derived values
//! (bounds, the triangulation of each face). All queries take `&self`, so a
//! polyhedron can be shared between threads.

use cgmath::prelude::*;

use crate::{
    config::QueryConfig,
    conn::Face,
    error::{Error, Result},
    handle::{Handle, PointId},
    math::{centroid, newell_normal, tet_volume, BoundingBox, Pos, Pos3Like},
};


mod cut;
mod face_table;
mod interp;
mod polygon;
mod query;
mod tetra;
#[cfg(test)]
mod tests;

pub use self::{
    cut::CutAttributes,
    face_table::FaceTable,
    polygon::triangulate_polygon,
    query::{Evaluation, LineHit},
    tetra::{TetPoint, Tetrahedralization, Weights},
};


/// One triangle of the triangulated boundary, in local point indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FaceTriangle {
    pub(crate) face: usize,
    pub(crate) corners: [usize; 3],
}

/// A polyhedral cell: a borrowed point arena and the cell's face table.
#[derive(Debug, Clone)]
pub struct Polyhedron<'a> {
    points: &'a [Pos],
    table: FaceTable,
    bounds: BoundingBox,
    triangles: Vec<FaceTriangle>,
    config: QueryConfig,
}

impl<'a> Polyhedron<'a> {
    /// Builds the polyhedron from its faces. Every point id has to be a
    /// valid index into `points`, otherwise [`Error::IndexOutOfRange`] is
    /// returned.
    pub fn new<F: AsRef<[PointId]>>(points: &'a [Pos], faces: &[F]) -> Result<Self> {
        Self::from_table(points, FaceTable::from_faces(faces))
    }

    /// Builds the polyhedron from an already built face table.
    pub fn from_table(points: &'a [Pos], table: FaceTable) -> Result<Self> {
        if let Some(bad) = table.point_ids().iter().find(|id| id.to_usize() >= points.len()) {
            return Err(Error::out_of_range("point", bad.to_usize(), points.len()));
        }

        let bounds = BoundingBox::around(
            table.point_ids().iter().map(|id| points[id.to_usize()])
        );

        let mut triangles = Vec::new();
        for (face, local) in table.local_faces().iter().enumerate() {
            let coords: Vec<_> = local.iter().map(|&l| points[table.point_ids()[l].to_usize()]).collect();
            for [a, b, c] in triangulate_polygon(&coords) {
                let corners = [local[a], local[b], local[c]];
                if corners[0] != corners[1] && corners[1] != corners[2] && corners[0] != corners[2] {
                    triangles.push(FaceTriangle { face, corners });
                }
            }
        }

        Ok(Self {
            points,
            table,
            bounds,
            triangles,
            config: QueryConfig::default(),
        })
    }

    /// Replaces the tolerances used by the queries.
    pub fn with_config(self, config: QueryConfig) -> Self {
        Self { config, ..self }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn table(&self) -> &FaceTable {
        &self.table
    }

    pub fn num_points(&self) -> usize {
        self.table.num_points()
    }

    pub fn num_faces(&self) -> usize {
        self.table.num_faces()
    }

    pub fn num_edges(&self) -> usize {
        self.table.num_edges()
    }

    /// Global ids of the cell's points, in local index order.
    pub fn point_ids(&self) -> &[PointId] {
        self.table.point_ids()
    }

    /// Position of the point with the given local index.
    ///
    /// Panics if `local >= self.num_points()`.
    pub fn point(&self, local: usize) -> Pos {
        self.points[self.table.point_ids()[local].to_usize()]
    }

    /// Iterator over the positions of all cell points, in local order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + Clone + '_ {
        self.table.point_ids().iter().map(move |id| self.points[id.to_usize()])
    }

    /// Returns face `i` in global point ids.
    pub fn face(&self, i: usize) -> Result<Face> {
        self.table.face(i)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub(crate) fn face_triangles(&self) -> &[FaceTriangle] {
        &self.triangles
    }

    /// The geometric tolerance in absolute units.
    pub(crate) fn abs_tolerance(&self, relative: f64) -> f64 {
        relative * self.bounds.diagonal()
    }

    /// Maps a position to parametric coordinates (relative to the bounding
    /// box, see [`BoundingBox::to_parametric`]).
    pub fn parametric_coords(&self, x: impl Pos3Like) -> [f64; 3] {
        self.bounds.to_parametric(x)
    }

    /// Inverse of [`Polyhedron::parametric_coords`].
    pub fn position_from_parametric(&self, pcoords: [f64; 3]) -> Pos {
        self.bounds.from_parametric(pcoords)
    }

    /// The vertex centroid (plain average of all cell points). `None` for a
    /// cell without points.
    pub fn centroid(&self) -> Option<Pos> {
        centroid(self.positions())
    }

    /// Enclosed volume computed with the divergence theorem over the
    /// triangulated faces. Independent of whether the faces point inwards or
    /// outwards, as long as they are consistently oriented.
    pub fn volume(&self) -> f64 {
        let reference = self.bounds.center();
        let signed: f64 = self.triangles.iter()
            .map(|t| {
                let [a, b, c] = t.corners;
                tet_volume(self.point(a), self.point(b), self.point(c), reference)
            })
            .sum();

        signed.abs()
    }

    /// Returns `true` if all cell points lie on the inner side of (or on)
    /// every face plane.
    pub fn is_convex(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }

        let tol = self.abs_tolerance(self.config.tolerance);
        let mut orientation = 0.0;
        for face in self.table.local_faces().iter() {
            let coords: Vec<_> = face.iter().map(|&l| self.point(l)).collect();
            let normal = newell_normal(coords.iter().cloned());
            let len = normal.magnitude();
            let origin = match centroid(coords.iter().cloned()) {
                Some(c) if len > 0.0 => c,
                _ => continue,
            };
            let normal = normal / len;

            for p in self.positions() {
                let d = normal.dot(p - origin);
                if d.abs() <= tol {
                    continue;
                }

                // All faces must see the remaining points on the same side.
                if orientation == 0.0 {
                    orientation = d.signum();
                } else if d.signum() != orientation {
                    return false;
                }
            }
        }

        true
    }

    /// Returns the face closest to the position given by `pcoords` and
    /// whether that position lies inside the cell.
    pub fn cell_boundary(&self, pcoords: [f64; 3]) -> Result<(Face, bool)> {
        let x = self.position_from_parametric(pcoords);
        let (_, face, _) = self.closest_point(x)?;
        let inside = self.is_inside(x, self.config.tolerance);
        Ok((self.table.face(face)?, inside))
    }
}
