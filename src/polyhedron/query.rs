//! Point location and differential queries on a polyhedron.

use std::f64::consts::PI;

use cgmath::{prelude::*, Matrix3};

use crate::{
    error::{Error, Result},
    math::{closest_point_on_triangle, segment_triangle, solid_angle, Pos, Pos3Like, Vec3},
};
use super::Polyhedron;


/// Result of [`Polyhedron::intersect_with_line`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineHit {
    /// Parameter of the closest hit along the segment (`0` at `p1`, `1` at
    /// `p2`).
    pub t: f64,

    /// Position of the closest hit.
    pub x: Pos,

    /// Parametric coordinates of `x`.
    pub pcoords: [f64; 3],

    /// Index of the face that was hit first.
    pub sub_id: usize,

    /// Number of faces the segment crosses. For convex cells this is `0`,
    /// `1` (segment ends inside) or `2`.
    pub num_hits: usize,
}

/// Result of [`Polyhedron::evaluate_position`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `x` itself if it is inside, otherwise the closest point on the
    /// boundary.
    pub closest: Pos,

    /// The face closest to `x`.
    pub sub_id: usize,

    /// Parametric coordinates of `closest`.
    pub pcoords: [f64; 3],

    /// Squared distance between `x` and `closest`. `0` when inside.
    pub dist2: f64,

    /// Interpolation weights of `closest` over the cell points (local
    /// order).
    pub weights: Vec<f64>,

    pub inside: bool,
}

impl Polyhedron<'_> {
    /// Returns the closest point to `x` on the boundary, the face it lies on
    /// and the squared distance.
    pub fn closest_point(&self, x: impl Pos3Like) -> Result<(Pos, usize, f64)> {
        let x = x.to_point3();
        let mut best: Option<(Pos, usize, f64)> = None;
        for tri in self.face_triangles() {
            let [a, b, c] = tri.corners;
            let p = closest_point_on_triangle(x, self.point(a), self.point(b), self.point(c));
            let d2 = p.distance2(x);
            if best.map(|(_, _, bd)| d2 < bd).unwrap_or(true) {
                best = Some((p, tri.face, d2));
            }
        }

        best.ok_or_else(|| Error::degenerate("polyhedron has no non-degenerate face"))
    }

    /// Point in polyhedron test (`IsInside`).
    ///
    /// `tolerance` is relative to the bounding box diagonal. Points outside
    /// the (grown) bounding box are rejected right away, points within the
    /// tolerance of the boundary count as inside. All other points are
    /// classified by their generalized winding number: the sum of the
    /// solid angles of all boundary triangles divided by `4π`, which is `±1`
    /// inside and `0` outside of a closed surface.
    pub fn is_inside(&self, x: impl Pos3Like, tolerance: f64) -> bool {
        let x = x.to_point3();
        let tol = self.abs_tolerance(tolerance);
        if self.face_triangles().is_empty() || !self.bounds().contains(x, tol) {
            return false;
        }

        match self.closest_point(x) {
            Ok((_, _, d2)) if d2 <= tol * tol => return true,
            Err(_) => return false,
            _ => {}
        }

        self.winding_number(x).abs() >= 0.5
    }

    /// Generalized winding number of `x` with respect to the boundary.
    pub fn winding_number(&self, x: impl Pos3Like) -> f64 {
        let x = x.to_point3();
        let total: f64 = self.face_triangles().iter()
            .map(|tri| {
                let [a, b, c] = tri.corners;
                solid_angle(x, self.point(a), self.point(b), self.point(c))
            })
            .sum();

        total / (4.0 * PI)
    }

    /// Intersects the segment `p1 → p2` with all faces
    /// (`IntersectWithLine`) and returns the closest hit, if any.
    ///
    /// `tolerance` is relative to the bounding box diagonal, as for
    /// [`Polyhedron::is_inside`]: hits at most that far outside a face (or
    /// beyond the ends of the segment) still count. A face crossed at
    /// several of its triangles (e.g. along the diagonal of a quad) counts
    /// once.
    pub fn intersect_with_line(
        &self,
        p1: impl Pos3Like,
        p2: impl Pos3Like,
        tolerance: f64,
    ) -> Option<LineHit> {
        let p1 = p1.to_point3();
        let p2 = p2.to_point3();
        let tol = self.abs_tolerance(tolerance);

        let mut best: Option<(f64, usize)> = None;
        let mut hit_faces: Vec<usize> = Vec::new();
        for tri in self.face_triangles() {
            let [a, b, c] = tri.corners;
            let t = match segment_triangle(p1, p2, self.point(a), self.point(b), self.point(c), tol) {
                Some(t) => t,
                None => continue,
            };

            if !hit_faces.contains(&tri.face) {
                hit_faces.push(tri.face);
            }
            if best.map(|(bt, _)| t < bt).unwrap_or(true) {
                best = Some((t, tri.face));
            }
        }

        best.map(|(t, sub_id)| {
            let x = p1 + (p2 - p1) * t;
            LineHit {
                t,
                x,
                pcoords: self.parametric_coords(x),
                sub_id,
                num_hits: hit_faces.len(),
            }
        })
    }

    /// Locates `x` relative to the cell (`EvaluatePosition`).
    ///
    /// Fails with [`Error::DegenerateGeometry`] if the cell has no proper
    /// face.
    pub fn evaluate_position(&self, x: impl Pos3Like) -> Result<Evaluation> {
        let x = x.to_point3();
        let (surface, sub_id, d2) = self.closest_point(x)?;
        let inside = self.is_inside(x, self.config().tolerance);

        let (closest, dist2) = if inside { (x, 0.0) } else { (surface, d2) };
        Ok(Evaluation {
            closest,
            sub_id,
            pcoords: self.parametric_coords(closest),
            dist2,
            weights: self.interpolation_weights(closest),
            inside,
        })
    }

    /// Maps parametric coordinates back to a position and its interpolation
    /// weights (`EvaluateLocation`).
    pub fn evaluate_location(&self, pcoords: [f64; 3]) -> (Pos, Vec<f64>) {
        let x = self.position_from_parametric(pcoords);
        (x, self.interpolation_weights(x))
    }

    /// Spatial derivatives of a point field at the given parametric
    /// coordinates (`Derivatives`).
    ///
    /// `values` holds `num_components` values per cell point (local order).
    /// The result holds `d/dx, d/dy, d/dz` for each component, i.e. it has
    /// `3 * num_components` entries. The gradient is the one of the linear
    /// interpolant over the tetrahedron (of [`Polyhedron::triangulate`])
    /// containing the location, or the closest one for points outside.
    ///
    /// Fails with [`Error::IndexOutOfRange`] if `values` holds less than
    /// `num_components * self.num_points()` entries.
    pub fn derivatives(&self, pcoords: [f64; 3], values: &[f64], num_components: usize) -> Result<Vec<f64>> {
        let expected = num_components * self.num_points();
        if values.len() < expected {
            return Err(Error::out_of_range("value", expected - 1, values.len()));
        }

        let tets = self.triangulate();
        if tets.is_empty() {
            return Err(Error::degenerate("polyhedron can't be decomposed into tetrahedra"));
        }

        let x = self.position_from_parametric(pcoords);
        let mut best: Option<(usize, f64)> = None;
        for (i, tet) in tets.tets.iter().enumerate() {
            let lambda = match barycentric(&tets.corners(tet), x) {
                Some(l) => l,
                None => continue,
            };
            let worst = lambda.iter().cloned().fold(f64::INFINITY, f64::min);
            if best.map(|(_, bw)| worst > bw).unwrap_or(true) {
                best = Some((i, worst));
            }
        }

        let tet = match best {
            Some((i, _)) => tets.tets[i],
            None => return Err(Error::degenerate("all tetrahedra are flat")),
        };
        let corners = tets.corners(&tet);
        let tet_values = tets.extend_values(values, num_components);

        let mut out = Vec::with_capacity(3 * num_components);
        for comp in 0..num_components {
            let f = |node: usize| tet_values[node * num_components + comp];
            let df = Vec3::new(
                f(tet[1]) - f(tet[0]),
                f(tet[2]) - f(tet[0]),
                f(tet[3]) - f(tet[0]),
            );
            let g = gradient(&corners, df)
                .ok_or_else(|| Error::degenerate("tetrahedron is flat"))?;
            out.extend_from_slice(&[g.x, g.y, g.z]);
        }

        Ok(out)
    }
}

/// Matrix with the edge vectors `p1 - p0`, `p2 - p0`, `p3 - p0` as columns.
fn edge_matrix(corners: &[Pos; 4]) -> Matrix3<f64> {
    Matrix3::from_cols(
        corners[1] - corners[0],
        corners[2] - corners[0],
        corners[3] - corners[0],
    )
}

/// Barycentric coordinates of `x` in the tetrahedron. `None` if flat.
pub(crate) fn barycentric(corners: &[Pos; 4], x: Pos) -> Option<[f64; 4]> {
    let inv = edge_matrix(corners).invert()?;
    let l = inv * (x - corners[0]);
    Some([1.0 - l.x - l.y - l.z, l.x, l.y, l.z])
}

/// Gradient of the linear function on the tetrahedron whose value
/// differences along the edges from corner 0 are `df`.
pub(crate) fn gradient(corners: &[Pos; 4], df: Vec3) -> Option<Vec3> {
    let inv = edge_matrix(corners).transpose().invert()?;
    Some(inv * df)
}
