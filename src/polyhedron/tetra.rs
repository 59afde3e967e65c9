//! Decomposition of a polyhedron into tetrahedra.
//!
//! A cell that is star-shaped (all boundary triangles are seen from the
//! inside by one point) is fanned from that point: its vertex centroid if
//! possible, one of its own points otherwise. Other cells are first cut by
//! axis aligned planes until every part is star-shaped. A plane never passes
//! through a point, and it cuts every part it crosses, so neighbouring parts
//! meet in identical triangles and the tetrahedra are conforming.

use std::cmp::Ordering;

use cgmath::{prelude::*, Point3};
use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    handle::PointId,
    math::{tet_volume, BoundingBox, Pos, Vec3},
};
use super::{polygon::triangulate_polygon, Polyhedron};


/// Upper limit of cutting planes used for a single cell.
const MAX_SPLITS: usize = 16;

/// A point of a [`Tetrahedralization`] as a combination of cell points:
/// `(local index, weight)` pairs with weights summing to one.
pub type Weights = SmallVec<[(usize, f64); 4]>;

/// Where a point of a [`Tetrahedralization`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetPoint {
    /// A point of the cell, with its local index and global id.
    Cell { local: usize, id: PointId },

    /// The vertex centroid of the cell, an additional point.
    Centroid,

    /// An additional point created while cutting a cell that is not
    /// star-shaped: the crossing of a plane with an edge, or the centroid
    /// of a part. See [`Tetrahedralization::weights`].
    Derived,
}

/// Tetrahedra covering a polyhedron (result of [`Polyhedron::triangulate`]).
///
/// The first `n` points are the cell's points in local order, additional
/// points follow. Every tetrahedron has positive volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Tetrahedralization {
    pub points: Vec<Pos>,
    pub sources: Vec<TetPoint>,

    /// How each point is interpolated from the cell points.
    pub weights: Vec<Weights>,

    pub tets: Vec<[usize; 4]>,
}

impl Tetrahedralization {
    fn empty() -> Self {
        Self {
            points: Vec::new(),
            sources: Vec::new(),
            weights: Vec::new(),
            tets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tets.len()
    }

    /// Index of the centroid point, if there is one.
    pub fn centroid_index(&self) -> Option<usize> {
        self.sources.iter().position(|s| *s == TetPoint::Centroid)
    }

    /// The global id of point `i`, `None` for additional points.
    pub fn source_id(&self, i: usize) -> Option<PointId> {
        match self.sources.get(i) {
            Some(TetPoint::Cell { id, .. }) => Some(*id),
            _ => None,
        }
    }

    /// Corner positions of a tetrahedron.
    pub fn corners(&self, tet: &[usize; 4]) -> [Pos; 4] {
        [
            self.points[tet[0]],
            self.points[tet[1]],
            self.points[tet[2]],
            self.points[tet[3]],
        ]
    }

    /// All tetrahedra as one flat list of point indices, four per
    /// tetrahedron.
    pub fn flat_connectivity(&self) -> Vec<usize> {
        self.tets.iter().flat_map(|t| t.iter().cloned()).collect()
    }

    /// Sum of all tetrahedra volumes.
    pub fn volume(&self) -> f64 {
        self.tets.iter()
            .map(|t| {
                let [a, b, c, d] = self.corners(t);
                tet_volume(a, b, c, d)
            })
            .sum()
    }

    /// Extends per cell point values (`num_components` each, local order)
    /// to all points of the decomposition using [`Self::weights`]. Exact
    /// for linear fields.
    pub fn extend_values(&self, values: &[f64], num_components: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.points.len() * num_components);
        for weights in &self.weights {
            for comp in 0..num_components {
                let v = weights.iter()
                    .map(|&(local, w)| w * values[local * num_components + comp])
                    .sum();
                out.push(v);
            }
        }

        out
    }
}

impl Polyhedron<'_> {
    /// Decomposes the cell into tetrahedra (`Triangulate`).
    ///
    /// Faces are triangulated by ear clipping. Convex and star-shaped cells
    /// are fanned from the vertex centroid (or from a cell point that sees
    /// every face triangle); other cells are cut into star-shaped parts
    /// first (see the module documentation). Tetrahedra are oriented to
    /// have positive volume; flat ones are dropped. Cells that are not
    /// closed or have no volume yield an empty result.
    pub fn triangulate(&self) -> Tetrahedralization {
        let center = match self.centroid() {
            Some(c) if !self.face_triangles().is_empty() && self.table().is_closed() => c,
            _ => return Tetrahedralization::empty(),
        };

        let mut builder = Builder::new(self);
        let triangles: Vec<[usize; 3]> = self.face_triangles().iter().map(|t| t.corners).collect();
        let reference = self.bounds().center();
        let signed: f64 = triangles.iter()
            .map(|&[a, b, c]| tet_volume(builder.points[a], builder.points[b], builder.points[c], reference))
            .sum();
        if signed.abs() <= builder.min_volume {
            return Tetrahedralization::empty();
        }
        builder.orientation = signed.signum();

        let n = self.num_points();
        let cell = Part::new(triangles, true);
        let centroid = (center, TetPoint::Centroid, (0..n).map(|l| (l, 1.0 / n as f64)).collect());
        let apex = builder.find_apex(&cell.triangles, centroid);
        let mut parts = vec![Part { apex, ..cell }];

        for _ in 0..MAX_SPLITS {
            let blocked = match parts.iter().position(|p| p.apex.is_none()) {
                Some(i) => i,
                None => break,
            };
            let (axis, value) = match builder.split_plane(&parts[blocked].triangles) {
                Some(plane) => plane,
                None => break,
            };
            match builder.split(&parts, axis, value) {
                Some(split) => parts = split,
                None => break,
            }
        }

        let mut tets = Vec::new();
        for mut part in parts {
            let apex = match part.apex.take() {
                Some(apex) => apex,
                None => {
                    log::warn!(
                        "no star-shaped decomposition found, fanning {} triangles from their centroid",
                        part.triangles.len(),
                    );
                    let (pos, source, weights) = builder.centroid_of(&part);
                    Apex::New(pos, source, weights)
                }
            };

            let apex = match apex {
                Apex::Point(i) => i,
                Apex::New(pos, source, weights) => builder.push(pos, source, weights),
            };
            builder.fan(&part.triangles, apex, &mut tets);
        }

        if tets.is_empty() {
            return Tetrahedralization::empty();
        }

        builder.finish(n, tets)
    }
}

/// The apex a part is fanned from.
#[derive(Debug, Clone)]
enum Apex {
    /// An existing point.
    Point(usize),

    /// A point still to be added.
    New(Pos, TetPoint, Weights),
}

/// A closed part of the cell, bounded by consistently oriented triangles.
#[derive(Debug, Clone)]
struct Part {
    triangles: Vec<[usize; 3]>,
    is_cell: bool,
    apex: Option<Apex>,
}

impl Part {
    fn new(triangles: Vec<[usize; 3]>, is_cell: bool) -> Self {
        Self { triangles, is_cell, apex: None }
    }
}

/// The growing point set of a decomposition.
struct Builder {
    points: Vec<Pos>,
    sources: Vec<TetPoint>,
    weights: Vec<Weights>,

    /// `+1` or `-1`: the sign of the volume of a boundary triangle with a
    /// point on its inner side.
    orientation: f64,
    min_volume: f64,
    diagonal: f64,
}

impl Builder {
    fn new(poly: &Polyhedron<'_>) -> Self {
        let diagonal = poly.bounds().diagonal();
        let mut weights = Vec::with_capacity(poly.num_points());
        for local in 0..poly.num_points() {
            let mut w = Weights::new();
            w.push((local, 1.0));
            weights.push(w);
        }

        Self {
            points: poly.positions().collect(),
            sources: poly.point_ids().iter()
                .enumerate()
                .map(|(local, &id)| TetPoint::Cell { local, id })
                .collect(),
            weights,
            orientation: 1.0,
            min_volume: 1e-12 * diagonal * diagonal * diagonal,
            diagonal,
        }
    }

    fn push(&mut self, pos: Pos, source: TetPoint, weights: Weights) -> usize {
        self.points.push(pos);
        self.sources.push(source);
        self.weights.push(weights);
        self.points.len() - 1
    }

    fn volume(&self, [a, b, c]: [usize; 3], apex: Pos) -> f64 {
        tet_volume(self.points[a], self.points[b], self.points[c], apex)
    }

    /// Returns `true` if `apex` lies on the inner side of (or in the plane
    /// of) every triangle and properly inside at least one.
    fn sees_all(&self, triangles: &[[usize; 3]], apex: Pos) -> bool {
        let mut any = false;
        for &tri in triangles {
            let v = self.orientation * self.volume(tri, apex);
            if v < -self.min_volume {
                return false;
            }
            any |= v > self.min_volume;
        }
        any
    }

    /// Tries the centroid first, then every point of the part.
    fn find_apex(&self, triangles: &[[usize; 3]], centroid: (Pos, TetPoint, Weights)) -> Option<Apex> {
        if self.sees_all(triangles, centroid.0) {
            return Some(Apex::New(centroid.0, centroid.1, centroid.2));
        }

        vertices(triangles).into_iter()
            .find(|&v| self.sees_all(triangles, self.points[v]))
            .map(Apex::Point)
    }

    /// The vertex centroid of a part. For the whole cell this is the cell's
    /// centroid.
    fn centroid_of(&self, part: &Part) -> (Pos, TetPoint, Weights) {
        let vertices = vertices(&part.triangles);
        let n = vertices.len() as f64;
        let mut sum = Vec3::zero();
        let mut weights = Weights::new();
        for &v in &vertices {
            sum += self.points[v].to_vec();
            for &(local, w) in &self.weights[v] {
                add_weight(&mut weights, local, w / n);
            }
        }

        let pos = Point3::from_vec(sum / n);
        let source = if part.is_cell { TetPoint::Centroid } else { TetPoint::Derived };
        (pos, source, weights)
    }

    /// Picks a cutting plane `(axis, value)` for a part: across its longest
    /// extent, in the gap between point coordinates closest to its center.
    /// Gaps are taken over all points, so no point lies on the plane.
    fn split_plane(&self, triangles: &[[usize; 3]]) -> Option<(usize, f64)> {
        let bounds = BoundingBox::around(vertices(triangles).into_iter().map(|v| self.points[v]));
        let extent = bounds.max() - bounds.min();
        let mut axes = [0, 1, 2];
        axes.sort_by(|&a, &b| extent[b].partial_cmp(&extent[a]).unwrap_or(Ordering::Equal));

        let min_gap = 1e-9 * self.diagonal;
        for &axis in &axes {
            let (lo, hi) = (bounds.min()[axis], bounds.max()[axis]);
            let center = 0.5 * (lo + hi);
            let mut coords: Vec<f64> = self.points.iter()
                .map(|p| p[axis])
                .filter(|&c| c >= lo && c <= hi)
                .collect();
            coords.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            coords.dedup();

            let best = coords.windows(2)
                .filter(|w| w[1] - w[0] > min_gap)
                .map(|w| 0.5 * (w[0] + w[1]))
                .min_by(|a, b| {
                    (a - center).abs().partial_cmp(&(b - center).abs()).unwrap_or(Ordering::Equal)
                });
            if let Some(value) = best {
                return Some((axis, value));
            }
        }

        None
    }

    /// Cuts every part crossed by the plane. `None` if a cut could not be
    /// closed properly.
    fn split(&mut self, parts: &[Part], axis: usize, value: f64) -> Option<Vec<Part>> {
        let mut crossings = FxHashMap::default();
        let mut out = Vec::with_capacity(parts.len() + 1);
        for part in parts {
            let below = part.triangles.iter()
                .flat_map(|t| t.iter())
                .filter(|&&v| self.points[v][axis] < value)
                .count();
            if below == 0 || below == 3 * part.triangles.len() {
                out.push(part.clone());
                continue;
            }

            let (lower, upper) = self.cut(&part.triangles, axis, value, &mut crossings)?;
            for triangles in vec![lower, upper] {
                let mut new = Part::new(triangles, false);
                let centroid = self.centroid_of(&new);
                new.apex = self.find_apex(&new.triangles, centroid);
                out.push(new);
            }
        }

        Some(out)
    }

    /// Cuts a part into the pieces below and above the plane. Both pieces
    /// are closed by the same cap triangles, with opposite orientation.
    fn cut(
        &mut self,
        triangles: &[[usize; 3]],
        axis: usize,
        value: f64,
        crossings: &mut FxHashMap<(usize, usize), usize>,
    ) -> Option<(Vec<[usize; 3]>, Vec<[usize; 3]>)> {
        let mut lower = Vec::new();
        let mut upper = Vec::new();

        // Cap edges of the lower piece, from the crossing where its
        // boundary enters a triangle to the one where it leaves.
        let mut cap: FxHashMap<usize, usize> = FxHashMap::default();

        for &tri in triangles {
            let below = [
                self.points[tri[0]][axis] < value,
                self.points[tri[1]][axis] < value,
                self.points[tri[2]][axis] < value,
            ];
            if below.iter().all(|&b| b) {
                lower.push(tri);
                continue;
            }
            if below.iter().all(|&b| !b) {
                upper.push(tri);
                continue;
            }

            let mut lo: SmallVec<[usize; 4]> = SmallVec::new();
            let mut hi: SmallVec<[usize; 4]> = SmallVec::new();
            let (mut entry, mut exit) = (None, None);
            for i in 0..3 {
                let (u, w) = (tri[i], tri[(i + 1) % 3]);
                if below[i] {
                    lo.push(u);
                } else {
                    hi.push(u);
                }

                if below[i] != below[(i + 1) % 3] {
                    let x = self.crossing(u, w, axis, value, crossings);
                    lo.push(x);
                    hi.push(x);
                    if below[i] {
                        exit = Some(x);
                    } else {
                        entry = Some(x);
                    }
                }
            }

            push_polygon(&mut lower, &lo);
            push_polygon(&mut upper, &hi);
            if cap.insert(entry?, exit?).is_some() {
                return None;
            }
        }

        let mut starts: Vec<usize> = cap.keys().cloned().collect();
        starts.sort();
        let mut loops = Vec::new();
        for start in starts {
            if !cap.contains_key(&start) {
                continue;
            }

            let mut cycle = Vec::new();
            let mut current = start;
            loop {
                let next = cap.remove(&current)?;
                cycle.push(current);
                current = next;
                if current == start {
                    break;
                }
            }
            if cycle.len() >= 3 {
                loops.push(cycle);
            }
        }

        if has_nested_loops(&loops, &self.points, axis) {
            return None;
        }

        for cycle in &loops {
            let coords: Vec<_> = cycle.iter().map(|&v| self.points[v]).collect();
            for [a, b, c] in triangulate_polygon(&coords) {
                lower.push([cycle[a], cycle[b], cycle[c]]);
                upper.push([cycle[a], cycle[c], cycle[b]]);
            }
        }

        Some((lower, upper))
    }

    /// The point where the plane crosses the edge `u`-`w`. Computed from
    /// the smaller index, so both triangles of an edge get the same point.
    fn crossing(
        &mut self,
        u: usize,
        w: usize,
        axis: usize,
        value: f64,
        crossings: &mut FxHashMap<(usize, usize), usize>,
    ) -> usize {
        let key = (u.min(w), u.max(w));
        if let Some(&x) = crossings.get(&key) {
            return x;
        }

        let (pa, pb) = (self.points[key.0], self.points[key.1]);
        let t = (value - pa[axis]) / (pb[axis] - pa[axis]);
        let mut pos = pa + (pb - pa) * t;
        pos[axis] = value;

        let mut weights = Weights::new();
        for &(local, w) in &self.weights[key.0] {
            add_weight(&mut weights, local, w * (1.0 - t));
        }
        for &(local, w) in &self.weights[key.1] {
            add_weight(&mut weights, local, w * t);
        }

        let x = self.push(pos, TetPoint::Derived, weights);
        crossings.insert(key, x);
        x
    }

    /// Connects all triangles to `apex`, skipping flat tetrahedra.
    fn fan(&self, triangles: &[[usize; 3]], apex: usize, tets: &mut Vec<[usize; 4]>) {
        for &[a, b, c] in triangles {
            let volume = self.volume([a, b, c], self.points[apex]);
            if volume.abs() <= self.min_volume {
                continue;
            }

            if volume > 0.0 {
                tets.push([a, b, c, apex]);
            } else {
                tets.push([a, c, b, apex]);
            }
        }
    }

    /// Drops additional points no tetrahedron uses and builds the result.
    fn finish(self, num_cell_points: usize, mut tets: Vec<[usize; 4]>) -> Tetrahedralization {
        let mut used = vec![false; self.points.len()];
        for tet in &tets {
            for &i in tet {
                used[i] = true;
            }
        }

        let mut remap = vec![0; self.points.len()];
        let mut out = Tetrahedralization::empty();
        let points = self.points.into_iter().zip(self.sources).zip(self.weights);
        for (i, ((pos, source), weights)) in points.enumerate() {
            if i < num_cell_points || used[i] {
                remap[i] = out.points.len();
                out.points.push(pos);
                out.sources.push(source);
                out.weights.push(weights);
            }
        }

        for tet in &mut tets {
            for i in tet.iter_mut() {
                *i = remap[*i];
            }
        }
        out.tets = tets;
        out
    }
}

/// All distinct points referenced by the triangles, ascending.
fn vertices(triangles: &[[usize; 3]]) -> Vec<usize> {
    let mut out: Vec<usize> = triangles.iter().flat_map(|t| t.iter().cloned()).collect();
    out.sort();
    out.dedup();
    out
}

fn add_weight(weights: &mut Weights, local: usize, w: f64) {
    match weights.iter_mut().find(|e| e.0 == local) {
        Some(e) => e.1 += w,
        None => weights.push((local, w)),
    }
}

/// Adds a triangle or a quad (fanned from its smallest index, so both
/// sides of a shared quad pick the same diagonal).
fn push_polygon(out: &mut Vec<[usize; 3]>, poly: &[usize]) {
    let n = poly.len();
    let start = (0..n).min_by_key(|&i| poly[i]).unwrap_or(0);
    let v = |i: usize| poly[(start + i) % n];
    for i in 1..n.saturating_sub(1) {
        out.push([v(0), v(i), v(i + 1)]);
    }
}

/// Returns `true` if a cap loop lies within another one (a cap with a
/// hole), which the cap triangulation can't handle.
fn has_nested_loops(loops: &[Vec<usize>], points: &[Pos], axis: usize) -> bool {
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    let inside = |cycle: &[usize], p: Pos| {
        let mut inside = false;
        for i in 0..cycle.len() {
            let a = points[cycle[i]];
            let b = points[cycle[(i + 1) % cycle.len()]];
            if (a[v] > p[v]) != (b[v] > p[v]) {
                let at = a[u] + (p[v] - a[v]) / (b[v] - a[v]) * (b[u] - a[u]);
                if p[u] < at {
                    inside = !inside;
                }
            }
        }
        inside
    };

    loops.iter().enumerate().any(|(i, outer)| {
        loops.iter()
            .enumerate()
            .any(|(j, other)| i != j && inside(outer, points[other[0]]))
    })
}
