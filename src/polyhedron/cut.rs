//! Contouring and clipping of a polyhedron against a scalar iso value.
//!
//! Both work on the tetrahedral decomposition from
//! [`Polyhedron::triangulate`], which is conforming even for cells that are
//! not star-shaped. Points on tetrahedron edges are computed from the
//! endpoint with the smaller key (global point id, additional points last)
//! towards the other one, so the same edge always yields bitwise identical
//! points, no matter from which tetrahedron or cell it is visited.

use cgmath::prelude::*;
use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{
    attr::AttributeData,
    conn::{Face, O2m},
    error::{Error, Result},
    grid::PolyhedronCells,
    handle::{CellId, Handle, PointId},
    locator::PointLocator,
    math::{newell_normal, tet_volume, Pos},
};
use super::{
    query::gradient,
    tetra::{TetPoint, Tetrahedralization},
    Polyhedron,
};


/// Input and output attributes for [`Polyhedron::contour`] and
/// [`Polyhedron::clip`].
///
/// Input point data is indexed by global point id, input cell data by cell
/// id. Output point data is written at the ids handed out by the locator
/// (only for newly inserted points), output cell data at the index of each
/// emitted polygon or cell. Create the outputs with
/// [`AttributeData::copy_allocate`].
#[derive(Debug)]
pub struct CutAttributes<'a> {
    pub point_data: &'a AttributeData,
    pub out_point_data: &'a mut AttributeData,
    pub cell_data: &'a AttributeData,
    pub out_cell_data: &'a mut AttributeData,
}

/// Vertex key during clipping: the output point id, or `DEFERRED` plus the
/// node index for additional points of the decomposition, which are only
/// inserted if they end up on the output. Those sort after all real ids.
type Vid = u64;
const DEFERRED: Vid = 1 << 63;

/// The six permutations of a prism `(bottom 0 1 2, top 3 4 5)` that move
/// each corner to position 0 while keeping `top[i]` above `bottom[i]`.
const PRISM_PERMUTATIONS: [[usize; 6]; 6] = [
    [0, 1, 2, 3, 4, 5],
    [1, 2, 0, 4, 5, 3],
    [2, 0, 1, 5, 3, 4],
    [3, 5, 4, 0, 2, 1],
    [4, 3, 5, 1, 0, 2],
    [5, 4, 3, 2, 1, 0],
];

impl Polyhedron<'_> {
    /// Contours the cell at `iso` (`Contour`) with marching tetrahedra.
    ///
    /// `scalars` is indexed by global point id. New points are inserted
    /// through `locator`. The triangles and quads cut from neighbouring
    /// tetrahedra are joined, so each connected piece of the iso surface
    /// within the cell becomes one polygon (oriented towards increasing
    /// scalar values) appended to `polys`. A piece whose outline is not a
    /// single loop is emitted as its separate triangles and quads. Point data
    /// is interpolated along the cut edges; cell data of `cell_id` is copied
    /// once per emitted polygon. A node with a value equal to `iso` counts as
    /// above.
    ///
    /// Returns the number of emitted polygons. Degenerate cells emit
    /// nothing.
    pub fn contour<L: PointLocator>(
        &self,
        iso: f64,
        scalars: &[f64],
        locator: &mut L,
        polys: &mut O2m<PointId>,
        mut attributes: Option<&mut CutAttributes<'_>>,
        cell_id: CellId,
    ) -> Result<usize> {
        let values = self.cell_scalars(scalars)?;
        let tets = self.triangulate();
        if tets.is_empty() {
            return Ok(0);
        }

        let mut ctx = Context::new(self, &tets, &values, iso);
        let mut fragments = Vec::new();
        for tet in &tets.tets {
            let s = [ctx.values[tet[0]], ctx.values[tet[1]], ctx.values[tet[2]], ctx.values[tet[3]]];
            let (above, below): (SmallVec<[usize; 4]>, SmallVec<[usize; 4]>) =
                tet.iter().cloned().partition(|&n| ctx.values[n] >= iso);

            let ring: SmallVec<[(usize, usize); 4]> = match above.len() {
                1 => below.iter().map(|&b| (above[0], b)).collect(),
                3 => above.iter().map(|&a| (a, below[0])).collect(),
                2 => {
                    let (a, b, c, d) = (above[0], above[1], below[0], below[1]);
                    [(a, c), (a, d), (b, d), (b, c)].iter().cloned().collect()
                }
                _ => continue,
            };

            let mut ids: Fragment = SmallVec::new();
            let mut positions: SmallVec<[Pos; 4]> = SmallVec::new();
            for (u, v) in ring {
                let (id, pos) = ctx.edge_point(u, v, locator, attributes.as_mut().map(|a| &mut **a));
                if ids.last() != Some(&id) {
                    ids.push(id);
                    positions.push(pos);
                }
            }
            while ids.len() > 1 && ids.first() == ids.last() {
                ids.pop();
                positions.pop();
            }

            let mut distinct = ids.clone();
            distinct.sort();
            distinct.dedup();
            if distinct.len() < 3 {
                continue;
            }

            // Orient the polygon along the scalar gradient.
            let corners = tets.corners(tet);
            let df = cgmath::Vector3::new(s[1] - s[0], s[2] - s[0], s[3] - s[0]);
            let normal = newell_normal(positions.iter().cloned());
            if let Some(g) = gradient(&corners, df) {
                if normal.dot(g) < 0.0 {
                    ids.reverse();
                }
            }

            fragments.push(ids);
        }

        let joined = join_fragments(&fragments);
        for ids in &joined {
            let poly = polys.push(ids.iter().cloned());
            if let Some(attrs) = attributes.as_mut() {
                attrs.out_cell_data.copy_tuple(attrs.cell_data, cell_id.to_usize(), poly);
            }
        }

        Ok(joined.len())
    }

    /// Clips the cell at `iso` (`Clip`) and appends the kept part as a new
    /// polyhedron to `cells`.
    ///
    /// With `inside_out == false` the part with scalar values `>= iso` is
    /// kept, otherwise the part with values `< iso`. Clipping the same cell
    /// both ways partitions its volume. A cell that is kept completely is
    /// copied with its original faces; a cell that is removed completely
    /// emits nothing. Otherwise every tetrahedron of the decomposition is
    /// clipped (kept parts are tetrahedra or prisms, prisms are split along
    /// the diagonals through their smallest output id) and the boundary of
    /// the union of all pieces is emitted as one cell with outward facing
    /// triangles.
    ///
    /// Returns whether a cell was emitted.
    pub fn clip<L: PointLocator>(
        &self,
        iso: f64,
        scalars: &[f64],
        locator: &mut L,
        cells: &mut PolyhedronCells,
        mut attributes: Option<&mut CutAttributes<'_>>,
        cell_id: CellId,
        inside_out: bool,
    ) -> Result<bool> {
        let keep = |v: f64| if inside_out { v < iso } else { v >= iso };

        let values = self.cell_scalars(scalars)?;
        let num_kept = values.iter().filter(|&&v| keep(v)).count();
        if num_kept == 0 || self.face_triangles().is_empty() {
            return Ok(false);
        }

        if num_kept == values.len() {
            let mut ids = Vec::with_capacity(self.num_points());
            for local in 0..self.num_points() {
                let (id, is_new) = locator.insert_unique(self.point(local));
                if is_new {
                    if let Some(attrs) = attributes.as_mut() {
                        let src = self.point_ids()[local].to_usize();
                        attrs.out_point_data.copy_tuple(attrs.point_data, src, id.to_usize());
                    }
                }
                ids.push(id);
            }

            let faces: Vec<Face> = self.table().local_faces().iter()
                .map(|f| f.iter().map(|&l| ids[l]).collect())
                .collect();
            let out = cells.push(&faces);
            if let Some(attrs) = attributes.as_mut() {
                attrs.out_cell_data.copy_tuple(attrs.cell_data, cell_id.to_usize(), out);
            }
            return Ok(true);
        }

        let tets = self.triangulate();
        if tets.is_empty() {
            return Ok(false);
        }

        let mut ctx = Context::new(self, &tets, &values, iso);
        let mut positions: FxHashMap<Vid, Pos> = FxHashMap::default();
        let mut pieces: Vec<[Vid; 4]> = Vec::new();

        for tet in &tets.tets {
            let (kept, removed): (SmallVec<[usize; 4]>, SmallVec<[usize; 4]>) =
                tet.iter().cloned().partition(|&n| keep(ctx.values[n]));

            let mut vid = |node: usize, other: Option<usize>| {
                let (vid, pos) = match other {
                    None => ctx.node_vid(node, locator, attributes.as_mut().map(|a| &mut **a)),
                    Some(other) => ctx.edge_vid(node, other, locator, attributes.as_mut().map(|a| &mut **a)),
                };
                positions.insert(vid, pos);
                vid
            };

            match kept.len() {
                0 => {}
                4 => {
                    let v = [
                        vid(tet[0], None),
                        vid(tet[1], None),
                        vid(tet[2], None),
                        vid(tet[3], None),
                    ];
                    pieces.push(v);
                }
                1 => {
                    let k = kept[0];
                    let v = [
                        vid(k, None),
                        vid(k, Some(removed[0])),
                        vid(k, Some(removed[1])),
                        vid(k, Some(removed[2])),
                    ];
                    pieces.push(v);
                }
                2 => {
                    let (a, b, c, d) = (kept[0], kept[1], removed[0], removed[1]);
                    let prism = [
                        vid(a, None),
                        vid(a, Some(c)),
                        vid(a, Some(d)),
                        vid(b, None),
                        vid(b, Some(c)),
                        vid(b, Some(d)),
                    ];
                    pieces.extend_from_slice(&split_prism(prism));
                }
                _ => {
                    let r = removed[0];
                    let prism = [
                        vid(kept[0], None),
                        vid(kept[1], None),
                        vid(kept[2], None),
                        vid(kept[0], Some(r)),
                        vid(kept[1], Some(r)),
                        vid(kept[2], Some(r)),
                    ];
                    pieces.extend_from_slice(&split_prism(prism));
                }
            }
        }

        let diagonal = self.bounds().diagonal();
        let min_volume = 1e-14 * diagonal * diagonal * diagonal;
        let mut boundary = BoundaryFaces::default();
        for mut piece in pieces {
            let mut sorted = piece;
            sorted.sort();
            if sorted.windows(2).any(|w| w[0] == w[1]) {
                continue;
            }

            let p = |v: Vid| positions[&v];
            let volume = tet_volume(p(piece[0]), p(piece[1]), p(piece[2]), p(piece[3]));
            if volume.abs() <= min_volume {
                continue;
            }
            if volume < 0.0 {
                piece.swap(1, 2);
            }

            let [a, b, c, d] = piece;
            boundary.add([a, c, b]);
            boundary.add([a, b, d]);
            boundary.add([b, c, d]);
            boundary.add([a, d, c]);
        }

        let faces = boundary.into_faces();
        if faces.is_empty() {
            return Ok(false);
        }

        let mut out_faces: Vec<Face> = Vec::with_capacity(faces.len());
        for face in faces {
            let mut out = Face::new();
            for v in face.iter().cloned() {
                let id = if v & DEFERRED != 0 {
                    let node = (v & !DEFERRED) as usize;
                    match ctx.nodes[node] {
                        Some(id) => id,
                        None => ctx.insert_node(node, locator, attributes.as_mut().map(|a| &mut **a)),
                    }
                } else {
                    PointId::new(v as _)
                };
                out.push(id);
            }
            out_faces.push(out);
        }

        let out = cells.push(&out_faces);
        if let Some(attrs) = attributes.as_mut() {
            attrs.out_cell_data.copy_tuple(attrs.cell_data, cell_id.to_usize(), out);
        }

        Ok(true)
    }

    /// Scalars of the cell's points in local order.
    pub(crate) fn cell_scalars(&self, scalars: &[f64]) -> Result<Vec<f64>> {
        self.point_ids().iter()
            .map(|id| {
                scalars.get(id.to_usize())
                    .cloned()
                    .ok_or_else(|| Error::out_of_range("scalar", id.to_usize(), scalars.len()))
            })
            .collect()
    }
}

/// Splits a prism into three tetrahedra. Each quad face is split along the
/// diagonal through its smallest vertex key, so neighbouring pieces agree
/// on shared faces.
fn split_prism(prism: [Vid; 6]) -> [[Vid; 4]; 3] {
    let min = (0..6).min_by_key(|&i| prism[i]).unwrap_or(0);
    let perm = PRISM_PERMUTATIONS[min];
    let w = |i: usize| prism[perm[i]];

    if w(1).min(w(5)) < w(2).min(w(4)) {
        [
            [w(0), w(1), w(2), w(5)],
            [w(0), w(1), w(5), w(4)],
            [w(0), w(4), w(5), w(3)],
        ]
    } else {
        [
            [w(0), w(1), w(2), w(4)],
            [w(0), w(4), w(2), w(5)],
            [w(0), w(4), w(5), w(3)],
        ]
    }
}

/// Counts triangles by their vertex set. Triangles seen once form the
/// boundary of the union of all tetrahedra.
#[derive(Default)]
struct BoundaryFaces {
    order: Vec<[Vid; 3]>,
    count: FxHashMap<[Vid; 3], usize>,
}

impl BoundaryFaces {
    fn add(&mut self, face: [Vid; 3]) {
        let mut key = face;
        key.sort();
        let count = self.count.entry(key).or_insert(0);
        if *count == 0 {
            self.order.push(face);
        }
        *count += 1;
    }

    fn into_faces(self) -> Vec<[Vid; 3]> {
        let count = self.count;
        self.order.into_iter()
            .filter(|f| {
                let mut key = *f;
                key.sort();
                count.get(&key) == Some(&1)
            })
            .collect()
    }
}

/// Contour polygon of a single tetrahedron.
type Fragment = SmallVec<[PointId; 4]>;

/// Joins fragments that share edges into one polygon per connected group,
/// in the order of each group's first fragment. Groups whose outline is not
/// a single loop are kept as separate fragments.
fn join_fragments(fragments: &[Fragment]) -> Vec<Vec<PointId>> {
    let mut owner: FxHashMap<(PointId, PointId), usize> = FxHashMap::default();
    for (i, f) in fragments.iter().enumerate() {
        for edge in ring_edges(f) {
            owner.insert(edge, i);
        }
    }

    let mut parent: Vec<usize> = (0..fragments.len()).collect();
    for (i, f) in fragments.iter().enumerate() {
        for (a, b) in ring_edges(f) {
            if let Some(&j) = owner.get(&(b, a)) {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                parent[ri.max(rj)] = ri.min(rj);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: FxHashMap<usize, usize> = FxHashMap::default();
    for i in 0..fragments.len() {
        let root = find_root(&mut parent, i);
        let g = *group_of.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        match outline(fragments, &group) {
            Some(polygon) => out.push(polygon),
            None => out.extend(group.iter().map(|&i| fragments[i].to_vec())),
        }
    }
    out
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn ring_edges(ids: &[PointId]) -> impl Iterator<Item = (PointId, PointId)> + '_ {
    (0..ids.len()).map(move |i| (ids[i], ids[(i + 1) % ids.len()]))
}

/// The boundary of a group of fragments as one loop, or `None` if it is
/// not a single simple loop.
fn outline(fragments: &[Fragment], group: &[usize]) -> Option<Vec<PointId>> {
    if let [single] = group {
        return Some(fragments[*single].to_vec());
    }

    let mut edges = FxHashSet::default();
    for &i in group {
        for edge in ring_edges(&fragments[i]) {
            if !edges.insert(edge) {
                return None;
            }
        }
    }

    let mut next = FxHashMap::default();
    let mut start = None;
    for &i in group {
        for (a, b) in ring_edges(&fragments[i]) {
            if edges.contains(&(b, a)) {
                continue;
            }
            if next.insert(a, b).is_some() {
                return None;
            }
            start.get_or_insert(a);
        }
    }

    let start = start?;
    let mut polygon = Vec::with_capacity(next.len());
    let mut current = start;
    loop {
        polygon.push(current);
        current = *next.get(&current)?;
        if current == start || polygon.len() > next.len() {
            break;
        }
    }

    if current != start || polygon.len() != next.len() || polygon.len() < 3 {
        return None;
    }
    Some(polygon)
}

/// Per cell state shared by contour and clip: the decomposition, node
/// values and caches for inserted points.
struct Context<'p, 't> {
    poly: &'p Polyhedron<'p>,
    tets: &'t Tetrahedralization,
    values: Vec<f64>,
    iso: f64,
    nodes: Vec<Option<PointId>>,
    edges: FxHashMap<(usize, usize), (PointId, Pos)>,
}

impl<'p, 't> Context<'p, 't> {
    fn new(poly: &'p Polyhedron<'p>, tets: &'t Tetrahedralization, cell_values: &[f64], iso: f64) -> Self {
        Self {
            poly,
            tets,
            values: tets.extend_values(cell_values, 1),
            iso,
            nodes: vec![None; tets.points.len()],
            edges: FxHashMap::default(),
        }
    }

    /// Global point ids and weights that make up a node of the
    /// decomposition.
    fn node_sources(&self, node: usize) -> SmallVec<[(usize, f64); 8]> {
        let ids = self.poly.point_ids();
        self.tets.weights[node].iter()
            .map(|&(local, w)| (ids[local].to_usize(), w))
            .collect()
    }

    fn write_point_data(
        &self,
        attributes: Option<&mut CutAttributes<'_>>,
        sources: &[(usize, f64)],
        to: PointId,
    ) {
        if let Some(attrs) = attributes {
            let ids: SmallVec<[usize; 8]> = sources.iter().map(|s| s.0).collect();
            let weights: SmallVec<[f64; 8]> = sources.iter().map(|s| s.1).collect();
            attrs.out_point_data.interpolate(attrs.point_data, &ids, &weights, to.to_usize());
        }
    }

    /// Sort key of a node: its global id, additional points last.
    fn node_key(&self, node: usize) -> u64 {
        match self.tets.sources[node] {
            TetPoint::Cell { id, .. } => id.idx() as u64,
            _ => DEFERRED | node as u64,
        }
    }

    /// The point where the iso surface crosses the edge `u`-`v`.
    fn edge_point<L: PointLocator>(
        &mut self,
        u: usize,
        v: usize,
        locator: &mut L,
        attributes: Option<&mut CutAttributes<'_>>,
    ) -> (PointId, Pos) {
        let (lo, hi, t) = self.edge_crossing(u, v);
        if let Some(&hit) = self.edges.get(&(lo, hi)) {
            return hit;
        }

        let (p_lo, p_hi) = (self.tets.points[lo], self.tets.points[hi]);
        let pos = if t <= 0.0 {
            p_lo
        } else if t >= 1.0 {
            p_hi
        } else {
            p_lo + (p_hi - p_lo) * t
        };

        let (id, is_new) = locator.insert_unique(pos);
        if is_new && attributes.is_some() {
            let mut sources = self.node_sources(lo);
            sources.iter_mut().for_each(|s| s.1 *= 1.0 - t);
            sources.extend(self.node_sources(hi).into_iter().map(|(i, w)| (i, w * t)));
            self.write_point_data(attributes, &sources, id);
        }

        self.edges.insert((lo, hi), (id, pos));
        (id, pos)
    }

    /// Endpoints of the edge `u`-`v` ordered by key and the parameter of the
    /// iso value crossing, measured from the first one.
    fn edge_crossing(&self, u: usize, v: usize) -> (usize, usize, f64) {
        let (lo, hi) = if self.node_key(u) < self.node_key(v) { (u, v) } else { (v, u) };
        let (s_lo, s_hi) = (self.values[lo], self.values[hi]);
        let t = if s_hi != s_lo { (self.iso - s_lo) / (s_hi - s_lo) } else { 0.5 };
        (lo, hi, t.max(0.0).min(1.0))
    }

    /// Clip key of the crossing on the edge `u`-`v`. A crossing at an
    /// endpoint gets the key of that node.
    fn edge_vid<L: PointLocator>(
        &mut self,
        u: usize,
        v: usize,
        locator: &mut L,
        attributes: Option<&mut CutAttributes<'_>>,
    ) -> (Vid, Pos) {
        let (lo, hi, t) = self.edge_crossing(u, v);
        if t <= 0.0 {
            return self.node_vid(lo, locator, attributes);
        }
        if t >= 1.0 {
            return self.node_vid(hi, locator, attributes);
        }
        let (id, pos) = self.edge_point(u, v, locator, attributes);
        (id.idx() as Vid, pos)
    }

    /// Key of a node of the decomposition. Cell points are inserted into
    /// the locator, additional points are deferred.
    fn node_vid<L: PointLocator>(
        &mut self,
        node: usize,
        locator: &mut L,
        attributes: Option<&mut CutAttributes<'_>>,
    ) -> (Vid, Pos) {
        let pos = self.tets.points[node];
        if !matches!(self.tets.sources[node], TetPoint::Cell { .. }) {
            return (DEFERRED | node as Vid, pos);
        }

        let id = match self.nodes[node] {
            Some(id) => id,
            None => self.insert_node(node, locator, attributes),
        };
        (id.idx() as Vid, pos)
    }

    fn insert_node<L: PointLocator>(
        &mut self,
        node: usize,
        locator: &mut L,
        attributes: Option<&mut CutAttributes<'_>>,
    ) -> PointId {
        let (id, is_new) = locator.insert_unique(self.tets.points[node]);
        if is_new {
            let sources = self.node_sources(node);
            self.write_point_data(attributes, &sources, id);
        }
        self.nodes[node] = Some(id);
        id
    }
}
