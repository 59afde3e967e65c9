//! The face table of a single polyhedron.

use fxhash::FxHashMap;

use crate::{
    conn::{decode_legacy_stream, Face, LegacyId, O2m},
    error::{Error, Result},
    handle::PointId,
};


/// Faces, points and edges of one polyhedral cell.
///
/// The table assigns each distinct point of the cell a *local* index (in
/// order of first appearance in the faces). Faces and edges are stored in
/// local indices; public accessors translate back to global [`PointId`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTable {
    point_ids: Vec<PointId>,
    local: FxHashMap<PointId, usize>,
    faces: O2m<usize>,
    edges: Vec<[usize; 2]>,
    edge_faces: Vec<(usize, Option<usize>)>,
}

impl FaceTable {
    /// Builds the table from a list of faces (`BuildFromFaces`). Runs in
    /// time linear in the total number of face references.
    pub fn from_faces<F: AsRef<[PointId]>>(faces: &[F]) -> Self {
        let mut point_ids = Vec::new();
        let mut local = FxHashMap::default();
        let mut local_faces = O2m::with_capacity(
            faces.len(),
            faces.iter().map(|f| f.as_ref().len()).sum(),
        );

        for face in faces {
            local_faces.push(face.as_ref().iter().map(|&id| {
                *local.entry(id).or_insert_with(|| {
                    point_ids.push(id);
                    point_ids.len() - 1
                })
            }));
        }

        let (edges, edge_faces) = collect_edges(&local_faces);

        Self {
            point_ids,
            local,
            faces: local_faces,
            edges,
            edge_faces,
        }
    }

    /// Decodes a legacy face stream starting at `start` and builds the table
    /// from it.
    pub fn from_legacy_stream(flat: &[LegacyId], start: usize) -> Result<Self> {
        let (faces, _) = decode_legacy_stream(flat, start)?;
        Ok(Self::from_faces(&faces))
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of distinct undirected edges. An edge shared by two faces
    /// counts once.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct points used by the cell.
    pub fn num_points(&self) -> usize {
        self.point_ids.len()
    }

    /// The distinct global point ids of the cell, indexed by local index.
    pub fn point_ids(&self) -> &[PointId] {
        &self.point_ids
    }

    /// Returns the local index of a global point id, if the point belongs to
    /// this cell.
    pub fn local_index(&self, id: PointId) -> Option<usize> {
        self.local.get(&id).cloned()
    }

    /// Returns face `i` in global point ids (`GetFace`).
    pub fn face(&self, i: usize) -> Result<Face> {
        self.local_face(i)
            .map(|f| f.iter().map(|&l| self.point_ids[l]).collect())
    }

    /// Returns face `i` in local indices.
    pub fn local_face(&self, i: usize) -> Result<&[usize]> {
        if i >= self.num_faces() {
            return Err(Error::out_of_range("face", i, self.num_faces()));
        }
        Ok(&self.faces[i])
    }

    /// All faces in local indices.
    pub fn local_faces(&self) -> &O2m<usize> {
        &self.faces
    }

    /// Iterator over all faces in global point ids.
    pub fn faces(&self) -> impl Iterator<Item = Face> + '_ {
        self.faces.iter().map(move |f| f.iter().map(|&l| self.point_ids[l]).collect())
    }

    /// Returns the end points of edge `i` in global point ids (`GetEdge`).
    pub fn edge(&self, i: usize) -> Result<[PointId; 2]> {
        self.edges.get(i)
            .map(|&[a, b]| [self.point_ids[a], self.point_ids[b]])
            .ok_or_else(|| Error::out_of_range("edge", i, self.num_edges()))
    }

    /// All edges in local indices.
    pub fn local_edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// The faces adjacent to edge `i`: the face that introduced the edge and
    /// the other face using it (`None` on open boundaries).
    pub fn edge_faces(&self, i: usize) -> Result<(usize, Option<usize>)> {
        self.edge_faces.get(i)
            .cloned()
            .ok_or_else(|| Error::out_of_range("edge", i, self.num_edges()))
    }

    /// Returns `true` if every edge is shared by exactly two faces.
    pub fn is_closed(&self) -> bool {
        !self.edges.is_empty() && self.edge_faces.iter().all(|(_, other)| other.is_some())
    }
}

/// Walks all faces (with wraparound) and deduplicates undirected edges.
fn collect_edges(faces: &O2m<usize>) -> (Vec<[usize; 2]>, Vec<(usize, Option<usize>)>) {
    let mut lookup = FxHashMap::default();
    let mut edges = Vec::new();
    let mut edge_faces = Vec::new();

    for (fid, face) in faces.iter().enumerate() {
        let n = face.len();
        for i in 0..n {
            let a = face[i];
            let b = face[(i + 1) % n];
            if a == b {
                continue;
            }

            let key = if a < b { (a, b) } else { (b, a) };
            match lookup.get(&key) {
                None => {
                    lookup.insert(key, edges.len());
                    edges.push([a, b]);
                    edge_faces.push((fid, None));
                }
                Some(&eid) => {
                    let entry: &mut (usize, Option<usize>) = &mut edge_faces[eid];
                    if entry.0 != fid && entry.1.is_none() {
                        entry.1 = Some(fid);
                    }
                }
            }
        }
    }

    (edges, edge_faces)
}
