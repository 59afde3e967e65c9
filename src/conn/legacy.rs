//! The legacy count-prefixed polyhedron face streams.
//!
//! One polyhedron is stored as `[nFaces, size_0, ids_0..., size_1, ...]`.
//! Whole grids concatenate these per-cell streams into one `faces` array and
//! store the start of each cell's stream in a parallel `locations` array
//! (`-1` for cells that are not polyhedra).

use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    handle::{Handle, PointId},
};
use super::Face;


/// The integer type of legacy streams. It is signed: locations use `-1` as
/// marker and corrupt input may contain arbitrary negative numbers.
pub type LegacyId = i64;


/// Decodes the face list of a single polyhedron starting at `start`
/// (`DecodeLegacyStream`).
///
/// Returns the faces and the number of array slots that were consumed. Only
/// exactly those slots are read: anything behind the last face of this
/// polyhedron is never looked at, even if it is garbage.
pub fn decode_legacy_stream(flat: &[LegacyId], start: usize) -> Result<(Vec<Face>, usize)> {
    let mut cursor = Cursor { flat, pos: start };

    let num_faces = cursor.count("face count")?;
    let mut faces = Vec::with_capacity(num_faces.min(flat.len()));
    for face_idx in 0..num_faces {
        let size = cursor.count("face size")?;
        let mut face = Face::with_capacity(size);
        for _ in 0..size {
            let raw = cursor.next("point id")?;
            let id = PointId::try_from_i64(raw).ok_or_else(|| {
                Error::malformed(format!("invalid point id {} in face {}", raw, face_idx))
            })?;
            face.push(id);
        }
        faces.push(face);
    }

    Ok((faces, cursor.pos - start))
}

/// Encodes faces into a legacy stream (`EncodeToLegacyStream`), the inverse
/// of [`decode_legacy_stream`].
pub fn encode_legacy_stream<F: AsRef<[PointId]>>(faces: &[F]) -> Vec<LegacyId> {
    let mut out = Vec::with_capacity(legacy_stream_len(faces));
    append_stream(&mut out, faces);
    out
}

/// Number of slots the legacy stream of `faces` occupies.
pub fn legacy_stream_len<F: AsRef<[PointId]>>(faces: &[F]) -> usize {
    1 + faces.iter().map(|f| 1 + f.as_ref().len()).sum::<usize>()
}

fn append_stream<F: AsRef<[PointId]>>(out: &mut Vec<LegacyId>, faces: &[F]) {
    out.push(faces.len() as LegacyId);
    for face in faces {
        let face = face.as_ref();
        out.push(face.len() as LegacyId);
        out.extend(face.iter().map(|id| id.idx() as LegacyId));
    }
}

/// Reads integers from a flat legacy array, never beyond its end.
struct Cursor<'a> {
    flat: &'a [LegacyId],
    pos: usize,
}

impl Cursor<'_> {
    fn next(&mut self, what: &str) -> Result<LegacyId> {
        let v = self.flat.get(self.pos).cloned().ok_or_else(|| {
            Error::malformed(format!(
                "stream truncated while reading {} at slot {} (length {})",
                what,
                self.pos,
                self.flat.len(),
            ))
        })?;
        self.pos += 1;
        Ok(v)
    }

    /// Reads a count/size. Counts larger than the rest of the array are
    /// rejected.
    fn count(&mut self, what: &str) -> Result<usize> {
        let at = self.pos;
        let v = self.next(what)?;
        if v < 0 {
            return Err(Error::malformed(format!("negative {} {} at slot {}", what, v, at)));
        }
        if v as u64 > (self.flat.len() - self.pos) as u64 {
            return Err(Error::malformed(format!(
                "{} {} at slot {} exceeds the remaining stream",
                what,
                v,
                at,
            )));
        }
        Ok(v as usize)
    }
}


// ===========================================================================
// ===== Shared face arrays with per-cell locations
// ===========================================================================

/// A read-only view of the legacy `faces` + `locations` pair of a grid.
#[derive(Debug, Clone, Copy)]
pub struct LegacyFaces<'a> {
    faces: &'a [LegacyId],
    locations: &'a [LegacyId],
}

impl<'a> LegacyFaces<'a> {
    pub fn new(faces: &'a [LegacyId], locations: &'a [LegacyId]) -> Self {
        Self { faces, locations }
    }

    /// Number of cells described by the locations array.
    pub fn num_cells(&self) -> usize {
        self.locations.len()
    }

    /// Decodes the faces of cell `cell`. Returns `Ok(None)` for cells
    /// without a face stream (location `-1`).
    pub fn cell(&self, cell: usize) -> Result<Option<Vec<Face>>> {
        let loc = *self.locations.get(cell)
            .ok_or_else(|| Error::out_of_range("cell", cell, self.locations.len()))?;

        match loc {
            -1 => Ok(None),
            loc if loc < 0 || loc as u64 >= self.faces.len() as u64 => Err(Error::malformed(
                format!("face location {} of cell {} out of bounds", loc, cell),
            )),
            loc => decode_legacy_stream(self.faces, loc as usize).map(|(faces, _)| Some(faces)),
        }
    }
}

/// Builds the shared legacy `faces` + `locations` arrays cell by cell.
#[derive(Debug, Clone, Default)]
pub struct FaceStreamBuilder {
    faces: Vec<LegacyId>,
    locations: Vec<LegacyId>,
}

impl FaceStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a polyhedron and records its location.
    pub fn push_polyhedron<F: AsRef<[PointId]>>(&mut self, faces: &[F]) {
        self.locations.push(self.faces.len() as LegacyId);
        append_stream(&mut self.faces, faces);
    }

    /// Appends a cell that is not a polyhedron (location `-1`).
    pub fn push_other(&mut self) {
        self.locations.push(-1);
    }

    /// Returns `(faces, locations)`.
    pub fn finish(self) -> (Vec<LegacyId>, Vec<LegacyId>) {
        (self.faces, self.locations)
    }
}

/// Converts a face list into the ids of its distinct points in order of
/// first appearance.
pub(crate) fn unique_points<F: AsRef<[PointId]>>(faces: &[F]) -> SmallVec<[PointId; 16]> {
    let mut out = SmallVec::new();
    let mut seen = fxhash::FxHashSet::default();
    for id in faces.iter().flat_map(|f| f.as_ref().iter()) {
        if seen.insert(*id) {
            out.push(*id);
        }
    }
    out
}
