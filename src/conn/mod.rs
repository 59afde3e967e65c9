//! Variable length connectivity: the offsets + flat array ("one to many")
//! encoding and the legacy count-prefixed polyhedron face streams.
//!
//! The canonical representation everywhere in this crate is [`O2m`]. Legacy
//! streams are only decoded on input and derived on demand for output; they
//! are never cached next to the canonical data.

use std::{
    fmt,
    iter::FromIterator,
    ops::{Index, Range},
};

use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    handle::PointId,
};


mod legacy;

pub use self::legacy::{
    LegacyId, LegacyFaces, FaceStreamBuilder,
    decode_legacy_stream, encode_legacy_stream, legacy_stream_len,
};
pub(crate) use self::legacy::unique_points;


/// An ordered list of point ids forming one polygon. Most faces in practice
/// are triangles or quads, so a few ids are stored inline.
pub type Face = SmallVec<[PointId; 6]>;


/// A one-to-many relation: entity `i` refers to the elements
/// `connectivity[offsets[i]..offsets[i + 1]]`.
///
/// Invariants (checked whenever an `O2m` is created from raw arrays):
/// - `offsets` is never empty and `offsets[0] == 0`,
/// - `offsets` is monotonically non-decreasing,
/// - the last offset equals `connectivity.len()`.
#[derive(Clone, PartialEq, Eq)]
pub struct O2m<T> {
    offsets: Vec<usize>,
    connectivity: Vec<T>,
}

impl<T: Copy> O2m<T> {
    /// Creates an empty relation (no entities).
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            connectivity: Vec::new(),
        }
    }

    /// Creates an empty relation with memory reserved for `entities` entities
    /// referring to `references` elements in total.
    pub fn with_capacity(entities: usize, references: usize) -> Self {
        let mut offsets = Vec::with_capacity(entities + 1);
        offsets.push(0);
        Self {
            offsets,
            connectivity: Vec::with_capacity(references),
        }
    }

    /// Creates the relation from already built arrays, validating all
    /// invariants. Fails with [`Error::MalformedConnectivity`] otherwise.
    pub fn from_raw(offsets: Vec<usize>, connectivity: Vec<T>) -> Result<Self> {
        match offsets.first() {
            None => return Err(Error::malformed("offsets array is empty")),
            Some(&first) if first != 0 => {
                return Err(Error::malformed(format!("first offset is {}, not 0", first)));
            }
            _ => {}
        }

        if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::malformed(format!(
                "offsets decrease from {} to {} at entity {}",
                offsets[pos],
                offsets[pos + 1],
                pos,
            )));
        }

        let last = offsets[offsets.len() - 1];
        if last != connectivity.len() {
            return Err(Error::malformed(format!(
                "last offset {} does not match connectivity length {}",
                last,
                connectivity.len(),
            )));
        }

        Ok(Self { offsets, connectivity })
    }

    /// Creates the relation from per-entity sizes (as used by Blueprint-like
    /// inputs). The sizes have to sum up to `connectivity.len()`.
    pub fn from_sizes(sizes: &[usize], connectivity: Vec<T>) -> Result<Self> {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut acc = 0usize;
        for &s in sizes {
            acc = acc.checked_add(s)
                .ok_or_else(|| Error::malformed("sum of sizes overflows"))?;
            offsets.push(acc);
        }

        Self::from_raw(offsets, connectivity)
    }

    /// Flattens a list of lists (`BuildO2M`).
    pub fn from_lists<I, L>(lists: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = T>,
    {
        let mut out = Self::new();
        for list in lists {
            out.push(list);
        }
        out
    }

    /// Appends a new entity referring to the given elements and returns its
    /// index.
    pub fn push(&mut self, list: impl IntoIterator<Item = T>) -> usize {
        self.connectivity.extend(list);
        self.offsets.push(self.connectivity.len());
        self.offsets.len() - 2
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of references (length of the flat array).
    pub fn num_references(&self) -> usize {
        self.connectivity.len()
    }

    /// Returns the elements entity `index` refers to (`DecodeO2M`), or
    /// [`Error::IndexOutOfRange`].
    pub fn get(&self, index: usize) -> Result<&[T]> {
        self.range(index).map(|r| &self.connectivity[r])
    }

    /// Returns the range of `index` inside the flat array.
    pub fn range(&self, index: usize) -> Result<Range<usize>> {
        if index >= self.len() {
            return Err(Error::out_of_range("entity", index, self.len()));
        }

        Ok(self.offsets[index]..self.offsets[index + 1])
    }

    /// Number of elements entity `index` refers to.
    pub fn size_of(&self, index: usize) -> Result<usize> {
        self.range(index).map(|r| r.len())
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn connectivity(&self) -> &[T] {
        &self.connectivity
    }

    /// Returns an iterator over all entities' element slices.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            o2m: self,
            next: 0,
        }
    }

    /// Consumes `self` and returns `(offsets, connectivity)`.
    pub fn into_raw(self) -> (Vec<usize>, Vec<T>) {
        (self.offsets, self.connectivity)
    }

    /// Maps every element of the flat array, keeping the structure.
    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> O2m<U> {
        O2m {
            offsets: self.offsets.clone(),
            connectivity: self.connectivity.iter().cloned().map(f).collect(),
        }
    }
}

impl<T: Copy> Default for O2m<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Index<usize> for O2m<T> {
    type Output = [T];
    fn index(&self, index: usize) -> &Self::Output {
        let start = self.offsets[index];
        let end = self.offsets[index + 1];
        &self.connectivity[start..end]
    }
}

impl<T: Copy, L: IntoIterator<Item = T>> FromIterator<L> for O2m<T> {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        Self::from_lists(iter)
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for O2m<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the entities of an [`O2m`].
#[derive(Clone)]
pub struct Iter<'a, T> {
    o2m: &'a O2m<T>,
    next: usize,
}

impl<'a, T: Copy> Iterator for Iter<'a, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.o2m.len() {
            return None;
        }

        let out = &self.o2m[self.next];
        self.next += 1;
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.o2m.len() - self.next;
        (rest, Some(rest))
    }
}

impl<T: Copy> ExactSizeIterator for Iter<'_, T> {}
