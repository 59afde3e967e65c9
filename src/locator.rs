//! Point locators: deduplicating point insertion for generated geometry.
//!
//! Contour and clip operations create many points that are shared between
//! neighbouring tetrahedra and cells. A locator hands out one id per
//! distinct position.

use std::sync::Mutex;

use cgmath::prelude::*;
use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    handle::{Handle, PointId},
    math::{Pos, Pos3Like},
};


/// Something that assigns ids to points, merging coincident ones.
pub trait PointLocator {
    /// Inserts `p` unless a point within the locator's tolerance already
    /// exists. Returns the id of the (new or existing) point and whether it
    /// was newly inserted.
    fn insert_unique(&mut self, p: Pos) -> (PointId, bool);

    /// Number of distinct points inserted so far.
    fn num_points(&self) -> usize;
}

impl<L: PointLocator + ?Sized> PointLocator for &mut L {
    fn insert_unique(&mut self, p: Pos) -> (PointId, bool) {
        (**self).insert_unique(p)
    }

    fn num_points(&self) -> usize {
        (**self).num_points()
    }
}


/// Hash grid locator.
///
/// Space is divided into cubic bins with an edge length of the merge
/// tolerance; a new point is compared against the points in its bin and the
/// 26 neighbouring ones. With a tolerance of `0`, only bitwise identical
/// positions are merged. When several existing points are within the
/// tolerance, the one inserted first wins, so results only depend on the
/// insertion order.
#[derive(Debug, Clone)]
pub struct MergePoints {
    tolerance: f64,
    points: Vec<Pos>,
    bins: FxHashMap<[i64; 3], SmallVec<[PointId; 4]>>,
}

impl MergePoints {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
            points: Vec::new(),
            bins: FxHashMap::default(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn points(&self) -> &[Pos] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Pos> {
        self.points
    }

    /// Returns the id of a point within the tolerance of `p`, if any.
    pub fn find(&self, p: impl Pos3Like) -> Option<PointId> {
        let p = p.to_point3();
        if self.tolerance == 0.0 {
            return self.bins.get(&exact_key(p))
                .and_then(|ids| ids.first().cloned());
        }

        let [x, y, z] = self.bin_of(p);
        let tol2 = self.tolerance * self.tolerance;
        let mut found: Option<PointId> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let bin = match self.bins.get(&[x + dx, y + dy, z + dz]) {
                        Some(bin) => bin,
                        None => continue,
                    };

                    let hit = bin.iter()
                        .cloned()
                        .filter(|id| self.points[id.to_usize()].distance2(p) <= tol2)
                        .min();
                    if let Some(id) = hit {
                        found = Some(found.map_or(id, |f| f.min(id)));
                    }
                }
            }
        }

        found
    }

    fn bin_of(&self, p: Pos) -> [i64; 3] {
        let discretize = |v: f64| (v / self.tolerance).floor() as i64;
        [discretize(p.x), discretize(p.y), discretize(p.z)]
    }

    fn key_of(&self, p: Pos) -> [i64; 3] {
        if self.tolerance == 0.0 {
            exact_key(p)
        } else {
            self.bin_of(p)
        }
    }
}

/// Key for exact merging. `-0.0` and `0.0` are treated as equal.
fn exact_key(p: Pos) -> [i64; 3] {
    let bits = |v: f64| if v == 0.0 { 0 } else { v.to_bits() as i64 };
    [bits(p.x), bits(p.y), bits(p.z)]
}

impl PointLocator for MergePoints {
    fn insert_unique(&mut self, p: Pos) -> (PointId, bool) {
        if let Some(id) = self.find(p) {
            return (id, false);
        }

        let id = PointId::from_usize(self.points.len());
        self.points.push(p);
        let key = self.key_of(p);
        self.bins.entry(key).or_default().push(id);
        (id, true)
    }

    fn num_points(&self) -> usize {
        self.points.len()
    }
}


/// A locator that can be shared between threads. Insertions are serialized
/// with a mutex. Use `&SharedLocator` as the locator in each thread.
///
/// Note that ids then depend on the order in which threads insert. The
/// batch operations in [`batch`][crate::batch] avoid this by using cell
/// local locators and merging afterwards.
#[derive(Debug, Default)]
pub struct SharedLocator<L> {
    inner: Mutex<L>,
}

impl<L: PointLocator> SharedLocator<L> {
    pub fn new(inner: L) -> Self {
        Self { inner: Mutex::new(inner) }
    }

    /// Returns the wrapped locator. A poisoned lock is ignored, as an
    /// insertion never leaves the locator in an inconsistent state.
    pub fn into_inner(self) -> L {
        match self.inner.into_inner() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<L: PointLocator> PointLocator for &SharedLocator<L> {
    fn insert_unique(&mut self, p: Pos) -> (PointId, bool) {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert_unique(p)
    }

    fn num_points(&self) -> usize {
        match self.inner.lock() {
            Ok(g) => g.num_points(),
            Err(poisoned) => poisoned.into_inner().num_points(),
        }
    }
}
