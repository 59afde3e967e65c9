//! Handles to refer to points, faces and cells of a grid.
//!
//! Handles are plain indices into the flat arrays owned by an
//! [`UnstructuredGrid`][crate::grid::UnstructuredGrid] (or into the output
//! arrays of contour/clip operations). They don't borrow anything and are
//! `Copy`; using a handle with the wrong grid is a logic error, but never UB.

use std::fmt;

use static_assertions::const_assert_eq;


/// The integer type used as index in all handles.
///
/// This is `u32` by default; enable the `large-handle` feature to use `u64`.
#[cfg(not(feature = "large-handle"))]
#[allow(non_camel_case_types)]
pub type hsize = u32;

/// The integer type used as index in all handles.
///
/// This is `u32` by default; enable the `large-handle` feature to use `u64`.
#[cfg(feature = "large-handle")]
#[allow(non_camel_case_types)]
pub type hsize = u64;


/// Types that are handles: thin wrappers around an `hsize` index.
pub trait Handle: 'static + Copy + fmt::Debug + Eq + Ord + std::hash::Hash {
    /// Creates a handle from the given index.
    fn new(idx: hsize) -> Self;

    /// Returns the index of the handle.
    fn idx(&self) -> hsize;

    /// Helper method to create a handle directly from an `usize`.
    ///
    /// Panics if `raw` can't be represented by `hsize`. If you need a
    /// fallible version, use [`Handle::try_from_usize`].
    #[inline(always)]
    fn from_usize(raw: usize) -> Self {
        Self::try_from_usize(raw).unwrap_or_else(|| {
            panic!("handle index {} does not fit into `hsize` (enable 'large-handle'?)", raw)
        })
    }

    /// Creates a handle from an `usize` if it fits into `hsize`.
    #[inline(always)]
    fn try_from_usize(raw: usize) -> Option<Self> {
        if raw as u64 > hsize::max_value() as u64 {
            None
        } else {
            Some(Self::new(raw as hsize))
        }
    }

    /// Creates a handle from a signed index as found in legacy streams.
    /// Returns `None` for negative values and values too large for `hsize`.
    #[inline(always)]
    fn try_from_i64(raw: i64) -> Option<Self> {
        if raw < 0 || raw as u64 > hsize::max_value() as u64 {
            None
        } else {
            Some(Self::new(raw as hsize))
        }
    }

    /// Helper method to get the index as `usize` directly from a handle.
    #[inline(always)]
    fn to_usize(&self) -> usize {
        self.idx() as usize
    }
}

macro_rules! make_handle_type {
    ($(#[$attr:meta])* $name:ident = $short:expr;) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(hsize);

        impl Handle for $name {
            #[inline(always)]
            fn new(id: hsize) -> Self {
                $name(id)
            }

            #[inline(always)]
            fn idx(&self) -> hsize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $short, self.idx())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    }
}

make_handle_type!{
    /// A handle that is associated with a point of a point set.
    PointId = "P";
}
make_handle_type!{
    /// A handle that is associated with a face (polygon) of a polyhedron
    /// face relation.
    FaceId = "F";
}
make_handle_type!{
    /// A handle that is associated with a cell of a grid.
    CellId = "C";
}

#[cfg(not(feature = "large-handle"))]
const_assert_eq!(std::mem::size_of::<PointId>(), 4);
#[cfg(feature = "large-handle")]
const_assert_eq!(std::mem::size_of::<PointId>(), 8);
