//! The error type of this crate.

use failure::Fail;


/// Errors that can occur while decoding connectivity or querying cells.
///
/// Ambiguous numerical cases (points close to faces, nearly parallel rays,
/// ...) are never errors: they are resolved deterministically with the
/// tolerances from [`QueryConfig`][crate::QueryConfig].
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum Error {
    /// A connectivity array is corrupt: negative sizes or counts, offsets
    /// out of bounds, truncated streams. Such a grid can't be trusted, so
    /// this error is always propagated to the caller.
    #[fail(display = "malformed connectivity: {}", reason)]
    MalformedConnectivity {
        reason: String,
    },

    /// A face, point, edge or cell index is beyond the number of elements.
    #[fail(display = "{} index {} out of range (there are {})", what, index, len)]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A cell without volume or without faces was passed to a query that
    /// needs a proper solid.
    #[fail(display = "degenerate geometry: {}", reason)]
    DegenerateGeometry {
        reason: String,
    },

    /// A numeric cell type code that doesn't name a known cell type.
    #[fail(display = "unsupported cell shape with code {}", _0)]
    UnsupportedShape(i64),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedConnectivity { reason: reason.into() }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Error::DegenerateGeometry { reason: reason.into() }
    }

    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { what, index, len }
    }

    /// Returns `true` for errors that mean the mesh itself is corrupt (as
    /// opposed to a single cell being unusable).
    pub fn is_corrupt_mesh(&self) -> bool {
        match self {
            Error::MalformedConnectivity { .. } | Error::UnsupportedShape(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
