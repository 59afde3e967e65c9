//! Reexports of the most important types and traits of this library for
//! convenience.
//!
//! As with every prelude, the main usage is to glob import everything from
//! this module:
//!
//! ```
//! use polycell::prelude::*;
//! ```
//!
//! Now you have all important traits in scope.

pub use crate::{
    CellType, Handle, PointLocator, Pos3Like, UnstructuredGrid,
    handle::{CellId, FaceId, PointId},
    polyhedron::Polyhedron,
};
