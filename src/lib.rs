//! Polyhedral cells of unstructured grids: connectivity encodings and
//! geometry.
//!
//! This library contains:
//! - the connectivity arrays of unstructured grids, both as one-to-many
//!   relations ([`O2m`]) and as the legacy count-prefixed face streams
//!   ([`conn`]),
//! - an arena style [`UnstructuredGrid`] with a closed set of
//!   [`CellType`]s, including import and export of Blueprint-style mixed
//!   topologies ([`grid::blueprint`]),
//! - a [`Polyhedron`] view of a single 3D cell with geometric queries
//!   (point containment, line intersection, interpolation weights,
//!   derivatives) and decomposition, contouring and clipping,
//! - whole-grid versions of these operations in [`batch`].
//!
//! Points and cells are referred to by lightweight handles ([`PointId`],
//! [`FaceId`], [`CellId`]), which are plain indices into the grid's
//! arrays.
//!
//! ```
//! use polycell::prelude::*;
//!
//! let points = vec![
//!     [0.0, 0.0, 0.0].to_point3(),
//!     [1.0, 0.0, 0.0].to_point3(),
//!     [0.0, 1.0, 0.0].to_point3(),
//!     [0.0, 0.0, 1.0].to_point3(),
//! ];
//! let mut grid = UnstructuredGrid::from_points(points);
//! let ids: Vec<_> = (0..4).map(PointId::new).collect();
//! let cell = grid.add_cell(CellType::Tetra, &ids).unwrap();
//!
//! let tet = grid.polyhedron(cell).unwrap();
//! assert!(tet.is_inside([0.1, 0.1, 0.1], 1e-6));
//! assert!((tet.volume() - 1.0 / 6.0).abs() < 1e-12);
//! ```
//!
//! # Cargo features
//!
//! - `parallel` (default): process cells in parallel in [`batch`] (with
//!   `rayon`).
//! - `large-handle`: use `u64` instead of `u32` as handle index type.


#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod attr;
pub mod batch;
pub mod cell;
pub mod config;
pub mod conn;
pub mod error;
pub mod grid;
pub mod handle;
pub mod locator;
pub mod math;
pub mod polyhedron;
pub mod prelude;

pub use self::{
    cell::CellType,
    config::{BatchConfig, QueryConfig},
    conn::O2m,
    error::{Error, Result},
    grid::UnstructuredGrid,
    handle::{hsize, CellId, FaceId, Handle, PointId},
    locator::{MergePoints, PointLocator},
    math::Pos3Like,
    polyhedron::Polyhedron,
};
