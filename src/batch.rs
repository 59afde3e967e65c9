//! Operations over all cells of a grid.
//!
//! Every cell is processed on its own: it gets a cell local locator and
//! cell local output arrays. Afterwards, the per-cell results are merged in
//! cell order into one global [`MergePoints`] locator. The output thus only
//! depends on the grid and the settings, never on how the cells were
//! scheduled. With the `parallel` feature (and [`BatchConfig::parallel`]
//! set), the per-cell step runs on the `rayon` thread pool.
//!
//! Problems with single cells do not abort the operation: they are recorded
//! in the returned [`Diagnostics`]. A cell whose faces don't form a closed
//! surface is reported as failed with [`Error::DegenerateGeometry`]. Only a
//! corrupt grid (see [`Error::is_corrupt_mesh`]) makes the whole operation
//! fail.

use derive_more::{Add, AddAssign};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    attr::AttributeData,
    cell::CellType,
    config::BatchConfig,
    conn::O2m,
    error::{Error, Result},
    grid::{PolyhedronCells, UnstructuredGrid},
    handle::{CellId, Handle, PointId},
    locator::{MergePoints, PointLocator},
    math::Pos,
    polyhedron::{CutAttributes, Polyhedron, TetPoint},
};


/// How many cells ended up in which category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Add, AddAssign)]
pub struct Counts {
    /// Cells that contributed output.
    pub processed: usize,

    /// Solid cells that contributed nothing (not cut by the iso value,
    /// completely clipped away).
    pub empty: usize,

    /// Cells that are not solids (vertices, lines, polygons).
    pub not_solid: usize,

    /// Cells without volume.
    pub skipped_degenerate: usize,
}

/// Summary of a batch operation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Diagnostics {
    pub counts: Counts,

    /// Cells for which the per-cell operation failed, in cell order.
    pub failed: Vec<(CellId, Error)>,
}

impl Diagnostics {
    /// Returns `true` if no cell failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of [`contour_grid`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContourOutput {
    pub points: Vec<Pos>,
    pub polys: O2m<PointId>,

    /// Interpolated point data, indexed like `points`.
    pub point_data: AttributeData,

    /// Cell data of the source cell of each polygon.
    pub cell_data: AttributeData,
}


/// Contours all solid cells of `grid` at `iso`. `scalars` holds one value
/// per grid point.
pub fn contour_grid(
    grid: &UnstructuredGrid,
    scalars: &[f64],
    iso: f64,
    cfg: &BatchConfig,
) -> Result<(ContourOutput, Diagnostics)> {
    check_inputs(grid, Some(scalars))?;

    let (pieces, diagnostics) = run(grid, cfg, |poly, cell| {
        let mut data = PieceData::for_grid(grid);
        let mut locator = MergePoints::new(0.0);
        let mut polys = O2m::new();
        let emitted = {
            let mut attrs = data.attributes(grid);
            poly.contour(iso, scalars, &mut locator, &mut polys, Some(&mut attrs), cell)?
        };

        if emitted == 0 {
            return Ok(None);
        }
        Ok(Some(Piece { points: locator.into_points(), data, output: polys }))
    })?;

    let mut merger = Merger::new(grid, cfg);
    let mut polys = O2m::new();
    for piece in &pieces {
        let ids = merger.add_points(&piece.points, &piece.data);
        for (local, poly) in piece.output.iter().enumerate() {
            let global = polys.push(poly.iter().map(|id| ids[id.to_usize()]));
            merger.cell_data.copy_tuple(&piece.data.cell_data, local, global);
        }
    }

    log::debug!(
        "contoured {} cells at {}: {} polygons, {:?}",
        grid.num_cells(),
        iso,
        polys.len(),
        diagnostics.counts,
    );

    let out = ContourOutput {
        points: merger.locator.into_points(),
        polys,
        point_data: merger.point_data,
        cell_data: merger.cell_data,
    };
    Ok((out, diagnostics))
}

/// Clips all solid cells of `grid` at `iso` (see [`Polyhedron::clip`] for
/// the meaning of `inside_out`). Every cell that keeps some volume becomes
/// one polyhedron of the output grid.
pub fn clip_grid(
    grid: &UnstructuredGrid,
    scalars: &[f64],
    iso: f64,
    inside_out: bool,
    cfg: &BatchConfig,
) -> Result<(UnstructuredGrid, Diagnostics)> {
    check_inputs(grid, Some(scalars))?;

    let (pieces, diagnostics) = run(grid, cfg, |poly, cell| {
        let mut data = PieceData::for_grid(grid);
        let mut locator = MergePoints::new(0.0);
        let mut cells = PolyhedronCells::new();
        let emitted = {
            let mut attrs = data.attributes(grid);
            poly.clip(iso, scalars, &mut locator, &mut cells, Some(&mut attrs), cell, inside_out)?
        };

        if !emitted {
            return Ok(None);
        }
        Ok(Some(Piece { points: locator.into_points(), data, output: cells }))
    })?;

    let mut merger = Merger::new(grid, cfg);
    let mut cells = PolyhedronCells::new();
    for piece in &pieces {
        let ids = merger.add_points(&piece.points, &piece.data);
        let first = cells.len();
        cells.extend_mapped(&piece.output, |id| ids[id.to_usize()]);
        for local in 0..piece.output.len() {
            merger.cell_data.copy_tuple(&piece.data.cell_data, local, first + local);
        }
    }

    log::debug!(
        "clipped {} cells at {} (inside out: {}): {} cells, {:?}",
        grid.num_cells(),
        iso,
        inside_out,
        cells.len(),
        diagnostics.counts,
    );

    let mut out = cells.into_grid(merger.locator.into_points())?;
    out.set_point_data(merger.point_data);
    out.set_cell_data(merger.cell_data);
    Ok((out, diagnostics))
}

/// Decomposes all solid cells into tetrahedra (see
/// [`Polyhedron::triangulate`]). The output grid contains only
/// [`CellType::Tetra`] cells; each carries the cell data of its source
/// cell. Additional points (cell centroids, points of the cuts through
/// cells that are not star-shaped) get point data interpolated with their
/// [`Tetrahedralization::weights`][crate::polyhedron::Tetrahedralization].
pub fn triangulate_grid(
    grid: &UnstructuredGrid,
    cfg: &BatchConfig,
) -> Result<(UnstructuredGrid, Diagnostics)> {
    check_inputs(grid, None)?;

    let (pieces, diagnostics) = run(grid, cfg, |poly, cell| {
        let tets = poly.triangulate();
        if tets.is_empty() {
            return Ok(None);
        }

        let mut data = PieceData::for_grid(grid);
        for (i, (source, weights)) in tets.sources.iter().zip(&tets.weights).enumerate() {
            match *source {
                TetPoint::Cell { id, .. } => {
                    data.point_data.copy_tuple(grid.point_data(), id.to_usize(), i);
                }
                _ => {
                    let ids: Vec<usize> = weights.iter()
                        .map(|&(local, _)| poly.point_ids()[local].to_usize())
                        .collect();
                    let w: Vec<f64> = weights.iter().map(|&(_, w)| w).collect();
                    data.point_data.interpolate(grid.point_data(), &ids, &w, i);
                }
            }
        }
        data.cell_data.copy_tuple(grid.cell_data(), cell.to_usize(), 0);

        Ok(Some(Piece { points: tets.points, data, output: tets.tets }))
    })?;

    let mut merger = Merger::new(grid, cfg);
    let mut tets = Vec::new();
    for piece in &pieces {
        let ids = merger.add_points(&piece.points, &piece.data);
        for tet in &piece.output {
            merger.cell_data.copy_tuple(&piece.data.cell_data, 0, tets.len());
            tets.push([ids[tet[0]], ids[tet[1]], ids[tet[2]], ids[tet[3]]]);
        }
    }

    log::debug!(
        "triangulated {} cells into {} tetrahedra, {:?}",
        grid.num_cells(),
        tets.len(),
        diagnostics.counts,
    );

    let mut out = UnstructuredGrid::from_points(merger.locator.into_points());
    for tet in &tets {
        out.add_cell(CellType::Tetra, tet)?;
    }
    out.set_point_data(merger.point_data);
    out.set_cell_data(merger.cell_data);
    Ok((out, diagnostics))
}


// ===========================================================================
// ===== Per-cell driver
// ===========================================================================

/// Output of a single cell in cell local point ids.
struct Piece<T> {
    points: Vec<Pos>,
    data: PieceData,
    output: T,
}

/// Point and cell data of a single cell's output.
struct PieceData {
    point_data: AttributeData,
    cell_data: AttributeData,
}

impl PieceData {
    fn for_grid(grid: &UnstructuredGrid) -> Self {
        Self {
            point_data: grid.point_data().copy_allocate(),
            cell_data: grid.cell_data().copy_allocate(),
        }
    }

    fn attributes<'a>(&'a mut self, grid: &'a UnstructuredGrid) -> CutAttributes<'a> {
        CutAttributes {
            point_data: grid.point_data(),
            out_point_data: &mut self.point_data,
            cell_data: grid.cell_data(),
            out_cell_data: &mut self.cell_data,
        }
    }
}

enum Outcome<T> {
    Done(Piece<T>),
    Empty,
    NotSolid,
    Degenerate,
    Failed(Error),
}

impl<T> Outcome<T> {
    fn counts(&self) -> Counts {
        let mut out = Counts::default();
        match self {
            Outcome::Done(_) => out.processed = 1,
            Outcome::Empty => out.empty = 1,
            Outcome::NotSolid => out.not_solid = 1,
            Outcome::Degenerate => out.skipped_degenerate = 1,
            Outcome::Failed(_) => {}
        }
        out
    }
}

/// Runs `work` on every solid cell and collects the pieces in cell order.
fn run<T, F>(
    grid: &UnstructuredGrid,
    cfg: &BatchConfig,
    work: F,
) -> Result<(Vec<Piece<T>>, Diagnostics)>
where
    T: Send,
    F: Fn(&Polyhedron<'_>, CellId) -> Result<Option<Piece<T>>> + Sync + Send,
{
    let cells: Vec<CellId> = grid.cell_ids().collect();
    let outcomes = map_cells(cells, cfg.parallel, |cell| {
        (cell, process_cell(grid, cell, cfg, &work))
    });

    let mut diagnostics = Diagnostics::default();
    let mut pieces = Vec::new();
    for (cell, outcome) in outcomes {
        let outcome = outcome?;
        diagnostics.counts += outcome.counts();
        match outcome {
            Outcome::Done(piece) => pieces.push(piece),
            Outcome::Failed(e) => {
                log::warn!("skipping cell {}: {}", cell, e);
                diagnostics.failed.push((cell, e));
            }
            _ => {}
        }
    }

    Ok((pieces, diagnostics))
}

fn process_cell<T, F>(grid: &UnstructuredGrid, cell: CellId, cfg: &BatchConfig, work: &F) -> Result<Outcome<T>>
where
    F: Fn(&Polyhedron<'_>, CellId) -> Result<Option<Piece<T>>>,
{
    if !grid.cell_type(cell)?.is_solid() {
        return Ok(Outcome::NotSolid);
    }

    let result = grid.polyhedron(cell).and_then(|poly| {
        let poly = poly.with_config(cfg.query);
        if is_degenerate(&poly) {
            log::debug!("cell {} has no volume", cell);
            return Ok(Outcome::Degenerate);
        }
        if !poly.table().is_closed() {
            return Err(Error::degenerate("surface of the cell is not closed"));
        }

        work(&poly, cell).map(|piece| match piece {
            Some(piece) => Outcome::Done(piece),
            None => Outcome::Empty,
        })
    });

    match result {
        Err(e) if e.is_corrupt_mesh() => Err(e),
        Err(e) => Ok(Outcome::Failed(e)),
        Ok(outcome) => Ok(outcome),
    }
}

/// A cell is degenerate if its volume is negligible compared to its size.
fn is_degenerate(poly: &Polyhedron<'_>) -> bool {
    let d = poly.bounds().diagonal();
    poly.volume() <= 1e-12 * d * d * d
}

#[cfg(feature = "parallel")]
fn map_cells<T, F>(cells: Vec<CellId>, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(CellId) -> T + Sync + Send,
{
    if parallel {
        cells.into_par_iter().map(f).collect()
    } else {
        cells.into_iter().map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_cells<T, F>(cells: Vec<CellId>, _parallel: bool, f: F) -> Vec<T>
where
    F: Fn(CellId) -> T,
{
    cells.into_iter().map(f).collect()
}


// ===========================================================================
// ===== Merging
// ===========================================================================

/// Global output state that the pieces are merged into.
struct Merger {
    locator: MergePoints,
    point_data: AttributeData,
    cell_data: AttributeData,
}

impl Merger {
    fn new(grid: &UnstructuredGrid, cfg: &BatchConfig) -> Self {
        Self {
            locator: MergePoints::new(cfg.merge_tolerance),
            point_data: grid.point_data().copy_allocate(),
            cell_data: grid.cell_data().copy_allocate(),
        }
    }

    /// Inserts the points of a piece and returns the global id of each.
    /// Point data is taken from the first piece that inserts a point.
    fn add_points(&mut self, points: &[Pos], data: &PieceData) -> Vec<PointId> {
        points.iter()
            .enumerate()
            .map(|(local, &p)| {
                let (id, is_new) = self.locator.insert_unique(p);
                if is_new {
                    self.point_data.copy_tuple(&data.point_data, local, id.to_usize());
                }
                id
            })
            .collect()
    }
}

/// Checks that scalars and attributes cover all points and cells.
fn check_inputs(grid: &UnstructuredGrid, scalars: Option<&[f64]>) -> Result<()> {
    if let Some(scalars) = scalars {
        if scalars.len() < grid.num_points() {
            return Err(Error::out_of_range("scalar", scalars.len(), scalars.len()));
        }
    }

    let pd = grid.point_data();
    if !pd.is_empty() && pd.num_tuples() < grid.num_points() {
        return Err(Error::out_of_range("point data tuple", pd.num_tuples(), pd.num_tuples()));
    }

    let cd = grid.cell_data();
    if !cd.is_empty() && cd.num_tuples() < grid.num_cells() {
        return Err(Error::out_of_range("cell data tuple", cd.num_tuples(), cd.num_tuples()));
    }

    Ok(())
}
