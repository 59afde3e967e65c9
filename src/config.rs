//! Numerical settings for queries and whole-grid operations.


/// Tolerances used by the geometry queries of a
/// [`Polyhedron`][crate::polyhedron::Polyhedron].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryConfig {
    /// Geometric tolerance relative to the length of the cell's bounding box
    /// diagonal. Points closer than this to the surface count as inside and
    /// line hits this close to a face's border still count.
    pub tolerance: f64,

    /// Below this distance (relative to the diagonal) a query point is
    /// considered to coincide with a cell point when computing
    /// interpolation weights.
    pub weight_epsilon: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            weight_epsilon: 1e-8,
        }
    }
}

impl QueryConfig {
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }

    pub fn with_weight_epsilon(self, weight_epsilon: f64) -> Self {
        Self { weight_epsilon, ..self }
    }
}


/// Settings for the whole-grid operations in [`batch`][crate::batch].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    /// Settings for the per-cell queries.
    pub query: QueryConfig,

    /// Output points closer than this (absolute distance) are merged into
    /// one.
    pub merge_tolerance: f64,

    /// Whether to process cells in parallel. Only has an effect if the
    /// `parallel` feature is enabled. The output is identical either way.
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            merge_tolerance: 1e-10,
            parallel: true,
        }
    }
}

impl BatchConfig {
    pub fn with_query(self, query: QueryConfig) -> Self {
        Self { query, ..self }
    }

    pub fn with_merge_tolerance(self, merge_tolerance: f64) -> Self {
        Self { merge_tolerance, ..self }
    }

    pub fn with_parallel(self, parallel: bool) -> Self {
        Self { parallel, ..self }
    }
}
