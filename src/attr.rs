//! Named attribute arrays attached to points or cells.

use std::fmt;

use crate::error::{Error, Result};


/// A named array of `f64` tuples with a fixed number of components.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeArray {
    name: String,
    num_components: usize,
    values: Vec<f64>,
}

impl AttributeArray {
    /// Creates an empty array.
    ///
    /// Panics if `num_components` is 0.
    pub fn new(name: impl Into<String>, num_components: usize) -> Self {
        assert!(num_components > 0, "attribute arrays need at least one component");
        Self {
            name: name.into(),
            num_components,
            values: Vec::new(),
        }
    }

    /// Creates an array from flat values. Fails if the number of values is
    /// not a multiple of `num_components`.
    pub fn from_values(name: impl Into<String>, num_components: usize, values: Vec<f64>) -> Result<Self> {
        let mut out = Self::new(name, num_components);
        if values.len() % num_components != 0 {
            return Err(Error::malformed(format!(
                "attribute '{}' has {} values, which is not a multiple of {} components",
                out.name,
                values.len(),
                num_components,
            )));
        }

        out.values = values;
        Ok(out)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_tuples(&self) -> usize {
        self.values.len() / self.num_components
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Tuple `i`.
    ///
    /// Panics if `i >= self.num_tuples()`.
    pub fn tuple(&self, i: usize) -> &[f64] {
        &self.values[i * self.num_components..(i + 1) * self.num_components]
    }

    /// Mutable access to tuple `i`, growing the array with zeros if needed.
    fn tuple_mut(&mut self, i: usize) -> &mut [f64] {
        let end = (i + 1) * self.num_components;
        if self.values.len() < end {
            self.values.resize(end, 0.0);
        }
        &mut self.values[i * self.num_components..end]
    }

    /// Same name and layout, no values.
    fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            num_components: self.num_components,
            values: Vec::new(),
        }
    }
}

impl fmt::Display for AttributeArray {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} × {})", self.name, self.num_tuples(), self.num_components)
    }
}


/// A set of attribute arrays that all describe the same entities (points
/// or cells).
///
/// Output data sets are written tuple by tuple at the index of the entity
/// they belong to; arrays grow automatically. Source and destination are
/// matched by array position, so the destination should be created from
/// the source with [`AttributeData::copy_allocate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeData {
    arrays: Vec<AttributeArray>,
}

impl AttributeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an array and returns its index. An array with the same name is
    /// replaced.
    pub fn add_array(&mut self, array: AttributeArray) -> usize {
        match self.arrays.iter().position(|a| a.name == array.name) {
            Some(i) => {
                self.arrays[i] = array;
                i
            }
            None => {
                self.arrays.push(array);
                self.arrays.len() - 1
            }
        }
    }

    pub fn arrays(&self) -> &[AttributeArray] {
        &self.arrays
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn array(&self, name: &str) -> Option<&AttributeArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// Number of tuples of the shortest array.
    pub fn num_tuples(&self) -> usize {
        self.arrays.iter().map(|a| a.num_tuples()).min().unwrap_or(0)
    }

    /// Creates data with the same arrays (names and component counts) but
    /// without any values.
    pub fn copy_allocate(&self) -> Self {
        Self {
            arrays: self.arrays.iter().map(|a| a.empty_like()).collect(),
        }
    }

    /// Copies tuple `from` of every array in `src` to index `to` of the
    /// matching array in `self`.
    pub fn copy_tuple(&mut self, src: &AttributeData, from: usize, to: usize) {
        for (dst, src) in self.arrays.iter_mut().zip(&src.arrays) {
            let n = dst.num_components.min(src.num_components);
            let values = src.tuple(from);
            dst.tuple_mut(to)[..n].copy_from_slice(&values[..n]);
        }
    }

    /// Writes `(1 - t) * src[a] + t * src[b]` to index `to`.
    pub fn interpolate_edge(&mut self, src: &AttributeData, a: usize, b: usize, t: f64, to: usize) {
        self.interpolate(src, &[a, b], &[1.0 - t, t], to);
    }

    /// Writes the weighted sum of the source tuples `ids` to index `to`.
    ///
    /// Panics if `ids` and `weights` differ in length.
    pub fn interpolate(&mut self, src: &AttributeData, ids: &[usize], weights: &[f64], to: usize) {
        assert_eq!(ids.len(), weights.len());

        for (dst, src) in self.arrays.iter_mut().zip(&src.arrays) {
            let n = dst.num_components.min(src.num_components);
            let mut acc = vec![0.0; n];
            for (&id, &w) in ids.iter().zip(weights) {
                for (a, v) in acc.iter_mut().zip(src.tuple(id)) {
                    *a += w * v;
                }
            }
            dst.tuple_mut(to)[..n].copy_from_slice(&acc);
        }
    }
}
