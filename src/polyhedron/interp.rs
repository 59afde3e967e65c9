//! Mean value coordinates on the closed boundary of a polyhedron.
//!
//! Triangles are handled with the closed form from Ju, Schaefer and Warren,
//! "Mean Value Coordinates for Closed Triangular Meshes" (2005). Faces with
//! more than three points are fanned around a virtual node at the face's
//! vertex centroid; the weight that node receives is split evenly between
//! the face's points. This keeps linear precision, because the value at the
//! virtual node is the average of the face's values.

use std::f64::consts::PI;

use cgmath::prelude::*;
use smallvec::SmallVec;

use crate::math::{centroid, Pos, Vec3};
use super::Polyhedron;


/// Below this, `π - h` means the query point lies on a triangle's plane
/// inside the triangle.
const ANGLE_EPS: f64 = 1e-8;

/// One node of the fanned boundary: either a cell point or the virtual
/// centroid of a face.
#[derive(Debug, Clone)]
enum Node {
    Point(usize),
    FaceCenter(SmallVec<[usize; 8]>),
}

struct FannedBoundary {
    nodes: Vec<(Pos, Node)>,
    triangles: Vec<[usize; 3]>,
}

impl Polyhedron<'_> {
    /// Interpolation weights (`InterpolateFunctions`) of `x` over the cell's
    /// points in local order. The weights sum to one and reproduce linear
    /// functions. If `x` coincides with a cell point, that point gets weight
    /// one. Returns an empty vector for a cell without faces.
    pub fn interpolation_weights(&self, x: Pos) -> Vec<f64> {
        let n = self.num_points();
        let mut out = vec![0.0; n];
        if n == 0 {
            return out;
        }

        let boundary = self.fanned_boundary();
        if boundary.triangles.is_empty() {
            return Vec::new();
        }

        let node_weights = mean_value_weights(
            x,
            &boundary,
            self.abs_tolerance(self.config().weight_epsilon),
        );

        for ((_, node), w) in boundary.nodes.iter().zip(node_weights) {
            match node {
                Node::Point(local) => out[*local] += w,
                Node::FaceCenter(locals) => {
                    let share = w / locals.len() as f64;
                    for &l in locals {
                        out[l] += share;
                    }
                }
            }
        }

        out
    }

    fn fanned_boundary(&self) -> FannedBoundary {
        let mut nodes: Vec<_> = (0..self.num_points())
            .map(|l| (self.point(l), Node::Point(l)))
            .collect();
        let mut triangles = Vec::new();

        for face in self.table().local_faces().iter() {
            let mut distinct: SmallVec<[usize; 8]> = SmallVec::new();
            for &l in face {
                if distinct.last() != Some(&l) {
                    distinct.push(l);
                }
            }
            while distinct.len() > 1 && distinct.first() == distinct.last() {
                distinct.pop();
            }

            match distinct.len() {
                0..=2 => {}
                3 => triangles.push([distinct[0], distinct[1], distinct[2]]),
                len => {
                    let center = match centroid(distinct.iter().map(|&l| self.point(l))) {
                        Some(c) => c,
                        None => continue,
                    };
                    let c = nodes.len();
                    for i in 0..len {
                        triangles.push([c, distinct[i], distinct[(i + 1) % len]]);
                    }
                    nodes.push((center, Node::FaceCenter(distinct)));
                }
            }
        }

        FannedBoundary { nodes, triangles }
    }
}

/// Mean value weights of `x` for every node of the triangulated boundary.
fn mean_value_weights(x: Pos, boundary: &FannedBoundary, eps: f64) -> Vec<f64> {
    let nodes = &boundary.nodes;
    let mut weights = vec![0.0; nodes.len()];

    let mut dist = Vec::with_capacity(nodes.len());
    let mut units: Vec<Vec3> = Vec::with_capacity(nodes.len());
    for (i, (p, _)) in nodes.iter().enumerate() {
        let d = p.distance(x);
        if d <= eps {
            weights[i] = 1.0;
            return weights;
        }
        dist.push(d);
        units.push((*p - x) / d);
    }

    for &[i1, i2, i3] in &boundary.triangles {
        let ids = [i1, i2, i3];
        let u = [units[i1], units[i2], units[i3]];
        let d = [dist[i1], dist[i2], dist[i3]];

        let mut theta = [0.0; 3];
        for k in 0..3 {
            let l = (u[(k + 1) % 3] - u[(k + 2) % 3]).magnitude();
            theta[k] = 2.0 * (l / 2.0).min(1.0).asin();
        }

        let h = (theta[0] + theta[1] + theta[2]) / 2.0;
        if PI - h < ANGLE_EPS {
            // `x` lies on this triangle: barycentric interpolation.
            let mut out = vec![0.0; nodes.len()];
            let mut sum = 0.0;
            for k in 0..3 {
                let w = theta[k].sin() * d[(k + 2) % 3] * d[(k + 1) % 3];
                out[ids[k]] += w;
                sum += w;
            }
            if sum > 0.0 {
                out.iter_mut().for_each(|w| *w /= sum);
                return out;
            }
            continue;
        }

        let det = u[0].dot(u[1].cross(u[2]));
        let sign = if det < 0.0 { -1.0 } else { 1.0 };

        let mut c = [0.0; 3];
        let mut s = [0.0; 3];
        let mut skip = false;
        for k in 0..3 {
            let sin_next = theta[(k + 1) % 3].sin();
            let sin_prev = theta[(k + 2) % 3].sin();
            c[k] = (2.0 * h.sin() * (h - theta[k]).sin()) / (sin_next * sin_prev) - 1.0;
            s[k] = sign * (1.0 - c[k] * c[k]).max(0.0).sqrt();
            if s[k].abs() <= ANGLE_EPS || !c[k].is_finite() {
                skip = true;
            }
        }

        // `x` lies in the plane of the triangle but outside of it.
        if skip {
            continue;
        }

        for k in 0..3 {
            let next = (k + 1) % 3;
            let prev = (k + 2) % 3;
            let numer = theta[k] - c[next] * theta[prev] - c[prev] * theta[next];
            let denom = d[k] * theta[next].sin() * s[prev];
            weights[ids[k]] += numer / denom;
        }
    }

    let sum: f64 = weights.iter().sum();
    if sum.abs() > std::f64::MIN_POSITIVE && sum.is_finite() {
        weights.iter_mut().for_each(|w| *w /= sum);
    } else {
        // Only reachable for degenerate boundaries: inverse distance weights.
        let inv: Vec<_> = dist.iter().map(|d| 1.0 / d).collect();
        let total: f64 = inv.iter().sum();
        weights = inv.into_iter().map(|w| w / total).collect();
    }

    weights
}
