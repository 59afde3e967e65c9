//! Small geometric helpers over `cgmath` types.
//!
//! Everything in here works with `f64` positions (`Point3<f64>`) and
//! directions (`Vector3<f64>`). Callers can pass positions as arrays or
//! tuples via [`Pos3Like`].

use cgmath::{prelude::*, Point3, Vector3};


/// Shorthand for the position type used everywhere in this crate.
pub type Pos = Point3<f64>;

/// Shorthand for the direction vector type used everywhere in this crate.
pub type Vec3 = Vector3<f64>;


/// Types that can be interpreted to represent some kind of 3D position.
///
/// This type is implemented for the strongly typed `cgmath::Point3<f64>`, as
/// well as for the "weaker" types `(f64, f64, f64)` and `[f64; 3]`. However,
/// to avoid logic errors, you should try to use strong types to represent
/// points in 3D space instead of simple tuples.
pub trait Pos3Like: Copy {
    /// Returns the `x` component of this position.
    fn x(&self) -> f64;

    /// Returns the `y` component of this position.
    fn y(&self) -> f64;

    /// Returns the `z` component of this position.
    fn z(&self) -> f64;

    fn to_point3(self) -> Pos {
        Point3::new(self.x(), self.y(), self.z())
    }
}

impl Pos3Like for Point3<f64> {
    fn x(&self) -> f64 { self.x }
    fn y(&self) -> f64 { self.y }
    fn z(&self) -> f64 { self.z }
}

impl Pos3Like for (f64, f64, f64) {
    fn x(&self) -> f64 { self.0 }
    fn y(&self) -> f64 { self.1 }
    fn z(&self) -> f64 { self.2 }
}

impl Pos3Like for [f64; 3] {
    fn x(&self) -> f64 { self[0] }
    fn y(&self) -> f64 { self[1] }
    fn z(&self) -> f64 { self[2] }
}


// ===========================================================================
// ===== Bounding box
// ===========================================================================

/// An axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Pos,
    max: Pos,
}

impl BoundingBox {
    /// Creates an invalid bounding box: all lower bounds are ∞, all upper
    /// bounds are -∞. Once you added a single point, the bounding box will be
    /// valid.
    pub fn new() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates a bounding box around all points of the given iterator. If the
    /// iterator is empty, an invalid bounding box is returned (see
    /// [`BoundingBox::new`]).
    pub fn around<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::Item: Pos3Like,
    {
        let mut out = Self::new();
        for pos in iter {
            out.add_point(pos);
        }
        out
    }

    /// Returns `true` if at least one point was added.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x
    }

    /// Returns the lower corner.
    pub fn min(&self) -> Pos {
        self.min
    }

    /// Returns the upper corner.
    pub fn max(&self) -> Pos {
        self.max
    }

    /// Returns the `[lower, upper]` limits for the x coordinate.
    pub fn x(&self) -> [f64; 2] {
        [self.min.x, self.max.x]
    }

    /// Returns the `[lower, upper]` limits for the y coordinate.
    pub fn y(&self) -> [f64; 2] {
        [self.min.y, self.max.y]
    }

    /// Returns the `[lower, upper]` limits for the z coordinate.
    pub fn z(&self) -> [f64; 2] {
        [self.min.z, self.max.z]
    }

    /// Returns the center of the bounding box.
    pub fn center(&self) -> Pos {
        self.min.midpoint(self.max)
    }

    /// Length of the diagonal. Zero for invalid boxes.
    pub fn diagonal(&self) -> f64 {
        if self.is_valid() {
            self.min.distance(self.max)
        } else {
            0.0
        }
    }

    /// Extends the bounding box to contain the given point.
    pub fn add_point(&mut self, p: impl Pos3Like) {
        let p = p.to_point3();
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Returns `true` if `p` is inside the box or at most `tol` away from it
    /// along each axis.
    pub fn contains(&self, p: impl Pos3Like, tol: f64) -> bool {
        let p = p.to_point3();
        p.x >= self.min.x - tol && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol && p.y <= self.max.y + tol
            && p.z >= self.min.z - tol && p.z <= self.max.z + tol
    }

    /// Maps `p` to coordinates relative to the box: the lower corner maps to
    /// `(0, 0, 0)`, the upper corner to `(1, 1, 1)`. Flat axes map to `0`.
    pub fn to_parametric(&self, p: impl Pos3Like) -> [f64; 3] {
        let p = p.to_point3();
        let rel = |v: f64, lo: f64, hi: f64| {
            if hi - lo > 0.0 { (v - lo) / (hi - lo) } else { 0.0 }
        };
        [
            rel(p.x, self.min.x, self.max.x),
            rel(p.y, self.min.y, self.max.y),
            rel(p.z, self.min.z, self.max.z),
        ]
    }

    /// Inverse of [`BoundingBox::to_parametric`].
    pub fn from_parametric(&self, pc: [f64; 3]) -> Pos {
        let lerp = |t: f64, lo: f64, hi: f64| (1.0 - t) * lo + t * hi;
        Point3::new(
            lerp(pc[0], self.min.x, self.max.x),
            lerp(pc[1], self.min.y, self.max.y),
            lerp(pc[2], self.min.z, self.max.z),
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}


// ===========================================================================
// ===== Polygons, triangles and tetrahedra
// ===========================================================================

/// Computes the (non-normalized) normal of a polygon with Newell's method.
/// Its length is twice the polygon's area. Works for non-planar and
/// non-convex polygons.
pub fn newell_normal<I>(points: I) -> Vec3
where
    I: IntoIterator<Item = Pos>,
    I::IntoIter: Clone,
{
    let iter = points.into_iter();
    let mut n = Vec3::zero();
    let firsts = iter.clone().take(1);
    for (a, b) in iter.clone().zip(iter.skip(1).chain(firsts)) {
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Returns the vertex centroid (the plain average) of the given points or
/// `None` if the iterator is empty.
pub fn centroid<I>(points: I) -> Option<Pos>
where
    I: IntoIterator<Item = Pos>,
{
    let mut count = 0usize;
    let mut sum = Vec3::zero();
    for p in points {
        sum += p.to_vec();
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some(Point3::from_vec(sum / count as f64))
    }
}

/// Signed volume of the tetrahedron `(a, b, c, d)`. Positive if `d` lies on
/// the side of the triangle `(a, b, c)` its counter clockwise normal points
/// to.
pub fn tet_volume(a: Pos, b: Pos, c: Pos, d: Pos) -> f64 {
    (b - a).cross(c - a).dot(d - a) / 6.0
}

/// Index (0, 1, 2) of the largest absolute component of `v`.
pub fn dominant_axis(v: Vec3) -> usize {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    if x >= y && x >= z {
        0
    } else if y >= z {
        1
    } else {
        2
    }
}

/// Returns the closest point to `p` on the triangle `(a, b, c)`.
///
/// Reference: Ericson, Christer. "Real-Time Collision Detection" (2004),
/// section 5.1.5.
pub fn closest_point_on_triangle(p: Pos, a: Pos, b: Pos, c: Pos) -> Pos {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Intersects the segment `p1 → p2` with the triangle `(a, b, c)`.
///
/// Returns the segment parameter `t ∈ [0, 1]` of the hit. Hits up to the
/// distance `tol` outside the triangle or beyond the ends of the segment
/// still count. A segment parallel to the triangle never hits.
///
/// Reference: Möller, Tomas; Trumbore, Ben. "Fast, minimum storage
/// ray-triangle intersection" (1997).
pub fn segment_triangle(p1: Pos, p2: Pos, a: Pos, b: Pos, c: Pos, tol: f64) -> Option<f64> {
    let dir = p2 - p1;
    let e1 = b - a;
    let e2 = c - a;
    let h = dir.cross(e2);
    let det = e1.dot(h);

    let scale = e1.magnitude() * e2.magnitude() * dir.magnitude();
    if scale == 0.0 || det.abs() <= 1e-12 * scale {
        return None;
    }

    // Barycentric slack: `tol` divided by the height over the opposite edge.
    let twice_area = e1.cross(e2).magnitude();
    let tol_u = tol * e2.magnitude() / twice_area;
    let tol_v = tol * e1.magnitude() / twice_area;
    let tol_w = tol * (c - b).magnitude() / twice_area;
    let tol_t = tol / dir.magnitude();

    let inv = 1.0 / det;
    let s = p1 - a;
    let u = inv * s.dot(h);
    if u < -tol_u || u > 1.0 + tol_u {
        return None;
    }

    let q = s.cross(e1);
    let v = inv * dir.dot(q);
    if v < -tol_v || u + v > 1.0 + tol_w {
        return None;
    }

    let t = inv * e2.dot(q);
    if t < -tol_t || t > 1.0 + tol_t {
        return None;
    }

    Some(t.max(0.0).min(1.0))
}

/// Signed solid angle subtended by the triangle `(a, b, c)` as seen from
/// `p`. Positive if the triangle is seen counter clockwise.
///
/// Reference: Van Oosterom, A.; Strackee, J. "The Solid Angle of a Plane
/// Triangle" (1983).
pub fn solid_angle(p: Pos, a: Pos, b: Pos, c: Pos) -> f64 {
    let ra = a - p;
    let rb = b - p;
    let rc = c - p;
    let la = ra.magnitude();
    let lb = rb.magnitude();
    let lc = rc.magnitude();

    let numer = ra.dot(rb.cross(rc));
    let denom = la * lb * lc + ra.dot(rb) * lc + ra.dot(rc) * lb + rb.dot(rc) * la;
    2.0 * numer.atan2(denom)
}
