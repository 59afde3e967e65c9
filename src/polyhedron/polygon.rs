//! Triangulation of single (possibly non-convex, slightly non-planar)
//! polygons by ear clipping.

use cgmath::Point2;

use crate::math::{dominant_axis, newell_normal, Pos};


/// Triangulates the polygon `points` and returns triangles as indices into
/// `points`. The triangles have the same orientation as the polygon.
///
/// The polygon is projected onto the coordinate plane most parallel to it
/// (determined by its Newell normal) and clipped ear by ear. If no proper ear
/// can be found (self-intersecting or degenerate polygons), the rest is
/// fanned. Polygons with less than three points yield no triangles.
pub fn triangulate_polygon(points: &[Pos]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let normal = newell_normal(points.iter().cloned());
    let axis = dominant_axis(normal);
    let sign = if normal[axis] >= 0.0 { 1.0 } else { -1.0 };

    // Project to 2D such that the polygon is counter clockwise.
    let projected: Vec<Point2<f64>> = points.iter()
        .map(|p| match axis {
            0 => Point2::new(p.y, p.z * sign),
            1 => Point2::new(p.z, p.x * sign),
            _ => Point2::new(p.x, p.y * sign),
        })
        .collect();

    let scale = {
        let (mut lo, mut hi) = (projected[0], projected[0]);
        for p in &projected {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
        }
        ((hi.x - lo.x).powi(2) + (hi.y - lo.y).powi(2)).max(std::f64::MIN_POSITIVE)
    };
    let eps = 1e-12 * scale;

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut out = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let a = remaining[(i + m - 1) % m];
            let b = remaining[i];
            let c = remaining[(i + 1) % m];
            if cross(projected[a], projected[b], projected[c]) <= eps {
                return false;
            }

            remaining.iter()
                .filter(|&&v| v != a && v != b && v != c)
                .all(|&v| !in_triangle(projected[v], projected[a], projected[b], projected[c]))
        });

        match ear {
            Some(i) => {
                let m = remaining.len();
                out.push([remaining[(i + m - 1) % m], remaining[i], remaining[(i + 1) % m]]);
                remaining.remove(i);
            }
            None => {
                // No ear: fan the rest.
                for i in 1..remaining.len() - 1 {
                    out.push([remaining[0], remaining[i], remaining[i + 1]]);
                }
                return out;
            }
        }
    }

    out.push([remaining[0], remaining[1], remaining[2]]);
    out
}

fn cross(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Closed point in triangle test for a counter clockwise triangle.
fn in_triangle(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}


#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use crate::math::tet_volume;
    use super::*;

    fn area(points: &[Pos], tris: &[[usize; 3]]) -> f64 {
        use cgmath::prelude::*;
        tris.iter()
            .map(|&[a, b, c]| (points[b] - points[a]).cross(points[c] - points[a]).magnitude() / 2.0)
            .sum()
    }

    #[test]
    fn square() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tris = triangulate_polygon(&pts);
        assert_eq!(tris.len(), 2);
        assert!((area(&pts, &tris) - 1.0).abs() < 1e-12);

        // Orientation is kept: all triangles have a +z normal.
        let below = Point3::new(0.5, 0.5, -1.0);
        for &[a, b, c] in &tris {
            assert!(tet_volume(pts[a], pts[b], pts[c], below) < 0.0);
        }
    }

    #[test]
    fn non_convex_l_shape() {
        // An L-shape in the xz-plane, clockwise seen from +y.
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let tris = triangulate_polygon(&pts);
        assert_eq!(tris.len(), 4);
        assert!((area(&pts, &tris) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn too_small() {
        assert!(triangulate_polygon(&[Point3::new(0.0, 0.0, 0.0)]).is_empty());
    }
}
