use crate::{
    cell::CellType,
    handle::{hsize, Handle, PointId},
    math::Pos,
};
use cgmath::Point3;


macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        assert_close!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $eps:expr) => {{
        let (left, right, eps): (f64, f64, f64) = ($left, $right, $eps);
        if !((left - right).abs() <= eps) {
            panic!(
                "assert_close failed:\n  left: `{}`,\n right: `{}`\n   eps: `{}`\nAt: {}:{}:{}",
                left,
                right,
                eps,
                file!(),
                line!(),
                column!(),
            );
        }
    }};
}

macro_rules! assert_pos_close {
    ($left:expr, $right:expr) => {{
        let (left, right): (crate::math::Pos, crate::math::Pos) = ($left, $right);
        assert_close!(left.x, right.x);
        assert_close!(left.y, right.y);
        assert_close!(left.z, right.z);
    }};
}


pub(crate) fn ids(raw: &[hsize]) -> Vec<PointId> {
    raw.iter().map(|&i| PointId::new(i)).collect()
}

/// The corners of the axis aligned box `[-hx, hx] × [-hy, hy] × [-hz, hz]`
/// in hexahedron order (bottom quad counter clockwise, then top quad).
pub(crate) fn box_points(hx: f64, hy: f64, hz: f64) -> Vec<Pos> {
    vec![
        Point3::new(-hx, -hy, -hz),
        Point3::new(hx, -hy, -hz),
        Point3::new(hx, hy, -hz),
        Point3::new(-hx, hy, -hz),
        Point3::new(-hx, -hy, hz),
        Point3::new(hx, -hy, hz),
        Point3::new(hx, hy, hz),
        Point3::new(-hx, hy, hz),
    ]
}

/// Outward oriented faces for the points of [`box_points`]. Face 3 is the
/// one at `x = +hx`, face 1 the one at `z = +hz`.
pub(crate) fn box_faces() -> Vec<Vec<PointId>> {
    vec![
        ids(&[0, 3, 2, 1]),
        ids(&[4, 5, 6, 7]),
        ids(&[0, 1, 5, 4]),
        ids(&[1, 2, 6, 5]),
        ids(&[2, 3, 7, 6]),
        ids(&[3, 0, 4, 7]),
    ]
}

/// An L-shaped prism: the outline `(0,0) (2,0) (2,1) (1,1) (1,2) (0,2)`
/// extruded from `z = 0` to `z = 1`. Not convex, volume 3.
pub(crate) fn l_prism() -> (Vec<Pos>, Vec<Vec<PointId>>) {
    prism(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)])
}

/// A U-shaped prism: the outline `(0,0) (3,0) (3,3) (2,3) (2,1) (1,1) (1,3)
/// (0,3)` extruded from `z = 0` to `z = 1`. Volume 7. Not star-shaped: its
/// vertex centroid `(1.5, 1.75, 0.5)` lies in the notch, outside the cell.
pub(crate) fn u_prism() -> (Vec<Pos>, Vec<Vec<PointId>>) {
    prism(&[
        (0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (2.0, 3.0),
        (2.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0),
    ])
}

/// Extrudes a counter clockwise outline from `z = 0` to `z = 1`. Points
/// `0..n` are the bottom, `n..2n` the top; faces point outwards.
fn prism(outline: &[(f64, f64)]) -> (Vec<Pos>, Vec<Vec<PointId>>) {
    let n = outline.len() as hsize;

    let mut points: Vec<Pos> = outline.iter().map(|&(x, y)| Point3::new(x, y, 0.0)).collect();
    points.extend(outline.iter().map(|&(x, y)| Point3::new(x, y, 1.0)));

    let mut faces = vec![
        (0..n).rev().map(PointId::new).collect(),
        (n..2 * n).map(PointId::new).collect::<Vec<_>>(),
    ];
    for i in 0..n {
        let j = (i + 1) % n;
        faces.push(ids(&[i, j, j + n, i + n]));
    }

    (points, faces)
}

/// A tetrahedron with faces from the cell type's face table.
pub(crate) fn tetra() -> (Vec<Pos>, Vec<Vec<PointId>>) {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(0.0, 0.0, 6.0),
    ];
    let faces = CellType::Tetra.faces()
        .iter()
        .map(|f| f.iter().map(|&l| PointId::from_usize(l)).collect())
        .collect();

    (points, faces)
}
