use cgmath::{prelude::*, Point3};

use crate::{
    attr::{AttributeArray, AttributeData},
    conn::O2m,
    error::Error,
    grid::PolyhedronCells,
    handle::{CellId, Handle, PointId},
    locator::{MergePoints, PointLocator},
    math::{newell_normal, Pos, Vec3},
    test_utils::{box_faces, box_points, ids, l_prism, tetra, u_prism},
};
use super::*;


/// The box `[-5, 5] × [-5, 5] × [-10, 10]`.
fn tall_box() -> (Vec<Pos>, Vec<Vec<PointId>>) {
    (box_points(5.0, 5.0, 10.0), box_faces())
}

/// A linear field used for interpolation and derivative tests.
fn linear(p: Pos) -> f64 {
    2.0 * p.x - p.y + 0.5 * p.z + 1.0
}

macro_rules! shape_tests {
    ($($shape:ident => $volume:expr, $inside:expr, $outside:expr;)*) => {
        $(
            paste::item! {
                #[test]
                fn [<$shape _volume_matches_decomposition>]() {
                    let (points, faces) = $shape();
                    let poly = Polyhedron::new(&points, &faces).unwrap();
                    assert!(poly.table().is_closed());
                    assert_close!(poly.volume(), $volume);
                    assert_close!(poly.triangulate().volume(), $volume);
                }

                #[test]
                fn [<$shape _inside_outside>]() {
                    let (points, faces) = $shape();
                    let poly = Polyhedron::new(&points, &faces).unwrap();
                    assert!(poly.is_inside($inside, 1e-5));
                    assert!(!poly.is_inside($outside, 1e-5));
                    assert_close!(poly.winding_number($inside).abs(), 1.0, 1e-9);
                    assert_close!(poly.winding_number($outside), 0.0, 1e-9);
                }

                #[test]
                fn [<$shape _weights_reproduce_linear_fields>]() {
                    let (points, faces) = $shape();
                    let poly = Polyhedron::new(&points, &faces).unwrap();
                    let x = Point3::from($inside);
                    let weights = poly.interpolation_weights(x);
                    assert_eq!(weights.len(), poly.num_points());
                    assert_close!(weights.iter().sum::<f64>(), 1.0);

                    let mut reproduced = Vec3::zero();
                    for (local, w) in weights.iter().enumerate() {
                        reproduced += poly.point(local).to_vec() * *w;
                    }
                    assert_pos_close!(Point3::from_vec(reproduced), x);
                }

                #[test]
                fn [<$shape _derivatives_of_linear_field>]() {
                    let (points, faces) = $shape();
                    let poly = Polyhedron::new(&points, &faces).unwrap();
                    let values: Vec<_> = poly.positions().map(linear).collect();
                    let pcoords = poly.parametric_coords($inside);
                    let d = poly.derivatives(pcoords, &values, 1).unwrap();
                    assert_close!(d[0], 2.0);
                    assert_close!(d[1], -1.0);
                    assert_close!(d[2], 0.5);
                }
            }
        )*
    };
}

shape_tests! {
    tall_box => 2000.0, [1.0, 2.0, -3.0], [-100.0, 0.0, 0.0];
    l_prism => 3.0, [0.5, 1.5, 0.5], [1.5, 1.5, 0.5];
    tetra => 6.0, [0.5, 0.5, 0.5], [2.0, 2.0, 2.0];
    u_prism => 7.0, [0.5, 2.0, 0.5], [1.5, 2.0, 0.5];
}


#[test]
fn box_topology() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert_eq!(poly.num_points(), 8);
    assert_eq!(poly.num_faces(), 6);
    assert_eq!(poly.num_edges(), 12);
    assert_eq!(poly.face(1).unwrap().as_slice(), &ids(&[4, 5, 6, 7])[..]);
    assert!(poly.face(6).is_err());
    assert_eq!(poly.centroid(), Some(Point3::new(0.0, 0.0, 0.0)));
    assert!(poly.is_convex());
}

#[test]
fn invalid_point_ids() {
    let (points, faces) = tall_box();
    assert_eq!(
        Polyhedron::new(&points[..4], &faces).err(),
        Some(Error::IndexOutOfRange { what: "point", index: 4, len: 4 }),
    );
}

#[test]
fn l_prism_is_not_convex() {
    let (points, faces) = l_prism();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert_eq!(poly.num_faces(), 8);
    assert_eq!(poly.num_edges(), 18);
    assert!(!poly.is_convex());
}

#[test]
fn inside_near_boundary() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert!(poly.is_inside([0.0, 0.0, 0.0], 1e-5));
    assert!(!poly.is_inside([-100.0, 0.0, 0.0], 1e-5));
    assert!(poly.is_inside([4.9, -4.9, 9.9], 1e-5));
    assert!(poly.is_inside([5.0, 0.0, 0.0], 1e-5));
    assert!(!poly.is_inside([5.5, 0.0, 0.0], 1e-5));
    // 0.1 is within 1% of the diagonal.
    assert!(poly.is_inside([5.1, 0.0, 0.0], 1e-2));
}

#[test]
fn line_through_box() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();

    // Away from the diagonals of the side quads, so every face is hit by
    // exactly one of its triangles.
    let hit = poly.intersect_with_line([-10.0, 1.0, 3.0], [10.0, 1.0, 3.0], 1e-9).unwrap();
    assert_eq!(hit.num_hits, 2);
    assert_close!(hit.t, 0.25);
    assert_pos_close!(hit.x, Point3::new(-5.0, 1.0, 3.0));
    assert_eq!(hit.sub_id, 5);
    assert_close!(hit.pcoords[0], 0.0);
    assert_close!(hit.pcoords[1], 0.6);
    assert_close!(hit.pcoords[2], 0.65);

    // Starts inside: one hit.
    let hit = poly.intersect_with_line([0.0, 1.0, 3.0], [0.0, 1.0, 30.0], 1e-9).unwrap();
    assert_eq!(hit.num_hits, 1);
    assert_eq!(hit.sub_id, 1);
    assert_pos_close!(hit.x, Point3::new(0.0, 1.0, 10.0));

    assert!(poly.intersect_with_line([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1e-9).is_none());
    assert!(poly.intersect_with_line([-10.0, 6.0, 3.0], [10.0, 6.0, 3.0], 1e-9).is_none());
}

#[test]
fn weights_at_special_points() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();

    for w in poly.interpolation_weights(Point3::new(0.0, 0.0, 0.0)) {
        assert_close!(w, 0.125);
    }

    // Center of the face at x = +5.
    let w = poly.interpolation_weights(Point3::new(5.0, 0.0, 0.0));
    for (local, &id) in poly.point_ids().iter().enumerate() {
        let expected = if [1, 2, 5, 6].contains(&id.idx()) { 0.25 } else { 0.0 };
        assert_close!(w[local], expected);
    }

    // A corner.
    let corner = poly.table().local_index(PointId::new(6)).unwrap();
    let w = poly.interpolation_weights(Point3::new(5.0, 5.0, 10.0));
    for (local, &w) in w.iter().enumerate() {
        assert_close!(w, if local == corner { 1.0 } else { 0.0 });
    }
}

#[test]
fn evaluate_position_inside_and_outside() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();

    let eval = poly.evaluate_position([1.0, 2.0, 3.0]).unwrap();
    assert!(eval.inside);
    assert_eq!(eval.dist2, 0.0);
    assert_eq!(eval.closest, Point3::new(1.0, 2.0, 3.0));
    assert_close!(eval.pcoords[0], 0.6);
    assert_close!(eval.pcoords[1], 0.7);
    assert_close!(eval.pcoords[2], 0.65);

    let (x, weights) = poly.evaluate_location(eval.pcoords);
    assert_pos_close!(x, eval.closest);
    for (a, b) in weights.iter().zip(&eval.weights) {
        assert_close!(*a, *b);
    }

    let eval = poly.evaluate_position([8.0, 0.0, 0.0]).unwrap();
    assert!(!eval.inside);
    assert_eq!(eval.sub_id, 3);
    assert_close!(eval.dist2, 9.0);
    assert_pos_close!(eval.closest, Point3::new(5.0, 0.0, 0.0));
    assert_close!(eval.weights.iter().sum::<f64>(), 1.0);
}

#[test]
fn evaluate_location_of_closest_point() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let eval = poly.evaluate_position([8.0, 0.0, 0.0]).unwrap();
    let (x, weights) = poly.evaluate_location(eval.pcoords);
    assert_pos_close!(x, eval.closest);
    assert_eq!(weights.len(), eval.weights.len());
    for (a, b) in weights.iter().zip(&eval.weights) {
        assert_close!(*a, *b);
    }

    // In the notch of the L: the closest point is on the face at y = 1.
    let (points, faces) = l_prism();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let eval = poly.evaluate_position([1.5, 1.2, 0.5]).unwrap();
    assert!(!eval.inside);
    assert_close!(eval.dist2, 0.04);
    assert_pos_close!(eval.closest, Point3::new(1.5, 1.0, 0.5));
    let (x, weights) = poly.evaluate_location(eval.pcoords);
    assert_pos_close!(x, eval.closest);
    for (a, b) in weights.iter().zip(&eval.weights) {
        assert_close!(*a, *b);
    }
}

#[test]
fn line_tolerance_is_relative_to_the_cell_size() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();

    // Passes 0.1 outside the faces at x = ±5. The diagonal is about 24.5.
    let hit = poly.intersect_with_line([-10.0, 5.1, 3.0], [10.0, 5.1, 3.0], 1e-2).unwrap();
    assert_eq!(hit.num_hits, 2);
    assert_close!(hit.t, 0.25);
    assert_pos_close!(hit.x, Point3::new(-5.0, 5.1, 3.0));

    assert!(poly.intersect_with_line([-10.0, 5.1, 3.0], [10.0, 5.1, 3.0], 1e-3).is_none());
}

#[test]
fn cell_boundary_picks_closest_face() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();

    let (face, inside) = poly.cell_boundary([0.5, 0.5, 0.95]).unwrap();
    assert_eq!(face.as_slice(), &ids(&[4, 5, 6, 7])[..]);
    assert!(inside);

    let (face, inside) = poly.cell_boundary([0.5, 0.5, 1.2]).unwrap();
    assert_eq!(face.as_slice(), &ids(&[4, 5, 6, 7])[..]);
    assert!(!inside);
}

#[test]
fn decomposition() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let tets = poly.triangulate();

    assert_eq!(tets.len(), 12);
    assert_eq!(tets.points.len(), 9);
    assert_eq!(tets.centroid_index(), Some(8));
    assert_eq!(tets.source_id(8), None);
    assert_eq!(tets.source_id(0), Some(poly.point_ids()[0]));
    assert_eq!(tets.flat_connectivity().len(), 48);
    for tet in &tets.tets {
        let [a, b, c, d] = tets.corners(tet);
        assert!(crate::math::tet_volume(a, b, c, d) > 0.0);
    }

    let values = tets.extend_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 1);
    assert_eq!(values[8], 4.5);
}

#[test]
fn derivatives_with_several_components() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let values: Vec<_> = poly.positions()
        .flat_map(|p| vec![linear(p), p.z, 3.0])
        .collect();

    let d = poly.derivatives([0.3, 0.6, 0.2], &values, 3).unwrap();
    let expected = [2.0, -1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    assert_eq!(d.len(), expected.len());
    for (a, b) in d.iter().zip(&expected) {
        assert_close!(*a, *b);
    }
}

#[test]
fn derivatives_with_too_few_values() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert_eq!(
        poly.derivatives([0.5, 0.5, 0.5], &[0.0; 3], 1),
        Err(Error::IndexOutOfRange { what: "value", index: 7, len: 3 }),
    );
    assert_eq!(
        poly.derivatives([0.5, 0.5, 0.5], &[0.0; 8], 2),
        Err(Error::IndexOutOfRange { what: "value", index: 15, len: 8 }),
    );
}

#[test]
fn decomposition_of_non_star_shaped_cell() {
    let (points, faces) = u_prism();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert!(!poly.is_inside(poly.centroid().unwrap(), 1e-5));

    let tets = poly.triangulate();
    assert!(!tets.is_empty());
    assert_eq!(tets.centroid_index(), None);
    assert_close!(tets.volume(), 7.0, 1e-9);
    for tet in &tets.tets {
        let [a, b, c, d] = tets.corners(tet);
        assert!(crate::math::tet_volume(a, b, c, d) > 0.0);
        let center = Point3::from_vec((a.to_vec() + b.to_vec() + c.to_vec() + d.to_vec()) / 4.0);
        assert!(poly.is_inside(center, 1e-9), "tetrahedron outside the cell: {:?}", tet);
    }

    // Additional points are interpolated from the cell points.
    for (i, pos) in tets.points.iter().enumerate() {
        let weights = &tets.weights[i];
        assert_close!(weights.iter().map(|w| w.1).sum::<f64>(), 1.0);
        let mut x = Vec3::zero();
        for &(local, w) in weights {
            x += poly.point(local).to_vec() * w;
        }
        assert_pos_close!(Point3::from_vec(x), *pos);
    }
    let xs: Vec<_> = poly.positions().map(|p| p.x).collect();
    let values = tets.extend_values(&xs, 1);
    for (v, p) in values.iter().zip(&tets.points) {
        assert_close!(*v, p.x);
    }
}

#[test]
fn open_cell_has_no_decomposition() {
    let points = box_points(1.0, 1.0, 1.0);
    let faces: Vec<_> = box_faces().into_iter().filter(|f| f != &ids(&[4, 5, 6, 7])).collect();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    assert!(!poly.table().is_closed());
    assert!(poly.triangulate().is_empty());

    let mut locator = MergePoints::new(0.0);
    let mut polys = O2m::new();
    let scalars = z_scalars(&points);
    assert_eq!(poly.contour(0.0, &scalars, &mut locator, &mut polys, None, CellId::new(0)), Ok(0));
    assert!(polys.is_empty());
}

#[test]
fn degenerate_cells() {
    let points = box_points(1.0, 1.0, 1.0);

    let flat = Polyhedron::new(&points, &[ids(&[0, 1, 2, 3]), ids(&[3, 2, 1, 0])]).unwrap();
    assert_eq!(flat.volume(), 0.0);
    assert!(flat.triangulate().is_empty());
    assert!(matches!(
        flat.derivatives([0.5, 0.5, 0.0], &[0.0; 4], 1),
        Err(Error::DegenerateGeometry { .. })
    ));

    let no_faces: &[Vec<PointId>] = &[];
    let empty = Polyhedron::new(&points, no_faces).unwrap();
    assert!(!empty.is_inside([0.0, 0.0, 0.0], 1e-5));
    assert!(empty.interpolation_weights(Point3::new(0.0, 0.0, 0.0)).is_empty());
    assert!(matches!(
        empty.evaluate_position([0.0, 0.0, 0.0]),
        Err(Error::DegenerateGeometry { .. })
    ));
    assert!(empty.intersect_with_line([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], 0.0).is_none());
}


// ===========================================================================
// ===== Contour and clip
// ===========================================================================

fn z_scalars(points: &[Pos]) -> Vec<f64> {
    points.iter().map(|p| p.z).collect()
}

fn polygon_positions(locator: &MergePoints, poly: &[PointId]) -> Vec<Pos> {
    poly.iter().map(|id| locator.points()[id.to_usize()]).collect()
}

#[test]
fn contour_box_at_z() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars = z_scalars(&points);

    let mut point_data = AttributeData::new();
    point_data.add_array(AttributeArray::from_values("x", 1, points.iter().map(|p| p.x).collect()).unwrap());
    let mut cell_data = AttributeData::new();
    cell_data.add_array(AttributeArray::from_values("material", 1, vec![7.0]).unwrap());
    let mut out_point_data = point_data.copy_allocate();
    let mut out_cell_data = cell_data.copy_allocate();

    let mut locator = MergePoints::new(0.0);
    let mut polys = O2m::new();
    let emitted = {
        let mut attrs = CutAttributes {
            point_data: &point_data,
            out_point_data: &mut out_point_data,
            cell_data: &cell_data,
            out_cell_data: &mut out_cell_data,
        };
        poly.contour(2.5, &scalars, &mut locator, &mut polys, Some(&mut attrs), CellId::new(0)).unwrap()
    };

    // The pieces of all tetrahedra are joined into one polygon.
    assert_eq!(emitted, 1);
    assert_eq!(emitted, polys.len());

    let mut area = 0.0;
    for p in polys.iter() {
        let positions = polygon_positions(&locator, p);
        for pos in &positions {
            assert_close!(pos.z, 2.5);
        }
        let normal = newell_normal(positions.iter().cloned());
        assert!(normal.z > 0.0, "polygon not oriented along the gradient");
        area += normal.magnitude() / 2.0;
    }
    assert_close!(area, 100.0, 1e-9);

    let xs = out_point_data.array("x").unwrap();
    assert_eq!(xs.num_tuples(), locator.num_points());
    for (i, p) in locator.points().iter().enumerate() {
        assert_close!(xs.tuple(i)[0], p.x);
    }
    assert_eq!(out_cell_data.array("material").unwrap().values(), &vec![7.0; emitted][..]);
}

#[test]
fn contour_outside_range_is_empty() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars = z_scalars(&points);

    let mut locator = MergePoints::new(0.0);
    let mut polys = O2m::new();
    let n = poly.contour(50.0, &scalars, &mut locator, &mut polys, None, CellId::new(0)).unwrap();
    assert_eq!(n, 0);
    assert!(polys.is_empty());
    assert_eq!(locator.num_points(), 0);

    assert_eq!(
        poly.contour(0.0, &scalars[..3], &mut locator, &mut polys, None, CellId::new(0)),
        Err(Error::IndexOutOfRange { what: "scalar", index: 3, len: 3 }),
    );
}

/// Clips the tall box at `z = iso` and returns the volume of the kept part.
fn clipped_volume(iso: f64, inside_out: bool) -> Option<f64> {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars = z_scalars(&points);

    let mut locator = MergePoints::new(0.0);
    let mut cells = PolyhedronCells::new();
    let emitted = poly.clip(iso, &scalars, &mut locator, &mut cells, None, CellId::new(0), inside_out)
        .unwrap();
    assert_eq!(emitted, !cells.is_empty());
    if !emitted {
        return None;
    }

    assert_eq!(cells.len(), 1);
    let out_points = locator.into_points();
    let faces = cells.cell(0).unwrap();
    let out = Polyhedron::new(&out_points, &faces).unwrap();
    assert!(out.table().is_closed());
    for p in out.positions() {
        if inside_out {
            assert!(p.z <= iso + 1e-12);
        } else {
            assert!(p.z >= iso - 1e-12);
        }
    }

    Some(out.volume())
}

#[test]
fn clip_halves_partition_the_cell() {
    let above = clipped_volume(2.5, false).unwrap();
    let below = clipped_volume(2.5, true).unwrap();
    assert_close!(above, 750.0, 1e-9);
    assert_close!(below, 1250.0, 1e-9);
}

#[test]
fn clip_keep_all_or_nothing() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars = z_scalars(&points);

    let mut locator = MergePoints::new(0.0);
    let mut cells = PolyhedronCells::new();
    assert!(poly.clip(-20.0, &scalars, &mut locator, &mut cells, None, CellId::new(0), false).unwrap());
    assert_eq!(cells.num_faces(), 6);
    assert_eq!(locator.num_points(), 8);
    assert_eq!(cells.cell(0).unwrap()[1], &ids(&[4, 5, 6, 7])[..]);

    assert!(!poly.clip(20.0, &scalars, &mut locator, &mut cells, None, CellId::new(0), false).unwrap());
    assert!(!poly.clip(-20.0, &scalars, &mut locator, &mut cells, None, CellId::new(0), true).unwrap());
    assert_eq!(cells.len(), 1);
    assert_close!(clipped_volume(20.0, true).unwrap(), 2000.0, 1e-9);
}

#[test]
fn clip_interpolates_point_data() {
    let (points, faces) = tall_box();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars = z_scalars(&points);

    let mut point_data = AttributeData::new();
    point_data.add_array(AttributeArray::from_values("z", 1, scalars.clone()).unwrap());
    let cell_data = AttributeData::new();
    let mut out_point_data = point_data.copy_allocate();
    let mut out_cell_data = cell_data.copy_allocate();

    let mut locator = MergePoints::new(0.0);
    let mut cells = PolyhedronCells::new();
    let mut attrs = CutAttributes {
        point_data: &point_data,
        out_point_data: &mut out_point_data,
        cell_data: &cell_data,
        out_cell_data: &mut out_cell_data,
    };
    poly.clip(-4.0, &scalars, &mut locator, &mut cells, Some(&mut attrs), CellId::new(0), true)
        .unwrap();

    let zs = out_point_data.array("z").unwrap();
    assert_eq!(zs.num_tuples(), locator.num_points());
    for (i, p) in locator.points().iter().enumerate() {
        assert_close!(zs.tuple(i)[0], p.z);
    }
}

/// Clips the U prism at `x = iso` and returns the kept part.
fn clip_u_prism(iso: f64, inside_out: bool) -> (Vec<Pos>, Vec<Vec<PointId>>) {
    let (points, faces) = u_prism();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars: Vec<_> = points.iter().map(|p| p.x).collect();

    let mut locator = MergePoints::new(0.0);
    let mut cells = PolyhedronCells::new();
    assert!(poly.clip(iso, &scalars, &mut locator, &mut cells, None, CellId::new(0), inside_out).unwrap());
    assert_eq!(cells.len(), 1);

    let faces = cells.cell(0).unwrap().iter().map(|f| f.to_vec()).collect();
    (locator.into_points(), faces)
}

#[test]
fn clip_non_star_shaped_cell() {
    let (points, faces) = clip_u_prism(1.5, false);
    let right = Polyhedron::new(&points, &faces).unwrap();
    assert!(right.table().is_closed());
    assert!(right.positions().all(|p| p.x >= 1.5));

    let (points, faces) = clip_u_prism(1.5, true);
    let left = Polyhedron::new(&points, &faces).unwrap();
    assert!(left.table().is_closed());
    assert!(left.positions().all(|p| p.x <= 1.5));

    assert_close!(right.volume(), 3.5, 1e-9);
    assert_close!(left.volume(), 3.5, 1e-9);

    let (points, faces) = clip_u_prism(0.4, true);
    let arm = Polyhedron::new(&points, &faces).unwrap();
    assert_close!(arm.volume(), 1.2, 1e-9);
}

/// Contours the U prism with the scalar field `f` at `iso`.
fn contour_u_prism(f: impl Fn(Pos) -> f64, iso: f64) -> (MergePoints, O2m<PointId>) {
    let (points, faces) = u_prism();
    let poly = Polyhedron::new(&points, &faces).unwrap();
    let scalars: Vec<_> = points.iter().cloned().map(f).collect();

    let mut locator = MergePoints::new(0.0);
    let mut polys = O2m::new();
    let n = poly.contour(iso, &scalars, &mut locator, &mut polys, None, CellId::new(0)).unwrap();
    assert_eq!(n, polys.len());
    (locator, polys)
}

#[test]
fn contour_non_star_shaped_cell() {
    // Across the bottom bar, between the arms.
    let (locator, polys) = contour_u_prism(|p| p.x, 1.5);
    let mut normal = Vec3::zero();
    for p in polys.iter() {
        let positions = polygon_positions(&locator, p);
        for pos in &positions {
            assert_close!(pos.x, 1.5);
        }
        normal += newell_normal(positions.iter().cloned()) / 2.0;
    }
    assert_close!(normal.x, 1.0, 1e-9);
    assert_close!(normal.y, 0.0, 1e-9);
    assert_close!(normal.z, 0.0, 1e-9);

    // Through both arms: one polygon per arm.
    let (locator, polys) = contour_u_prism(|p| p.y, 2.0);
    assert_eq!(polys.len(), 2);
    for p in polys.iter() {
        let positions = polygon_positions(&locator, p);
        for pos in &positions {
            assert_close!(pos.y, 2.0);
        }
        let normal = newell_normal(positions.iter().cloned());
        assert!(normal.y > 0.0);
        assert_close!(normal.magnitude() / 2.0, 1.0, 1e-9);
    }
}
