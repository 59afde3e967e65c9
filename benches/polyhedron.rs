//! Single cell queries on a polygonal prism and whole-grid contouring.

use criterion::{
    criterion_group, criterion_main, black_box, Criterion,
};

use polycell::{
    prelude::*,
    batch::contour_grid,
    BatchConfig,
};



// ===============================================================================================
// ===== Fixtures
// ===============================================================================================

/// A prism over a regular `n`-gon with height 1.
fn prism(n: usize) -> (Vec<cgmath::Point3<f64>>, Vec<Vec<PointId>>) {
    let mut points = Vec::with_capacity(2 * n);
    for z in &[0.0, 1.0] {
        for i in 0..n {
            let phi = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            points.push([phi.cos(), phi.sin(), *z].to_point3());
        }
    }

    let bottom = (0..n).rev().map(PointId::from_usize).collect();
    let top = (n..2 * n).map(PointId::from_usize).collect();
    let mut faces = vec![bottom, top];
    for i in 0..n {
        let j = (i + 1) % n;
        faces.push(vec![
            PointId::from_usize(i),
            PointId::from_usize(j),
            PointId::from_usize(j + n),
            PointId::from_usize(i + n),
        ]);
    }

    (points, faces)
}

/// `size³` unit cubes, every one stored as polyhedron.
fn block(size: usize) -> UnstructuredGrid {
    let n = size + 1;
    let mut grid = UnstructuredGrid::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                grid.add_point([i as f64, j as f64, k as f64]);
            }
        }
    }

    let pid = |i, j, k| PointId::from_usize(i + n * j + n * n * k);
    for k in 0..size {
        for j in 0..size {
            for i in 0..size {
                let ids = [
                    pid(i, j, k), pid(i + 1, j, k), pid(i + 1, j + 1, k), pid(i, j + 1, k),
                    pid(i, j, k + 1), pid(i + 1, j, k + 1), pid(i + 1, j + 1, k + 1), pid(i, j + 1, k + 1),
                ];
                let faces: Vec<Vec<PointId>> = CellType::Hexahedron.faces()
                    .iter()
                    .map(|f| f.iter().map(|&l| ids[l]).collect())
                    .collect();
                grid.add_polyhedron(&faces).unwrap();
            }
        }
    }

    grid
}


// ===============================================================================================
// ===== Benchmarks
// ===============================================================================================

fn is_inside(c: &mut Criterion) {
    c.bench_function(
        "is_inside_prism_16",
        |b| {
            let (points, faces) = prism(16);
            let cell = Polyhedron::new(&points, &faces).unwrap();

            b.iter(|| {
                black_box(cell.is_inside(black_box([0.3, -0.2, 0.4]), 1e-6));
            })
        },
    );
}

fn evaluate_position(c: &mut Criterion) {
    c.bench_function(
        "evaluate_position_prism_16",
        |b| {
            let (points, faces) = prism(16);
            let cell = Polyhedron::new(&points, &faces).unwrap();

            b.iter(|| {
                black_box(cell.evaluate_position(black_box([0.3, -0.2, 0.4])).unwrap());
            })
        },
    );
}

fn contour_block(c: &mut Criterion) {
    let grid = block(8);
    let scalars: Vec<_> = grid.points().iter().map(|p| p.x + 0.5 * p.y + 0.25 * p.z).collect();

    c.bench_function("contour_grid_8x8x8_parallel", |b| {
        let cfg = BatchConfig::default().with_parallel(true);
        b.iter(|| black_box(contour_grid(&grid, &scalars, 3.1, &cfg).unwrap()))
    });
    c.bench_function("contour_grid_8x8x8_sequential", |b| {
        let cfg = BatchConfig::default().with_parallel(false);
        b.iter(|| black_box(contour_grid(&grid, &scalars, 3.1, &cfg).unwrap()))
    });
}


criterion_group!(benches,
    is_inside,
    evaluate_position,
    contour_block,
);
criterion_main!(benches);
