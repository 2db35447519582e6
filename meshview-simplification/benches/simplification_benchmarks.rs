//! Edge collapse throughput on wavy grids, with and without boundary locking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshview_core::{Point3d, PolygonMesh};
use meshview_simplification::{EdgeCollapseSimplifier, MeshSimplifier};

fn generate_grid_mesh(size: usize) -> PolygonMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f64 / (size - 1) as f64 * std::f64::consts::PI;
            let fy = y as f64 / (size - 1) as f64 * std::f64::consts::PI;
            vertices.push(Point3d::new(x as f64, y as f64, fx.sin() * fy.sin() * 2.0));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    PolygonMesh::from_triangles(vertices, &faces).expect("grid indices are in range")
}

fn bench_simplification(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];

    let mut group = c.benchmark_group("simplification");

    for &size in &sizes {
        let mesh = generate_grid_mesh(size);
        let face_count = mesh.face_count();

        for &ratio in &ratios {
            let label = format!("{}f_r{}", face_count, (ratio * 100.0) as u32);

            group.bench_with_input(
                BenchmarkId::new("edge_collapse", &label),
                &(&mesh, ratio),
                |b, &(mesh, ratio)| {
                    let simplifier = EdgeCollapseSimplifier::new();
                    b.iter(|| {
                        let result = simplifier.simplify(black_box(mesh), ratio).unwrap();
                        black_box(result);
                    });
                },
            );

            group.bench_with_input(
                BenchmarkId::new("edge_collapse_free_boundary", &label),
                &(&mesh, ratio),
                |b, &(mesh, ratio)| {
                    let simplifier = EdgeCollapseSimplifier::with_params(None, false, 100.0);
                    b.iter(|| {
                        let result = simplifier.simplify(black_box(mesh), ratio).unwrap();
                        black_box(result);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_simplification);
criterion_main!(benches);
