use criterion::{criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rand::rngs::StdRng;
use vorotwo::{BoundingBox, Container, ContainerPoly};

const NUM_POINTS: usize = 10_000;

fn benchmark_compute_cells(c: &mut Criterion) {
    let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    // Grid resolution heuristic: square root of N.
    let res = (NUM_POINTS as f64).sqrt().ceil() as usize;

    let mut con = Container::new(bounds, res, res, false, false, 8, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..NUM_POINTS {
        con.put(i as i32, rng.gen::<f64>(), rng.gen::<f64>()).unwrap();
    }

    c.bench_function(&format!("compute_all_cells_{}_points", NUM_POINTS), |b| {
        b.iter(|| con.compute_all_cells())
    });

    c.bench_function(&format!("sum_cell_areas_{}_points", NUM_POINTS), |b| {
        b.iter(|| con.sum_cell_areas())
    });
}

fn benchmark_compute_cells_poly(c: &mut Criterion) {
    let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let res = (NUM_POINTS as f64).sqrt().ceil() as usize;

    let mut con = ContainerPoly::new(bounds, res, res, false, false, 8, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..NUM_POINTS {
        con.put(
            i as i32,
            rng.gen::<f64>(),
            rng.gen::<f64>(),
            rng.gen::<f64>() * 0.01,
        )
        .unwrap();
    }

    c.bench_function(
        &format!("compute_all_cells_poly_{}_points", NUM_POINTS),
        |b| b.iter(|| con.compute_all_cells()),
    );
}

criterion_group!(benches, benchmark_compute_cells, benchmark_compute_cells_poly);
criterion_main!(benches);
