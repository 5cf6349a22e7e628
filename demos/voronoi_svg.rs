use plotters::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use vorotwo::{BoundingBox, Container, DEFAULT_INIT_MEM};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new("voronoi.svg", (1024, 1024)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0.0..100.0, 0.0..100.0)?;

    let bounds = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let mut con = Container::new(bounds, 20, 20, false, false, DEFAULT_INIT_MEM, 4)?;

    let mut rng = StdRng::seed_from_u64(20260802);
    let mut generators = Vec::with_capacity(500);
    for i in 0..500 {
        let x = rng.gen_range(0.0..100.0);
        let y = rng.gen_range(0.0..100.0);
        con.put(i, x, y)?;
        generators.push((x, y));
    }

    // Draw the domain outline.
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0), (0.0, 0.0)],
        BLACK.stroke_width(2),
    )))?;

    // Draw the cells.
    for handle in con.handles() {
        let Some(cell) = con.compute_cell(handle) else {
            continue;
        };
        let [x, y] = con.position_of(handle);
        let vertices = cell.vertices_global(x, y);
        if vertices.len() < 6 {
            continue;
        }

        let mut poly: Vec<(f64, f64)> = vertices.chunks_exact(2).map(|v| (v[0], v[1])).collect();

        chart.draw_series(std::iter::once(Polygon::new(
            poly.clone(),
            BLUE.mix(0.1).filled(),
        )))?;

        poly.push(poly[0]);
        chart.draw_series(std::iter::once(PathElement::new(poly, BLACK.mix(0.5))))?;
    }

    // Draw the generators.
    chart.draw_series(generators.iter().map(|&p| Circle::new(p, 2, RED.filled())))?;

    root.present()?;
    println!("Output saved to voronoi.svg");
    Ok(())
}
