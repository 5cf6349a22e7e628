use float_cmp::assert_approx_eq;
use rand::prelude::*;
use rand::rngs::StdRng;
use vorotwo::{BoundingBox, Container, ParticleOrder, BOX_BOTTOM, BOX_LEFT, BOX_RIGHT, BOX_TOP};

fn unit_container(x_prd: bool, y_prd: bool) -> Container {
    Container::new(
        BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        4,
        4,
        x_prd,
        y_prd,
        8,
        2,
    )
    .unwrap()
}

#[test]
fn test_single_site_fills_domain() {
    let mut con = unit_container(false, false);
    con.put(0, 0.3, 0.7).unwrap();

    let handle = con.handles().next().unwrap();
    let cell = con.compute_cell(handle).unwrap();
    assert_eq!(cell.id(), 0);
    assert_eq!(cell.vertices().len() / 2, 4);
    assert_approx_eq!(f64, cell.area(), 1.0, epsilon = 1e-12);
    assert_approx_eq!(f64, cell.perimeter(), 4.0, epsilon = 1e-12);

    // The centroid of the whole domain, seen from the site at (0.3, 0.7).
    let c = cell.centroid();
    assert_approx_eq!(f64, c[0], 0.2, epsilon = 1e-12);
    assert_approx_eq!(f64, c[1], -0.2, epsilon = 1e-12);
}

#[test]
fn test_two_sites_split_in_half() {
    let mut con = unit_container(false, false);
    con.put(0, 0.25, 0.5).unwrap();
    con.put(1, 0.75, 0.5).unwrap();

    let mut cells: Vec<_> = con
        .handles()
        .map(|h| con.compute_cell(h).unwrap())
        .collect();
    cells.sort_by_key(|c| c.id());

    let expected = [-0.25, -0.5, 0.25, -0.5, 0.25, 0.5, -0.25, 0.5];
    for (v, e) in cells[0].vertices().iter().zip(expected) {
        assert_approx_eq!(f64, *v, e, epsilon = 1e-12);
    }
    assert_eq!(
        cells[0].edge_neighbors(),
        &[BOX_BOTTOM, 1, BOX_TOP, BOX_LEFT]
    );

    assert_approx_eq!(f64, cells[0].area(), 0.5, epsilon = 1e-12);
    assert_approx_eq!(f64, cells[1].area(), 0.5, epsilon = 1e-12);
    assert!(cells[1].edge_neighbors().contains(&0));
    assert!(cells[1].edge_neighbors().contains(&BOX_RIGHT));
}

#[test]
fn test_four_symmetric_sites() {
    let mut con = unit_container(false, false);
    con.put(0, 0.25, 0.25).unwrap();
    con.put(1, 0.75, 0.25).unwrap();
    con.put(2, 0.25, 0.75).unwrap();
    con.put(3, 0.75, 0.75).unwrap();

    let mut total = 0.0;
    for handle in con.handles() {
        let cell = con.compute_cell(handle).unwrap();
        assert_approx_eq!(f64, cell.area(), 0.25, epsilon = 1e-12);
        total += cell.area();
    }
    assert_approx_eq!(f64, total, 1.0, epsilon = 1e-12);

    // The cell at (0.25, 0.25) borders its axis-aligned neighbors; the
    // diagonal site only touches at a corner.
    let cell = con.compute_cell(con.handles().next().unwrap()).unwrap();
    assert!(cell.edge_neighbors().contains(&1));
    assert!(cell.edge_neighbors().contains(&2));
    assert!(!cell.edge_neighbors().contains(&3));
}

#[test]
fn test_periodic_single_site_is_whole_box() {
    let mut con = unit_container(true, true);
    con.put(0, 0.5, 0.5).unwrap();

    let cell = con.compute_cell(con.handles().next().unwrap()).unwrap();
    assert_eq!(cell.vertices().len() / 2, 4);
    assert_approx_eq!(f64, cell.area(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_area_conservation_random() {
    let mut con = Container::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 8, 8, false, false, 8, 4)
        .unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let n = 200;
    for i in 0..n {
        con.put(i, rng.gen::<f64>(), rng.gen::<f64>()).unwrap();
    }
    assert_eq!(con.total_particles(), n as usize);
    assert_approx_eq!(f64, con.sum_cell_areas(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_compute_cell_is_deterministic() {
    let mut con = unit_container(false, false);
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..50 {
        con.put(i, rng.gen::<f64>(), rng.gen::<f64>()).unwrap();
    }
    for handle in con.handles() {
        let a = con.compute_cell(handle).unwrap();
        let b = con.compute_cell(handle).unwrap();
        assert_eq!(a.vertices(), b.vertices());
        assert_eq!(a.edge_neighbors(), b.edge_neighbors());
    }
}

#[test]
fn test_ordered_insertion_tracks_order() {
    let mut con = unit_container(false, false);
    let mut order = ParticleOrder::new();
    con.put_ordered(&mut order, 5, 0.9, 0.9).unwrap();
    con.put_ordered(&mut order, 3, 0.1, 0.1).unwrap();
    con.put_ordered(&mut order, 4, 0.5, 0.5).unwrap();
    // Rejected inserts leave no trace in the ordering.
    assert!(!con.put_ordered(&mut order, 6, 1.5, 0.5).unwrap());

    let ids: Vec<i32> = order.iter().map(|h| con.id_of(h)).collect();
    assert_eq!(ids, vec![5, 3, 4]);
    assert_eq!(order.len(), 3);
}

#[test]
fn test_clear_then_reuse() {
    let mut con = unit_container(false, false);
    con.put(0, 0.25, 0.5).unwrap();
    con.put(1, 0.75, 0.5).unwrap();
    con.clear();
    assert_eq!(con.total_particles(), 0);
    assert_eq!(con.handles().count(), 0);

    con.put(2, 0.5, 0.5).unwrap();
    let cell = con.compute_cell(con.handles().next().unwrap()).unwrap();
    assert_approx_eq!(f64, cell.area(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_region_counts_follow_blocks() {
    let mut con = unit_container(false, false);
    con.put(0, 0.1, 0.1).unwrap();
    con.put(1, 0.15, 0.12).unwrap();
    con.put(2, 0.9, 0.9).unwrap();

    let counts = con.region_counts();
    assert_eq!(counts.len(), 16);
    assert_eq!(counts[0], 2);
    assert_eq!(counts[15], 1);
    assert_eq!(counts.iter().sum::<usize>(), 3);
}
