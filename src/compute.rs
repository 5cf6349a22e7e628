use rayon::prelude::*;

use crate::cell::{CellScratch, VoronoiCell};
use crate::container::{ContainerBase, ParticleHandle, RadiusModel};
use crate::grid::Grid;

/// One entry of the precomputed block visiting order: a displacement from a
/// particle's home block, with a lower bound on the squared distance from
/// any point of the home block to the displaced block.
pub(crate) struct SearchBlock {
    pub di: i32,
    pub dj: i32,
    pub dist_sq: f64,
}

/// Builds the outward block visiting order, sorted by the static distance
/// lower bound. The displacement range spans a full periodic image in each
/// direction, which is as far as any cell or location query can reach.
pub(crate) fn build_search_order(grid: &Grid) -> Vec<SearchBlock> {
    let rx = grid.nx as i32;
    let ry = grid.ny as i32;
    let mut order = Vec::with_capacity(((2 * rx + 1) * (2 * ry + 1)) as usize);
    for dj in -ry..=ry {
        for di in -rx..=rx {
            let mx = (di.abs() - 1).max(0) as f64 * grid.boxx;
            let my = (dj.abs() - 1).max(0) as f64 * grid.boxy;
            order.push(SearchBlock {
                di,
                dj,
                dist_sq: mx * mx + my * my,
            });
        }
    }
    order.sort_unstable_by(|a, b| a.dist_sq.total_cmp(&b.dist_sq));
    order
}

impl<R: RadiusModel> ContainerBase<R> {
    /// Computes the Voronoi cell of a stored particle, reusing `scratch`
    /// across calls.
    ///
    /// The cell starts as the domain rectangle about the site (a periodic
    /// axis contributes a full period centred on it) and is cut against
    /// candidate neighbors block by block, nearest block first. The walk
    /// stops once the nearest unvisited block is too far to reach the cell:
    /// past twice the cell's circumradius, plus the largest particle radius
    /// in the radical case.
    ///
    /// Returns `None` when the cell has been cut away entirely.
    pub fn compute_cell_with(
        &self,
        scratch: &mut CellScratch,
        handle: ParticleHandle,
    ) -> Option<VoronoiCell> {
        let g = &self.grid;
        let (ci, cj) = g.block_coords(handle.block);
        let site = self.payload(handle);
        let (x, y) = (site[0], site[1]);

        let (lx0, lx1) = if g.x_prd {
            (-0.5 * g.bounds.width(), 0.5 * g.bounds.width())
        } else {
            (g.bounds.min_x - x, g.bounds.max_x - x)
        };
        let (ly0, ly1) = if g.y_prd {
            (-0.5 * g.bounds.height(), 0.5 * g.bounds.height())
        } else {
            (g.bounds.min_y - y, g.bounds.max_y - y)
        };
        let mut cell = VoronoiCell::new_box(self.id_of(handle), lx0, lx1, ly0, ly1);

        // Fractional position of the site inside its home block, used to
        // tighten the per-block distance bound.
        let rel_x = (x - g.bounds.min_x) * g.xsp - ci as f64;
        let rel_y = (y - g.bounds.min_y) * g.ysp - cj as f64;

        for sb in &self.search_order {
            let bound = R::termination_bound(cell.max_radius_sq(), self.max_radius);
            if sb.dist_sq >= bound {
                break;
            }

            let ddx = block_axis_dist(sb.di, rel_x, g.boxx);
            let ddy = block_axis_dist(sb.dj, rel_y, g.boxy);
            if ddx * ddx + ddy * ddy >= bound {
                continue;
            }

            let bi = ci as i32 + sb.di;
            let bj = cj as i32 + sb.dj;
            let (wi, sx) = match wrap_axis(bi, g.nx, g.x_prd, g.bounds.width()) {
                Some(w) => w,
                None => continue,
            };
            let (wj, sy) = match wrap_axis(bj, g.ny, g.y_prd, g.bounds.height()) {
                Some(w) => w,
                None => continue,
            };
            let block = g.block_index(wi, wj);

            for slot in 0..self.block_len(block) {
                if sb.di == 0 && sb.dj == 0 && slot == handle.slot {
                    continue;
                }
                let nbr = self.payload(ParticleHandle { block, slot });
                let dx = nbr[0] + sx - x;
                let dy = nbr[1] + sy - y;
                let dist_sq = dx * dx + dy * dy;
                if dist_sq >= R::termination_bound(cell.max_radius_sq(), self.max_radius) {
                    continue;
                }
                let rs = dist_sq + R::radius_shift(&site, &nbr);
                let neighbor = self.id_of(ParticleHandle { block, slot });
                if !cell.plane(scratch, dx, dy, rs, neighbor) {
                    return None;
                }
            }
        }
        Some(cell)
    }

    /// As [`compute_cell_with`](Self::compute_cell_with) with a fresh
    /// scratch buffer.
    pub fn compute_cell(&self, handle: ParticleHandle) -> Option<VoronoiCell> {
        let mut scratch = CellScratch::default();
        self.compute_cell_with(&mut scratch, handle)
    }

    /// Finds the particle whose cell contains the given position, i.e. the
    /// nearest particle in the container's metric. Returns the particle's
    /// position, adjusted for the periodic image the query came from, and
    /// its ID. Returns `None` when the container is empty or the position
    /// lies outside a non-periodic axis.
    pub fn find_voronoi_cell(&self, x: f64, y: f64) -> Option<(f64, f64, i32)> {
        let g = &self.grid;
        let rm = g.remap(x, y)?;
        let (qx, qy) = (rm.x, rm.y);
        let rel_x = (qx - g.bounds.min_x) * g.xsp - rm.ci as f64;
        let rel_y = (qy - g.bounds.min_y) * g.ysp - rm.cj as f64;

        // (distance, position, id) of the best site seen so far.
        let mut best: Option<(f64, f64, f64, i32)> = None;

        for sb in &self.search_order {
            if let Some((score, ..)) = best {
                if R::location_bound(sb.dist_sq, self.max_radius) >= score {
                    break;
                }
            }

            let ddx = block_axis_dist(sb.di, rel_x, g.boxx);
            let ddy = block_axis_dist(sb.dj, rel_y, g.boxy);
            if let Some((score, ..)) = best {
                if R::location_bound(ddx * ddx + ddy * ddy, self.max_radius) >= score {
                    continue;
                }
            }

            let bi = rm.ci as i32 + sb.di;
            let bj = rm.cj as i32 + sb.dj;
            let (wi, sx) = match wrap_axis(bi, g.nx, g.x_prd, g.bounds.width()) {
                Some(w) => w,
                None => continue,
            };
            let (wj, sy) = match wrap_axis(bj, g.ny, g.y_prd, g.bounds.height()) {
                Some(w) => w,
                None => continue,
            };
            let block = g.block_index(wi, wj);

            for slot in 0..self.block_len(block) {
                let handle = ParticleHandle { block, slot };
                let nbr = self.payload(handle);
                let px = nbr[0] + sx;
                let py = nbr[1] + sy;
                let dx = px - qx;
                let dy = py - qy;
                let score = R::location_distance(dx * dx + dy * dy, &nbr);
                if best.map_or(true, |(b, ..)| score < b) {
                    best = Some((score, px, py, self.id_of(handle)));
                }
            }
        }

        best.map(|(_, px, py, id)| {
            (
                px + rm.ai as f64 * g.bounds.width(),
                py + rm.aj as f64 * g.bounds.height(),
                id,
            )
        })
    }

    /// Computes every cell across the worker pool and discards the results.
    /// Useful for measuring the pure computation cost.
    pub fn compute_all_cells(&self) {
        let handles: Vec<ParticleHandle> = self.handles().collect();
        self.pool.install(|| {
            handles
                .par_iter()
                .for_each_init(CellScratch::default, |scratch, &h| {
                    let _ = self.compute_cell_with(scratch, h);
                });
        });
    }

    /// Computes every cell across the worker pool and sums the areas. In a
    /// container without walls the total matches the domain area to
    /// numerical precision.
    pub fn sum_cell_areas(&self) -> f64 {
        let handles: Vec<ParticleHandle> = self.handles().collect();
        self.pool.install(|| {
            handles
                .par_iter()
                .map_init(CellScratch::default, |scratch, &h| {
                    self.compute_cell_with(scratch, h).map_or(0.0, |c| c.area())
                })
                .sum()
        })
    }
}

/// Distance along one axis from a position at fraction `rel` of its home
/// block to the near face of the block `d` steps away.
fn block_axis_dist(d: i32, rel: f64, box_len: f64) -> f64 {
    if d > 0 {
        (d as f64 - rel) * box_len
    } else if d < 0 {
        (rel - (d + 1) as f64) * box_len
    } else {
        0.0
    }
}

/// Wraps a signed block coordinate onto the primary grid, returning the
/// wrapped index and the coordinate shift of the periodic image it belongs
/// to. Out-of-range coordinates on a non-periodic axis return `None`.
fn wrap_axis(b: i32, n: usize, periodic: bool, extent: f64) -> Option<(usize, f64)> {
    let n = n as i32;
    if periodic {
        let w = b.rem_euclid(n);
        Some((w as usize, ((b - w) / n) as f64 * extent))
    } else if b < 0 || b >= n {
        None
    } else {
        Some((b as usize, 0.0))
    }
}
