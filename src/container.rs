use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::bounds::BoundingBox;
use crate::compute::{build_search_order, SearchBlock};
use crate::error::Error;
use crate::grid::Grid;
use crate::order::ParticleOrder;
use crate::wall::Wall;

/// Hard ceiling on the per-block particle capacity. Growing a block past
/// this is reported as [`Error::MemoryExceeded`].
pub const MAX_PARTICLE_MEMORY: usize = 1 << 24;

/// Default initial per-block capacity.
pub const DEFAULT_INIT_MEM: usize = 8;

/// The address of a stored particle: its block and its slot within the
/// block. Addresses are stable for the lifetime of the particle; blocks are
/// never compacted and particles never move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    pub block: usize,
    pub slot: usize,
}

/// Compile-time policy selecting the metric and the per-particle payload:
/// plain Euclidean Voronoi cells for [`Monodisperse`], radical (power)
/// cells with a per-particle radius for [`Polydisperse`].
pub trait RadiusModel: Send + Sync {
    /// Floating point entries stored per particle: `(x, y)` plus an
    /// optional radius.
    const PS: usize;

    /// Shift applied to the squared site-neighbor distance when placing the
    /// separating half-plane; `r_site^2 - r_neighbor^2` in the radical case.
    fn radius_shift(site: &[f64; 3], neighbor: &[f64; 3]) -> f64;

    /// Squared distance beyond which no unseen site can cut a cell whose
    /// farthest vertex lies at squared distance `max_vertex_sq`.
    fn termination_bound(max_vertex_sq: f64, max_radius: f64) -> f64;

    /// The distance minimized by point location.
    fn location_distance(dist_sq: f64, payload: &[f64; 3]) -> f64;

    /// Lower bound on [`location_distance`](Self::location_distance) for any
    /// particle at squared Euclidean distance at least `block_dist_sq`.
    fn location_bound(block_dist_sq: f64, max_radius: f64) -> f64;
}

/// Marker for containers of point particles (classic Voronoi diagram).
#[derive(Debug)]
pub struct Monodisperse;

impl RadiusModel for Monodisperse {
    const PS: usize = 2;

    fn radius_shift(_site: &[f64; 3], _neighbor: &[f64; 3]) -> f64 {
        0.0
    }

    fn termination_bound(max_vertex_sq: f64, _max_radius: f64) -> f64 {
        4.0 * max_vertex_sq
    }

    fn location_distance(dist_sq: f64, _payload: &[f64; 3]) -> f64 {
        dist_sq
    }

    fn location_bound(block_dist_sq: f64, _max_radius: f64) -> f64 {
        block_dist_sq
    }
}

/// Marker for containers of particles with radii (radical diagram).
#[derive(Debug)]
pub struct Polydisperse;

impl RadiusModel for Polydisperse {
    const PS: usize = 3;

    fn radius_shift(site: &[f64; 3], neighbor: &[f64; 3]) -> f64 {
        site[2] * site[2] - neighbor[2] * neighbor[2]
    }

    fn termination_bound(max_vertex_sq: f64, max_radius: f64) -> f64 {
        let reach = 2.0 * max_vertex_sq.sqrt() + max_radius;
        reach * reach
    }

    fn location_distance(dist_sq: f64, payload: &[f64; 3]) -> f64 {
        dist_sq - payload[2] * payload[2]
    }

    fn location_bound(block_dist_sq: f64, max_radius: f64) -> f64 {
        block_dist_sq - max_radius * max_radius
    }
}

/// Slot array written concurrently during parallel insertion.
///
/// Concurrent `write` calls must target distinct slots, which the atomic
/// slot reservation in `put_parallel` guarantees, and the array is never
/// grown while a parallel region is active.
struct SlotVec<T>(UnsafeCell<Vec<T>>);

unsafe impl<T: Send> Sync for SlotVec<T> {}

impl<T: Copy> SlotVec<T> {
    fn new(v: Vec<T>) -> Self {
        SlotVec(UnsafeCell::new(v))
    }

    fn len(&self) -> usize {
        unsafe { (*self.0.get()).len() }
    }

    /// Reads are only valid outside parallel insertion regions.
    fn as_slice(&self) -> &[T] {
        unsafe { &*self.0.get() }
    }

    fn get_mut(&mut self) -> &mut Vec<T> {
        self.0.get_mut()
    }

    /// # Safety
    /// `idx` must be in bounds and no other thread may be writing the same
    /// slot.
    unsafe fn write(&self, idx: usize, value: T) {
        std::ptr::write((*self.0.get()).as_mut_ptr().add(idx), value);
    }
}

/// One block of the grid: the particles whose remapped coordinates fall in
/// its rectangle. `co` counts reserved slots; it may transiently exceed the
/// capacity during parallel insertion, with the excess parked in the
/// overflow buffer until reconciliation.
struct Block {
    co: AtomicUsize,
    id: SlotVec<i32>,
    p: SlotVec<f64>,
}

impl Block {
    fn with_capacity(capacity: usize, ps: usize) -> Self {
        Block {
            co: AtomicUsize::new(0),
            id: SlotVec::new(vec![0; capacity]),
            p: SlotVec::new(vec![0.0; ps * capacity]),
        }
    }

    fn capacity(&self) -> usize {
        self.id.len()
    }

    fn count(&self) -> usize {
        self.co.load(Ordering::Relaxed)
    }
}

fn grow_block(block: &mut Block, ps: usize, needed: usize, index: usize) -> Result<(), Error> {
    let mut nmem = block.capacity() * 2;
    while nmem < needed {
        nmem *= 2;
    }
    if nmem > MAX_PARTICLE_MEMORY {
        return Err(Error::MemoryExceeded {
            block: index,
            requested: nmem,
        });
    }
    log::debug!("particle memory in block {} scaled up to {}", index, nmem);
    block.id.get_mut().resize(nmem, 0);
    block.p.get_mut().resize(ps * nmem, 0.0);
    Ok(())
}

#[derive(Clone, Copy)]
struct OverflowRecord {
    block: usize,
    slot: usize,
    id: i32,
}

/// Particles whose reserved slot exceeded the block capacity at insertion
/// time, in insertion order. Coordinates are packed with the container's
/// stride.
#[derive(Default)]
struct Overflow {
    records: Vec<OverflowRecord>,
    p: Vec<f64>,
}

/// A container of particles in a rectangular, optionally periodic 2D
/// domain, divided into a uniform grid of blocks.
///
/// The two instantiations are [`Container`] for point particles and
/// [`ContainerPoly`] for particles carrying a radius; the latter computes
/// radical (power) cells. The metric is fixed at compile time through the
/// [`RadiusModel`] parameter, so the cell computation hot path carries no
/// runtime dispatch.
pub struct ContainerBase<R: RadiusModel> {
    pub(crate) grid: Grid,
    blocks: Vec<Block>,
    overflow: Mutex<Overflow>,
    walls: Vec<Wall>,
    pub(crate) search_order: Vec<SearchBlock>,
    pub(crate) pool: rayon::ThreadPool,
    num_threads: usize,
    /// Supremum of all reconciled radii; stays 0 for point particles.
    pub(crate) max_radius: f64,
    /// Per-worker radius maxima gathered during parallel insertion, stored
    /// as `f64` bit patterns so `fetch_max` works (the orderings agree for
    /// non-negative floats).
    max_r: Vec<AtomicU64>,
    _radius_model: PhantomData<R>,
}

/// Container of point particles; cells are classic Voronoi cells.
pub type Container = ContainerBase<Monodisperse>;

/// Container of particles with radii; cells are radical (power) cells.
pub type ContainerPoly = ContainerBase<Polydisperse>;

impl<R: RadiusModel> ContainerBase<R> {
    /// Sets up the container geometry: the domain rectangle, the `nx * ny`
    /// block grid, per-axis periodicity, the initial per-block capacity and
    /// the size of the worker pool.
    pub fn new(
        bounds: BoundingBox,
        nx: usize,
        ny: usize,
        x_prd: bool,
        y_prd: bool,
        init_mem: usize,
        num_threads: usize,
    ) -> Result<Self, Error> {
        assert!(
            bounds.max_x > bounds.min_x && bounds.max_y > bounds.min_y,
            "domain must have positive extent"
        );
        assert!(nx >= 1 && ny >= 1, "grid resolution must be at least 1x1");
        assert!(init_mem >= 1, "initial block capacity must be at least 1");
        assert!(num_threads >= 1, "worker count must be at least 1");

        let grid = Grid::new(bounds, nx, ny, x_prd, y_prd);
        let blocks = (0..grid.nxy())
            .map(|_| Block::with_capacity(init_mem, R::PS))
            .collect();
        let search_order = build_search_order(&grid);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        let max_r = (0..num_threads).map(|_| AtomicU64::new(0)).collect();

        Ok(ContainerBase {
            grid,
            blocks,
            overflow: Mutex::new(Overflow::default()),
            walls: Vec::new(),
            search_order,
            pool,
            num_threads,
            max_radius: 0.0,
            max_r,
            _radius_model: PhantomData,
        })
    }

    /// Tears down the worker pool and per-thread insertion state and
    /// rebuilds them for `num_threads` workers. Any pending parallel batch
    /// must have been reconciled first.
    pub fn set_num_threads(&mut self, num_threads: usize) -> Result<(), Error> {
        assert!(num_threads >= 1, "worker count must be at least 1");
        self.pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        self.num_threads = num_threads;
        self.max_r = (0..num_threads).map(|_| AtomicU64::new(0)).collect();
        Ok(())
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn bounds(&self) -> BoundingBox {
        self.grid.bounds
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    /// Tests whether a point lies inside the domain rectangle and inside
    /// every wall.
    pub fn point_inside(&self, x: f64, y: f64) -> bool {
        self.grid.bounds.contains(x, y) && self.walls.iter().all(|w| w.point_inside(x, y))
    }

    /// Enumerates all stored particles in block-then-slot order.
    ///
    /// Must not be called while a parallel insertion batch is pending
    /// reconciliation.
    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block, b)| {
            (0..b.count()).map(move |slot| ParticleHandle { block, slot })
        })
    }

    /// Total number of stored particles.
    pub fn total_particles(&self) -> usize {
        self.blocks.iter().map(|b| b.count()).sum()
    }

    /// Particle counts per block, in block-index order.
    pub fn region_counts(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.count()).collect()
    }

    /// Particle capacities per block, in block-index order.
    pub fn region_capacities(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.capacity()).collect()
    }

    /// Number of overflow records awaiting
    /// [`put_reconcile_overflow`](Self::put_reconcile_overflow).
    pub fn pending_overflow(&self) -> usize {
        self.overflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn id_of(&self, handle: ParticleHandle) -> i32 {
        self.blocks[handle.block].id.as_slice()[handle.slot]
    }

    pub fn position_of(&self, handle: ParticleHandle) -> [f64; 2] {
        let p = self.blocks[handle.block].p.as_slice();
        [p[R::PS * handle.slot], p[R::PS * handle.slot + 1]]
    }

    /// The packed payload of a particle, padded to `(x, y, r)` with a zero
    /// radius for point particles.
    pub(crate) fn payload(&self, handle: ParticleHandle) -> [f64; 3] {
        let p = self.blocks[handle.block].p.as_slice();
        let base = R::PS * handle.slot;
        let r = if R::PS > 2 { p[base + 2] } else { 0.0 };
        [p[base], p[base + 1], r]
    }

    pub(crate) fn block_len(&self, block: usize) -> usize {
        self.blocks[block].count()
    }

    /// Removes all particles. Block capacities are kept.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            *block.co.get_mut() = 0;
        }
        let overflow = self.overflow.get_mut().unwrap_or_else(PoisonError::into_inner);
        overflow.records.clear();
        overflow.p.clear();
        for slot in &mut self.max_r {
            *slot.get_mut() = 0;
        }
        self.max_radius = 0.0;
    }

    /// Serial insertion path: remap, grow the block if it is full, write.
    /// Returns the particle's address, or `None` if the position falls
    /// outside a non-periodic axis.
    fn put_serial(
        &mut self,
        id: i32,
        x: f64,
        y: f64,
        r: f64,
    ) -> Result<Option<ParticleHandle>, Error> {
        let Some((ij, x, y)) = self.grid.put_remap(x, y) else {
            log::debug!("put: particle {} at ({}, {}) is out of bounds", id, x, y);
            return Ok(None);
        };
        let block = &mut self.blocks[ij];
        let slot = *block.co.get_mut();
        if slot == block.capacity() {
            grow_block(block, R::PS, slot + 1, ij)?;
        }
        block.id.get_mut()[slot] = id;
        let base = R::PS * slot;
        let p = block.p.get_mut();
        p[base] = x;
        p[base + 1] = y;
        if R::PS > 2 {
            p[base + 2] = r;
        }
        *block.co.get_mut() += 1;
        Ok(Some(ParticleHandle { block: ij, slot }))
    }

    /// Parallel insertion path: reserve a slot with an atomic fetch-add and
    /// write it directly when it is under the block capacity, otherwise park
    /// the particle in the overflow buffer under the global lock.
    fn put_parallel_inner(&self, id: i32, x: f64, y: f64, r: f64) -> bool {
        let Some((ij, x, y)) = self.grid.put_remap(x, y) else {
            log::debug!(
                "put_parallel: particle {} at ({}, {}) is out of bounds",
                id,
                x,
                y
            );
            return false;
        };
        let block = &self.blocks[ij];
        let slot = block.co.fetch_add(1, Ordering::Relaxed);
        if slot < block.capacity() {
            // The reservation above hands each writer a distinct slot.
            unsafe {
                block.id.write(slot, id);
                let base = R::PS * slot;
                block.p.write(base, x);
                block.p.write(base + 1, y);
                if R::PS > 2 {
                    block.p.write(base + 2, r);
                }
            }
        } else {
            let mut overflow = self.overflow.lock().unwrap_or_else(PoisonError::into_inner);
            overflow.records.push(OverflowRecord { block: ij, slot, id });
            overflow.p.push(x);
            overflow.p.push(y);
            if R::PS > 2 {
                overflow.p.push(r);
            }
        }
        true
    }

    /// Folds per-worker insertion state back into the container and drains
    /// the overflow buffer, growing blocks as required. Must run after any
    /// batch of parallel insertions and before any read or cell
    /// computation.
    pub fn put_reconcile_overflow(&mut self) -> Result<(), Error> {
        for slot in &mut self.max_r {
            let r = f64::from_bits(std::mem::take(slot.get_mut()));
            if r > self.max_radius {
                self.max_radius = r;
            }
        }

        let overflow = self.overflow.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (k, rec) in overflow.records.iter().enumerate() {
            let block = &mut self.blocks[rec.block];
            if rec.slot >= block.capacity() {
                grow_block(block, R::PS, rec.slot + 1, rec.block)?;
            }
            block.id.get_mut()[rec.slot] = rec.id;
            let base = R::PS * rec.slot;
            block.p.get_mut()[base..base + R::PS]
                .copy_from_slice(&overflow.p[R::PS * k..R::PS * (k + 1)]);
        }
        overflow.records.clear();
        overflow.p.clear();
        Ok(())
    }

    fn record_max_r(&self, r: f64) {
        let t = rayon::current_thread_index()
            .unwrap_or(0)
            .min(self.max_r.len() - 1);
        self.max_r[t].fetch_max(r.to_bits(), Ordering::Relaxed);
    }
}

impl ContainerBase<Monodisperse> {
    /// Puts a particle into the block its position maps to. Returns
    /// `Ok(false)` when the position lies outside a non-periodic axis; the
    /// particle is then skipped.
    pub fn put(&mut self, id: i32, x: f64, y: f64) -> Result<bool, Error> {
        Ok(self.put_serial(id, x, y, 0.0)?.is_some())
    }

    /// As [`put`](Self::put), additionally recording the particle's address
    /// in `order`.
    pub fn put_ordered(
        &mut self,
        order: &mut ParticleOrder,
        id: i32,
        x: f64,
        y: f64,
    ) -> Result<bool, Error> {
        match self.put_serial(id, x, y, 0.0)? {
            Some(handle) => {
                order.add(handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Thread-safe insertion for use inside the worker pool. Never grows
    /// block memory; slots past the current capacity go to the overflow
    /// buffer, to be placed by
    /// [`put_reconcile_overflow`](ContainerBase::put_reconcile_overflow).
    pub fn put_parallel(&self, id: i32, x: f64, y: f64) -> bool {
        self.put_parallel_inner(id, x, y, 0.0)
    }

    /// Inserts a packed `[x, y, x, y, ...]` point list across the worker
    /// pool, using each point's index as its ID. The caller must follow
    /// with [`put_reconcile_overflow`](ContainerBase::put_reconcile_overflow).
    pub fn put_parallel_batch(&self, points: &[f64]) {
        debug_assert!(points.len() % 2 == 0);
        self.pool.install(|| {
            points.par_chunks(2).enumerate().for_each(|(i, c)| {
                self.put_parallel(i as i32, c[0], c[1]);
            });
        });
    }
}

impl ContainerBase<Polydisperse> {
    /// Puts a particle of radius `r` into the block its position maps to.
    /// Returns `Ok(false)` when the position lies outside a non-periodic
    /// axis; the particle is then skipped.
    pub fn put(&mut self, id: i32, x: f64, y: f64, r: f64) -> Result<bool, Error> {
        let accepted = self.put_serial(id, x, y, r)?.is_some();
        if accepted && r > self.max_radius {
            self.max_radius = r;
        }
        Ok(accepted)
    }

    /// As [`put`](Self::put), additionally recording the particle's address
    /// in `order`.
    pub fn put_ordered(
        &mut self,
        order: &mut ParticleOrder,
        id: i32,
        x: f64,
        y: f64,
        r: f64,
    ) -> Result<bool, Error> {
        match self.put_serial(id, x, y, r)? {
            Some(handle) => {
                if r > self.max_radius {
                    self.max_radius = r;
                }
                order.add(handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Thread-safe insertion for use inside the worker pool. The radius is
    /// folded into the calling worker's maximum, merged at reconciliation.
    pub fn put_parallel(&self, id: i32, x: f64, y: f64, r: f64) -> bool {
        let accepted = self.put_parallel_inner(id, x, y, r);
        if accepted {
            self.record_max_r(r);
        }
        accepted
    }

    /// Inserts a packed `[x, y, r, x, y, r, ...]` particle list across the
    /// worker pool, using each particle's index as its ID. The caller must
    /// follow with
    /// [`put_reconcile_overflow`](ContainerBase::put_reconcile_overflow).
    pub fn put_parallel_batch(&self, particles: &[f64]) {
        debug_assert!(particles.len() % 3 == 0);
        self.pool.install(|| {
            particles.par_chunks(3).enumerate().for_each(|(i, c)| {
                self.put_parallel(i as i32, c[0], c[1], c[2]);
            });
        });
    }

    /// Largest radius among all reconciled particles.
    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn radius_of(&self, handle: ParticleHandle) -> f64 {
        self.blocks[handle.block].p.as_slice()[3 * handle.slot + 2]
    }
}
