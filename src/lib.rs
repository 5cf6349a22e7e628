//! # vorotwo
//!
//! `vorotwo` is a Rust library for 2D Voronoi and radical (power)
//! tessellations on rectangular domains that may be periodic in either
//! axis. It manages generator particles in a uniform grid of blocks and
//! computes each cell independently, by cutting a bounding polygon against
//! the perpendicular bisectors of nearby particles in an outward,
//! provably complete block sweep.
//!
//! ## Features
//!
//! - **Grid binning**: particles are stored per block for O(1) insertion
//!   and localized neighbor searches; cell computation cost scales with
//!   cell size, not domain size.
//! - **Parallel insertion**: bulk insertion reserves slots with atomic
//!   counters across a [rayon](https://docs.rs/rayon) worker pool, with a
//!   small reconciliation pass that grows any block that overflowed.
//! - **Radical diagrams**: [`ContainerPoly`] stores a radius per particle
//!   and computes power cells with the same machinery.
//! - **Point location**: [`ContainerBase::find_voronoi_cell`] reports which
//!   particle's cell contains a query point, honoring periodic images.
//!
//! ## Example
//!
//! ```
//! use vorotwo::{BoundingBox, Container};
//!
//! let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
//! let mut con = Container::new(bounds, 4, 4, false, false, 8, 2)?;
//! con.put(0, 0.25, 0.5)?;
//! con.put(1, 0.75, 0.5)?;
//!
//! let handle = con.handles().next().unwrap();
//! let cell = con.compute_cell(handle).unwrap();
//! assert!((cell.area() - 0.5).abs() < 1e-9);
//! # Ok::<(), vorotwo::Error>(())
//! ```

mod bounds;
mod cell;
mod compute;
mod container;
mod error;
mod grid;
mod order;
mod wall;

pub use bounds::{BoundingBox, BOX_BOTTOM, BOX_LEFT, BOX_RIGHT, BOX_TOP};
pub use cell::{CellScratch, VoronoiCell};
pub use container::{
    Container, ContainerBase, ContainerPoly, Monodisperse, ParticleHandle, Polydisperse,
    RadiusModel, DEFAULT_INIT_MEM, MAX_PARTICLE_MEMORY,
};
pub use error::Error;
pub use order::ParticleOrder;
pub use wall::{DiskGeometry, HalfPlaneGeometry, Wall, WallGeometry, WALL_ID_START};
