use crate::bounds::BoundingBox;

/// Geometry of the uniform block grid covering the domain.
///
/// The domain rectangle is split into `nx * ny` equally sized blocks. A
/// periodic axis wraps coordinates back into the primary domain; on a
/// non-periodic axis, coordinates outside the rectangle (including the upper
/// face itself) do not map to any block.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    pub bounds: BoundingBox,
    /// Number of blocks along each axis.
    pub nx: usize,
    pub ny: usize,
    /// Periodicity flags.
    pub x_prd: bool,
    pub y_prd: bool,
    /// Edge lengths of one block.
    pub boxx: f64,
    pub boxy: f64,
    /// Inverse block edge lengths, coordinate-to-index scale factors.
    pub xsp: f64,
    pub ysp: f64,
}

/// The result of remapping an arbitrary position into the primary domain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Remapped {
    /// Periodic image offsets; (0, 0) is the primary domain.
    pub ai: i32,
    pub aj: i32,
    /// Block coordinates of the remapped position.
    pub ci: usize,
    pub cj: usize,
    /// The remapped position itself.
    pub x: f64,
    pub y: f64,
}

impl Grid {
    pub fn new(bounds: BoundingBox, nx: usize, ny: usize, x_prd: bool, y_prd: bool) -> Self {
        let boxx = bounds.width() / nx as f64;
        let boxy = bounds.height() / ny as f64;
        Grid {
            bounds,
            nx,
            ny,
            x_prd,
            y_prd,
            boxx,
            boxy,
            xsp: 1.0 / boxx,
            ysp: 1.0 / boxy,
        }
    }

    pub fn nxy(&self) -> usize {
        self.nx * self.ny
    }

    pub fn block_index(&self, i: usize, j: usize) -> usize {
        i + self.nx * j
    }

    pub fn block_coords(&self, block: usize) -> (usize, usize) {
        (block % self.nx, block / self.nx)
    }

    /// Maps a particle position to its storage block, wrapping periodic axes
    /// into the primary domain. Returns the block index and the (possibly
    /// shifted) coordinates, or `None` if a non-periodic axis puts the
    /// position out of range.
    pub fn put_remap(&self, mut x: f64, mut y: f64) -> Option<(usize, f64, f64)> {
        let mut i = ((x - self.bounds.min_x) * self.xsp).floor() as i64;
        if self.x_prd {
            let w = i.rem_euclid(self.nx as i64);
            x += self.boxx * (w - i) as f64;
            i = w;
        } else if i < 0 || i >= self.nx as i64 {
            return None;
        }

        let mut j = ((y - self.bounds.min_y) * self.ysp).floor() as i64;
        if self.y_prd {
            let w = j.rem_euclid(self.ny as i64);
            y += self.boxy * (w - j) as f64;
            j = w;
        } else if j < 0 || j >= self.ny as i64 {
            return None;
        }

        Some((self.block_index(i as usize, j as usize), x, y))
    }

    /// Like [`put_remap`](Self::put_remap), but additionally reports which
    /// periodic image the position came from, so that a caller can
    /// reconstruct positions relative to the original query.
    pub fn remap(&self, mut x: f64, mut y: f64) -> Option<Remapped> {
        let mut ci = ((x - self.bounds.min_x) * self.xsp).floor() as i64;
        let ai;
        if ci < 0 || ci >= self.nx as i64 {
            if self.x_prd {
                ai = ci.div_euclid(self.nx as i64);
                x -= ai as f64 * self.bounds.width();
                ci -= ai * self.nx as i64;
            } else {
                return None;
            }
        } else {
            ai = 0;
        }

        let mut cj = ((y - self.bounds.min_y) * self.ysp).floor() as i64;
        let aj;
        if cj < 0 || cj >= self.ny as i64 {
            if self.y_prd {
                aj = cj.div_euclid(self.ny as i64);
                y -= aj as f64 * self.bounds.height();
                cj -= aj * self.ny as i64;
            } else {
                return None;
            }
        } else {
            aj = 0;
        }

        Some(Remapped {
            ai: ai as i32,
            aj: aj as i32,
            ci: ci as usize,
            cj: cj as usize,
            x,
            y,
        })
    }
}
