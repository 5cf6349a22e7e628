/// Walls are assigned IDs at or below this value so they never collide with
/// the domain face IDs or with particle IDs.
pub const WALL_ID_START: i32 = -10;

/// Point-membership predicate of a wall.
///
/// Must be `Send + Sync` so containers holding walls can be shared with the
/// worker pool.
pub trait WallGeometry: Send + Sync + std::fmt::Debug {
    /// Checks whether a point lies inside the valid region of the wall.
    fn contains(&self, x: f64, y: f64) -> bool;
}

/// A wall: a geometry predicate paired with its (negative) ID.
#[derive(Debug)]
pub struct Wall {
    id: i32,
    geometry: Box<dyn WallGeometry>,
}

impl Wall {
    pub fn new(id: i32, geometry: Box<dyn WallGeometry>) -> Self {
        Wall { id, geometry }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn point_inside(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(x, y)
    }
}

/// Half-plane wall; the normal points into the valid region.
#[derive(Debug)]
pub struct HalfPlaneGeometry {
    point: [f64; 2],
    normal: [f64; 2],
}

impl HalfPlaneGeometry {
    pub fn new(point: [f64; 2], normal: [f64; 2]) -> Self {
        Self { point, normal }
    }
}

impl WallGeometry for HalfPlaneGeometry {
    fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.point[0];
        let dy = y - self.point[1];
        dx * self.normal[0] + dy * self.normal[1] >= 0.0
    }
}

/// Disk wall; the valid region is the closed disk.
#[derive(Debug)]
pub struct DiskGeometry {
    center: [f64; 2],
    radius: f64,
}

impl DiskGeometry {
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self { center, radius }
    }
}

impl WallGeometry for DiskGeometry {
    fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_plane_contains() {
        let wall = Wall::new(
            WALL_ID_START,
            Box::new(HalfPlaneGeometry::new([0.5, 0.0], [1.0, 0.0])),
        );
        assert!(wall.point_inside(0.7, 3.0));
        assert!(wall.point_inside(0.5, -1.0));
        assert!(!wall.point_inside(0.3, 0.0));
    }

    #[test]
    fn test_disk_contains() {
        let wall = Wall::new(
            WALL_ID_START,
            Box::new(DiskGeometry::new([0.5, 0.5], 0.25)),
        );
        assert!(wall.point_inside(0.5, 0.5));
        assert!(wall.point_inside(0.75, 0.5));
        assert!(!wall.point_inside(0.76, 0.5));
    }
}
