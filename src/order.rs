use crate::container::ParticleHandle;

/// Records the (block, slot) address of each particle in the order it was
/// inserted, so callers can traverse the container in insertion order
/// rather than block order.
#[derive(Debug, Default, Clone)]
pub struct ParticleOrder {
    handles: Vec<ParticleHandle>,
}

impl ParticleOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: ParticleHandle) {
        self.handles.push(handle);
    }

    pub fn iter(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.handles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
