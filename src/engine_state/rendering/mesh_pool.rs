//! Reuse of renderer mesh handles across chunk evict/generate cycles.

use std::collections::VecDeque;

use super::MeshRole;

/// Bounded free-lists of renderer meshes, one per [`MeshRole`].
///
/// Released meshes are kept for the next chunk that needs one of the same role.
/// Once a list is full, further releases are handed back to the caller.
pub struct MeshPool<M> {
    available_meshes: [VecDeque<M>; 2],
    capacity: usize,
}

impl<M> MeshPool<M> {
    pub fn new(capacity: usize) -> Self {
        MeshPool {
            available_meshes: [VecDeque::new(), VecDeque::new()],
            capacity,
        }
    }

    /// Takes a free mesh of `role`, if there is one.
    pub fn acquire(&mut self, role: MeshRole) -> Option<M> {
        self.available_meshes[role as usize].pop_front()
    }

    /// Returns a mesh to the pool.
    ///
    /// # Returns
    /// `Some(mesh)` when the free-list for `role` is already full; the caller
    /// should destroy it.
    pub fn release(&mut self, role: MeshRole, mesh: M) -> Option<M> {
        let available = &mut self.available_meshes[role as usize];
        if available.len() >= self.capacity {
            return Some(mesh);
        }
        available.push_back(mesh);
        None
    }

    /// Number of free meshes of `role`.
    pub fn available(&self, role: MeshRole) -> usize {
        self.available_meshes[role as usize].len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
