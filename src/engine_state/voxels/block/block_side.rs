//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the local frame of each
//! face: its outward normal and the two in-plane tangent axes used to place
//! vertices and ambient-occlusion samples.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Unit offset from a block to the neighbour this face looks at.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// In-plane axes `(u, v)` of the face.
    ///
    /// `u × v` equals the normal, so vertices walked in `(0,0) (1,0) (1,1) (0,1)`
    /// order wind counter-clockwise when seen from outside the block.
    pub fn tangents(self) -> (Vector3<i32>, Vector3<i32>) {
        match self {
            BlockSide::FRONT => (Vector3::new(1, 0, 0), Vector3::new(0, 1, 0)),
            BlockSide::BACK => (Vector3::new(-1, 0, 0), Vector3::new(0, 1, 0)),
            BlockSide::BOTTOM => (Vector3::new(1, 0, 0), Vector3::new(0, 0, 1)),
            BlockSide::TOP => (Vector3::new(1, 0, 0), Vector3::new(0, 0, -1)),
            BlockSide::LEFT => (Vector3::new(0, 0, 1), Vector3::new(0, 1, 0)),
            BlockSide::RIGHT => (Vector3::new(0, 0, -1), Vector3::new(0, 1, 0)),
        }
    }
}
