//! Minimal 2D vector and 4x4 matrix helpers used by the renderer.
//!
//! Matrices are column-major `[[f32; 4]; 4]` (`m[column][row]`), the layout
//! both GLSL and WGSL expect for `mat4` uniforms.

use serde::{Deserialize, Serialize};

/// A 2D vector in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Column-major 4x4 matrix.
pub type Mat4 = [[f32; 4]; 4];

/// The identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Column-major orthographic projection, mapping the box
/// `[left, right] x [bottom, top] x [near, far]` to normalized device
/// coordinates.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rl = 1.0 / (right - left);
    let tb = 1.0 / (top - bottom);
    let fn_ = -1.0 / (far - near);

    let mut m = [[0.0; 4]; 4];
    m[0][0] = 2.0 * rl;
    m[1][1] = 2.0 * tb;
    m[2][2] = 2.0 * fn_;
    m[3][0] = -(right + left) * rl;
    m[3][1] = -(top + bottom) * tb;
    m[3][2] = (far + near) * fn_;
    m[3][3] = 1.0;
    m
}

/// Projection for pixel-space scenes: `(0, 0)` is the top-left corner of
/// the window, Y grows downward.
pub fn pixel_projection(width: f32, height: f32) -> Mat4 {
    orthographic(0.0, width, height, 0.0, -1.0, 1.0)
}

/// Projection centered on the window, Y grows upward. Used by the
/// standalone text path.
pub fn centered_projection(width: f32, height: f32) -> Mat4 {
    orthographic(
        -width / 2.0,
        width / 2.0,
        -height / 2.0,
        height / 2.0,
        -1.0,
        1.0,
    )
}

/// Transform a 2D point (z = 0, w = 1) by a column-major matrix.
pub fn transform_point(m: &Mat4, p: Vec2) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (row, value) in out.iter_mut().enumerate() {
        *value = m[0][row] * p.x + m[1][row] * p.y + m[3][row];
    }
    out
}
