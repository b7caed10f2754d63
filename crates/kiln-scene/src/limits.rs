//! Capacity limits for a scene's preallocated GPU buffers.
//!
//! The vertex and index buffers are sized once at scene creation. Every
//! rebuild is checked against these limits and rejected with a
//! [`SceneError`](crate::SceneError) instead of writing past the buffers.

use serde::{Deserialize, Serialize};

/// Maximum number of sprites a scene may reference.
pub const MAX_SCENE_SPRITES: usize = 50;

/// Maximum number of quads packed into one frame's vertex buffer.
pub const MAX_SCENE_QUADS: usize = MAX_SCENE_SPRITES;

/// Maximum number of distinct texture slots bound for one draw call.
pub const MAX_SCENE_TEXTURES: usize = 20;

/// Scalar fields per vertex: x, y, u, v, texture slot.
pub const FLOATS_PER_VERTEX: usize = 5;

/// Vertices per quad.
pub const VERTICES_PER_QUAD: usize = 4;

/// Indices per quad (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// Overridable capacity limits for one scene.
///
/// Defaults reproduce the engine's fixed caps. Limits are serializable so a
/// renderer configuration file can raise or lower them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLimits {
    /// Maximum number of sprite references the scene accepts.
    pub max_sprites: usize,
    /// Capacity of the vertex buffer, in quads.
    pub max_quads: usize,
    /// Maximum number of texture slots (sprites + text objects).
    pub max_texture_slots: usize,
}

impl SceneLimits {
    /// Number of vertices the vertex buffer holds.
    pub fn vertex_capacity(&self) -> usize {
        self.max_quads * VERTICES_PER_QUAD
    }

    /// Size of the vertex buffer in scalar fields.
    pub fn vertex_buffer_len(&self) -> usize {
        self.vertex_capacity() * FLOATS_PER_VERTEX
    }

    /// Number of entries in the static index buffer.
    pub fn index_buffer_len(&self) -> usize {
        self.max_quads * INDICES_PER_QUAD
    }
}

impl Default for SceneLimits {
    fn default() -> Self {
        Self {
            max_sprites: MAX_SCENE_SPRITES,
            max_quads: MAX_SCENE_QUADS,
            max_texture_slots: MAX_SCENE_TEXTURES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_engine_caps() {
        let limits = SceneLimits::default();
        assert_eq!(limits.max_sprites, 50);
        assert_eq!(limits.max_quads, 50);
        assert_eq!(limits.max_texture_slots, 20);
        assert_eq!(limits.vertex_buffer_len(), 50 * 4 * 5);
        assert_eq!(limits.index_buffer_len(), 50 * 6);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let limits: SceneLimits = serde_json::from_str(r#"{ "max_quads": 128 }"#).unwrap();
        assert_eq!(limits.max_quads, 128);
        assert_eq!(limits.max_sprites, MAX_SCENE_SPRITES);
        assert_eq!(limits.max_texture_slots, MAX_SCENE_TEXTURES);
    }
}
