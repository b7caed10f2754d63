//! Depth sorting of sprite references.
//!
//! The scene sorts its sprites once, at construction; the resulting order is
//! the paint order for the scene's lifetime. Changing a sprite's depth later
//! has no effect until the scene is rebuilt from scratch.

use std::cmp::Ordering;

use crate::sprite::SpriteRef;

/// Stable-sort sprites by ascending depth (back to front).
///
/// Sprites with equal depth (by `==`, so `-0.0` equals `0.0`) keep their
/// relative order. NaN depths sort after every other depth instead of
/// poisoning the comparison.
///
/// # Panics
///
/// Panics if any sprite is mutably borrowed while sorting. Sorting happens
/// during scene construction, before the references are shared further.
pub fn depth_sort(sprites: &mut [SpriteRef]) {
    sprites.sort_by(|a, b| compare_depth(a.borrow().depth, b.borrow().depth));
}

fn compare_depth(a: f32, b: f32) -> Ordering {
    // Any NaN is "furthest in front".
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // -0.0 and 0.0 compare equal here, unlike `total_cmp`.
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
