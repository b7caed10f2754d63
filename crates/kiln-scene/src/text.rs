//! Glyph-atlas text: layout and text objects.
//!
//! Text is drawn from a font atlas whose glyphs sit side by side, one slot
//! per glyph. A [`GlyphTable`] maps characters to atlas slots and lays a
//! string out as a list of [`GlyphQuad`]s, one per emitted glyph.
//!
//! # Compound Glyphs
//!
//! Some atlases draw a two-character sequence as one glyph: the clock atlas
//! has a single "AM" glyph and a single "PM" glyph, stored in the slots of
//! 'A' and 'P'. The table's *compound glyph triggers* name those characters.
//! When the layout meets a trigger it emits the trigger's glyph and consumes
//! the next character without emitting anything for it, whatever that
//! character is. So `"AM"` is one quad, and so is `"AX"`.
//!
//! # Unmapped Characters
//!
//! Characters missing from the table are drawn with the fallback slot
//! (slot 0) and counted in [`GlyphLayout::unmapped`]. That is a known
//! limitation of small atlases, so it is surfaced rather than hidden.
//!
//! # Example
//!
//! ```
//! use kiln_scene::text::GlyphTable;
//!
//! let table = GlyphTable::clock();
//! let layout = table.layout("10:30PM");
//! assert_eq!(layout.len(), 6);
//! assert_eq!(layout.glyphs()[5].slot, 1); // the "PM" glyph
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::gpu::{ProgramHandle, Texture};
use crate::math::Vec2;

/// Longest string a text object holds, in characters.
pub const MAX_TEXT_CHARS: usize = 9;

/// Slot used for characters missing from a [`GlyphTable`].
pub const FALLBACK_GLYPH_SLOT: u16 = 0;

/// Characters whose glyph also stands for the character after them.
pub const COMPOUND_GLYPH_TRIGGERS: &[char] = &['A', 'P'];

/// Shared handle to a text object referenced by a scene.
pub type TextRef = Rc<RefCell<TextObject>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when updating a text object.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The new content does not fit the text object.
    #[error("text of {len} characters exceeds the limit of {max}")]
    TooLong {
        len: usize,
        max: usize,
    },
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// One emitted glyph: the character index it is drawn at, and its atlas slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphQuad {
    /// Character index (not byte index) of the emitting character.
    pub column: usize,
    /// Atlas slot of the glyph.
    pub slot: u16,
}

/// The glyphs of a laid-out string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphLayout {
    glyphs: Vec<GlyphQuad>,
    unmapped: usize,
}

impl GlyphLayout {
    pub fn glyphs(&self) -> &[GlyphQuad] {
        &self.glyphs
    }

    /// Number of glyph quads.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Number of emitted glyphs whose character had no atlas slot.
    pub fn unmapped(&self) -> usize {
        self.unmapped
    }
}

/// Character to atlas-slot mapping plus compound glyph triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    slots: HashMap<char, u16>,
    compound_triggers: Vec<char>,
}

impl GlyphTable {
    /// An empty table with no compound triggers.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            compound_triggers: Vec::new(),
        }
    }

    /// The clock atlas: `A`, `P`, the digits, and `:`.
    ///
    /// | char | slot |
    /// |------|------|
    /// | `A` (AM) | 0 |
    /// | `P` (PM) | 1 |
    /// | `0`..`9` | 2..11 |
    /// | `:` | 12 |
    pub fn clock() -> Self {
        let mut table = Self::new();
        table.insert('A', 0);
        table.insert('P', 1);
        for (slot, ch) in ('0'..='9').enumerate() {
            table.insert(ch, slot as u16 + 2);
        }
        table.insert(':', 12);
        for &trigger in COMPOUND_GLYPH_TRIGGERS {
            table.add_compound_trigger(trigger);
        }
        table
    }

    /// Map `ch` to atlas `slot`, replacing any previous mapping.
    pub fn insert(&mut self, ch: char, slot: u16) {
        self.slots.insert(ch, slot);
    }

    /// Mark `ch` as a compound glyph trigger.
    pub fn add_compound_trigger(&mut self, ch: char) {
        if !self.compound_triggers.contains(&ch) {
            self.compound_triggers.push(ch);
        }
    }

    /// Atlas slot of `ch`, if mapped.
    pub fn slot(&self, ch: char) -> Option<u16> {
        self.slots.get(&ch).copied()
    }

    pub fn is_compound_trigger(&self, ch: char) -> bool {
        self.compound_triggers.contains(&ch)
    }

    pub fn compound_triggers(&self) -> &[char] {
        &self.compound_triggers
    }

    /// Lay `text` out left to right.
    ///
    /// Each character emits one glyph at its character index, except that
    /// a compound trigger also swallows the character that follows it.
    pub fn layout(&self, text: &str) -> GlyphLayout {
        let mut layout = GlyphLayout::default();
        let mut chars = text.chars().enumerate();

        while let Some((column, ch)) = chars.next() {
            let slot = match self.slot(ch) {
                Some(slot) => slot,
                None => {
                    tracing::debug!(?ch, column, "no glyph for character, using fallback slot");
                    layout.unmapped += 1;
                    FALLBACK_GLYPH_SLOT
                }
            };
            layout.glyphs.push(GlyphQuad { column, slot });

            if self.is_compound_trigger(ch) {
                chars.next();
            }
        }

        layout
    }
}

impl Default for GlyphTable {
    fn default() -> Self {
        Self::clock()
    }
}

/// Whether `new` differs from the currently laid-out `current` string.
pub fn text_obj_needs_update(current: &str, new: &str) -> bool {
    current != new
}

// ---------------------------------------------------------------------------
// TextObject
// ---------------------------------------------------------------------------

/// A short string drawn from a glyph atlas.
///
/// Content changes go through [`set_text`](Self::set_text), which re-lays
/// out only when the string actually changed. The layout is cached; glyph
/// positions are resolved against `pos` when the scene packs its buffer.
#[derive(Debug, Clone)]
pub struct TextObject {
    /// Baseline-left position of the first glyph.
    pub pos: Vec2,
    /// Position captured when the text object joined a scene.
    pub origin_pos: Vec2,
    /// On-screen size of each glyph.
    pub glyph_size: Vec2,
    /// Pixel size of each glyph inside the atlas.
    pub glyph_texture_size: Vec2,
    /// Horizontal advance per character.
    pub h_padding: f32,
    /// Program for the standalone text path.
    pub program: Option<ProgramHandle>,
    /// Font atlas.
    pub font: Texture,
    pub visible: bool,
    /// Sampler unit assigned by the scene on every rebuild.
    pub texture_slot: u32,
    content: String,
    layout: GlyphLayout,
    glyphs: GlyphTable,
}

impl TextObject {
    /// An empty, visible text object using the clock glyph table.
    ///
    /// Glyph size and texture size default to `glyph_size`; the horizontal
    /// advance defaults to the glyph width.
    pub fn new(font: Texture, glyph_size: Vec2) -> Self {
        Self {
            pos: Vec2::ZERO,
            origin_pos: Vec2::ZERO,
            glyph_size,
            glyph_texture_size: glyph_size,
            h_padding: glyph_size.x,
            program: None,
            font,
            visible: true,
            texture_slot: 0,
            content: String::new(),
            layout: GlyphLayout::default(),
            glyphs: GlyphTable::clock(),
        }
    }

    #[must_use]
    pub fn at(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: ProgramHandle) -> Self {
        self.program = Some(program);
        self
    }

    #[must_use]
    pub fn with_h_padding(mut self, h_padding: f32) -> Self {
        self.h_padding = h_padding;
        self
    }

    #[must_use]
    pub fn with_glyph_texture_size(mut self, glyph_texture_size: Vec2) -> Self {
        self.glyph_texture_size = glyph_texture_size;
        self
    }

    /// Replace the glyph table and re-lay out the current content.
    #[must_use]
    pub fn with_glyph_table(mut self, glyphs: GlyphTable) -> Self {
        self.layout = glyphs.layout(&self.content);
        self.glyphs = glyphs;
        self
    }

    /// Wrap the text object in a shared handle.
    pub fn into_ref(self) -> TextRef {
        Rc::new(RefCell::new(self))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn layout(&self) -> &GlyphLayout {
        &self.layout
    }

    /// Number of glyph quads the current content produces.
    pub fn glyph_count(&self) -> usize {
        self.layout.len()
    }

    pub fn needs_update(&self, text: &str) -> bool {
        text_obj_needs_update(&self.content, text)
    }

    /// Set new content, re-laying out only if it changed.
    ///
    /// Returns `true` if the content changed.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::TooLong`] if `text` has more than
    /// [`MAX_TEXT_CHARS`] characters; the current content is kept.
    pub fn set_text(&mut self, text: &str) -> Result<bool, TextError> {
        if !self.needs_update(text) {
            return Ok(false);
        }

        let len = text.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(TextError::TooLong {
                len,
                max: MAX_TEXT_CHARS,
            });
        }

        self.content.clear();
        self.content.push_str(text);
        self.layout = self.glyphs.layout(text);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::TextureHandle;

    fn font() -> Texture {
        Texture {
            handle: TextureHandle(9),
            width: 208,
            height: 16,
        }
    }

    #[test]
    fn compound_glyph_consumes_two_characters() {
        let layout = GlyphTable::clock().layout("AM");
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.glyphs()[0], GlyphQuad { column: 0, slot: 0 });
    }

    #[test]
    fn plain_characters_emit_one_quad_each() {
        let layout = GlyphTable::clock().layout("12");
        assert_eq!(
            layout.glyphs(),
            &[
                GlyphQuad { column: 0, slot: 3 },
                GlyphQuad { column: 1, slot: 4 },
            ]
        );
    }

    #[test]
    fn clock_string_positions_use_character_index() {
        let layout = GlyphTable::clock().layout("10:30PM");
        let columns: Vec<usize> = layout.glyphs().iter().map(|g| g.column).collect();
        let slots: Vec<u16> = layout.glyphs().iter().map(|g| g.slot).collect();
        assert_eq!(columns, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(slots, vec![3, 2, 12, 5, 2, 1]);
    }

    #[test]
    fn trigger_swallows_any_following_character() {
        let layout = GlyphTable::clock().layout("P1");
        assert_eq!(layout.len(), 1);

        // A trigger in the middle shifts later glyphs' columns past the
        // swallowed character.
        let layout = GlyphTable::clock().layout("A12");
        assert_eq!(
            layout.glyphs(),
            &[
                GlyphQuad { column: 0, slot: 0 },
                GlyphQuad { column: 2, slot: 4 },
            ]
        );
    }

    #[test]
    fn trailing_trigger_still_emits() {
        assert_eq!(GlyphTable::clock().layout("1A").len(), 2);
    }

    #[test]
    fn only_named_triggers_collapse() {
        // 'M' is not a trigger: "MA" is M + compound A.
        let layout = GlyphTable::clock().layout("MAM");
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn unmapped_characters_use_fallback_and_are_counted() {
        let layout = GlyphTable::clock().layout("9z");
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.glyphs()[1].slot, FALLBACK_GLYPH_SLOT);
        assert_eq!(layout.unmapped(), 1);
    }

    #[test]
    fn multibyte_characters_count_as_one_column() {
        let layout = GlyphTable::clock().layout("é1");
        assert_eq!(layout.glyphs()[1].column, 1);
    }

    #[test]
    fn custom_triggers_extend_the_rule() {
        let mut table = GlyphTable::new();
        table.insert('x', 4);
        table.add_compound_trigger('x');
        assert_eq!(table.layout("xy").len(), 1);
        assert!(table.is_compound_trigger('x'));
        assert!(!table.is_compound_trigger('A'));
    }

    #[test]
    fn needs_update_compares_content() {
        assert!(!text_obj_needs_update("10:30", "10:30"));
        assert!(text_obj_needs_update("10:30", "10:31"));
    }

    #[test]
    fn set_text_short_circuits_on_same_content() {
        let mut text = TextObject::new(font(), Vec2::new(16.0, 16.0));
        assert!(text.set_text("10:30").unwrap());
        assert!(!text.set_text("10:30").unwrap());
        assert!(text.set_text("10:31").unwrap());
        assert_eq!(text.glyph_count(), 5);
    }

    #[test]
    fn set_text_rejects_overlong_content() {
        let mut text = TextObject::new(font(), Vec2::new(16.0, 16.0));
        text.set_text("1:00").unwrap();

        let err = text.set_text("0123456789").unwrap_err();
        assert!(matches!(err, TextError::TooLong { len: 10, max: 9 }));
        assert_eq!(text.content(), "1:00");
        assert_eq!(text.glyph_count(), 4);
    }

    #[test]
    fn replacing_glyph_table_relays_out_content() {
        let mut text = TextObject::new(font(), Vec2::new(16.0, 16.0));
        text.set_text("AM").unwrap();
        assert_eq!(text.glyph_count(), 1);

        let text = text.with_glyph_table(GlyphTable::new());
        assert_eq!(text.glyph_count(), 2);
        assert_eq!(text.layout().unmapped(), 2);
    }
}
