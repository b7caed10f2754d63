//! Clock scene demo -- tiles, an animated sprite, and a 12-hour clock drawn
//! from a procedural glyph atlas in one batched draw call.
//!
//! Run with:
//!   cargo run --example clock_scene -p kiln-engine [-- path/to/config.json]
//!
//! Controls:
//!   B -- toggle click-barrier drawing
//!   Escape -- quit

use std::time::{SystemTime, UNIX_EPOCH};

use kiln_engine::prelude::*;
use kiln_engine::render::WgpuContext;
use kiln_scene::shader::TEXT_PROGRAM;

// ---------------------------------------------------------------------------
// Procedural textures
// ---------------------------------------------------------------------------

const GLYPH_CELL: u32 = 16;
const GLYPH_SLOTS: u32 = 13;

/// 3x5 bitmaps, `#` set.
type Bitmap = [&'static str; 5];

const DIGITS: [Bitmap; 10] = [
    ["###", "#.#", "#.#", "#.#", "###"],
    [".#.", "##.", ".#.", ".#.", "###"],
    ["###", "..#", "###", "#..", "###"],
    ["###", "..#", "###", "..#", "###"],
    ["#.#", "#.#", "###", "..#", "..#"],
    ["###", "#..", "###", "..#", "###"],
    ["###", "#..", "###", "#.#", "###"],
    ["###", "..#", "..#", "..#", "..#"],
    ["###", "#.#", "###", "#.#", "###"],
    ["###", "#.#", "###", "..#", "###"],
];
const COLON: Bitmap = ["...", ".#.", "...", ".#.", "..."];
const LETTER_A: Bitmap = [".#.", "#.#", "###", "#.#", "#.#"];
const LETTER_P: Bitmap = ["##.", "#.#", "##.", "#..", "#.."];
const LETTER_M: Bitmap = ["#.#", "###", "###", "#.#", "#.#"];

struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Image {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
        }
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = ((y * self.width + x) * 4) as usize;
            self.rgba[i..i + 4].copy_from_slice(&color);
        }
    }

    fn blit(&mut self, bitmap: &Bitmap, x0: u32, y0: u32, scale: u32) {
        for (row, line) in bitmap.iter().enumerate() {
            for (col, cell) in line.bytes().enumerate() {
                if cell != b'#' {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = x0 + col as u32 * scale + dx;
                        let y = y0 + row as u32 * scale + dy;
                        self.put(x, y, [240, 240, 220, 255]);
                    }
                }
            }
        }
    }

    /// Rows in reverse order, for the Y-up standalone text projection.
    fn flipped(mut self) -> Self {
        let row = (self.width * 4) as usize;
        let rows: Vec<Vec<u8>> = self.rgba.chunks(row).rev().map(<[u8]>::to_vec).collect();
        self.rgba = rows.concat();
        self
    }

    fn upload(&self, gpu: &mut WgpuContext) -> Result<Texture, GpuError> {
        gpu.create_texture_rgba(self.width, self.height, &self.rgba)
    }
}

/// The clock atlas: AM, PM, 0-9, and ':' in 16x16 cells.
fn clock_font() -> Image {
    let mut atlas = Image::new(GLYPH_CELL * GLYPH_SLOTS, GLYPH_CELL);
    // AM and PM share one cell each.
    atlas.blit(&LETTER_A, 1, 3, 2);
    atlas.blit(&LETTER_M, 8, 3, 2);
    atlas.blit(&LETTER_P, GLYPH_CELL + 1, 3, 2);
    atlas.blit(&LETTER_M, GLYPH_CELL + 8, 3, 2);
    for (i, digit) in DIGITS.iter().enumerate() {
        atlas.blit(digit, GLYPH_CELL * (i as u32 + 2) + 3, 0, 3);
    }
    atlas.blit(&COLON, GLYPH_CELL * 12 + 3, 0, 3);
    atlas
}

/// Four 32x32 frames of a block shifting hue.
fn spinner_atlas() -> Image {
    const FRAME: u32 = 32;
    let colors = [
        [230, 90, 70, 255],
        [230, 190, 70, 255],
        [90, 200, 110, 255],
        [80, 140, 230, 255],
    ];
    let mut atlas = Image::new(FRAME * 4, FRAME);
    for (frame, color) in colors.iter().enumerate() {
        for y in 4..FRAME - 4 {
            for x in 4..FRAME - 4 {
                atlas.put(frame as u32 * FRAME + x, y, *color);
            }
        }
    }
    atlas
}

fn checker_tile(light: [u8; 4], dark: [u8; 4]) -> Image {
    let mut tile = Image::new(32, 32);
    for y in 0..32 {
        for x in 0..32 {
            let color = if (x / 8 + y / 8) % 2 == 0 { light } else { dark };
            tile.put(x, y, color);
        }
    }
    tile
}

// ---------------------------------------------------------------------------
// Clock formatting
// ---------------------------------------------------------------------------

/// Current UTC time as `(h:MMAM, SS)`.
fn clock_strings() -> (String, String) {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let day_secs = secs % 86_400;
    let hour = day_secs / 3600;
    let minute = (day_secs / 60) % 60;
    let second = day_secs % 60;

    let suffix = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    (
        format!("{hour12}:{minute:02}{suffix}"),
        format!("{second:02}"),
    )
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

struct Live {
    clock: TextRef,
    spinner: SpriteRef,
    seconds: TextObject,
    seconds_surface: TextSurface,
}

#[derive(Default)]
struct ClockScene {
    live: Option<Live>,
    frames: u64,
}

impl SceneApp for ClockScene {
    fn init(
        &mut self,
        gpu: &mut WgpuContext,
        shaders: &ShaderCache,
        config: &RendererConfig,
    ) -> anyhow::Result<Scene> {
        let font = clock_font().upload(gpu)?;
        let spinner_tex = spinner_atlas().upload(gpu)?;

        let mut sprites = Vec::new();
        let palettes = [
            ([70, 70, 90, 255], [50, 50, 70, 255]),
            ([90, 70, 70, 255], [70, 50, 50, 255]),
            ([70, 90, 70, 255], [50, 70, 50, 255]),
        ];
        for (i, (light, dark)) in palettes.iter().enumerate() {
            let tile = checker_tile(*light, *dark).upload(gpu)?;
            for row in 0..2 {
                let pos = Vec2::new(80.0 + i as f32 * 160.0, 120.0 + row as f32 * 160.0);
                sprites.push(
                    Sprite::new(tile, Vec2::new(128.0, 128.0))
                        .with_texture_size(Vec2::new(32.0, 32.0))
                        .at(pos)
                        .with_depth(-1.0)
                        .into_ref(),
                );
            }
        }

        let spinner = Sprite::new(spinner_tex, Vec2::new(64.0, 64.0))
            .with_texture_size(Vec2::new(32.0, 32.0))
            .at(Vec2::new(config.width as f32 / 2.0, config.height as f32 / 2.0))
            .pivot_centered()
            .with_depth(1.0)
            .into_ref();
        sprites.push(spinner.clone());

        let (time, secs) = clock_strings();
        let mut clock = TextObject::new(font, Vec2::new(32.0, 32.0))
            .with_glyph_texture_size(Vec2::new(GLYPH_CELL as f32, GLYPH_CELL as f32))
            .with_h_padding(28.0)
            .at(Vec2::new(24.0, 24.0));
        clock.set_text(&time)?;
        let clock = clock.into_ref();

        let spinner_barrier = ClickBarrier::new(
            config.width as f32 / 2.0 - 32.0,
            config.width as f32 / 2.0 + 32.0,
            config.height as f32 / 2.0 - 32.0,
            config.height as f32 / 2.0 + 32.0,
        );
        let behaviors = vec![SpriteBehavior {
            sprite: spinner.clone(),
            click_barrier: spinner_barrier,
            action: 1,
        }];
        let clock_barrier = ClickBarrier::new(24.0, 24.0 + 28.0 * 6.0, 24.0, 56.0);

        let scene = Scene::new(
            gpu,
            config.limits,
            sprites,
            behaviors,
            vec![clock.clone()],
            vec![spinner_barrier, clock_barrier],
        )?;

        // Seconds are drawn standalone with the text program, centered
        // under the spinner.
        let flipped_font = clock_font().flipped().upload(gpu)?;
        let mut seconds = TextObject::new(flipped_font, Vec2::new(24.0, 24.0))
            .with_glyph_texture_size(Vec2::new(GLYPH_CELL as f32, GLYPH_CELL as f32))
            .with_h_padding(22.0)
            .at(Vec2::new(-22.0, -72.0));
        if let Ok(program) = shaders.get(TEXT_PROGRAM) {
            seconds = seconds.with_program(program);
        }
        seconds.set_text(&secs)?;
        let mut seconds_surface = TextSurface::new(gpu)?;
        seconds_surface.update(gpu, &mut seconds)?;

        self.live = Some(Live {
            clock,
            spinner,
            seconds,
            seconds_surface,
        });
        Ok(scene)
    }

    fn frame(&mut self, _scene: &mut Scene) {
        self.frames += 1;
        let Some(live) = self.live.as_mut() else {
            return;
        };

        if self.frames % 15 == 0 {
            let mut spinner = live.spinner.borrow_mut();
            spinner.current_frame = (spinner.current_frame + 1) % 4;
        }

        let (time, secs) = clock_strings();
        if let Err(e) = live.clock.borrow_mut().set_text(&time) {
            tracing::warn!(error = %e, "clock text rejected");
        }
        if let Err(e) = live.seconds.set_text(&secs) {
            tracing::warn!(error = %e, "seconds text rejected");
        }
    }

    fn draw_overlay(
        &mut self,
        gpu: &mut WgpuContext,
        viewport: Viewport,
        _shaders: &ShaderCache,
    ) -> Result<(), SceneError> {
        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };
        if live.seconds.program.is_none() {
            return Ok(());
        }
        live.seconds_surface.update(gpu, &mut live.seconds)?;
        live.seconds_surface.draw(gpu, &live.seconds, viewport)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig {
            title: "kiln clock -- B toggles barriers, ESC quits".to_owned(),
            ..RendererConfig::default()
        }
        .with_shader_root(env!("CARGO_MANIFEST_DIR")),
    };

    run_windowed(config, ClockScene::default())
}
