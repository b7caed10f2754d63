//! Renderer config loading from disk, and the bundled shader manifest.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_engine::config::{ConfigError, RendererConfig};
use kiln_scene::prelude::*;

/// A fresh directory under the system temp dir, removed on drop.
struct TempDir {
    root: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("kiln-config-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn load_resolves_shaders_against_config_directory() {
    let dir = TempDir::new("relative");
    let path = dir.root.join("renderer.json");
    fs::write(
        &path,
        r#"{
            "title": "demo",
            "clear_color": [0.0, 0.0, 0.0, 1.0],
            "shaders": {
                "programs": [
                    { "name": "scene", "vertex": "s.vert.wgsl", "fragment": "/abs/s.frag.wgsl" }
                ]
            }
        }"#,
    )
    .unwrap();

    let config = RendererConfig::load(&path).unwrap();

    assert_eq!(config.title, "demo");
    assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    let program = &config.shaders.programs[0];
    assert_eq!(program.vertex, dir.root.join("s.vert.wgsl"));
    assert_eq!(program.fragment, Path::new("/abs/s.frag.wgsl"));
}

#[test]
fn missing_file_reports_its_path() {
    let dir = TempDir::new("missing");
    let path = dir.root.join("nope.json");

    match RendererConfig::load(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Read error, got {other:?}"),
    }
}

#[test]
fn bundled_shaders_preload_headless() {
    let config = RendererConfig::default().with_shader_root(env!("CARGO_MANIFEST_DIR"));

    let mut gpu = HeadlessContext::new();
    let mut cache = ShaderCache::new();
    let summary = cache.preload(&mut gpu, &config.shaders);

    assert!(summary.all_loaded(), "failed: {:?}", summary.failed);
    assert!(cache.get("scene").is_ok());
    assert!(cache.get("text").is_ok());
}

#[test]
fn config_limits_drive_scene_capacity() {
    let config = RendererConfig::from_json_str(r#"{ "limits": { "max_quads": 2 } }"#).unwrap();

    let mut gpu = HeadlessContext::new();
    let sprites: Vec<SpriteRef> = (0..3)
        .map(|_| Sprite::new(gpu.create_texture(8, 8), Vec2::new(8.0, 8.0)).into_ref())
        .collect();

    let result = Scene::new(&mut gpu, config.limits, sprites, Vec::new(), Vec::new(), Vec::new());
    assert!(matches!(
        result,
        Err(SceneError::CapacityExceeded {
            required: 3,
            capacity: 2
        })
    ));
}
