//! Shader cache preload tests using real source files on disk.

use std::fs;
use std::path::PathBuf;

use kiln_scene::prelude::*;

/// A fresh directory under the system temp dir, removed on drop.
struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("kiln-shaders-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("shaders")).unwrap();
        Self { root }
    }

    fn write(&self, relative: &str, source: &str) {
        fs::write(self.root.join(relative), source).unwrap();
    }
}

impl Drop for ShaderDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

const VERTEX: &str = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
const FRAGMENT: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

#[test]
fn preload_registers_default_programs() {
    let dir = ShaderDir::new("ok");
    for stem in ["scene", "text"] {
        dir.write(&format!("shaders/{stem}.vert.wgsl"), VERTEX);
        dir.write(&format!("shaders/{stem}.frag.wgsl"), FRAGMENT);
    }

    let mut gpu = HeadlessContext::new();
    let mut cache = ShaderCache::new();
    let summary = cache.preload(&mut gpu, &ShaderManifest::default().with_root(&dir.root));

    assert!(summary.all_loaded());
    assert_eq!(summary.loaded, vec!["scene".to_owned(), "text".to_owned()]);
    assert_ne!(cache.get("scene").unwrap(), cache.get("text").unwrap());
}

#[test]
fn failed_compile_is_cached_as_unusable() {
    let dir = ShaderDir::new("broken");
    dir.write("shaders/scene.vert.wgsl", VERTEX);
    dir.write("shaders/scene.frag.wgsl", "");
    dir.write("shaders/text.vert.wgsl", VERTEX);
    dir.write("shaders/text.frag.wgsl", FRAGMENT);

    let mut gpu = HeadlessContext::new();
    let mut cache = ShaderCache::new();
    let summary = cache.preload(&mut gpu, &ShaderManifest::default().with_root(&dir.root));

    assert_eq!(summary.failed, vec!["scene".to_owned()]);
    assert_eq!(summary.loaded, vec!["text".to_owned()]);

    match cache.get("scene") {
        Err(ShaderError::Unusable { name, reason }) => {
            assert_eq!(name, "scene");
            assert!(reason.contains("fragment"), "reason carries driver log: {reason}");
        }
        other => panic!("expected Unusable, got {other:?}"),
    }
    assert!(cache.get("text").is_ok());
}

#[test]
fn missing_files_fail_preload_without_stopping_it() {
    let dir = ShaderDir::new("missing");
    dir.write("shaders/text.vert.wgsl", VERTEX);
    dir.write("shaders/text.frag.wgsl", FRAGMENT);

    let mut gpu = HeadlessContext::new();
    let mut cache = ShaderCache::new();
    let summary = cache.preload(&mut gpu, &ShaderManifest::default().with_root(&dir.root));

    assert_eq!(summary.failed, vec!["scene".to_owned()]);
    assert!(matches!(cache.get("scene"), Err(ShaderError::Unusable { .. })));
    assert!(cache.get("text").is_ok());
    assert_eq!(cache.len(), 2);
}

#[test]
fn manifest_round_trips_through_json() {
    let json = r#"{
        "programs": [
            { "name": "overlay", "vertex": "overlay.vert.wgsl", "fragment": "overlay.frag.wgsl" }
        ]
    }"#;
    let manifest: ShaderManifest = serde_json::from_str(json).unwrap();
    assert_eq!(manifest.programs.len(), 1);
    assert_eq!(manifest.programs[0].name, "overlay");
    assert_eq!(
        manifest.programs[0],
        ShaderProgramSource::new("overlay", "overlay.vert.wgsl", "overlay.frag.wgsl")
    );
}
