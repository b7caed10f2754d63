//! Named shader program cache.
//!
//! Programs are compiled once at startup by [`ShaderCache::preload`] and
//! looked up by name each frame. A program that failed to compile or link
//! stays in the cache as an *unusable* entry: looking it up returns an
//! error carrying the original failure, never a handle that would draw
//! garbage.
//!
//! # Example
//!
//! ```
//! use kiln_scene::headless::HeadlessContext;
//! use kiln_scene::shader::{ShaderCache, ShaderError};
//! use kiln_scene::gpu::GpuContext;
//!
//! let mut gpu = HeadlessContext::new();
//! let mut cache = ShaderCache::new();
//!
//! let program = gpu.compile_program("vertex", "fragment").unwrap();
//! cache.put("scene", program);
//!
//! assert_eq!(cache.get("scene").unwrap(), program);
//! assert!(matches!(cache.get("text"), Err(ShaderError::UnknownProgram { .. })));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::gpu::{GpuContext, GpuError, ProgramHandle};

/// Name of the program drawing packed scenes.
pub const SCENE_PROGRAM: &str = "scene";

/// Name of the program drawing standalone text.
pub const TEXT_PROGRAM: &str = "text";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by shader loading and lookup.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    /// A shader source file could not be read.
    #[error("could not load shader source at {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No program is registered under this name.
    #[error("no shader program named '{name}' in the cache")]
    UnknownProgram {
        name: String,
    },

    /// The program is registered but failed to compile or link.
    #[error("shader program '{name}' is unusable: {reason}")]
    Unusable {
        name: String,
        reason: String,
    },

    /// Compilation failed; carries the driver's log.
    #[error("shader compilation failed: {0}")]
    Compile(String),

    /// Linking failed; carries the driver's log.
    #[error("shader program linking failed: {0}")]
    Link(String),

    /// The GPU context failed for another reason.
    #[error(transparent)]
    Gpu(GpuError),
}

impl From<GpuError> for ShaderError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::Compile(log) => ShaderError::Compile(log),
            GpuError::Link(log) => ShaderError::Link(log),
            other => ShaderError::Gpu(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Source files of one named program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderProgramSource {
    pub name: String,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderProgramSource {
    pub fn new(name: &str, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_owned(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// The set of programs compiled at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderManifest {
    pub programs: Vec<ShaderProgramSource>,
}

impl ShaderManifest {
    /// Resolve every relative source path against `root`.
    #[must_use]
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        for program in &mut self.programs {
            if program.vertex.is_relative() {
                program.vertex = root.join(&program.vertex);
            }
            if program.fragment.is_relative() {
                program.fragment = root.join(&program.fragment);
            }
        }
        self
    }
}

impl Default for ShaderManifest {
    /// The "scene" and "text" programs under `shaders/`.
    fn default() -> Self {
        Self {
            programs: vec![
                ShaderProgramSource::new(
                    SCENE_PROGRAM,
                    "shaders/scene.vert.wgsl",
                    "shaders/scene.frag.wgsl",
                ),
                ShaderProgramSource::new(
                    TEXT_PROGRAM,
                    "shaders/text.vert.wgsl",
                    "shaders/text.frag.wgsl",
                ),
            ],
        }
    }
}

/// Outcome of [`ShaderCache::preload`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadSummary {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

impl PreloadSummary {
    pub fn all_loaded(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ShaderCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum CacheEntry {
    Ready(ProgramHandle),
    Failed(String),
}

/// Programs by name.
#[derive(Debug, Clone, Default)]
pub struct ShaderCache {
    programs: HashMap<String, CacheEntry>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a usable program.
    ///
    /// # Errors
    ///
    /// [`ShaderError::UnknownProgram`] if nothing is registered under
    /// `name`, [`ShaderError::Unusable`] if its compile or link failed.
    pub fn get(&self, name: &str) -> Result<ProgramHandle, ShaderError> {
        match self.programs.get(name) {
            Some(CacheEntry::Ready(handle)) => Ok(*handle),
            Some(CacheEntry::Failed(reason)) => Err(ShaderError::Unusable {
                name: name.to_owned(),
                reason: reason.clone(),
            }),
            None => {
                tracing::warn!(name, "failed to load cached shader");
                Err(ShaderError::UnknownProgram {
                    name: name.to_owned(),
                })
            }
        }
    }

    /// Register `handle` under `name`, replacing any previous entry.
    pub fn put(&mut self, name: &str, handle: ProgramHandle) {
        self.programs
            .insert(name.to_owned(), CacheEntry::Ready(handle));
    }

    /// Record that the program `name` could not be built.
    pub fn put_failed(&mut self, name: &str, reason: impl Into<String>) {
        self.programs
            .insert(name.to_owned(), CacheEntry::Failed(reason.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Compile and register every program in `manifest`.
    ///
    /// Failures do not stop the preload: each failed program is logged and
    /// registered as unusable, so later lookups report it.
    pub fn preload(&mut self, gpu: &mut dyn GpuContext, manifest: &ShaderManifest) -> PreloadSummary {
        let mut summary = PreloadSummary::default();

        for program in &manifest.programs {
            match create_program(gpu, &program.vertex, &program.fragment) {
                Ok(handle) => {
                    self.put(&program.name, handle);
                    summary.loaded.push(program.name.clone());
                }
                Err(e) => {
                    tracing::error!(name = %program.name, error = %e, "shader program preload failed");
                    self.put_failed(&program.name, e.to_string());
                    summary.failed.push(program.name.clone());
                }
            }
        }

        tracing::info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "shader programs preloaded"
        );
        summary
    }
}

/// Read a vertex and a fragment source file and build a program from them.
///
/// # Errors
///
/// [`ShaderError::SourceUnreadable`] if either file cannot be read;
/// [`ShaderError::Compile`] / [`ShaderError::Link`] with the driver's log if
/// the GPU context rejects the sources.
pub fn create_program(
    gpu: &mut dyn GpuContext,
    vertex_path: &Path,
    fragment_path: &Path,
) -> Result<ProgramHandle, ShaderError> {
    let vertex_source = read_shader_source(vertex_path)?;
    let fragment_source = read_shader_source(fragment_path)?;

    gpu.compile_program(&vertex_source, &fragment_source)
        .map_err(|e| {
            tracing::error!(
                vertex = %vertex_path.display(),
                fragment = %fragment_path.display(),
                error = %e,
                "failed to build shader program"
            );
            ShaderError::from(e)
        })
}

fn read_shader_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessContext;

    #[test]
    fn put_overwrites_failed_entry() {
        let mut gpu = HeadlessContext::new();
        let mut cache = ShaderCache::new();
        cache.put_failed("scene", "link error");
        assert!(matches!(cache.get("scene"), Err(ShaderError::Unusable { .. })));

        let handle = gpu.compile_program("v", "f").unwrap();
        cache.put("scene", handle);
        assert_eq!(cache.get("scene").unwrap(), handle);
    }

    #[test]
    fn missing_source_file_is_reported_with_path() {
        let mut gpu = HeadlessContext::new();
        let err = create_program(
            &mut gpu,
            Path::new("/nonexistent/kiln/scene.vert.wgsl"),
            Path::new("/nonexistent/kiln/scene.frag.wgsl"),
        )
        .unwrap_err();

        match err {
            ShaderError::SourceUnreadable { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/kiln/scene.vert.wgsl"));
            }
            other => panic!("expected SourceUnreadable, got {other:?}"),
        }
    }

    #[test]
    fn gpu_compile_and_link_errors_map_to_shader_errors() {
        assert!(matches!(
            ShaderError::from(GpuError::Compile("x".into())),
            ShaderError::Compile(_)
        ));
        assert!(matches!(
            ShaderError::from(GpuError::Link("x".into())),
            ShaderError::Link(_)
        ));
        assert!(matches!(
            ShaderError::from(GpuError::NoProgram),
            ShaderError::Gpu(GpuError::NoProgram)
        ));
    }

    #[test]
    fn manifest_root_resolves_relative_paths_only() {
        let manifest = ShaderManifest {
            programs: vec![ShaderProgramSource::new("a", "a.vert", "/abs/a.frag")],
        }
        .with_root("/assets");

        assert_eq!(manifest.programs[0].vertex, PathBuf::from("/assets/a.vert"));
        assert_eq!(manifest.programs[0].fragment, PathBuf::from("/abs/a.frag"));
    }

    #[test]
    fn default_manifest_names_scene_and_text() {
        let names: Vec<_> = ShaderManifest::default()
            .programs
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec![SCENE_PROGRAM, TEXT_PROGRAM]);
    }
}
