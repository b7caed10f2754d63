//! Renderer configuration.
//!
//! A [`RendererConfig`] gathers everything the windowed runner needs before
//! the first frame: window title and size, clear color, scene limits, and the
//! shader manifest. Every field has a default, so a config file only needs to
//! name what it overrides:
//!
//! ```
//! use kiln_engine::config::RendererConfig;
//!
//! let config = RendererConfig::from_json_str(r#"{ "title": "clock", "width": 640 }"#).unwrap();
//! assert_eq!(config.title, "clock");
//! assert_eq!(config.width, 640);
//! assert_eq!(config.height, RendererConfig::default().height);
//! ```

use std::path::{Path, PathBuf};

use kiln_scene::limits::SceneLimits;
use kiln_scene::shader::ShaderManifest;
use serde::{Deserialize, Serialize};

/// Errors from loading a [`RendererConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid JSON for a [`RendererConfig`].
    #[error("invalid renderer config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Window, clear color, scene limits, and shader sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// RGBA clear color, components in `0.0..=1.0`.
    pub clear_color: [f64; 4],
    pub limits: SceneLimits,
    pub shaders: ShaderManifest,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "kiln".to_owned(),
            width: 960,
            height: 540,
            clear_color: [0.08, 0.08, 0.12, 1.0],
            limits: SceneLimits::default(),
            shaders: ShaderManifest::default(),
        }
    }
}

impl RendererConfig {
    /// Parse a config from JSON. Shader paths are left as written.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config file. Relative shader paths resolve against the
    /// directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&json)?;
        if let Some(dir) = path.parent() {
            config.shaders = config.shaders.with_root(dir);
        }
        tracing::debug!(path = %path.display(), programs = config.shaders.programs.len(), "renderer config loaded");
        Ok(config)
    }

    /// Resolve relative shader paths against `root`.
    pub fn with_shader_root(mut self, root: impl AsRef<Path>) -> Self {
        self.shaders = self.shaders.with_root(root);
        self
    }
}
