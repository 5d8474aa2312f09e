use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tuning knobs for tree construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Deepest group nesting accepted before construction fails with
    /// [`SceneError::RecursionLimit`](crate::SceneError::RecursionLimit).
    pub max_depth: usize,
    /// When false, paintable nodes keep their placeholder texture and no
    /// decode task is scheduled.
    pub decode_textures: bool,
    /// Name given to document nodes that carry none.
    pub default_name: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            decode_textures: true,
            default_name: "Unnamed Node".to_string(),
        }
    }
}

impl SceneConfig {
    /// Default configuration with overrides from the environment.
    ///
    /// It checks `PSD_SCENE_MAX_DEPTH` and `PSD_SCENE_DECODE_TEXTURES`.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("PSD_SCENE_MAX_DEPTH") {
            match raw.trim().parse() {
                Ok(depth) => config.max_depth = depth,
                Err(_) => warn!(value = %raw, "ignoring invalid PSD_SCENE_MAX_DEPTH"),
            }
        }
        if let Ok(raw) = std::env::var("PSD_SCENE_DECODE_TEXTURES") {
            match raw.trim() {
                "1" | "true" | "yes" => config.decode_textures = true,
                "0" | "false" | "no" => config.decode_textures = false,
                _ => warn!(value = %raw, "ignoring invalid PSD_SCENE_DECODE_TEXTURES"),
            }
        }
        config
    }
}
