//! Export options.
//!
//! [`ExportOptions`] is the options bag recognized by the pipeline. It can be
//! built in code with the `with_*` methods or deserialized from JSON, where
//! every field is optional and falls back to [`ExportOptions::default`].

use serde::{Deserialize, Serialize};

/// Output file format policy for baked and passthrough textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormat {
    /// Keep the source bitmap's extension (PNG for anything unknown).
    #[default]
    Keep,
    /// Always write PNG.
    Png,
    /// Always write JPEG, unless an alpha channel must be preserved.
    Jpeg,
}

/// Which keyframes are sampled for animated joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeMode {
    /// No animation is exported.
    None,
    /// Only the curve's own keyframes.
    #[default]
    Native,
    /// Native keyframes plus fixed-step samples.
    Step,
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Maximum width or height of a baked texture.
    pub max_texture_size: u32,
    /// File format policy for textures.
    pub texture_format: TextureFormat,
    /// Convert RGB layers feeding scalar channels to luminance.
    pub grayscale: bool,
    /// Keep repeat counts on the binding instead of tiling pixels.
    pub bake_without_transform: bool,
    /// Keyframe sampling mode.
    pub keyframes: KeyframeMode,
    /// Step (in frames) used by [`KeyframeMode::Step`].
    pub step: f32,
    /// Export skin weights and skeleton bindings.
    pub export_skin: bool,
    /// Export vertex colors.
    pub export_vertex_colors: bool,
    /// Honor the subdivision flag of source meshes.
    pub subdivision: bool,
    /// Reuse unmodified bitmaps instead of re-baking them.
    pub prefer_passthrough: bool,
    /// Factor applied to translations and point positions (mm to cm by default).
    pub unit_scale: f32,
    /// Alpha cutoff for masked materials.
    pub alpha_cutoff: f32,
    /// Name of the root prim all nodes live under.
    pub root_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
            texture_format: TextureFormat::Keep,
            grayscale: false,
            bake_without_transform: true,
            keyframes: KeyframeMode::Native,
            step: 1.0,
            export_skin: true,
            export_vertex_colors: true,
            subdivision: true,
            prefer_passthrough: true,
            unit_scale: 0.1,
            alpha_cutoff: 0.5,
            root_name: "Root".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn with_texture_format(mut self, format: TextureFormat) -> Self {
        self.texture_format = format;
        self
    }

    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size.max(1);
        self
    }

    /// Sample native keyframes plus one sample every `step` frames.
    pub fn with_step_keyframes(mut self, step: f32) -> Self {
        self.keyframes = KeyframeMode::Step;
        self.step = step;
        self
    }

    pub fn with_keyframes(mut self, mode: KeyframeMode) -> Self {
        self.keyframes = mode;
        self
    }

    pub fn with_unit_scale(mut self, unit_scale: f32) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn with_passthrough(mut self, prefer_passthrough: bool) -> Self {
        self.prefer_passthrough = prefer_passthrough;
        self
    }

    /// Path of the root prim, e.g. `/Root`.
    pub fn root_path(&self) -> String {
        format!("/{}", self.root_name)
    }

    /// Step size when step sampling is active and usable.
    pub(crate) fn sample_step(&self) -> Option<f32> {
        match self.keyframes {
            KeyframeMode::Step if self.step > 0.0 => Some(self.step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExportOptions::default();
        assert_eq!(options.texture_format, TextureFormat::Keep);
        assert_eq!(options.keyframes, KeyframeMode::Native);
        assert_eq!(options.root_path(), "/Root");
        assert!(options.sample_step().is_none());
    }

    #[test]
    fn test_partial_json() {
        let options: ExportOptions =
            serde_json::from_str(r#"{ "texture_format": "jpeg", "keyframes": "step", "step": 5 }"#)
                .unwrap();
        assert_eq!(options.texture_format, TextureFormat::Jpeg);
        assert_eq!(options.sample_step(), Some(5.0));
        assert_eq!(options.max_texture_size, 4096);
    }

    #[test]
    fn test_zero_step_disables_sampling() {
        let options = ExportOptions::default().with_step_keyframes(0.0);
        assert!(options.sample_step().is_none());
    }
}
