//! Surface descriptions in the host's layered shading model.

use crate::types::{BitmapId, SurfaceId};
use serde::{Deserialize, Serialize};

/// Which shading attribute a mapping layer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    #[default]
    Diffuse,
    Normal,
    Reflection,
    Roughness,
    Glow,
    Transparency,
    Opacity,
    #[serde(other)]
    Other,
}

/// How a layer is projected onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Uv,
    Planar,
    Cylindrical,
    Spherical,
    Box,
}

/// Layer blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Alpha blend over the layers below.
    #[default]
    Normal,
    Multiply,
    /// Multiply with a 2x gain, clamped.
    MultiplyBright,
    Add,
    Subtract,
    Min,
    Max,
}

/// Which part of a layer's texels is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMix {
    #[default]
    Rgb,
    Red,
    Green,
    Blue,
    Alpha,
    /// Rec.601 luminance broadcast to RGB.
    Gray,
}

/// Texture addressing outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
}

/// Meaning of the alpha channel of a diffuse layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaUsage {
    /// Alpha is ignored.
    #[default]
    None,
    /// Alpha is transparency: drives the opacity channel.
    Transparent,
    /// Alpha is a cutout mask.
    Trim,
}

/// One weighted contribution to a material channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingLayer {
    pub kind: LayerKind,
    /// Bitmap of an image pattern; `None` for procedural patterns.
    pub image: Option<BitmapId>,
    pub projection: Projection,
    /// UV set index (0 or 1).
    pub uv_set: u8,
    pub weight: f32,
    pub blend: BlendMode,
    pub invert: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub rotate_90: bool,
    pub channel: ChannelMix,
    /// Repeat counts along U and V.
    pub repeat: [u32; 2],
    pub wrap: WrapMode,
    pub alpha: AlphaUsage,
    /// Ambient-occlusion layer; only contributes to the occlusion channel.
    pub occlusion: bool,
    /// Weight mask for the next layer of the same kind instead of a color.
    pub matte: bool,
}

impl Default for MappingLayer {
    fn default() -> Self {
        Self {
            kind: LayerKind::Diffuse,
            image: None,
            projection: Projection::Uv,
            uv_set: 0,
            weight: 1.0,
            blend: BlendMode::Normal,
            invert: false,
            flip_horizontal: false,
            flip_vertical: false,
            rotate_90: false,
            channel: ChannelMix::Rgb,
            repeat: [1, 1],
            wrap: WrapMode::Repeat,
            alpha: AlphaUsage::None,
            occlusion: false,
            matte: false,
        }
    }
}

impl MappingLayer {
    /// A full-weight UV image layer.
    pub fn image(kind: LayerKind, bitmap: BitmapId) -> Self {
        Self {
            kind,
            image: Some(bitmap),
            ..Self::default()
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_channel(mut self, channel: ChannelMix) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_alpha(mut self, alpha: AlphaUsage) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_repeat(mut self, u: u32, v: u32) -> Self {
        self.repeat = [u.max(1), v.max(1)];
        self
    }

    pub fn repeats(&self) -> bool {
        self.repeat[0] > 1 || self.repeat[1] > 1
    }
}

/// A surface description in the host's layered shading model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceDescription {
    pub id: SurfaceId,
    pub name: String,
    pub diffuse_color: [f32; 3],
    pub diffuse_intensity: f32,
    pub emissive_color: [f32; 3],
    pub emissive_intensity: f32,
    /// Reflection intensity; becomes metallic.
    pub reflection: f32,
    pub roughness: f32,
    pub transparency: f32,
    pub refraction_index: f32,
    /// Bump / normal map strength.
    pub normal_strength: f32,
    pub double_sided: bool,
    /// Unlit ("no shading") surfaces.
    pub no_shading: bool,
    pub layers: Vec<MappingLayer>,
}

impl Default for SurfaceDescription {
    fn default() -> Self {
        Self {
            id: SurfaceId(0),
            name: String::new(),
            diffuse_color: [0.8, 0.8, 0.8],
            diffuse_intensity: 1.0,
            emissive_color: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            reflection: 0.0,
            roughness: 0.5,
            transparency: 0.0,
            refraction_index: 1.5,
            normal_strength: 1.0,
            double_sided: false,
            no_shading: false,
            layers: Vec::new(),
        }
    }
}

impl SurfaceDescription {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: SurfaceId(id),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: MappingLayer) -> Self {
        self.layers.push(layer);
        self
    }
}
