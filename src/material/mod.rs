//! Material and texture baking.
//!
//! Surfaces of the host's layered shading model are converted into
//! metallic-roughness [`MaterialDescriptor`]s. Each of the seven material
//! channels is resolved by the compositor to either a passthrough of an
//! existing bitmap or a synthesized [`BakedImage`].

pub mod baker;
pub mod blend;
pub mod cache;
pub mod compositor;

pub use baker::MaterialBaker;
pub use cache::{BakeCache, BakeKey, BakeSource, PassthroughKey};
pub use compositor::{ChannelResolution, TextureCompositor};

use crate::source::{BlendMode, ChannelMix, WrapMode};
use crate::types::{BitmapId, SurfaceId};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance for comparing numeric fields of a [`TextureTransform`].
pub const TRANSFORM_EPSILON: f32 = 1e-4;

/// The seven channels of an exported material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Diffuse,
    Normal,
    Metallic,
    Roughness,
    Emissive,
    Occlusion,
    Opacity,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 7] = [
        ChannelKind::Diffuse,
        ChannelKind::Normal,
        ChannelKind::Metallic,
        ChannelKind::Roughness,
        ChannelKind::Emissive,
        ChannelKind::Occlusion,
        ChannelKind::Opacity,
    ];

    /// Suffix for synthesized texture file names.
    pub fn suffix(self) -> &'static str {
        match self {
            ChannelKind::Diffuse => "diffuse",
            ChannelKind::Normal => "normal",
            ChannelKind::Metallic => "metallic",
            ChannelKind::Roughness => "roughness",
            ChannelKind::Emissive => "emissive",
            ChannelKind::Occlusion => "occlusion",
            ChannelKind::Opacity => "opacity",
        }
    }

    /// Channels stored as RGB; the others are single scalars.
    pub fn is_color(self) -> bool {
        matches!(
            self,
            ChannelKind::Diffuse | ChannelKind::Emissive | ChannelKind::Normal
        )
    }
}

/// Which part of a texture a binding reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    #[default]
    Rgb,
    R,
    G,
    B,
    A,
}

impl ChannelMode {
    /// The binding mode able to read a layer's channel mix without remixing.
    pub fn from_mix(mix: ChannelMix) -> Option<Self> {
        match mix {
            ChannelMix::Rgb => Some(ChannelMode::Rgb),
            ChannelMix::Red => Some(ChannelMode::R),
            ChannelMix::Green => Some(ChannelMode::G),
            ChannelMix::Blue => Some(ChannelMode::B),
            ChannelMix::Alpha => Some(ChannelMode::A),
            ChannelMix::Gray => None,
        }
    }
}

/// Everything that shaped one layer's contribution to a baked image.
///
/// Two transforms are the same when all numeric fields agree within
/// [`TRANSFORM_EPSILON`] and every flag is equal; see [`TextureTransform::matches`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureTransform {
    /// Per-channel multiply applied after channel selection.
    pub multiply: [f32; 4],
    /// Per-channel offset applied after the multiply.
    pub offset: [f32; 4],
    pub invert: bool,
    /// Blend weight in `[0, 1]`.
    pub weight: f32,
    pub grayscale: bool,
    pub normal_map: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub rotate_90: bool,
    /// Repeat counts tiled into the pixels (`[1, 1]` when kept on the binding).
    pub repeat: [u32; 2],
    pub blend: BlendMode,
    pub channel: ChannelMix,
    /// Matte bitmap scaling this layer's weight.
    pub matte: Option<BitmapId>,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            multiply: [1.0; 4],
            offset: [0.0; 4],
            invert: false,
            weight: 1.0,
            grayscale: false,
            normal_map: false,
            flip_horizontal: false,
            flip_vertical: false,
            rotate_90: false,
            repeat: [1, 1],
            blend: BlendMode::Normal,
            channel: ChannelMix::Rgb,
            matte: None,
        }
    }
}

impl TextureTransform {
    pub fn matches(&self, other: &TextureTransform) -> bool {
        let close = |a: f32, b: f32| (a - b).abs() <= TRANSFORM_EPSILON;
        self.multiply.iter().zip(&other.multiply).all(|(a, b)| close(*a, *b))
            && self.offset.iter().zip(&other.offset).all(|(a, b)| close(*a, *b))
            && close(self.weight, other.weight)
            && self.invert == other.invert
            && self.grayscale == other.grayscale
            && self.normal_map == other.normal_map
            && self.flip_horizontal == other.flip_horizontal
            && self.flip_vertical == other.flip_vertical
            && self.rotate_90 == other.rotate_90
            && self.repeat == other.repeat
            && self.blend == other.blend
            && self.channel == other.channel
            && self.matte == other.matte
    }

    /// Whether the transform leaves the source texels untouched.
    pub fn is_identity(&self) -> bool {
        self.matches(&TextureTransform {
            normal_map: self.normal_map,
            ..TextureTransform::default()
        })
    }
}

/// A texture attached to one material channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureBinding {
    /// Index into [`crate::ExportOutput::images`].
    pub image: usize,
    pub channel: ChannelMode,
    /// UV set index (0 or 1).
    pub uv_set: u8,
    pub repeat: [u32; 2],
    pub wrap: WrapMode,
}

/// An exported texture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakedImage {
    /// Unique file name, extension included.
    pub file_name: String,
    /// Source bitmap copied unmodified; `None` for synthesized images.
    pub source: Option<BitmapId>,
    /// Pixels of a synthesized image.
    #[serde(skip)]
    pub pixels: Option<RgbaImage>,
    pub width: u32,
    pub height: u32,
    /// Channel extraction the bindings of this image use.
    pub channel: ChannelMode,
    /// Channel the image was first produced for.
    pub channel_kind: ChannelKind,
    /// One transform per composited layer.
    pub transforms: Vec<TextureTransform>,
    pub occlusion: bool,
}

impl BakedImage {
    pub fn is_passthrough(&self) -> bool {
        self.source.is_some()
    }

    /// Extension of the file name, lowercased.
    pub fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("png")
    }
}

/// How the renderer treats the opacity channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask { cutoff: f32 },
}

/// An exported metallic-roughness material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    /// Unique prim path.
    pub name: String,
    /// Source surface the material was baked from.
    pub surface: SurfaceId,
    pub diffuse: [f32; 3],
    pub emissive: [f32; 3],
    pub roughness: f32,
    pub metallic: f32,
    pub ior: f32,
    pub opacity: f32,
    pub textures: BTreeMap<ChannelKind, TextureBinding>,
    pub use_diffuse_alpha: bool,
    pub double_sided: bool,
    pub unlit: bool,
    pub alpha_mode: AlphaMode,
    /// Number of times the material was requested.
    pub ref_count: u32,
}

impl MaterialDescriptor {
    pub fn texture(&self, channel: ChannelKind) -> Option<&TextureBinding> {
        self.textures.get(&channel)
    }

    pub fn has_textures(&self) -> bool {
        !self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_tolerance() {
        let a = TextureTransform::default();
        let b = TextureTransform {
            weight: 1.0 - 5e-5,
            ..TextureTransform::default()
        };
        assert!(a.matches(&b));
        assert!(a.is_identity());

        let c = TextureTransform {
            weight: 0.9,
            ..TextureTransform::default()
        };
        assert!(!a.matches(&c));

        let d = TextureTransform {
            invert: true,
            ..TextureTransform::default()
        };
        assert!(!a.matches(&d));
        assert!(!d.is_identity());
    }

    #[test]
    fn test_channel_mode_from_mix() {
        assert_eq!(ChannelMode::from_mix(ChannelMix::Green), Some(ChannelMode::G));
        assert_eq!(ChannelMode::from_mix(ChannelMix::Gray), None);
    }

    #[test]
    fn test_channel_kinds() {
        assert_eq!(ChannelKind::ALL.len(), 7);
        assert!(ChannelKind::Normal.is_color());
        assert!(!ChannelKind::Opacity.is_color());
    }
}
