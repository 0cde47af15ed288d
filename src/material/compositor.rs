//! Per-channel texture resolution: passthrough or bake.
//!
//! For one surface and one [`ChannelKind`] the compositor collects the mapping
//! layers that feed the channel. A single unmodified layer backed by an image
//! file is passed through as is; anything else is composited into a new image
//! against the surface's constant value for the channel. Results are
//! deduplicated through the context's [`BakeCache`](super::BakeCache).

use super::blend::{self, Canvas};
use super::cache::{BakeKey, BakeSource, PassthroughKey};
use super::{BakedImage, ChannelKind, ChannelMode, TextureBinding, TextureTransform};
use crate::config::TextureFormat;
use crate::error::ExportWarning;
use crate::naming::NameKind;
use crate::scene::ExportContext;
use crate::source::{
    AlphaUsage, ChannelMix, LayerKind, MappingLayer, Projection, SourceBitmap,
    SourceScene, SurfaceDescription,
};
use crate::types::BitmapId;
use glam::{Vec3, Vec4, Vec4Swizzles};
use image::RgbaImage;

/// Weights and multipliers closer to one than this count as one.
const UNIT_EPSILON: f32 = 1e-3;

/// The texture chosen for one material channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResolution {
    pub binding: TextureBinding,
    /// Source bitmap when the channel passes an existing file through.
    pub passthrough: Option<BitmapId>,
    /// The image carries meaningful diffuse alpha.
    pub preserves_alpha: bool,
}

/// A qualifying layer with everything needed to composite it.
struct Contribution<'s> {
    layer: &'s MappingLayer,
    bitmap: &'s SourceBitmap,
    image: &'s RgbaImage,
    matte: Option<&'s RgbaImage>,
    transform: TextureTransform,
    /// The layer's alpha is data rather than coverage.
    alpha_is_data: bool,
}

/// Resolves material channels of surfaces in one scene.
pub struct TextureCompositor<'s> {
    scene: &'s SourceScene,
}

impl<'s> TextureCompositor<'s> {
    pub fn new(scene: &'s SourceScene) -> Self {
        Self { scene }
    }

    /// Resolve `channel` of `surface`. Returns `None` when no layer
    /// contributes, in which case the material keeps its constant value.
    pub fn resolve_channel(
        &self,
        ctx: &mut ExportContext,
        surface: &'s SurfaceDescription,
        channel: ChannelKind,
    ) -> Option<ChannelResolution> {
        let contributions = self.contributions(ctx, surface, channel);
        if contributions.is_empty() {
            return None;
        }

        if let Some(mode) = passthrough_mode(ctx, surface, channel, &contributions) {
            return Some(self.passthrough(ctx, channel, &contributions[0], mode));
        }
        Some(self.bake(ctx, surface, channel, &contributions))
    }

    /// Qualifying layers of `channel`, in stacking order, each paired with
    /// the matte layer directly before it.
    fn contributions(
        &self,
        ctx: &mut ExportContext,
        surface: &'s SurfaceDescription,
        channel: ChannelKind,
    ) -> Vec<Contribution<'s>> {
        let mut out = Vec::new();
        let mut pending_matte: Option<(BitmapId, &'s RgbaImage)> = None;

        for layer in &surface.layers {
            if !is_relevant(layer, channel)
                || layer.projection != Projection::Uv
                || layer.weight.abs() <= f32::EPSILON
            {
                continue;
            }
            let Some(bitmap_id) = layer.image else {
                continue;
            };
            let Some(bitmap) = self.scene.bitmap(bitmap_id) else {
                ctx.warn(ExportWarning::MissingBitmap {
                    name: format!("#{}", bitmap_id.0),
                });
                continue;
            };
            let Some(image) = bitmap.image.as_ref() else {
                ctx.warn(ExportWarning::MissingBitmap {
                    name: bitmap.name.clone(),
                });
                continue;
            };

            if layer.matte {
                pending_matte = Some((bitmap.id, image));
                continue;
            }

            let matte = pending_matte.take();
            let (transform, alpha_is_data) =
                layer_transform(layer, channel, ctx.options.grayscale, matte.map(|m| m.0));
            out.push(Contribution {
                layer,
                bitmap,
                image,
                matte: matte.map(|m| m.1),
                transform,
                alpha_is_data,
            });
        }
        out
    }

    fn passthrough(
        &self,
        ctx: &mut ExportContext,
        channel: ChannelKind,
        contribution: &Contribution<'s>,
        mode: ChannelMode,
    ) -> ChannelResolution {
        let bitmap = contribution.bitmap;
        let layer = contribution.layer;
        let preserves_alpha = channel == ChannelKind::Diffuse && layer.alpha != AlphaUsage::None;

        let key = PassthroughKey {
            bitmap: bitmap.id,
            channel: mode,
            occlusion: layer.occlusion,
        };
        let image = match ctx.bake_cache.get_passthrough(&key) {
            Some(index) => index,
            None => {
                let extension = match ctx.options.texture_format {
                    _ if preserves_alpha => "png".to_string(),
                    TextureFormat::Keep => bitmap.extension().unwrap_or_else(|| "png".to_string()),
                    TextureFormat::Png => "png".to_string(),
                    TextureFormat::Jpeg => "jpg".to_string(),
                };
                let file_name = ctx.names.allocate(
                    &format!("{}.{}", file_stem(bitmap), extension),
                    NameKind::Texture,
                    true,
                );
                let (width, height) = contribution.image.dimensions();
                tracing::debug!("Passing through {} as {}", bitmap.name, file_name);
                let index = ctx.push_image(BakedImage {
                    file_name,
                    source: Some(bitmap.id),
                    pixels: None,
                    width,
                    height,
                    channel: mode,
                    channel_kind: channel,
                    transforms: vec![contribution.transform.clone()],
                    occlusion: layer.occlusion,
                });
                ctx.bake_cache.insert_passthrough(key, index);
                index
            }
        };

        ChannelResolution {
            binding: TextureBinding {
                image,
                channel: mode,
                uv_set: layer.uv_set,
                repeat: layer.repeat,
                wrap: layer.wrap,
            },
            passthrough: Some(bitmap.id),
            preserves_alpha,
        }
    }

    fn bake(
        &self,
        ctx: &mut ExportContext,
        surface: &SurfaceDescription,
        channel: ChannelKind,
        contributions: &[Contribution<'s>],
    ) -> ChannelResolution {
        let first = contributions[0].layer;

        // Repeats stay on the binding only when every layer agrees on them.
        let keep_repeat = ctx.options.bake_without_transform
            && contributions.iter().all(|c| c.layer.repeat == first.repeat);
        let mut transforms: Vec<TextureTransform> = Vec::with_capacity(contributions.len());
        for c in contributions {
            let mut transform = c.transform.clone();
            transform.repeat = if keep_repeat { [1, 1] } else { c.layer.repeat };
            transforms.push(transform);
        }

        let (width, height) = bake_size(contributions, &transforms, ctx.options.max_texture_size);
        let mode = if channel.is_color() {
            ChannelMode::Rgb
        } else {
            ChannelMode::R
        };
        let preserves_alpha = channel == ChannelKind::Diffuse
            && contributions.iter().any(|c| c.layer.alpha != AlphaUsage::None);
        let base = base_value(surface, channel);
        let multiplier = channel_multiplier(surface, channel);

        let key = BakeKey {
            source: BakeSource::Layers(
                contributions
                    .iter()
                    .zip(&transforms)
                    .map(|(c, t)| (c.bitmap.id, t.clone()))
                    .collect(),
            ),
            channel: mode,
            occlusion: channel == ChannelKind::Occlusion,
            base: base.to_array(),
            multiplier,
            preserve_alpha: preserves_alpha,
            size: (width, height),
        };

        let binding = |image: usize| TextureBinding {
            image,
            channel: mode,
            uv_set: first.uv_set,
            repeat: if keep_repeat { first.repeat } else { [1, 1] },
            wrap: first.wrap,
        };

        if let Some(image) = ctx.bake_cache.get(&key) {
            tracing::debug!("Reusing baked image {} for {:?}", ctx.images[image].file_name, channel);
            return ChannelResolution {
                binding: binding(image),
                passthrough: None,
                preserves_alpha,
            };
        }

        let mut canvas = Canvas::filled(width, height, base);
        for (c, transform) in contributions.iter().zip(&transforms) {
            composite_layer(&mut canvas, c, transform, channel, preserves_alpha);
        }
        finish_channel(&mut canvas, surface, channel, preserves_alpha);

        let extension = if preserves_alpha {
            "png".to_string()
        } else {
            match ctx.options.texture_format {
                TextureFormat::Png => "png".to_string(),
                TextureFormat::Jpeg => "jpg".to_string(),
                TextureFormat::Keep => contributions[0]
                    .bitmap
                    .extension()
                    .filter(|e| matches!(e.as_str(), "png" | "jpg" | "jpeg"))
                    .unwrap_or_else(|| "png".to_string()),
            }
        };
        let file_name = ctx.names.allocate(
            &format!(
                "{}_{}.{}",
                file_stem(contributions[0].bitmap),
                channel.suffix(),
                extension
            ),
            NameKind::Texture,
            true,
        );
        tracing::debug!(
            "Baked {} layer(s) into {} ({}x{})",
            contributions.len(),
            file_name,
            width,
            height
        );

        let index = ctx.push_image(BakedImage {
            file_name,
            source: None,
            pixels: Some(canvas.to_rgba8()),
            width,
            height,
            channel: mode,
            channel_kind: channel,
            transforms,
            occlusion: channel == ChannelKind::Occlusion,
        });
        ctx.bake_cache.insert(key, index);

        ChannelResolution {
            binding: binding(index),
            passthrough: None,
            preserves_alpha,
        }
    }
}

/// Whether a layer feeds `channel`. Occlusion-tagged layers feed only the
/// occlusion channel.
fn is_relevant(layer: &MappingLayer, channel: ChannelKind) -> bool {
    if layer.occlusion {
        return channel == ChannelKind::Occlusion;
    }
    match channel {
        ChannelKind::Diffuse => layer.kind == LayerKind::Diffuse,
        ChannelKind::Normal => layer.kind == LayerKind::Normal,
        ChannelKind::Metallic => layer.kind == LayerKind::Reflection,
        ChannelKind::Roughness => layer.kind == LayerKind::Roughness,
        ChannelKind::Emissive => layer.kind == LayerKind::Glow,
        ChannelKind::Occlusion => false,
        ChannelKind::Opacity => match layer.kind {
            LayerKind::Transparency | LayerKind::Opacity => true,
            LayerKind::Diffuse => layer.alpha == AlphaUsage::Transparent,
            _ => false,
        },
    }
}

/// Scalar channels read one value per texel: an explicit single channel, or
/// gray/red for RGB layers.
fn scalar_mix(mix: ChannelMix, grayscale: bool) -> ChannelMix {
    match mix {
        ChannelMix::Rgb if grayscale => ChannelMix::Gray,
        ChannelMix::Rgb => ChannelMix::Red,
        other => other,
    }
}

fn layer_transform(
    layer: &MappingLayer,
    channel: ChannelKind,
    grayscale: bool,
    matte: Option<BitmapId>,
) -> (TextureTransform, bool) {
    let mut transform = TextureTransform {
        invert: layer.invert,
        weight: layer.weight.clamp(0.0, 1.0),
        normal_map: channel == ChannelKind::Normal,
        flip_horizontal: layer.flip_horizontal,
        flip_vertical: layer.flip_vertical,
        rotate_90: layer.rotate_90,
        repeat: layer.repeat,
        blend: layer.blend,
        channel: layer.channel,
        matte,
        ..TextureTransform::default()
    };

    if !channel.is_color() {
        transform.channel = scalar_mix(layer.channel, grayscale);
        transform.grayscale = transform.channel == ChannelMix::Gray && layer.channel == ChannelMix::Rgb;
    }

    let mut alpha_is_data = layer.alpha != AlphaUsage::None;
    if channel == ChannelKind::Opacity {
        match layer.kind {
            LayerKind::Diffuse => {
                transform.channel = ChannelMix::Alpha;
                transform.grayscale = false;
            }
            LayerKind::Transparency => {
                transform.multiply = [-1.0, -1.0, -1.0, 1.0];
                transform.offset = [1.0, 1.0, 1.0, 0.0];
            }
            _ => {}
        }
        alpha_is_data = true;
    }
    if transform.channel == ChannelMix::Alpha {
        alpha_is_data = true;
    }
    (transform, alpha_is_data)
}

/// The binding mode that can read the single contribution unmodified, if the
/// channel may be passed through at all.
fn passthrough_mode(
    ctx: &ExportContext,
    surface: &SurfaceDescription,
    channel: ChannelKind,
    contributions: &[Contribution<'_>],
) -> Option<ChannelMode> {
    let options = &ctx.options;
    if !options.prefer_passthrough || channel == ChannelKind::Opacity {
        return None;
    }
    let [c] = contributions else {
        return None;
    };
    let layer = c.layer;

    // Channel selection and repeats are carried by the binding.
    let untouched = TextureTransform {
        weight: 1.0,
        channel: ChannelMix::Rgb,
        grayscale: false,
        repeat: [1, 1],
        ..c.transform.clone()
    }
    .is_identity();
    let eligible = c.bitmap.is_file_backed()
        && untouched
        && (layer.weight - 1.0).abs() <= UNIT_EPSILON
        && (!layer.repeats() || options.bake_without_transform)
        && c.image.width().max(c.image.height()) <= options.max_texture_size
        && (channel_multiplier(surface, channel) - 1.0).abs() <= UNIT_EPSILON;
    if !eligible {
        return None;
    }

    match (channel.is_color(), layer.channel) {
        (true, ChannelMix::Rgb) => Some(ChannelMode::Rgb),
        (true, _) => None,
        (false, ChannelMix::Rgb) if options.grayscale => None,
        (false, ChannelMix::Rgb) => Some(ChannelMode::R),
        (false, mix) => ChannelMode::from_mix(mix),
    }
}

/// Constant the first layer is blended against.
fn base_value(surface: &SurfaceDescription, channel: ChannelKind) -> Vec4 {
    let rgb = match channel {
        ChannelKind::Diffuse => Vec3::from(surface.diffuse_color),
        ChannelKind::Emissive => Vec3::from(surface.emissive_color),
        ChannelKind::Metallic => Vec3::ZERO,
        ChannelKind::Roughness => Vec3::splat(surface.roughness),
        ChannelKind::Normal => Vec3::new(0.5, 0.5, 1.0),
        ChannelKind::Occlusion => Vec3::ONE,
        ChannelKind::Opacity => Vec3::splat(1.0 - surface.transparency),
    };
    rgb.clamp(Vec3::ZERO, Vec3::ONE).extend(1.0)
}

/// Surface scalar applied to the composited channel.
fn channel_multiplier(surface: &SurfaceDescription, channel: ChannelKind) -> f32 {
    match channel {
        ChannelKind::Diffuse => surface.diffuse_intensity,
        ChannelKind::Emissive => surface.emissive_intensity,
        ChannelKind::Metallic => surface.reflection,
        ChannelKind::Normal => surface.normal_strength,
        _ => 1.0,
    }
}

/// Largest layer (after tiling and rotation), fitted into the size cap.
fn bake_size(contributions: &[Contribution<'_>], transforms: &[TextureTransform], max_size: u32) -> (u32, u32) {
    let mut width = 1;
    let mut height = 1;
    for (c, t) in contributions.iter().zip(transforms) {
        let (mut w, mut h) = c.image.dimensions();
        if t.rotate_90 {
            std::mem::swap(&mut w, &mut h);
        }
        width = width.max(w.saturating_mul(t.repeat[0].max(1)));
        height = height.max(h.saturating_mul(t.repeat[1].max(1)));
        if let Some(matte) = c.matte {
            width = width.max(matte.width());
            height = height.max(matte.height());
        }
    }
    blend::fit_size(width, height, max_size.max(1))
}

fn composite_layer(
    canvas: &mut Canvas,
    contribution: &Contribution<'_>,
    transform: &TextureTransform,
    channel: ChannelKind,
    preserves_alpha: bool,
) {
    let oriented = blend::orient(contribution.image, transform);
    let layer = blend::resample(&oriented, canvas.width, canvas.height, transform.repeat);
    let matte = contribution
        .matte
        .map(|m| blend::resample(m, canvas.width, canvas.height, [1, 1]));
    let carries_alpha = preserves_alpha && contribution.layer.alpha != AlphaUsage::None;

    for (i, acc) in canvas.pixels.iter_mut().enumerate() {
        let texel = layer.pixels[i];
        let matte_value = matte
            .as_ref()
            .map(|m| blend::luminance(m.pixels[i].xyz()))
            .unwrap_or(1.0);
        let weight = transform.weight * matte_value;
        let coverage = if contribution.alpha_is_data { 1.0 } else { texel.w };
        let value = blend::apply_color(texel, transform);

        let mut next = if channel == ChannelKind::Normal {
            blend::blend_normal(*acc, value, weight * coverage)
        } else {
            blend::blend(*acc, value, transform.blend, weight * coverage)
        };
        if carries_alpha {
            next.w = acc.w + (texel.w - acc.w) * weight;
        }
        *acc = next;
    }
}

/// Apply the surface's channel multiplier and settle the alpha channel.
fn finish_channel(canvas: &mut Canvas, surface: &SurfaceDescription, channel: ChannelKind, preserves_alpha: bool) {
    let multiplier = channel_multiplier(surface, channel);
    canvas.map(|p| {
        let p = match channel {
            ChannelKind::Normal => blend::scale_normal(p, multiplier),
            ChannelKind::Diffuse | ChannelKind::Emissive | ChannelKind::Metallic => {
                let rgb = (p.xyz() * multiplier).clamp(Vec3::ZERO, Vec3::ONE);
                rgb.extend(p.w)
            }
            _ => p,
        };
        if preserves_alpha {
            p
        } else {
            Vec4::new(p.x, p.y, p.z, 1.0)
        }
    });
}

/// File stem of images derived from `bitmap`.
fn file_stem(bitmap: &SourceBitmap) -> &str {
    if !bitmap.name.is_empty() && bitmap.name.is_ascii() {
        &bitmap.name
    } else {
        "texture"
    }
}
