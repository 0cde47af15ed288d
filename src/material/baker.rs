//! Surface description to metallic-roughness material conversion.

use super::blend::{self, Canvas};
use super::cache::{BakeKey, BakeSource};
use super::compositor::TextureCompositor;
use super::{AlphaMode, BakedImage, ChannelKind, ChannelMode, MaterialDescriptor, TextureBinding};
use crate::config::TextureFormat;
use crate::naming::NameKind;
use crate::scene::ExportContext;
use crate::source::{AlphaUsage, LayerKind, SourceScene, SurfaceDescription};
use glam::{Vec4, Vec4Swizzles};
use image::RgbaImage;
use std::collections::BTreeMap;

/// Bakes surfaces into [`MaterialDescriptor`]s, once per surface identity.
pub struct MaterialBaker<'s> {
    scene: &'s SourceScene,
    compositor: TextureCompositor<'s>,
}

impl<'s> MaterialBaker<'s> {
    pub fn new(scene: &'s SourceScene) -> Self {
        Self {
            scene,
            compositor: TextureCompositor::new(scene),
        }
    }

    /// Bake `surface` and return its index in the context's material list.
    ///
    /// A surface that was baked before only has its reference count raised.
    pub fn bake(&self, ctx: &mut ExportContext, surface: &'s SurfaceDescription) -> usize {
        if let Some(index) = ctx.material_for(surface.id) {
            ctx.materials[index].ref_count += 1;
            return index;
        }

        let mut textures = BTreeMap::new();
        let mut diffuse_alpha = false;
        for channel in ChannelKind::ALL {
            if let Some(resolved) = self.compositor.resolve_channel(ctx, surface, channel) {
                if channel == ChannelKind::Diffuse {
                    diffuse_alpha = resolved.preserves_alpha;
                }
                textures.insert(channel, resolved.binding);
            }
        }

        self.remap_shading(ctx, surface, &mut textures, diffuse_alpha);

        let uses_trim = surface
            .layers
            .iter()
            .any(|l| l.kind == LayerKind::Diffuse && l.alpha == AlphaUsage::Trim && !l.occlusion);
        let alpha_mode = if uses_trim {
            AlphaMode::Mask {
                cutoff: ctx.options.alpha_cutoff,
            }
        } else {
            AlphaMode::Opaque
        };

        let base_name = if surface.name.is_empty() {
            NameKind::Material.fallback()
        } else {
            surface.name.as_str()
        };
        let name = ctx.names.allocate(
            &format!("{}/Materials/{}", ctx.options.root_path(), base_name),
            NameKind::Material,
            false,
        );

        let mut material = MaterialDescriptor {
            name,
            surface: surface.id,
            diffuse: scale(surface.diffuse_color, surface.diffuse_intensity),
            emissive: scale(surface.emissive_color, surface.emissive_intensity),
            roughness: surface.roughness,
            metallic: surface.reflection,
            ior: surface.refraction_index,
            opacity: 1.0 - surface.transparency,
            textures,
            use_diffuse_alpha: diffuse_alpha,
            double_sided: surface.double_sided,
            unlit: false,
            alpha_mode,
            ref_count: 1,
        };
        if surface.no_shading {
            apply_unlit(&mut material);
        }

        tracing::debug!(
            "Baked material {} with {} texture(s)",
            material.name,
            material.textures.len()
        );
        ctx.register_material(material)
    }

    /// Convert a textured diffuse and reflection pair into a base color and a
    /// metallic texture. Both images must have the same size.
    fn remap_shading(
        &self,
        ctx: &mut ExportContext,
        surface: &SurfaceDescription,
        textures: &mut BTreeMap<ChannelKind, TextureBinding>,
        preserve_alpha: bool,
    ) {
        let (Some(diffuse), Some(metallic)) = (
            textures.get(&ChannelKind::Diffuse).cloned(),
            textures.get(&ChannelKind::Metallic).cloned(),
        ) else {
            return;
        };

        let (Some(diffuse_pixels), Some(reflection_pixels)) =
            (self.pixels(ctx, diffuse.image), self.pixels(ctx, metallic.image))
        else {
            return;
        };
        if diffuse_pixels.dimensions() != reflection_pixels.dimensions() {
            tracing::debug!(
                "Skipping shading remap of {}: diffuse and reflection sizes differ",
                surface.name
            );
            return;
        }

        let (width, height) = diffuse_pixels.dimensions();
        let key = |output: ChannelKind| BakeKey {
            source: BakeSource::ShadeRemap {
                diffuse: diffuse.image,
                reflection: metallic.image,
                diffuse_intensity: surface.diffuse_intensity,
                output,
            },
            channel: if output == ChannelKind::Diffuse {
                ChannelMode::Rgb
            } else {
                ChannelMode::R
            },
            occlusion: false,
            base: [0.0; 4],
            multiplier: 1.0,
            preserve_alpha: output == ChannelKind::Diffuse && preserve_alpha,
            size: (width, height),
        };

        let cached = (
            ctx.bake_cache.get(&key(ChannelKind::Diffuse)),
            ctx.bake_cache.get(&key(ChannelKind::Metallic)),
        );
        let (base_index, metallic_index) = match cached {
            (Some(base), Some(metal)) => (base, metal),
            _ => {
                let (base, metal) = remap_pixels(
                    &diffuse_pixels,
                    &reflection_pixels,
                    metallic.channel,
                    surface.diffuse_intensity,
                    preserve_alpha,
                );
                let stem = file_stem(&ctx.images[diffuse.image].file_name).to_string();
                let base_index =
                    self.push_remapped(ctx, &stem, "basecolor", base, ChannelKind::Diffuse, preserve_alpha);
                let metallic_index =
                    self.push_remapped(ctx, &stem, "metallic", metal, ChannelKind::Metallic, false);
                ctx.bake_cache.insert(key(ChannelKind::Diffuse), base_index);
                ctx.bake_cache.insert(key(ChannelKind::Metallic), metallic_index);
                (base_index, metallic_index)
            }
        };

        textures.insert(
            ChannelKind::Diffuse,
            TextureBinding {
                image: base_index,
                channel: ChannelMode::Rgb,
                ..diffuse
            },
        );
        textures.insert(
            ChannelKind::Metallic,
            TextureBinding {
                image: metallic_index,
                channel: ChannelMode::R,
                ..metallic
            },
        );
    }

    /// Pixels behind an image: synthesized pixels or the source bitmap.
    fn pixels(&self, ctx: &ExportContext, image: usize) -> Option<RgbaImage> {
        let baked = ctx.images.get(image)?;
        match (&baked.pixels, baked.source) {
            (Some(pixels), _) => Some(pixels.clone()),
            (None, Some(bitmap)) => self.scene.bitmap(bitmap)?.image.clone(),
            (None, None) => None,
        }
    }

    fn push_remapped(
        &self,
        ctx: &mut ExportContext,
        stem: &str,
        suffix: &str,
        pixels: RgbaImage,
        channel: ChannelKind,
        preserve_alpha: bool,
    ) -> usize {
        let extension = match ctx.options.texture_format {
            TextureFormat::Jpeg if !preserve_alpha => "jpg",
            _ => "png",
        };
        let file_name = ctx.names.allocate(
            &format!("{}_{}.{}", stem, suffix, extension),
            NameKind::Texture,
            true,
        );
        let (width, height) = pixels.dimensions();
        ctx.push_image(BakedImage {
            file_name,
            source: None,
            pixels: Some(pixels),
            width,
            height,
            channel: if channel == ChannelKind::Diffuse {
                ChannelMode::Rgb
            } else {
                ChannelMode::R
            },
            channel_kind: channel,
            transforms: Vec::new(),
            occlusion: false,
        })
    }
}

/// Per-pixel shading remap. Returns the base color and metallic images.
fn remap_pixels(
    diffuse: &RgbaImage,
    reflection: &RgbaImage,
    reflection_mode: ChannelMode,
    diffuse_intensity: f32,
    preserve_alpha: bool,
) -> (RgbaImage, RgbaImage) {
    let diffuse = Canvas::from_rgba8(diffuse);
    let reflection = Canvas::from_rgba8(reflection);
    let mut base = Canvas::filled(diffuse.width, diffuse.height, Vec4::ONE);
    let mut metal = base.clone();

    for (i, (d, r)) in diffuse.pixels.iter().zip(&reflection.pixels).enumerate() {
        let refl = match reflection_mode {
            ChannelMode::Rgb | ChannelMode::R => r.x,
            ChannelMode::G => r.y,
            ChannelMode::B => r.z,
            ChannelMode::A => r.w,
        };
        let (color, metallic) = blend::shade_remap(d.xyz(), refl, diffuse_intensity);
        base.pixels[i] = color.extend(if preserve_alpha { d.w } else { 1.0 });
        metal.pixels[i] = Vec4::new(metallic, metallic, metallic, 1.0);
    }
    (base.to_rgba8(), metal.to_rgba8())
}

/// Unlit surfaces: the diffuse color becomes emission and shading inputs are
/// neutralized.
fn apply_unlit(material: &mut MaterialDescriptor) {
    material.unlit = true;
    material.roughness = 1.0;
    material.metallic = 1.0;
    material.ior = 1.0;
    material.emissive = material.diffuse;
    material.diffuse = [0.0; 3];

    material.textures.remove(&ChannelKind::Emissive);
    if let Some(diffuse) = material.textures.remove(&ChannelKind::Diffuse) {
        material.textures.insert(ChannelKind::Emissive, diffuse);
    }
    for channel in [ChannelKind::Normal, ChannelKind::Metallic, ChannelKind::Roughness] {
        material.textures.remove(&channel);
    }
}

fn scale(color: [f32; 3], intensity: f32) -> [f32; 3] {
    color.map(|c| c * intensity)
}

fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}
