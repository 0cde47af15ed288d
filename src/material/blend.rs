//! Pixel operations for texture compositing.
//!
//! Layers are composited in floating point on a [`Canvas`] and quantized to
//! RGBA8 once at the end.

use super::TextureTransform;
use crate::source::{BlendMode, ChannelMix};
use glam::{Vec3, Vec4, Vec4Swizzles};
use image::{imageops, Rgba, RgbaImage};

/// A floating point RGBA image with components in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl Canvas {
    /// A canvas filled with one value.
    pub fn filled(width: u32, height: u32, value: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_rgba8(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().map(|p| unpack(*p)).collect(),
        }
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(&self.pixels) {
            *dst = pack(*src);
        }
        out
    }

    pub fn map(&mut self, mut f: impl FnMut(Vec4) -> Vec4) {
        for p in &mut self.pixels {
            *p = f(*p);
        }
    }
}

fn unpack(p: Rgba<u8>) -> Vec4 {
    Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
}

fn pack(v: Vec4) -> Rgba<u8> {
    let v = (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    Rgba([v.x as u8, v.y as u8, v.z as u8, v.w as u8])
}

/// Fit `(width, height)` inside `max_size`, preserving the aspect ratio.
pub fn fit_size(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let largest = width.max(height);
    if largest <= max_size || largest == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = max_size as f32 / largest as f32;
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

/// Apply the geometric part of a transform to the source image.
pub fn orient(image: &RgbaImage, transform: &TextureTransform) -> RgbaImage {
    let mut out = if transform.rotate_90 {
        imageops::rotate90(image)
    } else {
        image.clone()
    };
    if transform.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut out);
    }
    if transform.flip_vertical {
        imageops::flip_vertical_in_place(&mut out);
    }
    out
}

/// Nearest-neighbor resample of `image` to `width x height`, tiling it
/// `repeat[0] x repeat[1]` times.
pub fn resample(image: &RgbaImage, width: u32, height: u32, repeat: [u32; 2]) -> Canvas {
    let (sw, sh) = image.dimensions();
    let mut canvas = Canvas::filled(width, height, Vec4::ZERO);
    if sw == 0 || sh == 0 {
        return canvas;
    }

    let ru = repeat[0].max(1) as u64;
    let rv = repeat[1].max(1) as u64;
    for y in 0..height {
        let sy = ((y as u64 * rv * sh as u64) / height as u64) % sh as u64;
        for x in 0..width {
            let sx = ((x as u64 * ru * sw as u64) / width as u64) % sw as u64;
            canvas.pixels[(y * width + x) as usize] = unpack(*image.get_pixel(sx as u32, sy as u32));
        }
    }
    canvas
}

/// Rec.601 luma.
pub fn luminance(rgb: Vec3) -> f32 {
    0.299 * rgb.x + 0.587 * rgb.y + 0.114 * rgb.z
}

/// Select the texel part named by `mix`, broadcast to RGB. Alpha is kept.
pub fn select_channel(texel: Vec4, mix: ChannelMix) -> Vec4 {
    let value = match mix {
        ChannelMix::Rgb => return texel,
        ChannelMix::Red => texel.x,
        ChannelMix::Green => texel.y,
        ChannelMix::Blue => texel.z,
        ChannelMix::Alpha => texel.w,
        ChannelMix::Gray => luminance(texel.xyz()),
    };
    Vec4::new(value, value, value, texel.w)
}

/// Apply inversion, channel selection and the multiply/offset of a transform
/// to one texel.
pub fn apply_color(texel: Vec4, transform: &TextureTransform) -> Vec4 {
    let mut t = texel;
    if transform.invert {
        t = Vec4::new(1.0 - t.x, 1.0 - t.y, 1.0 - t.z, t.w);
    }
    t = select_channel(t, transform.channel);
    t = t * Vec4::from(transform.multiply) + Vec4::from(transform.offset);
    t.clamp(Vec4::ZERO, Vec4::ONE)
}

/// Blend a layer texel over the accumulated value. Only RGB is blended.
pub fn blend(acc: Vec4, texel: Vec4, mode: BlendMode, factor: f32) -> Vec4 {
    let a = acc.xyz();
    let t = texel.xyz();
    let f = factor.clamp(0.0, 1.0);
    let rgb = match mode {
        BlendMode::Normal => a.lerp(t, f),
        BlendMode::Multiply => a.lerp(a * t, f),
        BlendMode::MultiplyBright => a.lerp((a * t * 2.0).min(Vec3::ONE), f),
        BlendMode::Add => a + t * f,
        BlendMode::Subtract => a - t * f,
        BlendMode::Min => a.lerp(a.min(t), f),
        BlendMode::Max => a.lerp(a.max(t), f),
    };
    rgb.clamp(Vec3::ZERO, Vec3::ONE).extend(acc.w)
}

/// Decode an RGB-encoded tangent-space normal.
pub fn decode_normal(rgb: Vec3) -> Vec3 {
    rgb * 2.0 - Vec3::ONE
}

pub fn encode_normal(n: Vec3) -> Vec3 {
    (n.normalize_or_zero() + Vec3::ONE) * 0.5
}

/// Blend normal maps as vectors; the blend mode is ignored.
pub fn blend_normal(acc: Vec4, texel: Vec4, factor: f32) -> Vec4 {
    let a = decode_normal(acc.xyz());
    let t = decode_normal(texel.xyz());
    let n = a.lerp(t, factor.clamp(0.0, 1.0));
    let n = if n.length_squared() > 0.0 { n } else { Vec3::Z };
    encode_normal(n).extend(acc.w)
}

/// Scale the tangent-plane part of an encoded normal.
pub fn scale_normal(texel: Vec4, strength: f32) -> Vec4 {
    let n = decode_normal(texel.xyz());
    let n = Vec3::new(n.x * strength, n.y * strength, n.z);
    let n = if n.length_squared() > 0.0 { n } else { Vec3::Z };
    encode_normal(n).extend(texel.w)
}

/// RGB to hue (degrees), saturation, value.
pub fn rgb_to_hsv(rgb: Vec3) -> Vec3 {
    let max = rgb.max_element();
    let min = rgb.min_element();
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == rgb.x {
        60.0 * ((rgb.y - rgb.z) / delta).rem_euclid(6.0)
    } else if max == rgb.y {
        60.0 * ((rgb.z - rgb.x) / delta + 2.0)
    } else {
        60.0 * ((rgb.x - rgb.y) / delta + 4.0)
    };
    let saturation = if max <= 0.0 { 0.0 } else { delta / max };
    Vec3::new(hue, saturation, max)
}

pub fn hsv_to_rgb(hsv: Vec3) -> Vec3 {
    let (h, s, v) = (hsv.x.rem_euclid(360.0), hsv.y, hsv.z);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Vec3::new(r + m, g + m, b + m)
}

/// Shade-style diffuse and reflection texels to a metallic-roughness base
/// color and metallic value.
///
/// `refl` is the reflection texel, `diffuse_intensity` the surface's diffuse
/// intensity. Hue is kept.
pub fn shade_remap(diffuse: Vec3, refl: f32, diffuse_intensity: f32) -> (Vec3, f32) {
    let lum = luminance(diffuse);
    let metallic = (refl / (lum * 0.7 + 0.3)).clamp(0.0, 1.0);
    let hsv = rgb_to_hsv(diffuse);
    let saturation = hsv.y * (1.0 - metallic * (1.0 - diffuse_intensity.clamp(0.0, 1.0)));
    let value = hsv.z * (1.0 - metallic) + hsv.z.max(refl) * metallic;
    (hsv_to_rgb(Vec3::new(hsv.x, saturation, value)), metallic)
}
