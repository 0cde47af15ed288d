//! Deduplication of baked images.

use super::{ChannelKind, ChannelMode, TextureTransform, TRANSFORM_EPSILON};
use crate::types::BitmapId;
use std::collections::HashMap;

/// What a baked image was produced from.
#[derive(Debug, Clone, PartialEq)]
pub enum BakeSource {
    /// Composited layers in order, each with the transform it was applied with.
    Layers(Vec<(BitmapId, TextureTransform)>),
    /// Diffuse and reflection images remapped to base color or metallic.
    ShadeRemap {
        diffuse: usize,
        reflection: usize,
        diffuse_intensity: f32,
        output: ChannelKind,
    },
}

impl BakeSource {
    fn matches(&self, other: &BakeSource) -> bool {
        match (self, other) {
            (BakeSource::Layers(a), BakeSource::Layers(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ia, ta), (ib, tb))| ia == ib && ta.matches(tb))
            }
            (
                BakeSource::ShadeRemap {
                    diffuse: da,
                    reflection: ra,
                    diffuse_intensity: ia,
                    output: oa,
                },
                BakeSource::ShadeRemap {
                    diffuse: db,
                    reflection: rb,
                    diffuse_intensity: ib,
                    output: ob,
                },
            ) => da == db && ra == rb && oa == ob && (ia - ib).abs() <= TRANSFORM_EPSILON,
            _ => false,
        }
    }
}

/// Cache key of a synthesized image.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeKey {
    pub source: BakeSource,
    pub channel: ChannelMode,
    pub occlusion: bool,
    /// Constant the first layer was blended against.
    pub base: [f32; 4],
    /// Channel multiplier applied after compositing.
    pub multiplier: f32,
    pub preserve_alpha: bool,
    pub size: (u32, u32),
}

impl BakeKey {
    pub fn matches(&self, other: &BakeKey) -> bool {
        let close = |a: f32, b: f32| (a - b).abs() <= TRANSFORM_EPSILON;
        self.source.matches(&other.source)
            && self.channel == other.channel
            && self.occlusion == other.occlusion
            && self.base.iter().zip(&other.base).all(|(a, b)| close(*a, *b))
            && close(self.multiplier, other.multiplier)
            && self.preserve_alpha == other.preserve_alpha
            && self.size == other.size
    }
}

/// Cache key of a bitmap passed through unmodified. The same file bound with
/// a different channel mode or occlusion role gets its own image entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassthroughKey {
    pub bitmap: BitmapId,
    pub channel: ChannelMode,
    pub occlusion: bool,
}

/// Maps bake keys and passthrough bitmaps to indices in the image list.
///
/// Keys hold floating point values compared with a tolerance, so lookup is a
/// linear scan; a scene has at most a few hundred baked images.
#[derive(Debug, Default)]
pub struct BakeCache {
    baked: Vec<(BakeKey, usize)>,
    passthrough: HashMap<PassthroughKey, usize>,
}

impl BakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &BakeKey) -> Option<usize> {
        self.baked
            .iter()
            .find(|(k, _)| k.matches(key))
            .map(|(_, image)| *image)
    }

    pub fn insert(&mut self, key: BakeKey, image: usize) {
        self.baked.push((key, image));
    }

    pub fn get_passthrough(&self, key: &PassthroughKey) -> Option<usize> {
        self.passthrough.get(key).copied()
    }

    pub fn insert_passthrough(&mut self, key: PassthroughKey, image: usize) {
        self.passthrough.insert(key, image);
    }

    pub fn len(&self) -> usize {
        self.baked.len() + self.passthrough.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(weight: f32) -> BakeKey {
        BakeKey {
            source: BakeSource::Layers(vec![(
                BitmapId(1),
                TextureTransform {
                    weight,
                    ..TextureTransform::default()
                },
            )]),
            channel: ChannelMode::Rgb,
            occlusion: false,
            base: [0.8, 0.8, 0.8, 1.0],
            multiplier: 1.0,
            preserve_alpha: false,
            size: (64, 64),
        }
    }

    #[test]
    fn test_lookup_with_tolerance() {
        let mut cache = BakeCache::new();
        cache.insert(key(0.5), 3);

        assert_eq!(cache.get(&key(0.5 + 1e-5)), Some(3));
        assert_eq!(cache.get(&key(0.6)), None);

        let mut other = key(0.5);
        other.occlusion = true;
        assert_eq!(cache.get(&other), None);
    }

    #[test]
    fn test_shade_remap_keys() {
        let remap = |output| BakeKey {
            source: BakeSource::ShadeRemap {
                diffuse: 0,
                reflection: 1,
                diffuse_intensity: 1.0,
                output,
            },
            ..key(1.0)
        };
        let mut cache = BakeCache::new();
        cache.insert(remap(ChannelKind::Diffuse), 2);
        assert_eq!(cache.get(&remap(ChannelKind::Diffuse)), Some(2));
        assert_eq!(cache.get(&remap(ChannelKind::Metallic)), None);
        assert_eq!(cache.get(&key(1.0)), None);
    }

    #[test]
    fn test_passthrough() {
        let mut cache = BakeCache::new();
        assert!(cache.is_empty());
        let diffuse = PassthroughKey {
            bitmap: BitmapId(7),
            channel: ChannelMode::Rgb,
            occlusion: false,
        };
        cache.insert_passthrough(diffuse, 0);
        assert_eq!(cache.get_passthrough(&diffuse), Some(0));
        assert_eq!(
            cache.get_passthrough(&PassthroughKey {
                bitmap: BitmapId(8),
                ..diffuse
            }),
            None
        );
        assert_eq!(
            cache.get_passthrough(&PassthroughKey {
                channel: ChannelMode::R,
                occlusion: true,
                ..diffuse
            }),
            None
        );
    }
}
