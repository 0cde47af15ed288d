//! Shared state of one export run.

use crate::config::ExportOptions;
use crate::error::ExportWarning;
use crate::material::{BakeCache, BakedImage, MaterialDescriptor};
use crate::naming::NameRegistry;
use crate::types::SurfaceId;
use std::collections::{HashMap, HashSet};

/// Registry, caches and output lists threaded through every component.
///
/// Allocation happens in traversal order, which keeps names and
/// deduplication stable from run to run.
#[derive(Debug, Default)]
pub struct ExportContext {
    pub options: ExportOptions,
    pub names: NameRegistry,
    pub bake_cache: BakeCache,
    pub images: Vec<BakedImage>,
    pub materials: Vec<MaterialDescriptor>,
    material_index: HashMap<SurfaceId, usize>,
    warnings: Vec<ExportWarning>,
    seen_warnings: HashSet<ExportWarning>,
}

impl ExportContext {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Record a warning; repeats of the same warning are dropped.
    pub fn warn(&mut self, warning: ExportWarning) {
        if self.seen_warnings.insert(warning.clone()) {
            tracing::debug!("{}", warning);
            self.warnings.push(warning);
        }
    }

    pub fn warnings(&self) -> &[ExportWarning] {
        &self.warnings
    }

    /// Material index previously baked for a surface.
    pub fn material_for(&self, surface: SurfaceId) -> Option<usize> {
        self.material_index.get(&surface).copied()
    }

    pub(crate) fn register_material(&mut self, material: MaterialDescriptor) -> usize {
        let index = self.materials.len();
        self.material_index.insert(material.surface, index);
        self.materials.push(material);
        index
    }

    /// Push a new image and return its index.
    pub(crate) fn push_image(&mut self, image: BakedImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Remove images no material binds, such as the inputs of a shading
    /// remap or textures dropped by the unlit override, and renumber the
    /// remaining bindings.
    ///
    /// Cached bakes refer to image positions, so the bake cache is cleared.
    /// Call this once every material has been baked.
    pub fn drop_unreferenced_images(&mut self) {
        let mut used = vec![false; self.images.len()];
        for material in &self.materials {
            for binding in material.textures.values() {
                if let Some(flag) = used.get_mut(binding.image) {
                    *flag = true;
                }
            }
        }
        if used.iter().all(|flag| *flag) {
            return;
        }

        let mut renumbered = Vec::with_capacity(self.images.len());
        let mut kept = Vec::new();
        for (image, used) in std::mem::take(&mut self.images).into_iter().zip(used) {
            if used {
                renumbered.push(Some(kept.len()));
                kept.push(image);
            } else {
                tracing::debug!("Dropping unreferenced image {}", image.file_name);
                renumbered.push(None);
            }
        }
        self.images = kept;

        for material in &mut self.materials {
            for binding in material.textures.values_mut() {
                if let Some(Some(index)) = renumbered.get(binding.image) {
                    binding.image = *index;
                }
            }
        }
        self.bake_cache = BakeCache::new();
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<ExportWarning> {
        self.seen_warnings.clear();
        std::mem::take(&mut self.warnings)
    }
}
