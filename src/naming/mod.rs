//! Collision-free path and file name allocation.
//!
//! Every prim path and texture file name produced by an export run goes
//! through one [`NameRegistry`]. Allocation is append-only: once a name is
//! handed out it is never released, so names are stable for the given
//! traversal order.

use std::collections::HashSet;

/// What a name is allocated for. Selects the fallback word used when the
/// requested name cannot be represented in ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Mesh,
    Bone,
    Material,
    Texture,
    Node,
}

impl NameKind {
    /// The fixed replacement word for non-ASCII names.
    pub fn fallback(self) -> &'static str {
        match self {
            NameKind::Mesh => "mesh",
            NameKind::Bone => "bone",
            NameKind::Material => "material",
            NameKind::Texture => "texture",
            NameKind::Node => "node",
        }
    }
}

/// Registry of allocated prim paths and file names.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    paths: HashSet<String>,
    /// Lowercased file stems; file systems may be case-insensitive.
    files: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a unique, sanitized name derived from `candidate`.
    ///
    /// With `is_filename` the result is a single file name (`/` collapsed to
    /// `_`) whose extension is preserved; otherwise it is a prim path.
    pub fn allocate(&mut self, candidate: &str, kind: NameKind, is_filename: bool) -> String {
        if is_filename {
            self.allocate_file(candidate, kind)
        } else {
            self.allocate_path(candidate, kind)
        }
    }

    /// Check whether a prim path has been allocated.
    pub fn exists(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of names allocated so far.
    pub fn len(&self) -> usize {
        self.paths.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate_path(&mut self, candidate: &str, kind: NameKind) -> String {
        let candidate = match candidate.rsplit_once('/') {
            Some((parent, last)) if !last.is_ascii() => format!("{}/{}", parent, kind.fallback()),
            None if !candidate.is_ascii() => kind.fallback().to_string(),
            _ => candidate.to_string(),
        };

        let mut path = sanitize_path(&candidate);
        if path.is_empty() || path == "/" {
            path = format!("{}{}", path, kind.fallback());
        }

        while self.paths.contains(&path) {
            path = bump_suffix(&path);
        }
        self.paths.insert(path.clone());
        path
    }

    fn allocate_file(&mut self, candidate: &str, kind: NameKind) -> String {
        let (stem, extension) = split_extension(candidate);
        let stem = if stem.is_ascii() {
            sanitize_stem(stem)
        } else {
            kind.fallback().to_string()
        };
        let mut stem = if stem.is_empty() {
            kind.fallback().to_string()
        } else {
            stem
        };

        while self.files.contains(&stem.to_ascii_lowercase()) {
            stem = bump_suffix(&stem);
        }
        self.files.insert(stem.to_ascii_lowercase());

        match sanitize_extension(extension) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }
}

/// Sanitize a prim path: every character outside `[0-9a-zA-Z/]` becomes `_`,
/// empty segments are dropped and segments starting with a digit get a `_`
/// prefix. A leading `/` is preserved.
pub fn sanitize_path(path: &str) -> String {
    let replaced: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '/' { c } else { '_' })
        .collect();

    let segments: Vec<String> = replaced
        .split('/')
        .filter(|s| !s.is_empty())
        .map(prefix_digit)
        .collect();

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Sanitize a file name: `/` and every other character outside
/// `[0-9a-zA-Z]` become `_` in the stem, the extension keeps only ASCII
/// alphanumerics and is lowercased.
pub fn sanitize_filename(name: &str) -> String {
    let (stem, extension) = split_extension(name);
    let mut stem = sanitize_stem(stem);
    if stem.is_empty() {
        stem.push('_');
    }
    match sanitize_extension(extension) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn sanitize_stem(stem: &str) -> String {
    let replaced: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if replaced.is_empty() {
        replaced
    } else {
        prefix_digit(&replaced)
    }
}

fn sanitize_extension(extension: Option<&str>) -> Option<String> {
    let ext: String = extension?
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn prefix_digit(segment: &str) -> String {
    if segment.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", segment)
    } else {
        segment.to_string()
    }
}

/// Split `name` into stem and extension at the last `.` of its final segment.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let last_segment_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    match name[last_segment_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = last_segment_start + dot;
            (&name[..dot], Some(&name[dot + 1..]))
        }
        _ => (name, None),
    }
}

/// `foo` -> `foo_1`, `foo_1` -> `foo_2`.
fn bump_suffix(name: &str) -> String {
    if let Some((base, number)) = name.rsplit_once('_') {
        if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(n) = number.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                return format!("{}_{}", base, n);
            }
        }
    }
    format!("{}_1", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_unique_paths() {
        let mut registry = NameRegistry::new();
        let a = registry.allocate("/Root/Cube", NameKind::Node, false);
        let b = registry.allocate("/Root/Cube", NameKind::Node, false);
        let c = registry.allocate("/Root/Cube", NameKind::Node, false);
        assert_eq!(a, "/Root/Cube");
        assert_eq!(b, "/Root/Cube_1");
        assert_eq!(c, "/Root/Cube_2");
        assert!(registry.exists("/Root/Cube_1"));
        assert!(!registry.exists("/Root/Cube_3"));
    }

    #[test]
    fn test_existing_suffix_is_incremented() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.allocate("/Root/Arm_7", NameKind::Bone, false), "/Root/Arm_7");
        assert_eq!(registry.allocate("/Root/Arm_7", NameKind::Bone, false), "/Root/Arm_8");
    }

    #[test]
    fn test_largest_suffix_gets_new_counter() {
        let max = format!("/Root/Arm_{}", u64::MAX);
        assert_eq!(bump_suffix(&max), format!("{}_1", max));
        assert_eq!(bump_suffix("/Root/Arm_41"), "/Root/Arm_42");

        let mut registry = NameRegistry::new();
        assert_eq!(registry.allocate(&max, NameKind::Bone, false), max);
        assert_eq!(registry.allocate(&max, NameKind::Bone, false), format!("{}_1", max));
    }

    #[test]
    fn test_distinct_valid_path_is_unchanged() {
        let mut registry = NameRegistry::new();
        registry.allocate("/Root/A", NameKind::Node, false);
        assert_eq!(registry.allocate("/Root/B", NameKind::Node, false), "/Root/B");
    }

    #[test]
    fn test_non_ascii_final_segment_uses_fallback() {
        let mut registry = NameRegistry::new();
        let path = registry.allocate("/Root/Körper/球体", NameKind::Mesh, false);
        assert_eq!(path, "/Root/K_rper/mesh");
        let material = registry.allocate("/Root/Materials/木目", NameKind::Material, false);
        assert_eq!(material, "/Root/Materials/material");
    }

    #[test]
    fn test_invalid_characters_and_digits() {
        let mut registry = NameRegistry::new();
        let path = registry.allocate("/Root/3d model-v2.final", NameKind::Node, false);
        assert_eq!(path, "/Root/_3d_model_v2_final");
    }

    #[test]
    fn test_filename_allocation() {
        let mut registry = NameRegistry::new();
        let a = registry.allocate("wood grain.PNG", NameKind::Texture, true);
        let b = registry.allocate("Wood_Grain.jpg", NameKind::Texture, true);
        let c = registry.allocate("textures/1.png", NameKind::Texture, true);
        let d = registry.allocate("木.png", NameKind::Texture, true);
        assert_eq!(a, "wood_grain.png");
        assert_eq!(b, "Wood_Grain_1.jpg");
        assert_eq!(c, "textures_1.png");
        assert_eq!(d, "texture.png");
    }

    #[test]
    fn test_all_allocations_distinct() {
        let mut registry = NameRegistry::new();
        let inputs = ["/Root/a", "/Root/a_1", "/Root/a", "/Root/a_1", "/Root/a b", "/Root/a_b"];
        let mut seen = HashSet::new();
        for input in inputs {
            let name = registry.allocate(input, NameKind::Node, false);
            assert!(seen.insert(name.clone()), "duplicate name {}", name);
        }
        assert_eq!(seen.len(), inputs.len());
    }

    #[test]
    fn test_sanitize_idempotent() {
        let samples = [
            "/Root/Cube",
            "/Root//9lives/é-x",
            "a b/c.d",
            "_under/_score",
            "",
            "///",
            "名前/name",
        ];
        for s in samples {
            let once = sanitize_path(s);
            assert_eq!(sanitize_path(&once), once, "path {:?}", s);
            let once = sanitize_filename(s);
            assert_eq!(sanitize_filename(&once), once, "file {:?}", s);
        }
    }

    #[test]
    fn test_bump_suffix() {
        assert_eq!(bump_suffix("foo"), "foo_1");
        assert_eq!(bump_suffix("foo_9"), "foo_10");
        assert_eq!(bump_suffix("foo_bar"), "foo_bar_1");
    }
}
