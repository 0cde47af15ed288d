//! Polygon soup to indexed mesh conversion.
//!
//! Three passes run per source mesh:
//!
//! 1. **Degeneracy**: faces with repeated corners, collapsed corners or zero
//!    area are removed together with their slice of every face-vertex stream.
//! 2. **Partition**: face-grouped meshes are split into one sub-mesh per
//!    material, each compacted to the vertices it references.
//! 3. **Vertex split**: a vertex is shared between face-vertices only when
//!    their normals (and colors) agree; otherwise it is cloned.

use super::geometry::IndexedMesh;
use crate::error::MeshError;
use crate::source::RawMesh;
use crate::types::{BoundingBox, JointHandle, SurfaceId};
use glam::Vec3;
use std::collections::BTreeMap;

/// Positions are scaled by this factor before the degeneracy tests.
const DEGENERATE_SCALE: f32 = 1000.0;
/// Minimum corner distance in scaled space.
const DEGENERATE_DISTANCE: f32 = 1e-4;
/// Minimum triangle area in scaled space.
const DEGENERATE_AREA: f32 = 1e-6;
/// Per-component tolerance when comparing normals and colors.
const ATTRIBUTE_EPSILON: f32 = 1e-4;

/// Options that change how meshes are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Honor the mesh's subdivision flag.
    pub subdivision: bool,
    /// Keep vertex colors.
    pub vertex_colors: bool,
    /// Keep skin weights and joints.
    pub skin: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            subdivision: true,
            vertex_colors: true,
            skin: true,
        }
    }
}

/// Material assignment of a mesh's faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Surface of faces without a face group.
    pub default_surface: Option<SurfaceId>,
    /// Surface per face-group id.
    pub group_surfaces: Vec<Option<SurfaceId>>,
}

impl Partition {
    pub fn single(surface: Option<SurfaceId>) -> Self {
        Self {
            default_surface: surface,
            group_surfaces: Vec::new(),
        }
    }

    fn group_surface(&self, group: u32) -> Option<SurfaceId> {
        self.group_surfaces.get(group as usize).copied().flatten()
    }
}

/// Converts [`RawMesh`] values into [`IndexedMesh`] values.
#[derive(Debug, Clone, Default)]
pub struct MeshNormalizer {
    options: NormalizeOptions,
}

impl MeshNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalize one mesh. `flip` is combined with the mesh's own
    /// `flip_faces` flag.
    ///
    /// Returns one mesh per non-empty partition; an empty vector when every
    /// face was degenerate.
    pub fn normalize(
        &self,
        raw: &RawMesh,
        partition: &Partition,
        flip: bool,
    ) -> Result<Vec<IndexedMesh>, MeshError> {
        let mut soup = Soup::from_raw(raw, &self.options)?;
        soup.remove_degenerate_faces(&raw.positions);

        if soup.counts.is_empty() {
            return Ok(Vec::new());
        }

        let flip = flip ^ raw.flip_faces;
        let subdivision = raw.subdivision && self.options.subdivision;
        let skin = raw
            .skin
            .as_ref()
            .filter(|s| {
                self.options.skin
                    && s.weights.len() == raw.positions.len()
                    && s.joints.len() == raw.positions.len()
            });

        let mut meshes = Vec::new();
        for (surface, faces) in soup.partitions(partition) {
            let mut mesh = soup.emit(&faces, flip);
            mesh.surface = surface;
            mesh.subdivision = subdivision;
            compact(&mut mesh, &raw.positions, skin.map(|s| (&s.weights[..], &s.joints[..])));
            split_vertices(&mut mesh, &soup, subdivision);
            mesh.update_bounds();
            meshes.push(mesh.finish());
        }
        Ok(meshes)
    }
}

/// Working copy of the face-vertex streams. Optional streams with a length
/// that does not match the face-vertex count are treated as absent.
struct Soup {
    counts: Vec<u32>,
    indices: Vec<u32>,
    normals: Option<Vec<[f32; 3]>>,
    uv0: Option<Vec<[f32; 2]>>,
    uv1: Option<Vec<[f32; 2]>>,
    colors: Option<Vec<[f32; 4]>>,
    groups: Option<Vec<Option<u32>>>,
}

impl Soup {
    fn from_raw(raw: &RawMesh, options: &NormalizeOptions) -> Result<Self, MeshError> {
        let expected: usize = raw.face_vertex_counts.iter().map(|&c| c as usize).sum();
        if expected != raw.face_indices.len() {
            return Err(MeshError::IndexCountMismatch {
                expected,
                actual: raw.face_indices.len(),
            });
        }
        if let Some(&index) = raw
            .face_indices
            .iter()
            .find(|&&i| i as usize >= raw.positions.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: raw.positions.len(),
            });
        }

        let fv = raw.face_indices.len();
        fn stream<T: Clone>(data: &[T], len: usize, name: &str) -> Option<Vec<T>> {
            if data.is_empty() {
                None
            } else if data.len() != len {
                tracing::debug!("Ignoring {} stream: {} values for {} entries", name, data.len(), len);
                None
            } else {
                Some(data.to_vec())
            }
        }

        let colors = if options.vertex_colors {
            stream(&raw.colors, fv, "color")
        } else {
            None
        };

        Ok(Self {
            counts: raw.face_vertex_counts.clone(),
            indices: raw.face_indices.clone(),
            normals: stream(&raw.normals, fv, "normal"),
            uv0: stream(&raw.uv0, fv, "uv0"),
            uv1: stream(&raw.uv1, fv, "uv1"),
            colors,
            groups: stream(&raw.face_groups, raw.face_vertex_counts.len(), "face group")
                .filter(|g| g.iter().any(Option::is_some)),
        })
    }

    fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.counts.len());
        let mut offset = 0;
        for &count in &self.counts {
            offsets.push(offset);
            offset += count as usize;
        }
        offsets
    }

    fn face(&self, offsets: &[usize], face: usize) -> &[u32] {
        let start = offsets[face];
        &self.indices[start..start + self.counts[face] as usize]
    }

    fn remove_degenerate_faces(&mut self, positions: &[[f32; 3]]) {
        let offsets = self.offsets();
        let degenerate: Vec<usize> = (0..self.counts.len())
            .filter(|&f| is_degenerate(self.face(&offsets, f), positions))
            .collect();

        // Highest face first so the offsets of earlier faces stay valid.
        for &face in degenerate.iter().rev() {
            let range = offsets[face]..offsets[face] + self.counts[face] as usize;
            self.indices.drain(range.clone());
            if let Some(n) = &mut self.normals {
                n.drain(range.clone());
            }
            if let Some(uv) = &mut self.uv0 {
                uv.drain(range.clone());
            }
            if let Some(uv) = &mut self.uv1 {
                uv.drain(range.clone());
            }
            if let Some(c) = &mut self.colors {
                c.drain(range);
            }
            if let Some(g) = &mut self.groups {
                g.remove(face);
            }
            self.counts.remove(face);
        }

        if !degenerate.is_empty() {
            tracing::debug!("Removed {} degenerate faces", degenerate.len());
        }
    }

    /// Faces per output mesh: ungrouped faces first, then each group with at
    /// least one face and a resolvable surface, by ascending group id.
    fn partitions(&self, partition: &Partition) -> Vec<(Option<SurfaceId>, Vec<usize>)> {
        let Some(groups) = &self.groups else {
            return vec![(partition.default_surface, (0..self.counts.len()).collect())];
        };

        let mut ungrouped = Vec::new();
        let mut grouped: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (face, group) in groups.iter().enumerate() {
            match group {
                Some(g) => grouped.entry(*g).or_default().push(face),
                None => ungrouped.push(face),
            }
        }

        let mut out = Vec::new();
        if !ungrouped.is_empty() {
            out.push((partition.default_surface, ungrouped));
        }
        for (group, faces) in grouped {
            match partition.group_surface(group) {
                Some(surface) => out.push((Some(surface), faces)),
                None => tracing::debug!(
                    "Dropping {} faces of face group {} without a surface",
                    faces.len(),
                    group
                ),
            }
        }
        out
    }

    /// Emit the selected faces with source vertex indices, honoring `flip`.
    fn emit(&self, faces: &[usize], flip: bool) -> SubMesh {
        let offsets = self.offsets();
        let mut mesh = SubMesh::default();

        for &face in faces {
            let start = offsets[face];
            let count = self.counts[face] as usize;
            let corners: Vec<usize> = if flip {
                (start..start + count).rev().collect()
            } else {
                (start..start + count).collect()
            };

            mesh.counts.push(count as u32);
            for fv in corners {
                mesh.indices.push(self.indices[fv]);
                mesh.source_fv.push(fv);
                if let Some(uv) = &self.uv0 {
                    mesh.uv0.push(uv[fv]);
                }
                if let Some(uv) = &self.uv1 {
                    mesh.uv1.push(uv[fv]);
                }
            }
        }
        mesh.flip = flip;
        mesh
    }

    fn key(&self, fv: usize, flip: bool) -> VertexKey {
        VertexKey {
            normal: self.normals.as_ref().map(|n| {
                let n = n[fv];
                if flip {
                    [-n[0], -n[1], -n[2]]
                } else {
                    n
                }
            }),
            color: self.colors.as_ref().map(|c| c[fv]),
        }
    }
}

/// Any two equal corners, or (for triangles) collapsed corners or zero area.
fn is_degenerate(face: &[u32], positions: &[[f32; 3]]) -> bool {
    if face.len() < 3 {
        return true;
    }
    for (i, a) in face.iter().enumerate() {
        if face[i + 1..].contains(a) {
            return true;
        }
    }
    if face.len() != 3 {
        return false;
    }

    let p = [0, 1, 2].map(|i| Vec3::from(positions[face[i] as usize]) * DEGENERATE_SCALE);
    let min_dist_sq = DEGENERATE_DISTANCE * DEGENERATE_DISTANCE;
    if p[0].distance_squared(p[1]) < min_dist_sq
        || p[1].distance_squared(p[2]) < min_dist_sq
        || p[2].distance_squared(p[0]) < min_dist_sq
    {
        return true;
    }
    let area = 0.5 * (p[1] - p[0]).cross(p[2] - p[0]).length();
    area < DEGENERATE_AREA
}

/// Attributes that must agree for two face-vertices to share a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VertexKey {
    normal: Option<[f32; 3]>,
    color: Option<[f32; 4]>,
}

impl VertexKey {
    fn matches(&self, other: &VertexKey) -> bool {
        let close = |a: &[f32], b: &[f32]| {
            a.iter().zip(b).all(|(x, y)| (x - y).abs() <= ATTRIBUTE_EPSILON)
        };
        let normal = match (&self.normal, &other.normal) {
            (Some(a), Some(b)) => close(a, b),
            (None, None) => true,
            _ => false,
        };
        let color = match (&self.color, &other.color) {
            (Some(a), Some(b)) => close(a, b),
            (None, None) => true,
            _ => false,
        };
        normal && color
    }
}

/// An output mesh under construction.
#[derive(Debug, Default)]
struct SubMesh {
    positions: Vec<[f32; 3]>,
    skin_weights: Vec<[f32; 4]>,
    skin_joints: Vec<[Option<JointHandle>; 4]>,
    counts: Vec<u32>,
    indices: Vec<u32>,
    /// Face-vertex position in the soup for every emitted face-vertex.
    source_fv: Vec<usize>,
    uv0: Vec<[f32; 2]>,
    uv1: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    flip: bool,
    surface: Option<SurfaceId>,
    subdivision: bool,
    bounds: Option<BoundingBox>,
}

impl SubMesh {
    fn update_bounds(&mut self) {
        self.bounds = BoundingBox::from_points(self.positions.iter().copied());
    }

    fn finish(self) -> IndexedMesh {
        IndexedMesh {
            positions: self.positions,
            normals: self.normals,
            colors: self.colors,
            skin_weights: self.skin_weights,
            skin_joints: self.skin_joints,
            uv0: self.uv0,
            uv1: self.uv1,
            face_vertex_counts: self.counts,
            face_indices: self.indices,
            surface: self.surface,
            material: None,
            subdivision: self.subdivision,
            bounds: self.bounds,
        }
    }
}

/// Drop unreferenced vertices. Indices are renumbered by a forward scan so
/// the relative order of the surviving vertices is preserved.
fn compact(
    mesh: &mut SubMesh,
    positions: &[[f32; 3]],
    skin: Option<(&[[f32; 4]], &[[Option<JointHandle>; 4]])>,
) {
    let mut referenced = vec![false; positions.len()];
    for &i in &mesh.indices {
        referenced[i as usize] = true;
    }

    let mut remap = vec![u32::MAX; positions.len()];
    let mut next = 0u32;
    for (old, used) in referenced.iter().enumerate() {
        if !used {
            continue;
        }
        remap[old] = next;
        next += 1;
        mesh.positions.push(positions[old]);
        if let Some((weights, joints)) = skin {
            mesh.skin_weights.push(weights[old]);
            mesh.skin_joints.push(joints[old]);
        }
    }

    for i in &mut mesh.indices {
        *i = remap[*i as usize];
    }
}

/// Clone vertices whose face-vertices disagree on normal or color, then
/// write one normal and color per final vertex.
fn split_vertices(mesh: &mut SubMesh, soup: &Soup, subdivision: bool) {
    let vertex_count = mesh.positions.len();
    let mut occurrences: Vec<Vec<(u32, VertexKey)>> = vec![Vec::new(); vertex_count];
    let mut keys: Vec<Option<VertexKey>> = vec![None; vertex_count];
    let skinned = !mesh.skin_weights.is_empty();
    let mut cloned = 0usize;

    for slot in 0..mesh.indices.len() {
        let vertex = mesh.indices[slot] as usize;
        let key = soup.key(mesh.source_fv[slot], mesh.flip);
        let seen = &mut occurrences[vertex];

        if seen.is_empty() {
            seen.push((vertex as u32, key));
            keys[vertex] = Some(key);
            continue;
        }

        let reuse = if subdivision {
            seen.first().filter(|(_, k)| k.matches(&key)).map(|(i, _)| *i)
        } else {
            seen.iter().find(|(_, k)| k.matches(&key)).map(|(i, _)| *i)
        };

        let target = match reuse {
            Some(index) => index,
            None => {
                let index = mesh.positions.len() as u32;
                mesh.positions.push(mesh.positions[vertex]);
                if skinned {
                    mesh.skin_weights.push(mesh.skin_weights[vertex]);
                    mesh.skin_joints.push(mesh.skin_joints[vertex]);
                }
                keys.push(Some(key));
                seen.push((index, key));
                cloned += 1;
                index
            }
        };
        mesh.indices[slot] = target;
    }

    if cloned > 0 {
        tracing::debug!("Split {} vertices with disagreeing attributes", cloned);
    }

    if soup.normals.is_some() {
        mesh.normals = keys
            .iter()
            .map(|k| k.and_then(|k| k.normal).unwrap_or([0.0, 0.0, 0.0]))
            .collect();
    }
    if soup.colors.is_some() {
        mesh.colors = keys
            .iter()
            .map(|k| k.and_then(|k| k.color).unwrap_or([1.0, 1.0, 1.0, 1.0]))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SkinData;

    const UP: [f32; 3] = [0.0, 0.0, 1.0];

    fn quad() -> RawMesh {
        let mut raw = RawMesh::new();
        raw.positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        raw.add_face(&[0, 1, 2, 3], &[UP; 4]);
        raw
    }

    /// Two triangles sharing the edge 1-2.
    fn two_triangles(second_normal: [f32; 3]) -> RawMesh {
        let mut raw = RawMesh::new();
        raw.positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ];
        raw.add_face(&[0, 1, 2], &[UP; 3]);
        raw.add_face(&[1, 3, 2], &[second_normal; 3]);
        raw
    }

    fn normalize(raw: &RawMesh) -> Vec<IndexedMesh> {
        MeshNormalizer::default()
            .normalize(raw, &Partition::single(Some(SurfaceId(1))), false)
            .unwrap()
    }

    #[test]
    fn test_single_quad() {
        let meshes = normalize(&quad());
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_vertex_counts, vec![4]);
        assert_eq!(mesh.face_indices, vec![0, 1, 2, 3]);
        assert_eq!(mesh.normals, vec![UP; 4]);
        assert_eq!(mesh.surface, Some(SurfaceId(1)));
        assert!(mesh.is_well_formed());
    }

    #[test]
    fn test_shared_normals_are_not_split() {
        let meshes = normalize(&two_triangles(UP));
        assert_eq!(meshes[0].vertex_count(), 4);
        assert_eq!(meshes[0].face_indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn test_differing_normals_are_split() {
        let mesh = &normalize(&two_triangles([0.0, 1.0, 0.0]))[0];
        // Vertices 1 and 2 are referenced with two different normals.
        assert_eq!(mesh.vertex_count(), 6);
        assert!(mesh.is_well_formed());
        let second = &mesh.face_indices[3..6];
        assert_ne!(second[0], 1);
        assert_ne!(second[2], 2);
        assert_eq!(mesh.positions[second[0] as usize], mesh.positions[1]);
        assert_eq!(mesh.positions[second[2] as usize], mesh.positions[2]);
        assert_eq!(mesh.normals[second[0] as usize], [0.0, 1.0, 0.0]);
        assert_eq!(mesh.normals[1], UP);
    }

    #[test]
    fn test_split_reuses_matching_duplicate() {
        let mut raw = two_triangles([0.0, 1.0, 0.0]);
        // A third face touching vertex 1 with the second face's normal.
        raw.positions.push([2.0, 0.0, 0.0]);
        raw.add_face(&[1, 4, 3], &[[0.0, 1.0, 0.0]; 3]);
        let mesh = &normalize(&raw)[0];
        // Clones: 1' and 2' for face two; face three reuses 1' and vertex 3.
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.face_indices[6], mesh.face_indices[3]);
    }

    #[test]
    fn test_subdivision_always_clones() {
        let mut raw = two_triangles([0.0, 1.0, 0.0]);
        raw.positions.push([2.0, 0.0, 0.0]);
        raw.add_face(&[1, 4, 3], &[[0.0, 1.0, 0.0]; 3]);
        raw.subdivision = true;
        let mesh = &normalize(&raw)[0];
        assert_eq!(mesh.vertex_count(), 8);
        assert_ne!(mesh.face_indices[6], mesh.face_indices[3]);
        assert!(mesh.subdivision);
    }

    #[test]
    fn test_degenerate_faces_removed() {
        let mut raw = quad();
        raw.uv0 = vec![[0.0, 0.0]; 4];
        raw.add_face(&[0, 1, 1], &[UP; 3]); // repeated corner
        raw.uv0.extend([[0.5, 0.5]; 3]);
        raw.positions.push([2.0, 0.0, 0.0]);
        raw.add_face(&[0, 1, 4], &[UP; 3]); // collinear, zero area
        raw.uv0.extend([[0.7, 0.7]; 3]);
        raw.positions.push([0.0, 0.0, 0.0]);
        raw.add_face(&[0, 5, 2], &[UP; 3]); // collapsed corner
        raw.uv0.extend([[0.9, 0.9]; 3]);

        let mesh = &normalize(&raw)[0];
        assert_eq!(mesh.face_vertex_counts, vec![4]);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.uv0, vec![[0.0, 0.0]; 4]);
    }

    #[test]
    fn test_all_degenerate_yields_nothing() {
        let mut raw = RawMesh::new();
        raw.positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        raw.add_face(&[0, 1, 0], &[UP; 3]);
        assert!(normalize(&raw).is_empty());
    }

    #[test]
    fn test_face_group_partition() {
        let mut raw = RawMesh::new();
        raw.positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [5.0, 0.0, 0.0],
            [6.0, 0.0, 0.0],
            [5.0, 1.0, 0.0],
            [9.0, 0.0, 0.0],
            [9.0, 1.0, 0.0],
        ];
        raw.add_face(&[0, 1, 2], &[UP; 3]);
        raw.add_face(&[3, 4, 5], &[UP; 3]);
        raw.add_face(&[4, 6, 7], &[UP; 3]);
        raw.face_groups = vec![None, Some(0), Some(1)];

        let partition = Partition {
            default_surface: Some(SurfaceId(10)),
            group_surfaces: vec![Some(SurfaceId(20)), None],
        };
        let meshes = MeshNormalizer::default()
            .normalize(&raw, &partition, false)
            .unwrap();

        // Group 1 has no surface and is dropped.
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].surface, Some(SurfaceId(10)));
        assert_eq!(meshes[1].surface, Some(SurfaceId(20)));
        // Group 0 is compacted to its own three vertices.
        assert_eq!(meshes[1].positions, vec![[5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [5.0, 1.0, 0.0]]);
        assert_eq!(meshes[1].face_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_flip_reverses_and_negates() {
        let mut raw = quad();
        raw.flip_faces = true;
        let mesh = &normalize(&raw)[0];
        assert_eq!(mesh.face_indices, vec![3, 2, 1, 0]);
        assert_eq!(mesh.normals[0], [0.0, 0.0, -1.0]);

        // Flipping twice cancels out.
        let mesh = &MeshNormalizer::default()
            .normalize(&raw, &Partition::default(), true)
            .unwrap()[0];
        assert_eq!(mesh.face_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_mismatched_stream_is_ignored() {
        let mut raw = quad();
        raw.uv0 = vec![[0.0, 0.0]; 3];
        raw.colors = vec![[1.0, 0.0, 0.0, 1.0]; 4];
        let mesh = &normalize(&raw)[0];
        assert!(mesh.uv0.is_empty());
        assert_eq!(mesh.colors.len(), 4);
    }

    #[test]
    fn test_colors_take_part_in_sharing() {
        let mut raw = two_triangles(UP);
        raw.colors = vec![[1.0, 0.0, 0.0, 1.0]; 3];
        raw.colors.extend([[0.0, 0.0, 1.0, 1.0]; 3]);
        let mesh = &normalize(&raw)[0];
        assert_eq!(mesh.vertex_count(), 6);

        let without_colors = MeshNormalizer::new(NormalizeOptions {
            vertex_colors: false,
            ..NormalizeOptions::default()
        })
        .normalize(&raw, &Partition::default(), false)
        .unwrap();
        assert_eq!(without_colors[0].vertex_count(), 4);
        assert!(without_colors[0].colors.is_empty());
    }

    #[test]
    fn test_skin_follows_compaction_and_split() {
        let mut raw = two_triangles([0.0, 1.0, 0.0]);
        raw.skin = Some(SkinData {
            weights: vec![[1.0, 0.0, 0.0, 0.0]; 4],
            joints: (0..4).map(|j| [Some(JointHandle(j)), None, None, None]).collect(),
        });
        let mesh = &normalize(&raw)[0];
        assert_eq!(mesh.skin_weights.len(), mesh.vertex_count());
        let clone = mesh.face_indices[3] as usize;
        assert_eq!(mesh.skin_joints[clone][0], Some(JointHandle(1)));
    }

    #[test]
    fn test_structural_errors() {
        let mut raw = quad();
        raw.face_indices.push(0);
        assert!(matches!(
            MeshNormalizer::default().normalize(&raw, &Partition::default(), false),
            Err(MeshError::IndexCountMismatch { .. })
        ));

        let mut raw = quad();
        raw.face_indices[3] = 9;
        assert!(matches!(
            MeshNormalizer::default().normalize(&raw, &Partition::default(), false),
            Err(MeshError::IndexOutOfRange { index: 9, .. })
        ));
    }
}
