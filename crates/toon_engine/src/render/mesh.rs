//! Mesh geometry and GPU mesh handles
//!
//! [`MeshData`] is CPU-side geometry with one array per vertex attribute,
//! as produced by the loaders. Before anything reaches the GPU it is
//! validated: every attribute array present must have exactly one entry per
//! position and every index must be in range. Geometry that fails the check
//! is never uploaded, and the [`MeshHandle`] created for it draws nothing.

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::api::{GpuMeshHandle, RenderBackend};

/// Interleaved vertex as uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
    /// Per-vertex colour, multiplied with the node tint
    pub colour: [f32; 4],
}

/// Normal used when a mesh carries none
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// How consecutive indices form faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Every three indices form a triangle
    Triangles,
    /// Every four indices form a planar quad
    Quads,
}

impl Topology {
    /// Number of indices per face
    pub const fn vertices_per_face(self) -> usize {
        match self {
            Self::Triangles => 3,
            Self::Quads => 4,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point; `None` for an empty slice
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let first = Vec3::from(*first);
        let (min, max) = rest.iter().fold((first, first), |(min, max), p| {
            let p = Vec3::from(*p);
            (min.inf(&p), max.sup(&p))
        });
        Some(Self { min, max })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Geometry that cannot be uploaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// No positions at all
    #[error("mesh has no vertices")]
    Empty,
    /// An attribute array does not match the position count
    #[error("{attribute} count {found} does not match vertex count {expected}")]
    AttributeCountMismatch {
        /// Attribute name
        attribute: &'static str,
        /// Number of positions
        expected: usize,
        /// Number of entries in the attribute array
        found: usize,
    },
    /// Index count does not divide into whole faces
    #[error("index count {count} is not a multiple of {per_face}")]
    PartialFace {
        /// Number of indices
        count: usize,
        /// Indices per face for the topology
        per_face: usize,
    },
    /// An index points past the last vertex
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Number of positions
        vertex_count: usize,
    },
}

/// CPU-side mesh with one array per attribute.
///
/// `normals`, `tex_coords` and `colours` may each be empty, meaning the
/// attribute is absent. When present they must match `positions` in length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates
    pub tex_coords: Vec<[f32; 2]>,
    /// Vertex colours
    pub colours: Vec<[f32; 4]>,
    /// Face indices; empty means sequential
    pub indices: Vec<u32>,
    /// Face layout of `indices`
    pub topology: Option<Topology>,
}

impl MeshData {
    /// Topology, defaulting to triangles
    pub fn topology(&self) -> Topology {
        self.topology.unwrap_or(Topology::Triangles)
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check attribute counts and index ranges
    pub fn validate(&self) -> Result<(), MeshError> {
        let expected = self.positions.len();
        if expected == 0 {
            return Err(MeshError::Empty);
        }

        for (attribute, found) in [
            ("normal", self.normals.len()),
            ("uv", self.tex_coords.len()),
            ("colour", self.colours.len()),
        ] {
            if found != 0 && found != expected {
                return Err(MeshError::AttributeCountMismatch { attribute, expected, found });
            }
        }

        let per_face = self.topology().vertices_per_face();
        let count = if self.indices.is_empty() { expected } else { self.indices.len() };
        if count % per_face != 0 {
            return Err(MeshError::PartialFace { count, per_face });
        }

        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= expected) {
            return Err(MeshError::IndexOutOfRange { index, vertex_count: expected });
        }

        Ok(())
    }

    /// Interleave the attribute arrays, filling absent ones with defaults
    pub fn interleaved(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i],
                normal: self.normals.get(i).copied().unwrap_or(DEFAULT_NORMAL),
                tex_coord: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                colour: self.colours.get(i).copied().unwrap_or([1.0, 1.0, 1.0, 1.0]),
            })
            .collect()
    }

    /// Triangle list indices; quads are split along their 0-2 diagonal
    pub fn triangle_indices(&self) -> Vec<u32> {
        let indices: Vec<u32> = if self.indices.is_empty() {
            (0..self.positions.len() as u32).collect()
        } else {
            self.indices.clone()
        };

        match self.topology() {
            Topology::Triangles => indices,
            Topology::Quads => indices
                .chunks_exact(4)
                .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
                .collect(),
        }
    }

    /// Bounding box of the positions
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }
}

/// Immutable, shareable reference to uploaded geometry.
///
/// `gpu` is `None` when loading or validation failed; drawing such a mesh
/// is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHandle {
    name: String,
    gpu: Option<GpuMeshHandle>,
    vertex_count: usize,
    topology: Topology,
    bounds: Option<Aabb>,
}

impl MeshHandle {
    /// Validate and upload `data`. Invalid geometry yields an absent handle.
    pub fn upload(name: impl Into<String>, data: &MeshData, backend: &mut dyn RenderBackend) -> Self {
        let name = name.into();

        let gpu = match data.validate() {
            Ok(()) => match backend.create_mesh(&data.interleaved(), &data.triangle_indices()) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::warn!("Mesh '{}' upload failed: {}", name, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Mesh '{}' rejected: {}", name, e);
                None
            }
        };

        if gpu.is_some() {
            log::debug!(
                "Uploaded mesh '{}' ({} vertices, {:?})",
                name,
                data.vertex_count(),
                data.topology()
            );
        }

        Self {
            name,
            gpu,
            vertex_count: data.vertex_count(),
            topology: data.topology(),
            bounds: data.bounds(),
        }
    }

    /// Placeholder for a mesh whose file could not be loaded
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gpu: None,
            vertex_count: 0,
            topology: Topology::Triangles,
            bounds: None,
        }
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend handle if the upload succeeded
    pub fn gpu(&self) -> Option<GpuMeshHandle> {
        self.gpu
    }

    /// Whether drawing this mesh issues a draw call
    pub fn is_drawable(&self) -> bool {
        self.gpu.is_some()
    }

    /// Number of source vertices
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Source topology
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Model-space bounds
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Release the GPU buffers; the handle stays valid and draws nothing
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.gpu.take() {
            backend.destroy_mesh(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessBackend;
    use approx::assert_relative_eq;

    fn quad() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            normals: vec![[0.0, 1.0, 0.0]; 4],
            topology: Some(Topology::Quads),
            ..Default::default()
        }
    }

    #[test]
    fn test_quads_split_into_two_triangles() {
        assert_eq!(quad().triangle_indices(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_uv_count_mismatch_rejected() {
        let mut mesh = quad();
        mesh.tex_coords = vec![[0.0, 0.0]; 3];
        assert_eq!(
            mesh.validate(),
            Err(MeshError::AttributeCountMismatch { attribute: "uv", expected: 4, found: 3 })
        );
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let mut mesh = quad();
        mesh.indices = vec![0, 1, 2, 7];
        assert!(matches!(mesh.validate(), Err(MeshError::IndexOutOfRange { index: 7, .. })));
    }

    #[test]
    fn test_partial_face_rejected() {
        let mut mesh = quad();
        mesh.topology = Some(Topology::Triangles);
        assert!(matches!(mesh.validate(), Err(MeshError::PartialFace { count: 4, per_face: 3 })));
    }

    #[test]
    fn test_bounds() {
        let bounds = quad().bounds().unwrap();
        assert_relative_eq!(bounds.min, Vec3::zeros());
        assert_relative_eq!(bounds.max, Vec3::new(1.0, 0.0, 1.0));
        assert_relative_eq!(bounds.center(), Vec3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_interleave_fills_missing_attributes() {
        let vertices = quad().interleaved();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[2].tex_coord, [0.0, 0.0]);
        assert_eq!(vertices[2].colour, [1.0; 4]);
    }

    #[test]
    fn test_invalid_mesh_never_reaches_backend() {
        let mut backend = HeadlessBackend::new(64, 64);
        let mut mesh = quad();
        mesh.colours = vec![[1.0; 4]];

        let handle = MeshHandle::upload("broken", &mesh, &mut backend);
        assert!(!handle.is_drawable());
        assert_eq!(backend.mesh_count(), 0);

        let handle = MeshHandle::upload("floor", &quad(), &mut backend);
        assert!(handle.is_drawable());
        assert_eq!(backend.mesh_count(), 1);
        assert_eq!(handle.topology(), Topology::Quads);
    }
}
