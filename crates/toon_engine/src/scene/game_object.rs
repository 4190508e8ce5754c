//! Scene nodes

use std::fmt;

use super::behaviour::Behaviour;
use super::NodeId;
use crate::assets::{MaterialId, MeshId};
use crate::foundation::math::{Mat4, Transform, Vec3, Vec4};

/// A positioned object in the scene forest.
///
/// Holds its own transform and child list, and non-owning keys to a shared
/// mesh and material. Parent and child links are maintained by
/// [`SceneGraph`](super::SceneGraph); a freshly built object is detached.
pub struct GameObject {
    pub(super) name: String,
    pub(super) transform: Transform,
    pub(super) mesh: Option<MeshId>,
    pub(super) material: MaterialId,
    pub(super) tint: Option<Vec4>,
    pub(super) behaviour: Option<Box<dyn Behaviour>>,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) world_matrix: Mat4,
}

impl GameObject {
    /// New object drawn with `material`
    pub fn new(name: impl Into<String>, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            material,
            tint: None,
            behaviour: None,
            parent: None,
            children: Vec::new(),
            world_matrix: Mat4::identity(),
        }
    }

    /// Set the mesh
    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshId) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Set the local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the local position
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.set_position(position);
        self
    }

    /// Set a uniform scale
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.transform.set_uniform_scale(scale);
        self
    }

    /// Set the tint
    #[must_use]
    pub fn with_tint(mut self, tint: Vec4) -> Self {
        self.tint = Some(tint);
        self
    }

    /// Attach a behaviour
    #[must_use]
    pub fn with_behaviour(mut self, behaviour: impl Behaviour + 'static) -> Self {
        self.behaviour = Some(Box::new(behaviour));
        self
    }

    /// Unique node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable local transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Mesh key
    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    /// Material key
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Per-node colour
    pub fn tint(&self) -> Option<Vec4> {
        self.tint
    }

    /// Replace the per-node colour
    pub fn set_tint(&mut self, tint: Option<Vec4>) {
        self.tint = tint;
    }

    /// Move to `position` in parent space
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
    }

    /// Per-axis scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.set_scale(scale);
    }

    /// Same scale on every axis
    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.transform.set_uniform_scale(scale);
    }

    /// Parent, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True when the node has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// World matrix as of the last update or attach
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Local matrix from the current transform
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.local_matrix()
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("mesh", &self.mesh)
            .field("material", &self.material)
            .field("tint", &self.tint)
            .field("behaviour", &self.behaviour)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
