//! Scene forest and the roots-only registry
//!
//! Nodes live in a slotmap arena and refer to each other by [`NodeId`].
//! Only root nodes are listed in the registry; a node leaves it the moment
//! it is attached to a parent and is from then on reached only by recursion
//! from its root. Attaching checks for existing parents and cycles before
//! touching anything, so a rejected attach leaves the graph unchanged.
//! There is no detach: once attached a node stays under that parent until
//! it is destroyed.

use std::collections::{BTreeMap, HashMap};

use slotmap::SlotMap;
use thiserror::Error;

use super::behaviour::NodeState;
use super::game_object::GameObject;
use super::NodeId;
use crate::assets::{AssetTable, MaterialId, MeshId};
use crate::foundation::math::{Mat4, Quat, Vec3, Vec4};
use crate::render::api::{RenderBackend, RenderError};
use crate::render::frame::{DrawStats, FrameUniforms};
use crate::render::material::MaterialError;

/// Structural violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Id does not refer to a live node
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// Another node already uses the name
    #[error("a node named '{0}' already exists")]
    DuplicateName(String),
    /// Child already has a parent; nodes cannot be re-parented
    #[error("'{child}' is already a child of '{parent}'")]
    AlreadyParented {
        /// Child name
        child: String,
        /// Current parent name
        parent: String,
    },
    /// Attaching would make a node its own ancestor
    #[error("attaching '{child}' under '{parent}' would create a cycle")]
    Cycle {
        /// Requested parent
        parent: String,
        /// Requested child
        child: String,
    },
}

/// Arena of nodes plus the registry of roots
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, GameObject>,
    names: HashMap<String, NodeId>,
    roots: BTreeMap<String, NodeId>,
}

impl SceneGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a detached object as a new root
    pub fn spawn(&mut self, mut object: GameObject) -> Result<NodeId, SceneError> {
        if self.names.contains_key(&object.name) {
            return Err(SceneError::DuplicateName(object.name));
        }
        object.parent = None;
        object.children.clear();
        object.world_matrix = object.transform.local_matrix();

        let name = object.name.clone();
        let id = self.nodes.insert(object);
        self.names.insert(name.clone(), id);
        self.roots.insert(name, id);
        log::trace!("Spawned root '{}'", self.nodes[id].name);
        Ok(id)
    }

    /// Spawn `object` and attach it under `parent` in one step
    pub fn spawn_child(&mut self, parent: NodeId, object: GameObject) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let child = self.spawn(object)?;
        if let Err(e) = self.add_child(parent, child) {
            self.destroy(child)?;
            return Err(e);
        }
        Ok(child)
    }

    /// Attach the root `child` under `parent`.
    ///
    /// Rejects a child that already has a parent, `parent == child`, and a
    /// child that is an ancestor of `parent`. On success the child leaves the
    /// registry and its subtree's world matrices follow the parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let parent_node = self.nodes.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        let child_node = self.nodes.get(child).ok_or(SceneError::UnknownNode(child))?;

        if let Some(existing) = child_node.parent {
            return Err(SceneError::AlreadyParented {
                child: child_node.name.clone(),
                parent: self.nodes[existing].name.clone(),
            });
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle {
                parent: parent_node.name.clone(),
                child: child_node.name.clone(),
            });
        }

        let parent_world = parent_node.world_matrix;
        let child_name = child_node.name.clone();
        self.roots.remove(&child_name);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        self.refresh_world(child, &parent_world);

        log::debug!("Attached '{}' under '{}'", child_name, self.nodes[parent].name);
        Ok(())
    }

    /// True if `ancestor` is `node` or lies on the path from `node` to its root
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Remove a node and every descendant. Returns how many nodes were removed.
    pub fn destroy(&mut self, id: NodeId) -> Result<usize, SceneError> {
        let node = self.nodes.get(id).ok_or(SceneError::UnknownNode(id))?;
        let (parent, name) = (node.parent, node.name.clone());
        match parent {
            Some(parent) => self.nodes[parent].children.retain(|c| *c != id),
            None => {
                self.roots.remove(&name);
            }
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                self.names.remove(&node.name);
                stack.extend(node.children);
                removed += 1;
            }
        }
        log::debug!("Destroyed {} node(s)", removed);
        Ok(removed)
    }

    /// Node by id
    pub fn get(&self, id: NodeId) -> Option<&GameObject> {
        self.nodes.get(id)
    }

    /// Mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut GameObject> {
        self.nodes.get_mut(id)
    }

    /// Node id by name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Whether `id` is live
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered roots in name order
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.values().copied()
    }

    /// Number of registered roots
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Whether the node is a root
    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(GameObject::is_root)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut GameObject, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Move a node in parent space
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_position(position);
        Ok(())
    }

    /// Per-axis scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_scale(scale);
        Ok(())
    }

    /// Uniform scale
    pub fn set_uniform_scale(&mut self, id: NodeId, scale: f32) -> Result<(), SceneError> {
        self.node_mut(id)?.set_uniform_scale(scale);
        Ok(())
    }

    /// Replace rotation
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        self.node_mut(id)?.transform.set_rotation(rotation);
        Ok(())
    }

    /// Replace tint
    pub fn set_tint(&mut self, id: NodeId, tint: Option<Vec4>) -> Result<(), SceneError> {
        self.node_mut(id)?.set_tint(tint);
        Ok(())
    }

    /// Cached world matrix from the last update
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(|n| n.world_matrix)
    }

    /// World matrix composed from the current local transforms of every ancestor
    pub fn world_matrix_on_demand(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(id)?;
        let mut world = node.transform.local_matrix();
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            world = node.transform.local_matrix() * world;
        }
        Some(world)
    }

    /// World-space position from the cached matrix
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| Vec3::new(m.m14, m.m24, m.m34))
    }

    fn refresh_world(&mut self, id: NodeId, parent_world: &Mat4) {
        let world = {
            let node = &mut self.nodes[id];
            node.world_matrix = node.transform.world_matrix(parent_world);
            node.world_matrix
        };
        for i in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[i];
            self.refresh_world(child, &world);
        }
    }

    /// Update every root once. Returns the number of nodes updated.
    pub fn update(&mut self, dt: f32) -> usize {
        let roots: Vec<NodeId> = self.roots().collect();
        roots
            .into_iter()
            .map(|root| self.update_subtree(root, dt, &Mat4::identity()))
            .sum()
    }

    /// Run behaviours and recompute world matrices for `id` and its descendants
    pub fn update_subtree(&mut self, id: NodeId, dt: f32, parent_world: &Mat4) -> usize {
        let Some(node) = self.nodes.get_mut(id) else {
            return 0;
        };

        if let Some(behaviour) = node.behaviour.as_mut() {
            behaviour.update(
                NodeState {
                    transform: &mut node.transform,
                    tint: &mut node.tint,
                },
                dt,
            );
        }
        node.world_matrix = node.transform.world_matrix(parent_world);
        let world = node.world_matrix;

        let mut updated = 1;
        for i in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[i];
            updated += self.update_subtree(child, dt, &world);
        }
        updated
    }

    /// Draw every root with an optional material override
    pub fn draw(
        &self,
        frame: &FrameUniforms,
        override_material: Option<MaterialId>,
        assets: &AssetTable,
        backend: &mut dyn RenderBackend,
        stats: &mut DrawStats,
    ) -> Result<(), RenderError> {
        for root in self.roots() {
            self.draw_subtree(root, frame, override_material, assets, backend, stats)?;
        }
        Ok(())
    }

    /// Draw `id` and its descendants.
    ///
    /// `override_material` replaces each node's material for this call only.
    /// Nodes with an absent mesh, an unlinked material or a backend failure
    /// are skipped, logged and counted in `stats`; their children are still
    /// drawn. Only an unknown `id` is an error.
    pub fn draw_subtree(
        &self,
        id: NodeId,
        frame: &FrameUniforms,
        override_material: Option<MaterialId>,
        assets: &AssetTable,
        backend: &mut dyn RenderBackend,
        stats: &mut DrawStats,
    ) -> Result<(), RenderError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| RenderError::InvalidOperation(format!("draw of unknown node {:?}", id)))?;

        if let Some(mesh_id) = node.mesh {
            self.draw_node(node, mesh_id, frame, override_material, assets, backend, stats);
        }

        for child in &node.children {
            self.draw_subtree(*child, frame, override_material, assets, backend, stats)?;
        }
        Ok(())
    }

    fn draw_node(
        &self,
        node: &GameObject,
        mesh_id: MeshId,
        frame: &FrameUniforms,
        override_material: Option<MaterialId>,
        assets: &AssetTable,
        backend: &mut dyn RenderBackend,
        stats: &mut DrawStats,
    ) {
        let Some(gpu_mesh) = assets.mesh(mesh_id).and_then(|m| m.gpu()) else {
            log::trace!("Skipping '{}': mesh not available", node.name);
            stats.skipped_meshes += 1;
            return;
        };

        let material_id = override_material.unwrap_or(node.material);
        let Some(material) = assets.material(material_id) else {
            log::warn!("Skipping '{}': material {:?} not in asset table", node.name, material_id);
            stats.refused_binds += 1;
            return;
        };

        let colour = node.tint.filter(|_| material.accepts_tint());
        let uniforms = frame.node_uniforms(&node.world_matrix, colour);

        let result = match material.bind(backend, &uniforms) {
            Ok(()) => backend.draw_mesh(gpu_mesh),
            Err(MaterialError::Unlinked { .. }) => {
                stats.refused_binds += 1;
                return;
            }
            Err(MaterialError::Backend(e)) => Err(e),
        };

        match result {
            Ok(()) => stats.draws += 1,
            Err(e) => {
                log::error!("Skipping '{}' with material '{}': {}", node.name, material.name(), e);
                stats.failed_draws += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::{Material, ShaderProgram};
    use crate::scene::behaviour::Behaviour;
    use crate::scene::layout::ring_positions;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn material() -> (AssetTable, MaterialId) {
        let mut assets = AssetTable::new();
        let id = assets.add_material(Material::new("m", ShaderProgram::failed("p", "test")));
        (assets, id)
    }

    #[derive(Debug)]
    struct CountUpdates(Rc<Cell<usize>>);

    impl Behaviour for CountUpdates {
        fn update(&mut self, _node: NodeState<'_>, _dt: f32) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_spawn_registers_root() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let id = graph.spawn(GameObject::new("floor", m)).unwrap();

        assert!(graph.is_root(id));
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![id]);
        assert_eq!(graph.find("floor"), Some(id));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        graph.spawn(GameObject::new("torus", m)).unwrap();
        assert_eq!(
            graph.spawn(GameObject::new("torus", m)),
            Err(SceneError::DuplicateName("torus".to_string()))
        );
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_add_child_removes_from_registry() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let a = graph.spawn(GameObject::new("a", m)).unwrap();
        let b = graph.spawn(GameObject::new("b", m)).unwrap();

        graph.add_child(a, b).unwrap();
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.children(a), &[b]);
        assert_eq!(graph.parent(b), Some(a));
        assert!(!graph.is_root(b));
    }

    #[test]
    fn test_cycle_rejected_without_side_effects() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let a = graph.spawn(GameObject::new("a", m)).unwrap();
        let b = graph.spawn(GameObject::new("b", m)).unwrap();
        graph.add_child(a, b).unwrap();

        let err = graph.add_child(b, a).unwrap_err();
        assert!(matches!(err, SceneError::Cycle { .. }));
        assert_eq!(graph.children(a), &[b]);
        assert!(graph.children(b).is_empty());
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_deep_cycle_and_self_attach_rejected() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let a = graph.spawn(GameObject::new("a", m)).unwrap();
        let b = graph.spawn_child(a, GameObject::new("b", m)).unwrap();
        let c = graph.spawn_child(b, GameObject::new("c", m)).unwrap();

        assert!(matches!(graph.add_child(c, a), Err(SceneError::Cycle { .. })));
        assert!(matches!(graph.add_child(a, a), Err(SceneError::Cycle { .. })));
        assert!(graph.children(c).is_empty());
    }

    #[test]
    fn test_second_parent_rejected() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let a = graph.spawn(GameObject::new("a", m)).unwrap();
        let b = graph.spawn(GameObject::new("b", m)).unwrap();
        let c = graph.spawn(GameObject::new("c", m)).unwrap();
        graph.add_child(a, c).unwrap();

        assert_eq!(
            graph.add_child(b, c),
            Err(SceneError::AlreadyParented {
                child: "c".to_string(),
                parent: "a".to_string()
            })
        );
        assert_eq!(graph.children(a), &[c]);
        assert!(graph.children(b).is_empty());
    }

    #[test]
    fn test_world_equals_parent_world_times_local() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let root = graph
            .spawn(GameObject::new("root", m).with_position(Vec3::new(0.0, 2.0, 0.0)).with_uniform_scale(3.0))
            .unwrap();
        let mid = graph
            .spawn_child(root, GameObject::new("mid", m).with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let leaf = graph
            .spawn_child(mid, GameObject::new("leaf", m).with_position(Vec3::new(0.0, 0.0, 2.0)))
            .unwrap();
        graph.get_mut(mid).unwrap().transform_mut().set_rotation_euler(0.0, 0.7, 0.0);

        graph.update(0.016);

        for (parent, child) in [(root, mid), (mid, leaf)] {
            let expected = graph.world_matrix(parent).unwrap() * graph.get(child).unwrap().local_matrix();
            assert_relative_eq!(graph.world_matrix(child).unwrap(), expected, epsilon = 1e-5);
            assert_relative_eq!(
                graph.world_matrix(child).unwrap(),
                graph.world_matrix_on_demand(child).unwrap(),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_every_node_updated_once_per_tick() {
        let (_, m) = material();
        let counter = Rc::new(Cell::new(0));
        let mut graph = SceneGraph::new();

        for r in 0..3 {
            let root = graph
                .spawn(GameObject::new(format!("r{r}"), m).with_behaviour(CountUpdates(counter.clone())))
                .unwrap();
            for c in 0..3 {
                let child = graph
                    .spawn_child(
                        root,
                        GameObject::new(format!("r{r}c{c}"), m).with_behaviour(CountUpdates(counter.clone())),
                    )
                    .unwrap();
                for g in 0..3 {
                    graph
                        .spawn_child(
                            child,
                            GameObject::new(format!("r{r}c{c}g{g}"), m)
                                .with_behaviour(CountUpdates(counter.clone())),
                        )
                        .unwrap();
                }
            }
        }
        assert_eq!(graph.len(), 39);
        assert_eq!(graph.root_count(), 3);

        assert_eq!(graph.update(0.016), 39);
        assert_eq!(counter.get(), 39);

        assert_eq!(graph.update(0.016), 39);
        assert_eq!(counter.get(), 78);
    }

    #[test]
    fn test_ring_positions_survive_zero_dt_update() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let ring = ring_positions(12, 10.0, 2.0);
        let ids: Vec<NodeId> = ring
            .iter()
            .enumerate()
            .map(|(i, p)| graph.spawn(GameObject::new(format!("torus_{i}"), m).with_position(*p)).unwrap())
            .collect();

        // Stale caches so the update has something to refresh
        for id in &ids {
            graph.get_mut(*id).unwrap().world_matrix = Mat4::zeros();
        }
        graph.update(0.0);

        for (id, expected) in ids.iter().zip(&ring) {
            assert_relative_eq!(graph.get(*id).unwrap().transform().position, *expected);
            assert_relative_eq!(graph.world_position(*id).unwrap(), *expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_attach_refreshes_child_world() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let parent = graph
            .spawn(GameObject::new("parent", m).with_position(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        let child = graph
            .spawn(GameObject::new("child", m).with_position(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();

        graph.add_child(parent, child).unwrap();
        assert_relative_eq!(graph.world_position(child).unwrap(), Vec3::new(5.0, 1.0, 0.0));
    }

    #[test]
    fn test_destroy_removes_descendants() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let a = graph.spawn(GameObject::new("a", m)).unwrap();
        let b = graph.spawn_child(a, GameObject::new("b", m)).unwrap();
        let c = graph.spawn_child(b, GameObject::new("c", m)).unwrap();
        let keep = graph.spawn_child(a, GameObject::new("keep", m)).unwrap();

        assert_eq!(graph.destroy(b), Ok(2));
        assert!(!graph.contains(c));
        assert_eq!(graph.find("c"), None);
        assert_eq!(graph.children(a), &[keep]);

        // The name is free again
        graph.spawn(GameObject::new("b", m)).unwrap();

        assert_eq!(graph.destroy(a), Ok(2));
        assert_eq!(graph.root_count(), 1);
    }

    #[test]
    fn test_setters_forward_to_transform() {
        let (_, m) = material();
        let mut graph = SceneGraph::new();
        let id = graph.spawn(GameObject::new("sphere", m)).unwrap();

        graph.set_position(id, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        graph.set_uniform_scale(id, 3.0).unwrap();
        let t = graph.get(id).unwrap().transform();
        assert_relative_eq!(t.position, Vec3::new(0.0, 5.0, 0.0));
        assert_relative_eq!(t.scale, Vec3::repeat(3.0));
    }
}
