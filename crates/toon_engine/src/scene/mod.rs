//! Scene graph: nodes, the roots registry, behaviours and the scene context

pub mod behaviour;
pub mod context;
pub mod game_object;
pub mod layout;
pub mod scene_graph;

pub use behaviour::{Behaviour, HueCycle, LightOrbit, NodeState, Spin};
pub use context::{LightSource, ModeMaterials, SceneContext};
pub use game_object::GameObject;
pub use scene_graph::{SceneError, SceneGraph};

slotmap::new_key_type! {
    /// Key of a node in the scene graph
    pub struct NodeId;
}
