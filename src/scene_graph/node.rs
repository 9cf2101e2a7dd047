use glam::Vec3;
use id_arena::Id;

use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub type NodeId = Id<SceneNode>;

/// What a node draws. Resources are referenced by name; loading them is the
/// renderer's business.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Model(String),
    PointCloud(Vec<Vec3>),
    Reticle,
}

pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub geometry: Option<Geometry>,
    pub hidden: bool,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, geometry: Option<Geometry>) -> Self {
        Self {
            name: name.into(),
            geometry,
            ..Default::default()
        }
    }

    pub fn parent<'a>(&self, scene: &'a Scene) -> Option<&'a SceneNode> {
        self.parent_id.and_then(|id| scene.node(id))
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b SceneNode> + 'b
    where
        'a: 'b,
    {
        self.child_ids.iter().filter_map(move |id| scene.node(*id))
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            geometry: None,
            hidden: false,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}

/// The fixed visual every placed room object is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub name: String,
    pub geometry: Geometry,
    pub scale: f32,
}

impl NodeTemplate {
    pub fn instantiate(&self) -> SceneNode {
        let mut node = SceneNode::new(self.name.clone(), Some(self.geometry.clone()));
        node.transform.set_scale(self.scale);
        node
    }
}

impl Default for NodeTemplate {
    fn default() -> Self {
        Self {
            name: "candle".to_string(),
            geometry: Geometry::Model("art/candle.glb".to_string()),
            scale: 1.0,
        }
    }
}
