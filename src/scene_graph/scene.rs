use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::scene_graph::node::{Geometry, NodeId, SceneNode};

/// Node arena with a fixed root and a camera node hanging off it.
///
/// Nodes are never freed. Removing a node from the scene means detaching it
/// from its parent; a detached subtree is not drawn and is not reachable from
/// the root.
pub struct Scene {
    nodes: Arena<SceneNode>,
    root: NodeId,
    camera: NodeId,
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(SceneNode::new("root", None));
        let camera = nodes.alloc(SceneNode::new("camera", None));

        let mut scene = Self {
            nodes,
            root,
            camera,
        };
        scene.set_node_parent(camera, Some(root));
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn camera(&self) -> NodeId {
        self.camera
    }

    /// Allocates a detached node.
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    pub fn attach(&mut self, id: NodeId, parent: NodeId) {
        self.set_node_parent(id, Some(parent));
    }

    pub fn detach(&mut self, id: NodeId) {
        self.set_node_parent(id, None);
    }

    /// Whether the node can be reached from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|node| node.parent_id);
        }
        false
    }

    /// Number of nodes reachable from the root, root included.
    pub fn attached_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                count += 1;
                stack.extend(node.child_ids.iter().copied());
            }
        }
        count
    }

    /// Sets the parent of a node and updates child relationships
    pub fn set_node_parent(&mut self, child_id: NodeId, new_parent_id: Option<NodeId>) {
        // Remove from old parent's children list
        if let Some(child) = self.nodes.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.nodes.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.nodes.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_node_hierarchy(child_id);
    }

    /// Invalidates world transforms for a node and all its descendants
    pub fn invalidate_node_hierarchy(&self, node_id: NodeId) {
        if let Some(node) = self.nodes.get(node_id) {
            node.transform.invalidate_world();

            for &child_id in &node.child_ids {
                self.invalidate_node_hierarchy(child_id);
            }
        }
    }

    pub fn set_node_pose(&mut self, node_id: NodeId, translation: Vec3, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.transform.set_pose(translation, rotation);
        }
        self.invalidate_node_hierarchy(node_id);
    }

    pub fn set_node_euler_pose(&mut self, node_id: NodeId, position: Vec3, euler_angles: Vec3) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.transform.set_euler_pose(position, euler_angles);
        }
        self.invalidate_node_hierarchy(node_id);
    }

    /// Moves the camera node to a tracked camera transform.
    pub fn set_camera_transform(&mut self, camera_transform: Mat4) {
        if let Some(node) = self.nodes.get_mut(self.camera) {
            node.transform.set_from_matrix(camera_transform);
        }
        self.invalidate_node_hierarchy(self.camera);
    }

    pub fn set_node_geometry(&mut self, node_id: NodeId, geometry: Option<Geometry>) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.geometry = geometry;
        }
    }

    pub fn set_node_hidden(&mut self, node_id: NodeId, hidden: bool) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.hidden = hidden;
        }
    }

    /// Brings world matrices of attached nodes up to date.
    pub fn update_transforms(&self) {
        self.update_node_transform_recursive(self.root, Mat4::IDENTITY);
    }

    fn update_node_transform_recursive(&self, node_id: NodeId, parent_world_matrix: Mat4) {
        if let Some(node) = self.nodes.get(node_id) {
            if node.transform.is_world_dirty() {
                let local_matrix = *node.transform.local_matrix();
                node.transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *node.transform.world_matrix();
            for &child_id in &node.child_ids {
                self.update_node_transform_recursive(child_id, world_matrix);
            }
        }
    }

    /// World matrix of an attached node, `None` for detached ones.
    pub fn world_matrix(&self, node_id: NodeId) -> Option<Mat4> {
        if !self.is_attached(node_id) {
            return None;
        }
        self.update_transforms();
        self.nodes
            .get(node_id)
            .map(|node| *node.transform.world_matrix())
    }

    pub fn world_position(&self, node_id: NodeId) -> Option<Vec3> {
        self.world_matrix(node_id)
            .map(|matrix| matrix.w_axis.truncate())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scene_has_camera_under_root() {
        let scene = Scene::new();

        assert!(scene.is_attached(scene.camera()));
        assert_eq!(scene.attached_count(), 2);
        let camera = scene.node(scene.camera()).unwrap();
        assert_eq!(camera.parent_id, Some(scene.root()));
    }

    #[test]
    fn reparenting_moves_node_between_child_lists() {
        let mut scene = Scene::new();
        let node = scene.add_node(SceneNode::new("marker", Some(Geometry::Reticle)));
        assert!(!scene.is_attached(node));

        scene.attach(node, scene.camera());
        assert!(scene.node(scene.camera()).unwrap().child_ids.contains(&node));

        scene.attach(node, scene.root());
        assert!(!scene.node(scene.camera()).unwrap().child_ids.contains(&node));
        assert_eq!(
            scene
                .node(scene.root())
                .unwrap()
                .child_ids
                .iter()
                .filter(|&&id| id == node)
                .count(),
            1
        );

        scene.detach(node);
        assert!(!scene.is_attached(node));
        assert_eq!(scene.world_position(node), None);
    }

    #[test]
    fn child_world_position_follows_camera() {
        let mut scene = Scene::new();
        let node = scene.add_node(SceneNode::default());
        scene.attach(node, scene.camera());
        scene.set_node_pose(node, Vec3::new(0.0, 0.0, -0.5), Quat::IDENTITY);

        scene.set_camera_transform(Mat4::from_translation(Vec3::new(1.0, 1.5, 0.0)));
        let position = scene.world_position(node).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(1.0, 1.5, -0.5), 1e-5));

        scene.set_camera_transform(Mat4::from_translation(Vec3::new(-2.0, 0.0, 3.0)));
        let position = scene.world_position(node).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(-2.0, 0.0, 2.5), 1e-5));
    }
}
