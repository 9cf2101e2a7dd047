use std::collections::{HashMap, VecDeque};

use itertools::Itertools;

use crate::room::RoomObject;
use crate::scene_graph::{NodeId, Scene, SceneNode};

/// What to do with an update for an object that has no node yet.
///
/// The SDK does not order "added" and "updated" deliveries for the same
/// object, so an update can overtake the add it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Ignore it.
    Drop,
    /// Park the latest update per id until the add arrives. At most
    /// `capacity` ids are parked; the oldest one is evicted first.
    Buffer { capacity: usize },
}

impl UpdatePolicy {
    pub const DEFAULT_PENDING_CAPACITY: usize = 64;
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::Buffer {
            capacity: Self::DEFAULT_PENDING_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Parked,
    Dropped,
}

/// Maps room object ids to the scene nodes drawing them.
///
/// Every method takes the scene it attaches to, so in practice it is only
/// touched from the mutation queue worker.
pub struct NodeRegistry {
    nodes: HashMap<String, NodeId>,
    pending: VecDeque<RoomObject>,
    policy: UpdatePolicy,
}

impl NodeRegistry {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self {
            nodes: HashMap::new(),
            pending: VecDeque::new(),
            policy,
        }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Adds `node` under the scene root and registers it for `id`. A node
    /// already registered for `id` is detached.
    pub fn insert_or_replace(&mut self, scene: &mut Scene, id: &str, node: SceneNode) -> NodeId {
        let node_id = scene.add_node(node);
        scene.attach(node_id, scene.root());

        if let Some(previous) = self.nodes.insert(id.to_string(), node_id) {
            log::debug!("Replacing node for object {id}");
            scene.detach(previous);
        }

        if let Some(index) = self.pending.iter().position(|object| object.id == id) {
            if let Some(update) = self.pending.remove(index) {
                log::debug!("Applying parked update for object {id}");
                scene.set_node_euler_pose(node_id, update.position, update.euler_angles);
            }
        }

        node_id
    }

    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Moves the node of `object` to its new pose, or handles the miss
    /// according to the policy.
    pub fn apply_update(&mut self, scene: &mut Scene, object: &RoomObject) -> UpdateOutcome {
        if let Some(node_id) = self.lookup(&object.id) {
            scene.set_node_euler_pose(node_id, object.position, object.euler_angles);
            return UpdateOutcome::Applied;
        }

        match self.policy {
            UpdatePolicy::Drop => {
                log::debug!("Dropping update for unknown object {}", object.id);
                UpdateOutcome::Dropped
            }
            UpdatePolicy::Buffer { capacity: 0 } => UpdateOutcome::Dropped,
            UpdatePolicy::Buffer { capacity } => {
                self.pending.retain(|parked| parked.id != object.id);
                while self.pending.len() >= capacity {
                    if let Some(evicted) = self.pending.pop_front() {
                        log::warn!("Evicting parked update for object {}", evicted.id);
                    }
                }
                self.pending.push_back(object.clone());
                UpdateOutcome::Parked
            }
        }
    }

    /// Detaches every registered node and forgets them, along with any parked
    /// updates. Returns how many nodes were removed.
    pub fn remove_all(&mut self, scene: &mut Scene) -> usize {
        let removed = self.nodes.len();
        for (_, node_id) in self.nodes.drain() {
            scene.detach(node_id);
        }
        self.pending.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().sorted().collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn object(id: &str, x: f32) -> RoomObject {
        RoomObject::new(id, Vec3::new(x, 0.0, 0.0), Vec3::ZERO)
    }

    fn translation(scene: &Scene, node_id: NodeId) -> Vec3 {
        scene.node(node_id).unwrap().transform.translation()
    }

    #[test]
    fn replacing_detaches_the_previous_node() {
        let mut scene = Scene::new();
        let mut registry = NodeRegistry::new(UpdatePolicy::Drop);

        let first = registry.insert_or_replace(&mut scene, "a", SceneNode::default());
        let second = registry.insert_or_replace(&mut scene, "a", SceneNode::default());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("a"), Some(second));
        assert!(!scene.is_attached(first));
        assert!(scene.is_attached(second));
    }

    #[test]
    fn drop_policy_ignores_unknown_ids() {
        let mut scene = Scene::new();
        let mut registry = NodeRegistry::new(UpdatePolicy::Drop);
        let nodes_before = scene.attached_count();

        let outcome = registry.apply_update(&mut scene, &object("ghost", 1.0));

        assert_eq!(outcome, UpdateOutcome::Dropped);
        assert!(registry.is_empty());
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(scene.attached_count(), nodes_before);
    }

    #[test]
    fn parked_update_is_applied_when_the_object_arrives() {
        let mut scene = Scene::new();
        let mut registry = NodeRegistry::new(UpdatePolicy::default());

        assert_eq!(
            registry.apply_update(&mut scene, &object("a", 1.0)),
            UpdateOutcome::Parked
        );
        assert_eq!(
            registry.apply_update(&mut scene, &object("a", 2.0)),
            UpdateOutcome::Parked
        );
        assert!(registry.is_empty());
        assert_eq!(registry.pending_len(), 1);

        let node_id = registry.insert_or_replace(&mut scene, "a", SceneNode::default());

        assert_eq!(registry.pending_len(), 0);
        assert_eq!(translation(&scene, node_id), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn oldest_parked_update_is_evicted_at_capacity() {
        let mut scene = Scene::new();
        let mut registry = NodeRegistry::new(UpdatePolicy::Buffer { capacity: 2 });

        registry.apply_update(&mut scene, &object("a", 1.0));
        registry.apply_update(&mut scene, &object("b", 1.0));
        registry.apply_update(&mut scene, &object("c", 1.0));
        assert_eq!(registry.pending_len(), 2);

        let a = registry.insert_or_replace(&mut scene, "a", SceneNode::default());
        let c = registry.insert_or_replace(&mut scene, "c", SceneNode::default());

        assert_eq!(translation(&scene, a), Vec3::ZERO);
        assert_eq!(translation(&scene, c), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn remove_all_detaches_every_node() {
        let mut scene = Scene::new();
        let mut registry = NodeRegistry::new(UpdatePolicy::default());
        let nodes: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|id| registry.insert_or_replace(&mut scene, id, SceneNode::default()))
            .collect();
        registry.apply_update(&mut scene, &object("late", 0.0));

        assert_eq!(registry.ids(), vec!["a", "b", "c"]);
        assert_eq!(registry.remove_all(&mut scene), 3);

        assert!(registry.is_empty());
        assert_eq!(registry.pending_len(), 0);
        assert!(nodes.iter().all(|&node| !scene.is_attached(node)));
        assert_eq!(scene.attached_count(), 2);
    }
}
