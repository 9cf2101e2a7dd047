use glam::{Quat, Vec3};

use crate::config::PipelineConfig;
use crate::focus::{FocusIndicator, FocusState};
use crate::registry::{NodeRegistry, UpdateOutcome};
use crate::room::RoomObject;
use crate::scene_graph::{Geometry, NodeId, NodeTemplate, Scene, SceneNode};

/// Identifies one open room on the scene. Tasks queued for a session that
/// has ended are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Everything the mutation queue worker owns.
pub struct SceneState {
    pub scene: Scene,
    pub registry: NodeRegistry,
    pub focus: FocusIndicator,
    template: NodeTemplate,
    scan_preview: Option<NodeId>,
    session: Option<SessionId>,
    sessions_opened: u64,
}

impl SceneState {
    pub fn new(config: &PipelineConfig) -> Self {
        let mut scene = Scene::new();
        let focus = FocusIndicator::new(&mut scene, &config.focus);

        Self {
            scene,
            registry: NodeRegistry::new(config.update_policy),
            focus,
            template: config.template.clone(),
            scan_preview: None,
            session: None,
            sessions_opened: 0,
        }
    }

    /// Starts drawing a new room. Any previous session is torn down first.
    pub fn begin_session(&mut self) -> SessionId {
        if let Some(previous) = self.session {
            self.end_session(previous);
        }
        self.sessions_opened += 1;
        let session = SessionId(self.sessions_opened);
        self.session = Some(session);
        self.focus.apply(&mut self.scene, FocusState::Initializing);
        session
    }

    pub fn is_current(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    /// Tears the room down if `session` is still the open one. Returns the
    /// number of object nodes removed.
    pub fn end_session(&mut self, session: SessionId) -> usize {
        if !self.is_current(session) {
            return 0;
        }
        self.session = None;
        self.teardown()
    }

    /// Draws a room object with the template visual.
    pub fn spawn_object(&mut self, object: &RoomObject) -> NodeId {
        let mut node = self.template.instantiate();
        node.transform
            .set_euler_pose(object.position, object.euler_angles);
        log::debug!("Drawing object {} at {}", object.id, object.position);
        self.registry
            .insert_or_replace(&mut self.scene, &object.id, node)
    }

    pub fn update_object(&mut self, object: &RoomObject) -> UpdateOutcome {
        self.registry.apply_update(&mut self.scene, object)
    }

    /// Pose of the node drawing `id`, while it is in the scene.
    pub fn object_pose(&self, id: &str) -> Option<(Vec3, Quat)> {
        let node_id = self.registry.lookup(id)?;
        if !self.scene.is_attached(node_id) {
            return None;
        }
        let transform = &self.scene.node(node_id)?.transform;
        Some((transform.translation(), transform.rotation()))
    }

    pub fn attached_object_count(&self) -> usize {
        self.registry
            .node_ids()
            .filter(|&node_id| self.scene.is_attached(node_id))
            .count()
    }

    /// Replaces the scan preview points, creating the preview node first.
    pub fn show_scan_points(&mut self, points: Vec<Vec3>) {
        let node_id = match self.scan_preview {
            Some(node_id) => node_id,
            None => {
                let node_id = self.scene.add_node(SceneNode::new("room-scan", None));
                self.scan_preview = Some(node_id);
                node_id
            }
        };

        if !self.scene.is_attached(node_id) {
            self.scene.attach(node_id, self.scene.root());
        }
        self.scene
            .set_node_geometry(node_id, Some(Geometry::PointCloud(points)));
    }

    pub fn hide_scan_preview(&mut self) {
        if let Some(node_id) = self.scan_preview {
            self.scene.detach(node_id);
        }
    }

    pub fn scan_preview(&self) -> Option<NodeId> {
        self.scan_preview
    }

    /// Clears the room from the scene: the indicator goes away and every
    /// object node is detached.
    pub fn teardown(&mut self) -> usize {
        self.focus.reset(&mut self.scene);
        self.hide_scan_preview();
        let removed = self.registry.remove_all(&mut self.scene);
        log::info!("Removed {removed} object nodes from the scene");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_objects_use_the_template() {
        let mut state = SceneState::new(&PipelineConfig::default());
        let object = RoomObject::new("o1", Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO);

        let node_id = state.spawn_object(&object);

        let node = state.scene.node(node_id).unwrap();
        assert_eq!(node.name, "candle");
        assert_eq!(
            state.object_pose("o1").map(|(position, _)| position),
            Some(object.position)
        );
    }

    #[test]
    fn ending_a_stale_session_is_a_no_op() {
        let mut state = SceneState::new(&PipelineConfig::default());
        let first = state.begin_session();
        state.spawn_object(&RoomObject::new("o1", Vec3::ZERO, Vec3::ZERO));
        let second = state.begin_session();

        assert!(!state.is_current(first));
        assert!(state.is_current(second));
        assert_eq!(state.registry.len(), 0);

        state.spawn_object(&RoomObject::new("o2", Vec3::ZERO, Vec3::ZERO));
        assert_eq!(state.end_session(first), 0);
        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.end_session(second), 1);
        assert!(!state.is_current(second));
    }

    #[test]
    fn teardown_leaves_only_root_and_camera() {
        let mut state = SceneState::new(&PipelineConfig::default());
        state.spawn_object(&RoomObject::new("o1", Vec3::ZERO, Vec3::ZERO));
        state.spawn_object(&RoomObject::new("o2", Vec3::X, Vec3::ZERO));
        state.show_scan_points(vec![Vec3::ONE]);

        assert_eq!(state.teardown(), 2);

        assert_eq!(state.attached_object_count(), 0);
        assert_eq!(state.scene.attached_count(), 2);
    }
}
