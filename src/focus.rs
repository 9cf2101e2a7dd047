//! The floating reticle showing where a new object would be placed.
//!
//! [`FocusIndicator`] is the node side and lives with the rest of the scene
//! on the mutation queue worker. [`FocusUpdater`] is driven by the frame
//! callback: it hit-tests, decides the next state and hands the change to the
//! queue as a single task.

use glam::{Quat, Vec2, Vec3};

use crate::config::FocusConfig;
use crate::mutation_queue::{MutationQueue, QueueClosed};
use crate::room::{CameraSnapshot, HitResult, PlaneAlignment, PlaneAnchor, Tracker};
use crate::scene_graph::{Geometry, NodeId, Scene, SceneNode};
use crate::state::SessionId;

#[derive(Debug, Clone, PartialEq)]
pub enum FocusState {
    /// Nothing found yet, the indicator floats in front of the camera.
    Initializing,
    FeaturesDetected {
        point: Vec3,
        camera: Option<CameraSnapshot>,
    },
    PlaneDetected {
        point: Vec3,
        plane: PlaneAnchor,
        camera: Option<CameraSnapshot>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusPhase {
    Initializing,
    FeaturesDetected,
    PlaneDetected,
}

impl FocusState {
    pub fn from_hit(hit: Option<HitResult>) -> Self {
        match hit {
            None => FocusState::Initializing,
            Some(HitResult {
                point,
                plane: None,
                camera,
            }) => FocusState::FeaturesDetected { point, camera },
            Some(HitResult {
                point,
                plane: Some(plane),
                camera,
            }) => FocusState::PlaneDetected {
                point,
                plane,
                camera,
            },
        }
    }

    pub fn phase(&self) -> FocusPhase {
        match self {
            FocusState::Initializing => FocusPhase::Initializing,
            FocusState::FeaturesDetected { .. } => FocusPhase::FeaturesDetected,
            FocusState::PlaneDetected { .. } => FocusPhase::PlaneDetected,
        }
    }

    /// World position the indicator sits at, if it is located.
    pub fn point(&self) -> Option<Vec3> {
        match self {
            FocusState::Initializing => None,
            FocusState::FeaturesDetected { point, .. }
            | FocusState::PlaneDetected { point, .. } => Some(*point),
        }
    }
}

fn heading_rotation(camera: Option<&CameraSnapshot>) -> Quat {
    camera
        .map(|camera| Quat::from_rotation_y(camera.heading()))
        .unwrap_or(Quat::IDENTITY)
}

fn plane_rotation(plane: &PlaneAnchor, camera: Option<&CameraSnapshot>) -> Quat {
    match plane.alignment {
        PlaneAlignment::Horizontal => heading_rotation(camera),
        PlaneAlignment::Vertical { .. } => Quat::from_rotation_arc(Vec3::Y, plane.normal()),
    }
}

pub struct FocusIndicator {
    node: NodeId,
    state: FocusState,
    last_position: Option<Vec3>,
    distance: f32,
}

impl FocusIndicator {
    /// Creates the indicator node in the searching position.
    pub fn new(scene: &mut Scene, config: &FocusConfig) -> Self {
        let node = scene.add_node(SceneNode::new("focus", Some(Geometry::Reticle)));
        let mut indicator = Self {
            node,
            state: FocusState::Initializing,
            last_position: None,
            distance: config.distance,
        };
        indicator.apply(scene, FocusState::Initializing);
        indicator
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Last position where a surface was found.
    pub fn last_position(&self) -> Option<Vec3> {
        self.last_position
    }

    /// Re-parents and moves the node for `state`.
    pub fn apply(&mut self, scene: &mut Scene, state: FocusState) {
        match &state {
            FocusState::Initializing => {
                scene.attach(self.node, scene.camera());
                scene.set_node_pose(
                    self.node,
                    Vec3::new(0.0, 0.0, -self.distance),
                    Quat::IDENTITY,
                );
            }
            FocusState::FeaturesDetected { point, camera } => {
                scene.attach(self.node, scene.root());
                scene.set_node_pose(self.node, *point, heading_rotation(camera.as_ref()));
                self.last_position = Some(*point);
            }
            FocusState::PlaneDetected {
                point,
                plane,
                camera,
            } => {
                scene.attach(self.node, scene.root());
                scene.set_node_pose(self.node, *point, plane_rotation(plane, camera.as_ref()));
                self.last_position = Some(*point);
            }
        }

        scene.set_node_hidden(self.node, false);
        self.state = state;
    }

    /// Takes the indicator out of the scene at the end of a room session.
    pub fn reset(&mut self, scene: &mut Scene) {
        scene.detach(self.node);
        scene.set_node_hidden(self.node, true);
        self.state = FocusState::Initializing;
        self.last_position = None;
    }
}

/// Frame-side half of the indicator, owned by whoever delivers frames.
pub struct FocusUpdater {
    queue: MutationQueue,
    session: SessionId,
    screen_center: Vec2,
    bias: Option<Vec3>,
    history: Vec<FocusPhase>,
}

impl FocusUpdater {
    pub fn new(queue: MutationQueue, session: SessionId, config: &FocusConfig) -> Self {
        Self {
            queue,
            session,
            screen_center: config.screen_center,
            bias: None,
            history: Vec::new(),
        }
    }

    /// Runs one frame: hit-test, then queue exactly one mutation moving the
    /// camera node and the indicator.
    pub fn update(&mut self, tracker: &dyn Tracker) -> Result<FocusPhase, QueueClosed> {
        let hit = tracker.hit_test(self.screen_center, self.bias);
        let camera = hit
            .and_then(|hit| hit.camera)
            .or_else(|| tracker.current_camera());

        let state = FocusState::from_hit(hit);
        let phase = state.phase();
        if let Some(point) = state.point() {
            self.bias = Some(point);
        }

        let session = self.session;
        self.queue.submit(move |scene_state| {
            if !scene_state.is_current(session) {
                return;
            }
            if let Some(camera) = camera {
                scene_state.scene.set_camera_transform(camera.transform);
            }
            scene_state.focus.apply(&mut scene_state.scene, state);
        })?;

        self.history.push(phase);
        Ok(phase)
    }

    pub fn history(&self) -> &[FocusPhase] {
        &self.history
    }

    pub fn bias(&self) -> Option<Vec3> {
        self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn searching_indicator_floats_in_front_of_the_camera() {
        let mut scene = Scene::new();
        let indicator = FocusIndicator::new(&mut scene, &FocusConfig::default());

        scene.set_camera_transform(Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)));

        let node = scene.node(indicator.node()).unwrap();
        assert_eq!(node.parent_id, Some(scene.camera()));
        let position = scene.world_position(indicator.node()).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(0.0, 1.5, -0.5), 1e-5));
        assert_eq!(indicator.last_position(), None);
    }

    #[test]
    fn located_indicator_moves_to_the_root_and_remembers_the_point() {
        let mut scene = Scene::new();
        let mut indicator = FocusIndicator::new(&mut scene, &FocusConfig::default());
        let point = Vec3::new(1.0, 0.0, -2.0);

        indicator.apply(
            &mut scene,
            FocusState::FeaturesDetected {
                point,
                camera: Some(CameraSnapshot::looking_from(Vec3::Y, FRAC_PI_2)),
            },
        );

        assert_eq!(
            scene.node(indicator.node()).unwrap().parent_id,
            Some(scene.root())
        );
        assert_eq!(scene.world_position(indicator.node()), Some(point));
        assert_eq!(indicator.last_position(), Some(point));

        indicator.apply(&mut scene, FocusState::Initializing);
        assert_eq!(indicator.last_position(), Some(point));
    }

    #[test]
    fn vertical_plane_turns_the_indicator_to_its_normal() {
        let mut scene = Scene::new();
        let mut indicator = FocusIndicator::new(&mut scene, &FocusConfig::default());
        let plane = PlaneAnchor::vertical(Vec3::ZERO, Vec2::ONE, Vec3::Z);

        indicator.apply(
            &mut scene,
            FocusState::PlaneDetected {
                point: Vec3::ZERO,
                plane,
                camera: None,
            },
        );

        let rotation = scene.node(indicator.node()).unwrap().transform.rotation();
        assert!((rotation * Vec3::Y).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn reset_detaches_and_forgets() {
        let mut scene = Scene::new();
        let mut indicator = FocusIndicator::new(&mut scene, &FocusConfig::default());
        indicator.apply(
            &mut scene,
            FocusState::FeaturesDetected {
                point: Vec3::X,
                camera: None,
            },
        );

        indicator.reset(&mut scene);

        assert!(!scene.is_attached(indicator.node()));
        assert!(scene.node(indicator.node()).unwrap().hidden);
        assert_eq!(indicator.last_position(), None);
        assert_eq!(indicator.state(), &FocusState::Initializing);
    }
}
