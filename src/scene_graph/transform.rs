use glam::{EulerRot, Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// Converts SceneKit-style euler angles `(pitch, yaw, roll)` into a rotation.
pub fn euler_to_quat(euler_angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::YXZ, euler_angles.y, euler_angles.x, euler_angles.z)
}

pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(pitch, yaw, roll)
}

#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self::from_pose(translation, Quat::IDENTITY)
    }

    pub fn from_pose(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: 1.0,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn local_matrix(&self) -> Ref<'_, Mat4> {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    pub fn world_matrix(&self) -> Ref<'_, Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn set_pose(&mut self, translation: Vec3, rotation: Quat) {
        self.translation = translation;
        self.rotation = rotation;
        self.invalidate_local();
    }

    /// Replaces translation and rotation from a position and euler angles
    /// as delivered by the room SDK. Scale is left untouched.
    pub fn set_euler_pose(&mut self, position: Vec3, euler_angles: Vec3) {
        self.set_pose(position, euler_to_quat(euler_angles));
    }

    /// Decomposes a rigid matrix into translation and rotation.
    pub fn set_from_matrix(&mut self, matrix: Mat4) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale.max_element();
        self.invalidate_local();
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn euler_angles(&self) -> Vec3 {
        quat_to_euler(self.rotation)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn yaw_rotates_forward_axis_around_up() {
        let rotation = euler_to_quat(Vec3::new(0.0, FRAC_PI_2, 0.0));
        let forward = rotation * Vec3::NEG_Z;

        assert!(forward.abs_diff_eq(Vec3::NEG_X, 1e-5), "{forward:?}");
    }

    #[test]
    fn local_matrix_is_rebuilt_after_pose_change() {
        let mut transform = Transform::from_translation(Vec3::X);
        assert_eq!(transform.local_matrix().w_axis.truncate(), Vec3::X);

        transform.set_euler_pose(Vec3::new(0.0, 2.0, -1.0), Vec3::ZERO);

        assert!(transform.is_world_dirty());
        assert_eq!(
            transform.local_matrix().w_axis.truncate(),
            Vec3::new(0.0, 2.0, -1.0)
        );
    }

    #[test]
    fn euler_angles_survive_the_quaternion_trip() {
        let mut transform = Transform::default();
        let euler = Vec3::new(0.2, -1.1, 0.05);
        transform.set_euler_pose(Vec3::ZERO, euler);

        assert!(transform.euler_angles().abs_diff_eq(euler, 1e-5));
    }
}
