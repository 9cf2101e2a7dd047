use glam::{Mat4, Quat, Vec2, Vec3};

/// Device camera pose at the time of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub transform: Mat4,
}

impl CameraSnapshot {
    pub fn new(transform: Mat4) -> Self {
        Self { transform }
    }

    pub fn looking_from(position: Vec3, yaw: f32) -> Self {
        Self::new(Mat4::from_rotation_translation(
            Quat::from_rotation_y(yaw),
            position,
        ))
    }

    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// The direction the camera looks at, its `-Z` axis in world space.
    pub fn forward(&self) -> Vec3 {
        self.transform.transform_vector3(Vec3::NEG_Z)
    }

    /// Heading around the up axis, zero when looking down `-Z`.
    pub fn heading(&self) -> f32 {
        let forward = self.forward();
        (-forward.x).atan2(-forward.z)
    }

    /// Yaw-only euler angles matching the camera heading.
    pub fn heading_euler(&self) -> Vec3 {
        Vec3::new(0.0, self.heading(), 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneAlignment {
    Horizontal,
    Vertical { normal: Vec3 },
}

/// A detected planar surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneAnchor {
    pub center: Vec3,
    pub extent: Vec2,
    pub alignment: PlaneAlignment,
}

impl PlaneAnchor {
    pub fn horizontal(center: Vec3, extent: Vec2) -> Self {
        Self {
            center,
            extent,
            alignment: PlaneAlignment::Horizontal,
        }
    }

    pub fn vertical(center: Vec3, extent: Vec2, normal: Vec3) -> Self {
        Self {
            center,
            extent,
            alignment: PlaneAlignment::Vertical { normal },
        }
    }

    pub fn normal(&self) -> Vec3 {
        match self.alignment {
            PlaneAlignment::Horizontal => Vec3::Y,
            PlaneAlignment::Vertical { normal } => normal.normalize_or_zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub point: Vec3,
    pub plane: Option<PlaneAnchor>,
    pub camera: Option<CameraSnapshot>,
}

/// Per-frame queries against the device's tracking.
pub trait Tracker: Send {
    /// Intersects the ray through `screen_point` (normalized view
    /// coordinates) with tracked geometry. `bias` is the last known
    /// indicator position, used to prefer nearby surfaces.
    fn hit_test(&self, screen_point: Vec2, bias: Option<Vec3>) -> Option<HitResult>;

    fn current_camera(&self) -> Option<CameraSnapshot> {
        None
    }
}
