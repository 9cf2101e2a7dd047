//! Contract of the room SDK.
//!
//! Everything behind these traits (tracking, anchor persistence, room
//! restoration) belongs to the SDK and is only consumed here.

mod tracking;

pub use tracking::{CameraSnapshot, HitResult, PlaneAlignment, PlaneAnchor, Tracker};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::Receiver;
use glam::Vec3;

/// An object the SDK keeps in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomObject {
    pub id: String,
    pub position: Vec3,
    pub euler_angles: Vec3,
}

impl RoomObject {
    pub fn new(id: impl Into<String>, position: Vec3, euler_angles: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            euler_angles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDescriptor {
    pub id: String,
    pub name: String,
}

/// The recognizable surface a room is re-localized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterAnchor {
    pub id: String,
    pub image_url: Option<String>,
}

/// Feature points collected while scanning a new room.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomScan {
    pub points: Vec<Vec3>,
}

/// One frame of an ongoing room scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFrame {
    pub points: Vec<Vec3>,
    /// Fraction of the scan completed, `1.0` or more when done.
    pub progress: f32,
}

/// Result of scanning the master anchor, either for a new room or to
/// re-localize a restored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterAnchorScan {
    pub anchor_id: String,
}

/// Asynchronous notifications the SDK delivers for an open room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Objects recognized after a restored room was re-localized.
    ObjectsFound(Vec<RoomObject>),
    ObjectAdded(RoomObject),
    ObjectsUpdated(Vec<RoomObject>),
    Error(SdkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkErrorKind {
    NotFound,
    Network,
    Rejected,
    Internal,
}

impl fmt::Display for SdkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SdkErrorKind::NotFound => "not found",
            SdkErrorKind::Network => "network",
            SdkErrorKind::Rejected => "rejected",
            SdkErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error reported by the room SDK. Opaque to this crate, passed through as is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct SdkError {
    pub kind: SdkErrorKind,
    pub message: String,
}

impl SdkError {
    pub fn new(kind: SdkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sink for new objects. The SDK answers with [`RoomEvent::ObjectAdded`].
pub trait ObjectPlacer: Send + Sync {
    fn add_object(&self, room_id: &str, position: Vec3, euler_angles: Vec3);
}

/// Handle to an open room.
pub struct Room {
    pub id: String,
    pub name: String,
    pub master_anchor: MasterAnchor,
    placer: Arc<dyn ObjectPlacer>,
    events: Receiver<RoomEvent>,
}

impl Room {
    pub fn new(
        descriptor: RoomDescriptor,
        master_anchor: MasterAnchor,
        placer: Arc<dyn ObjectPlacer>,
        events: Receiver<RoomEvent>,
    ) -> Self {
        Self {
            id: descriptor.id,
            name: descriptor.name,
            master_anchor,
            placer,
            events,
        }
    }

    /// Fire-and-forget; the object shows up later on the event stream.
    pub fn add_object(&self, position: Vec3, euler_angles: Vec3) {
        self.placer.add_object(&self.id, position, euler_angles);
    }

    pub fn events(&self) -> Receiver<RoomEvent> {
        self.events.clone()
    }

    pub fn descriptor(&self) -> RoomDescriptor {
        RoomDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("master_anchor", &self.master_anchor)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(
        &self,
        name: &str,
        scan: RoomScan,
        master_anchor: MasterAnchorScan,
    ) -> Result<Room, SdkError>;

    async fn restore_room(&self, id: &str) -> Result<Room, SdkError>;

    async fn delete_room(&self, id: &str) -> Result<(), SdkError>;

    async fn near_rooms(&self) -> Result<Vec<RoomDescriptor>, SdkError>;
}
