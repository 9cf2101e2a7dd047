//! In-memory stand-ins for the room SDK and device tracking, used by the demo
//! binary and the tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use crossbeam_channel::Sender;
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::room::{
    CameraSnapshot, HitResult, MasterAnchor, MasterAnchorScan, ObjectPlacer, Room, RoomDescriptor,
    RoomEvent, RoomObject, RoomScan, RoomService, SdkError, SdkErrorKind, Tracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOperation {
    Create,
    Restore,
    Delete,
    NearRooms,
}

struct SimRoom {
    descriptor: RoomDescriptor,
    master_anchor: MasterAnchor,
    objects: Vec<RoomObject>,
    listeners: Vec<Sender<RoomEvent>>,
}

impl SimRoom {
    fn broadcast(&mut self, event: RoomEvent) {
        self.listeners
            .retain(|listener| listener.send(event.clone()).is_ok());
    }
}

#[derive(Default)]
struct SimInner {
    rooms: HashMap<String, SimRoom>,
    failures: HashMap<SimOperation, SdkError>,
    next_room: u32,
    next_object: u32,
}

/// Room service keeping everything in memory.
#[derive(Clone)]
pub struct SimRoomService {
    inner: Arc<Mutex<SimInner>>,
    latency: Duration,
}

impl SimRoomService {
    pub fn new(latency: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimInner::default())),
            latency,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        // A poisoned lock only means a test panicked while holding it.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn respond(&self, operation: SimOperation) -> Result<(), SdkError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.lock().failures.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: SimOperation, error: SdkError) {
        self.lock().failures.insert(operation, error);
    }

    /// Seeds a stored room with objects, as if created in an earlier run.
    pub fn seed_room(&self, name: &str, objects: Vec<RoomObject>) -> RoomDescriptor {
        let mut inner = self.lock();
        inner.next_room += 1;
        let descriptor = RoomDescriptor {
            id: format!("room-{}", inner.next_room),
            name: name.to_string(),
        };
        let master_anchor = MasterAnchor {
            id: format!("anchor-{}", inner.next_room),
            image_url: Some(format!("https://rooms.invalid/{}/anchor.jpg", descriptor.id)),
        };
        inner.rooms.insert(
            descriptor.id.clone(),
            SimRoom {
                descriptor: descriptor.clone(),
                master_anchor,
                objects,
                listeners: Vec::new(),
            },
        );
        descriptor
    }

    pub fn master_anchor(&self, room_id: &str) -> Option<MasterAnchor> {
        self.lock()
            .rooms
            .get(room_id)
            .map(|room| room.master_anchor.clone())
    }

    pub fn objects(&self, room_id: &str) -> Vec<RoomObject> {
        self.lock()
            .rooms
            .get(room_id)
            .map(|room| room.objects.clone())
            .unwrap_or_default()
    }

    /// Delivers an arbitrary event to everyone listening on a room.
    pub fn emit(&self, room_id: &str, event: RoomEvent) {
        if let Some(room) = self.lock().rooms.get_mut(room_id) {
            room.broadcast(event);
        }
    }

    /// Moves every object of a room by `offset` and reports the change.
    pub fn shift_objects(&self, room_id: &str, offset: Vec3) {
        let mut inner = self.lock();
        if let Some(room) = inner.rooms.get_mut(room_id) {
            for object in &mut room.objects {
                object.position += offset;
            }
            let objects = room.objects.clone();
            room.broadcast(RoomEvent::ObjectsUpdated(objects));
        }
    }

    /// Jitters object positions a little, like tracking corrections do.
    pub fn drift(&self, room_id: &str, rng: &mut impl Rng) {
        let mut inner = self.lock();
        if let Some(room) = inner.rooms.get_mut(room_id) {
            for object in &mut room.objects {
                object.position += Vec3::new(
                    rng.gen_range(-0.01..0.01),
                    0.0,
                    rng.gen_range(-0.01..0.01),
                );
            }
            let objects = room.objects.clone();
            room.broadcast(RoomEvent::ObjectsUpdated(objects));
        }
    }

    fn open(&self, inner: &mut SimInner, room_id: &str) -> Option<Room> {
        let placer: Arc<dyn ObjectPlacer> = Arc::new(self.clone());
        let room = inner.rooms.get_mut(room_id)?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        room.listeners.push(sender);
        Some(Room::new(
            room.descriptor.clone(),
            room.master_anchor.clone(),
            placer,
            receiver,
        ))
    }
}

impl ObjectPlacer for SimRoomService {
    fn add_object(&self, room_id: &str, position: Vec3, euler_angles: Vec3) {
        let mut inner = self.lock();
        inner.next_object += 1;
        let id = format!("object-{}", inner.next_object);
        let object = RoomObject::new(id, position, euler_angles);
        match inner.rooms.get_mut(room_id) {
            Some(room) => {
                room.objects.push(object.clone());
                room.broadcast(RoomEvent::ObjectAdded(object));
            }
            None => log::warn!("Ignoring object for unknown room {room_id}"),
        }
    }
}

#[async_trait]
impl RoomService for SimRoomService {
    async fn create_room(
        &self,
        name: &str,
        scan: RoomScan,
        master_anchor: MasterAnchorScan,
    ) -> Result<Room, SdkError> {
        self.respond(SimOperation::Create).await?;
        if scan.points.is_empty() {
            return Err(SdkError::new(SdkErrorKind::Rejected, "room scan has no points"));
        }

        let descriptor = self.seed_room(name, Vec::new());
        let mut inner = self.lock();
        if let Some(room) = inner.rooms.get_mut(&descriptor.id) {
            room.master_anchor.id = master_anchor.anchor_id;
            room.master_anchor.image_url = None;
        }
        self.open(&mut inner, &descriptor.id)
            .ok_or_else(|| SdkError::new(SdkErrorKind::Internal, "room vanished"))
    }

    async fn restore_room(&self, id: &str) -> Result<Room, SdkError> {
        self.respond(SimOperation::Restore).await?;
        let mut inner = self.lock();
        let room = self
            .open(&mut inner, id)
            .ok_or_else(|| SdkError::new(SdkErrorKind::NotFound, format!("no room {id}")))?;

        if let Some(stored) = inner.rooms.get_mut(id) {
            let objects = stored.objects.clone();
            stored.broadcast(RoomEvent::ObjectsFound(objects));
        }
        Ok(room)
    }

    async fn delete_room(&self, id: &str) -> Result<(), SdkError> {
        self.respond(SimOperation::Delete).await?;
        // Dropping the room closes every listener channel.
        self.lock()
            .rooms
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SdkError::new(SdkErrorKind::NotFound, format!("no room {id}")))
    }

    async fn near_rooms(&self) -> Result<Vec<RoomDescriptor>, SdkError> {
        self.respond(SimOperation::NearRooms).await?;
        let mut rooms: Vec<_> = self
            .lock()
            .rooms
            .values()
            .map(|room| room.descriptor.clone())
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }
}

/// Tracker replaying a fixed list of hit-test answers, then reporting no hit.
#[derive(Default)]
pub struct ScriptedTracker {
    script: Mutex<VecDeque<Option<HitResult>>>,
    biases: Mutex<Vec<Option<Vec3>>>,
    camera: Option<CameraSnapshot>,
}

impl ScriptedTracker {
    pub fn new(script: impl IntoIterator<Item = Option<HitResult>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn with_camera(mut self, camera: CameraSnapshot) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn push(&self, hit: Option<HitResult>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(hit);
        }
    }

    /// Bias positions passed to each hit-test so far.
    pub fn biases(&self) -> Vec<Option<Vec3>> {
        self.biases
            .lock()
            .map(|biases| biases.clone())
            .unwrap_or_default()
    }
}

impl Tracker for ScriptedTracker {
    fn hit_test(&self, _screen_point: Vec2, bias: Option<Vec3>) -> Option<HitResult> {
        if let Ok(mut biases) = self.biases.lock() {
            biases.push(bias);
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .flatten()
    }

    fn current_camera(&self) -> Option<CameraSnapshot> {
        self.camera
    }
}
