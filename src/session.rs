use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::FocusConfig;
use crate::error::{ErrorPresenter, FlowError, PlaceError};
use crate::focus::{FocusPhase, FocusUpdater};
use crate::mutation_queue::{MutationQueue, QueueClosed};
use crate::room::{CameraSnapshot, Room, RoomService, Tracker};
use crate::router::EventRouter;
use crate::state::SessionId;

/// An open room drawn on the shared scene.
///
/// Room events are pumped into the router on a dedicated thread for as long
/// as the session lives. Frames are delivered by the caller through
/// [`RoomSession::on_frame`].
pub struct RoomSession {
    room: Room,
    service: Arc<dyn RoomService>,
    presenter: Arc<dyn ErrorPresenter>,
    queue: MutationQueue,
    router: Arc<EventRouter>,
    focus_config: FocusConfig,
    event_pump: Option<JoinHandle<()>>,
    deleted: AtomicBool,
}

impl RoomSession {
    pub fn open(
        room: Room,
        service: Arc<dyn RoomService>,
        presenter: Arc<dyn ErrorPresenter>,
        queue: MutationQueue,
        focus_config: FocusConfig,
    ) -> Result<Self, FlowError> {
        let session = queue.call(|state| state.begin_session())?;
        let router = Arc::new(EventRouter::new(
            queue.clone(),
            session,
            Arc::clone(&presenter),
        ));

        let events = room.events();
        let pump_router = Arc::clone(&router);
        let event_pump = thread::Builder::new()
            .name(format!("room-events-{}", room.id))
            .spawn(move || pump_router.run_events(events))?;

        log::info!("Opened room {} ({})", room.name, room.id);

        Ok(Self {
            room,
            service,
            presenter,
            queue,
            router,
            focus_config,
            event_pump: Some(event_pump),
            deleted: AtomicBool::new(false),
        })
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn id(&self) -> SessionId {
        self.router.session()
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// A focus updater for the thread delivering frames.
    pub fn focus_updater(&self) -> FocusUpdater {
        FocusUpdater::new(self.queue.clone(), self.id(), &self.focus_config)
    }

    pub fn on_frame(
        &self,
        updater: &mut FocusUpdater,
        tracker: &dyn Tracker,
    ) -> Result<Option<FocusPhase>, QueueClosed> {
        self.router.on_frame(updater, tracker)
    }

    /// Asks the SDK for a new object where the focus indicator last found a
    /// surface, turned to face the same way as the camera.
    pub fn place_object(&self, camera: &CameraSnapshot) -> Result<(), PlaceError> {
        if self.is_deleted() {
            return Err(PlaceError::RoomClosed);
        }

        let position = self
            .queue
            .read(|state| state.focus.last_position())?
            .ok_or(PlaceError::NoFocus)?;
        let euler_angles = camera.heading_euler();

        log::debug!("Placing object at {position} facing {}", euler_angles.y);
        self.room.add_object(position, euler_angles);
        Ok(())
    }

    /// Deletes the room. Returns once the SDK confirmed and every node of the
    /// room has left the scene.
    pub async fn delete(&self) -> Result<(), FlowError> {
        if let Err(error) = self.service.delete_room(&self.room.id).await {
            let error = FlowError::Delete(error);
            log::warn!("Deleting room {} failed: {error}", self.room.id);
            self.presenter.present(&error);
            return Err(error);
        }

        self.deleted.store(true, Ordering::SeqCst);
        self.router.deactivate();

        let session = self.id();
        self.queue.submit(move |state| {
            state.end_session(session);
        })?;
        self.queue.drain_async().await?;

        log::info!("Deleted room {} ({})", self.room.name, self.room.id);
        Ok(())
    }

    /// Stops event delivery. The room stays on the scene until another
    /// session replaces it.
    pub fn close(mut self) {
        self.stop_events();
    }

    fn stop_events(&mut self) {
        self.router.deactivate();
        if let Some(pump) = self.event_pump.take() {
            if pump.join().is_err() {
                log::error!("Event delivery for room {} panicked", self.room.id);
            }
        }
    }
}

impl fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomSession")
            .field("room", &self.room)
            .field("session", &self.id())
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.stop_events();
    }
}
