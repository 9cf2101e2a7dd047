use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{select, Receiver, Sender};
use itertools::Itertools;

use crate::error::{ErrorPresenter, FlowError};
use crate::focus::{FocusPhase, FocusUpdater};
use crate::mutation_queue::{MutationQueue, QueueClosed};
use crate::room::{RoomEvent, RoomObject, Tracker};
use crate::state::SessionId;

/// Turns room events into queued scene mutations.
pub struct EventRouter {
    queue: MutationQueue,
    session: SessionId,
    presenter: Arc<dyn ErrorPresenter>,
    active: AtomicBool,
    stop_sender: Sender<()>,
    stop_receiver: Receiver<()>,
}

impl EventRouter {
    pub fn new(
        queue: MutationQueue,
        session: SessionId,
        presenter: Arc<dyn ErrorPresenter>,
    ) -> Self {
        let (stop_sender, stop_receiver) = crossbeam_channel::bounded(1);
        Self {
            queue,
            session,
            presenter,
            active: AtomicBool::new(true),
            stop_sender,
            stop_receiver,
        }
    }

    pub fn route(&self, event: RoomEvent) -> Result<(), QueueClosed> {
        match event {
            RoomEvent::ObjectsFound(objects) => {
                log::info!(
                    "Found {} objects: {}",
                    objects.len(),
                    objects.iter().map(|object| &object.id).join(", ")
                );
                objects
                    .into_iter()
                    .try_for_each(|object| self.draw(object))
            }
            RoomEvent::ObjectAdded(object) => self.draw(object),
            RoomEvent::ObjectsUpdated(objects) => objects
                .into_iter()
                .try_for_each(|object| self.update(object)),
            RoomEvent::Error(error) => {
                self.presenter.present(&FlowError::Room(error));
                Ok(())
            }
        }
    }

    fn draw(&self, object: RoomObject) -> Result<(), QueueClosed> {
        let session = self.session;
        self.queue.submit(move |state| {
            if state.is_current(session) {
                state.spawn_object(&object);
            } else {
                log::debug!("Discarding object {} of a closed room", object.id);
            }
        })
    }

    fn update(&self, object: RoomObject) -> Result<(), QueueClosed> {
        let session = self.session;
        self.queue.submit(move |state| {
            if state.is_current(session) {
                state.update_object(&object);
            }
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Frame callback. Returns `None` once the room is gone.
    pub fn on_frame(
        &self,
        updater: &mut FocusUpdater,
        tracker: &dyn Tracker,
    ) -> Result<Option<FocusPhase>, QueueClosed> {
        if !self.is_active() {
            return Ok(None);
        }
        updater.update(tracker).map(Some)
    }

    /// Routes events until the stream ends or the router is deactivated.
    pub fn run_events(&self, events: Receiver<RoomEvent>) {
        loop {
            let event = select! {
                recv(events) -> event => event.ok(),
                recv(self.stop_receiver) -> _ => None,
            };
            let Some(event) = event else {
                break;
            };
            if let Err(error) = self.route(event) {
                log::warn!("Stopping event delivery: {error}");
                break;
            }
        }
        log::debug!("Room event delivery finished");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops frame handling and event delivery for a closed room.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self.stop_sender.try_send(());
    }
}
