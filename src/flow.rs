use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{ErrorPresenter, FlowError};
use crate::pipeline::ScenePipeline;
use crate::room::{MasterAnchorScan, Room, RoomDescriptor, RoomScan, RoomService};
use crate::scan_preview::ScanPreview;
use crate::session::RoomSession;
use crate::state::SceneState;

/// Room lifecycle on top of one scene: find, create, restore and open rooms.
pub struct RoomFlow {
    service: Arc<dyn RoomService>,
    presenter: Arc<dyn ErrorPresenter>,
    pipeline: ScenePipeline,
}

impl RoomFlow {
    pub fn new(
        service: Arc<dyn RoomService>,
        presenter: Arc<dyn ErrorPresenter>,
        config: PipelineConfig,
    ) -> Result<Self, FlowError> {
        Ok(Self {
            service,
            presenter,
            pipeline: ScenePipeline::start(config)?,
        })
    }

    pub fn pipeline(&self) -> &ScenePipeline {
        &self.pipeline
    }

    fn report(&self, error: FlowError) -> FlowError {
        log::warn!("{error}");
        self.presenter.present(&error);
        error
    }

    pub async fn near_rooms(&self) -> Result<Vec<RoomDescriptor>, FlowError> {
        match self.service.near_rooms().await {
            Ok(rooms) => {
                log::info!("{} rooms nearby", rooms.len());
                Ok(rooms)
            }
            Err(error) => Err(self.report(FlowError::NearRooms(error))),
        }
    }

    /// Starts showing a room scan on the scene.
    pub fn start_scan(&self) -> ScanPreview {
        ScanPreview::new(self.pipeline.queue().clone())
    }

    pub async fn create_room(
        &self,
        name: &str,
        scan: RoomScan,
        master_anchor: MasterAnchorScan,
    ) -> Result<RoomSession, FlowError> {
        let room = match self.service.create_room(name, scan, master_anchor).await {
            Ok(room) => room,
            Err(error) => return Err(self.report(FlowError::Create(error))),
        };
        log::info!("Created room {name} ({})", room.id);
        self.open(room)
    }

    /// Restores a room. It still has to be re-localized against its master
    /// anchor before it can be opened.
    pub async fn restore_room(&self, id: &str) -> Result<RestoredRoom, FlowError> {
        match self.service.restore_room(id).await {
            Ok(room) => {
                log::info!("Restored room {} ({id})", room.name);
                Ok(RestoredRoom { room })
            }
            Err(error) => Err(self.report(FlowError::Restore(error))),
        }
    }

    /// Opens a restored room once its master anchor has been scanned.
    pub fn open_restored(
        &self,
        restored: RestoredRoom,
        scan: &MasterAnchorScan,
    ) -> Result<RoomSession, FlowError> {
        if scan.anchor_id != restored.room.master_anchor.id {
            return Err(self.report(FlowError::AnchorMismatch {
                expected: restored.room.master_anchor.id.clone(),
                scanned: scan.anchor_id.clone(),
            }));
        }
        self.open(restored.room)
    }

    fn open(&self, room: Room) -> Result<RoomSession, FlowError> {
        RoomSession::open(
            room,
            Arc::clone(&self.service),
            Arc::clone(&self.presenter),
            self.pipeline.queue().clone(),
            self.pipeline.config().focus.clone(),
        )
    }

    pub fn shutdown(self) -> SceneState {
        self.pipeline.shutdown()
    }
}

/// A room handed back by the SDK that has not been re-localized yet.
#[derive(Debug)]
pub struct RestoredRoom {
    room: Room,
}

impl RestoredRoom {
    pub fn descriptor(&self) -> RoomDescriptor {
        self.room.descriptor()
    }

    /// Picture of the master anchor to show the user while they look for it.
    pub fn master_anchor_image_url(&self) -> Option<&str> {
        self.room.master_anchor.image_url.as_deref()
    }
}
