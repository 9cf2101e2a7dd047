use crate::mutation_queue::{QueueClosed, TaskError};
use crate::room::SdkError;

/// Failures surfaced to whoever presents errors to the user. SDK errors are
/// carried unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("could not create room: {0}")]
    Create(#[source] SdkError),
    #[error("could not restore room: {0}")]
    Restore(#[source] SdkError),
    #[error("could not delete room: {0}")]
    Delete(#[source] SdkError),
    #[error("could not look up nearby rooms: {0}")]
    NearRooms(#[source] SdkError),
    #[error("room reported an error: {0}")]
    Room(#[source] SdkError),
    #[error("scanned anchor {scanned} does not match the room's master anchor {expected}")]
    AnchorMismatch { expected: String, scanned: String },
    #[error("could not start the scene worker")]
    Worker(#[from] std::io::Error),
    #[error(transparent)]
    Queue(#[from] QueueClosed),
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl FlowError {
    pub fn sdk_error(&self) -> Option<&SdkError> {
        match self {
            FlowError::Create(error)
            | FlowError::Restore(error)
            | FlowError::Delete(error)
            | FlowError::NearRooms(error)
            | FlowError::Room(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("no surface has been found to place the object on")]
    NoFocus,
    #[error("the room has been deleted")]
    RoomClosed,
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// The UI seam: shows an error to the user, typically as a modal dialog.
pub trait ErrorPresenter: Send + Sync {
    fn present(&self, error: &FlowError);
}

/// Presenter for headless use, errors only end up in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl ErrorPresenter for LogPresenter {
    fn present(&self, error: &FlowError) {
        log::error!("{error}");
    }
}
