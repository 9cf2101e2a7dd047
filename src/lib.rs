//! Serialized scene mutations for an AR room viewer.
//!
//! Room events from the SDK and per-frame tracking results arrive on
//! arbitrary threads. None of them touch the scene directly: they queue
//! closures on a [`MutationQueue`], whose single worker owns the
//! [`SceneState`] and runs them in order.

pub mod config;
pub mod error;
pub mod flow;
pub mod focus;
pub mod mutation_queue;
pub mod pipeline;
pub mod registry;
pub mod room;
pub mod router;
pub mod scan_preview;
pub mod scene_graph;
pub mod session;
pub mod sim;
pub mod state;

pub use config::PipelineConfig;
pub use error::{ErrorPresenter, FlowError, LogPresenter, PlaceError};
pub use flow::{RestoredRoom, RoomFlow};
pub use mutation_queue::{MutationQueue, QueueClosed, TaskError};
pub use registry::UpdatePolicy;
pub use session::RoomSession;
pub use state::{SceneState, SessionId};
