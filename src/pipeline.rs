use crate::config::PipelineConfig;
use crate::mutation_queue::{MutationQueue, QueueWorker};
use crate::state::SceneState;

/// The scene of the AR view together with the worker that owns it. One per
/// view; rooms come and go on top of it.
pub struct ScenePipeline {
    queue: MutationQueue,
    worker: QueueWorker,
    config: PipelineConfig,
}

impl ScenePipeline {
    pub fn start(config: PipelineConfig) -> std::io::Result<Self> {
        let state = SceneState::new(&config);
        let (queue, worker) = MutationQueue::spawn(&config.queue, state)?;
        log::info!("Scene pipeline started ({:?})", config.update_policy);

        Ok(Self {
            queue,
            worker,
            config,
        })
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stops the worker once queued work is done and returns the scene.
    pub fn shutdown(self) -> SceneState {
        self.worker.shutdown()
    }
}
