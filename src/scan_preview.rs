use crate::mutation_queue::{MutationQueue, QueueClosed};
use crate::room::{RoomScan, ScanFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    Scanning,
    Complete,
}

/// Shows the feature points of a room scan while it runs and collects them
/// for room creation.
pub struct ScanPreview {
    queue: MutationQueue,
    scan: RoomScan,
    complete: bool,
}

impl ScanPreview {
    pub fn new(queue: MutationQueue) -> Self {
        Self {
            queue,
            scan: RoomScan::default(),
            complete: false,
        }
    }

    pub fn on_frame(&mut self, frame: ScanFrame) -> Result<ScanProgress, QueueClosed> {
        if self.complete {
            return Ok(ScanProgress::Complete);
        }

        self.scan.points.extend_from_slice(&frame.points);
        let points = frame.points;
        self.queue.submit(move |state| state.show_scan_points(points))?;

        if frame.progress < 1.0 {
            return Ok(ScanProgress::Scanning);
        }

        log::info!("Room scan complete with {} points", self.scan.points.len());
        self.complete = true;
        self.queue.submit(|state| state.hide_scan_preview())?;
        Ok(ScanProgress::Complete)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The collected scan, once complete.
    pub fn finish(self) -> Option<RoomScan> {
        self.complete.then_some(self.scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, QueueConfig};
    use crate::scene_graph::Geometry;
    use crate::state::SceneState;
    use glam::Vec3;

    #[test]
    fn preview_tracks_the_latest_frame_and_goes_away_when_done() {
        let (queue, worker) = MutationQueue::spawn(
            &QueueConfig::default(),
            SceneState::new(&PipelineConfig::default()),
        )
        .unwrap();
        let mut preview = ScanPreview::new(queue.clone());

        let progress = preview
            .on_frame(ScanFrame {
                points: vec![Vec3::X, Vec3::Y],
                progress: 0.4,
            })
            .unwrap();
        assert_eq!(progress, ScanProgress::Scanning);

        let (attached, geometry) = queue
            .read(|state| {
                let node_id = state.scan_preview().unwrap();
                (
                    state.scene.is_attached(node_id),
                    state.scene.node(node_id).unwrap().geometry.clone(),
                )
            })
            .unwrap();
        assert!(attached);
        assert_eq!(geometry, Some(Geometry::PointCloud(vec![Vec3::X, Vec3::Y])));

        let progress = preview
            .on_frame(ScanFrame {
                points: vec![Vec3::Z],
                progress: 1.0,
            })
            .unwrap();
        assert_eq!(progress, ScanProgress::Complete);

        let submitted = queue.submitted();
        preview
            .on_frame(ScanFrame {
                points: vec![Vec3::ONE],
                progress: 1.0,
            })
            .unwrap();
        assert_eq!(queue.submitted(), submitted);

        let attached = queue
            .read(|state| state.scene.is_attached(state.scan_preview().unwrap()))
            .unwrap();
        assert!(!attached);

        let scan = preview.finish().unwrap();
        assert_eq!(scan.points, vec![Vec3::X, Vec3::Y, Vec3::Z]);
        worker.shutdown();
    }
}
