use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use roomscene::room::{
    CameraSnapshot, HitResult, MasterAnchorScan, PlaneAnchor, RoomObject, ScanFrame,
};
use roomscene::scan_preview::ScanProgress;
use roomscene::sim::{ScriptedTracker, SimRoomService};
use roomscene::{LogPresenter, PipelineConfig, RoomFlow, RoomSession};

const FRAMES: usize = 30;

/// Walks through a full session against the simulated SDK: scan and create
/// a room, place objects, delete it, then restore a stored room.
pub async fn run() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env()?;
    let service = Arc::new(SimRoomService::new(Duration::from_millis(20)));
    service.seed_room(
        "Living room",
        vec![
            RoomObject::new("candle-a", Vec3::new(0.3, 0.8, -1.2), Vec3::ZERO),
            RoomObject::new("candle-b", Vec3::new(-0.4, 0.8, -1.1), Vec3::new(0.0, 1.2, 0.0)),
        ],
    );

    let flow = RoomFlow::new(service.clone(), Arc::new(LogPresenter), config)?;
    let rooms = flow.near_rooms().await?;
    for room in &rooms {
        log::info!("Nearby: {} ({})", room.name, room.id);
    }

    let mut rng = StdRng::seed_from_u64(7);
    let mut preview = flow.start_scan();
    let mut step = 0;
    while preview.on_frame(scan_frame(step))? != ScanProgress::Complete {
        step += 1;
    }
    let scan = preview.finish().context("room scan did not complete")?;

    let session = flow
        .create_room(
            "Kitchen",
            scan,
            MasterAnchorScan {
                anchor_id: "kitchen-frame".to_string(),
            },
        )
        .await?;
    place_objects(&session, 3)?;
    service.drift(&session.room().id, &mut rng);
    report(&session)?;
    session.delete().await?;
    report(&session)?;
    session.close();

    let stored = rooms.first().context("no stored rooms nearby")?;
    let restored = flow.restore_room(&stored.id).await?;
    log::info!(
        "Look for the master anchor: {}",
        restored.master_anchor_image_url().unwrap_or("<no picture>")
    );
    let anchor = service
        .master_anchor(&stored.id)
        .context("stored room has no master anchor")?;
    let session = flow.open_restored(
        restored,
        &MasterAnchorScan {
            anchor_id: anchor.id,
        },
    )?;
    place_objects(&session, 1)?;
    report(&session)?;
    session.close();

    let state = flow.shutdown();
    log::info!("{} object nodes left on the scene", state.attached_object_count());
    Ok(())
}

fn scan_frame(step: usize) -> ScanFrame {
    let points = (0..16)
        .map(|i| {
            let angle = (step * 16 + i) as f32 * 0.37;
            Vec3::new(angle.cos() * 2.0, (i % 4) as f32 * 0.5, angle.sin() * 2.0)
        })
        .collect();
    ScanFrame {
        points,
        progress: (step + 1) as f32 / 5.0,
    }
}

/// Runs frames until the focus indicator finds the table, then places
/// `count` objects in front of the camera.
fn place_objects(session: &RoomSession, count: usize) -> anyhow::Result<()> {
    let camera = CameraSnapshot::looking_from(Vec3::new(0.0, 1.6, 0.0), 0.3);
    let table = PlaneAnchor::horizontal(Vec3::new(0.0, 0.8, -1.0), Vec2::new(1.2, 0.8));
    let tracker = ScriptedTracker::new((0..FRAMES).map(|frame| match frame % 10 {
        0..=2 => None,
        3..=5 => Some(HitResult {
            point: Vec3::new(0.1 * frame as f32, 0.8, -1.0),
            plane: None,
            camera: Some(camera),
        }),
        _ => Some(HitResult {
            point: Vec3::new(0.05 * frame as f32, 0.8, -1.0),
            plane: Some(table),
            camera: Some(camera),
        }),
    }))
    .with_camera(camera);

    let mut updater = session.focus_updater();
    let mut placed = 0;
    for _ in 0..FRAMES {
        session.on_frame(&mut updater, &tracker)?;
        if placed < count && updater.bias().is_some() {
            session.place_object(&camera)?;
            placed += 1;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    if placed < count {
        bail!("only placed {placed} of {count} objects");
    }
    Ok(())
}

fn report(session: &RoomSession) -> anyhow::Result<()> {
    // Give the event pump a moment to hand over what the SDK sent.
    std::thread::sleep(Duration::from_millis(50));
    let (ids, attached) = session
        .queue()
        .read(|state| (state.registry.ids(), state.attached_object_count()))?;
    log::info!(
        "Room {}: {} objects registered, {attached} attached: {ids:?}",
        session.room().name,
        ids.len()
    );
    Ok(())
}
