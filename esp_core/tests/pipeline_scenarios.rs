use esp_core::camera::{Camera, CameraPose};
use esp_core::combat::CombatStateManager;
use esp_core::entity::{EntityRef, RenderableEntity, RenderableNpc};
use esp_core::visuals::calculate_visuals;
use esp_core::{
    ConfigStore, EspPipeline, FrameContext, FrameInputs, RecordingDrawList, Settings,
    TextMetrics,
};
use esp_stream::{Attitude, EntityBase, EntityRecord, FrameSnapshot, NpcRecord};
use glam::Vec3;

const WIDTH: f32 = 1920.0;
const HEIGHT: f32 = 1080.0;

fn inputs(now_ms: u64) -> FrameInputs {
    FrameInputs {
        now_ms,
        screen_width: WIDTH,
        screen_height: HEIGHT,
        in_wvw: false,
    }
}

fn pose() -> CameraPose {
    CameraPose {
        position: Vec3::ZERO,
        forward: Vec3::Z,
        avatar_position: Vec3::ZERO,
        fov_radians: std::f32::consts::FRAC_PI_2,
    }
}

fn pipeline() -> EspPipeline {
    let mut pipeline = EspPipeline::default();
    assert!(pipeline.camera_mut().update(&pose(), WIDTH, HEIGHT));
    pipeline
}

/// A hostile NPC `ahead` metres in front of the camera. Game space is
/// Z-up and scaled by 1.23 relative to the overlay.
fn npc_ahead(address: u64, ahead: f32) -> EntityRecord {
    EntityRecord::Npc(NpcRecord {
        base: EntityBase {
            address,
            position: [0.0, ahead * 1.23, 0.0],
            health: 1000.0,
            max_health: 1000.0,
            barrier: 0.0,
        },
        attitude: Attitude::Hostile,
        name: format!("npc-{address}"),
        ..NpcRecord::default()
    })
}

fn snapshot(entities: Vec<EntityRecord>) -> FrameSnapshot {
    FrameSnapshot {
        seq: 7,
        time_ms: 0,
        entities,
    }
}

#[test]
fn limit_mode_fades_near_the_edge_and_culls_past_it() {
    let mut pipeline = pipeline();
    let mut config = ConfigStore::default();
    {
        let distance = &mut config.settings_mut().distance;
        distance.use_distance_limit = true;
        distance.render_distance_limit = 90.0;
    }

    let frame = snapshot(vec![npc_ahead(1, 85.0), npc_ahead(2, 95.0)]);
    assert!(pipeline.update(&frame, &mut config, inputs(1000)));

    let finalized = pipeline.finalized();
    assert_eq!(finalized.len(), 1);
    let near = &finalized[0];
    assert_eq!(near.context.key.raw(), 1);
    assert!(
        (near.visuals.distance_fade_alpha - 0.5).abs() < 0.01,
        "fade alpha was {}",
        near.visuals.distance_fade_alpha
    );
    assert_eq!(pipeline.last_tick().filtered, 1);
    // Culled entities are still tracked until they leave the snapshot.
    assert_eq!(pipeline.combat().len(), 2);
}

#[test]
fn entities_behind_the_camera_are_never_drawn() {
    let mut camera = Camera::default();
    assert!(camera.update(&pose(), WIDTH, HEIGHT));
    assert!(camera.world_to_screen(Vec3::new(0.0, 0.0, -20.0), WIDTH, HEIGHT).is_none());
    assert!(camera.world_to_screen(Vec3::new(0.0, 0.0, 20.0), WIDTH, HEIGHT).is_some());

    let behind = RenderableNpc {
        base: RenderableEntity {
            address: 9,
            position: Vec3::new(0.0, 0.0, -20.0),
            health: 1000.0,
            max_health: 1000.0,
            visual_distance: 20.0,
            gameplay_distance: 20.0,
            valid: true,
            ..RenderableEntity::default()
        },
        attitude: Attitude::Hostile,
        ..RenderableNpc::default()
    };
    let combat = CombatStateManager::default();
    let settings = Settings::default();
    let ctx = FrameContext {
        now_ms: 1000,
        camera: &camera,
        combat: &combat,
        settings: &settings,
        screen_width: WIDTH,
        screen_height: HEIGHT,
        in_wvw: false,
        adaptive_far_plane: 1500.0,
    };
    assert!(calculate_visuals(EntityRef::Npc(&behind), &ctx).is_none());

    let mut pipeline = pipeline();
    let mut config = ConfigStore::default();
    let frame = snapshot(vec![npc_ahead(3, -20.0), npc_ahead(4, 20.0)]);
    pipeline.update(&frame, &mut config, inputs(1000));

    let mut draw = RecordingDrawList::new(TextMetrics::Fixed);
    let drawn = pipeline.draw(&mut draw, config.settings(), &config.shutdown_flag(), inputs(1016));
    assert_eq!(drawn, 1);
    assert!(!draw.commands().is_empty());
}

#[test]
fn a_full_session_tracks_and_forgets_entities() {
    let mut pipeline = pipeline();
    let mut config = ConfigStore::default();

    let mut now = 0;
    for health in [1000.0, 900.0, 700.0] {
        now += 200;
        let mut record = npc_ahead(5, 30.0);
        if let EntityRecord::Npc(npc) = &mut record {
            npc.base.health = health;
        }
        pipeline.update(&snapshot(vec![record]), &mut config, inputs(now));
    }
    let key = pipeline.finalized()[0].context.key;
    let state = pipeline.combat().get_state(key).expect("tracked");
    assert_eq!(state.accumulated_damage, 300.0);
    assert_eq!(state.burst_start_time, 400);

    pipeline.update(&snapshot(Vec::new()), &mut config, inputs(now + 200));
    assert!(pipeline.combat().is_empty());
    assert!(pipeline.finalized().is_empty());
    assert_eq!(pipeline.last_tick().pruned, 1);

    // Pruning an already empty store is a no-op.
    pipeline.update(&snapshot(Vec::new()), &mut config, inputs(now + 400));
    assert_eq!(pipeline.last_tick().pruned, 0);
}
