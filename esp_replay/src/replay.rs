use std::collections::BTreeMap;

use esp_core::{FrameCoordinator, FrameOutcome, FrameStats, RecordingDrawList, TextMetrics};
use serde::Serialize;

use crate::capture::{Capture, CaptureEvent};
use crate::host::ReplayHost;

/// What one replayed frame produced.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub seq: u64,
    pub time_ms: u64,
    pub outcome: FrameOutcome,
    pub lifecycle: &'static str,
    pub ui_visible: bool,
    pub commands: BTreeMap<&'static str, usize>,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub capture: String,
    pub producer: String,
    pub display: [f32; 2],
    pub frames: Vec<FrameReport>,
    pub stats: FrameStats,
    pub gpu_restores: u64,
    pub ui_frames: u64,
    pub bad_link_blocks: u64,
    pub final_lifecycle: &'static str,
}

impl CaptureReport {
    pub fn drawn_frames(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| matches!(frame.outcome, FrameOutcome::Drawn { .. }))
            .count()
    }

    pub fn total_commands(&self) -> usize {
        self.frames
            .iter()
            .flat_map(|frame| frame.commands.values())
            .sum()
    }
}

/// Plays `capture` through `coordinator`, one host frame per recorded
/// snapshot, stopping early once the overlay has shut down.
pub fn replay_capture(
    capture: &Capture,
    coordinator: &mut FrameCoordinator,
    metrics: &TextMetrics,
    display: (f32, f32),
) -> CaptureReport {
    let mut host = ReplayHost::new();
    let mut draw = RecordingDrawList::new(metrics.clone());
    let mut frames = Vec::with_capacity(capture.frame_count());

    for event in &capture.events {
        host.set_time(event.time_ms());
        let snapshot = match event {
            CaptureEvent::Link(block) => {
                host.push_link_block(block);
                continue;
            }
            CaptureEvent::Input(input) => {
                host.push_input(input);
                continue;
            }
            CaptureEvent::Frame(snapshot) => snapshot,
        };
        host.push_snapshot(snapshot.clone());

        draw.clear();
        let outcome = coordinator.execute(&mut host, display.0, display.1, Some(&mut draw));
        let mut commands = BTreeMap::new();
        for command in draw.commands() {
            *commands.entry(command.kind_label()).or_insert(0) += 1;
        }
        frames.push(FrameReport {
            seq: snapshot.seq,
            time_ms: snapshot.time_ms,
            outcome,
            lifecycle: coordinator.lifecycle().state().label(),
            ui_visible: coordinator.is_ui_visible(),
            commands,
            texts: draw.texts().map(str::to_string).collect(),
        });

        if outcome == FrameOutcome::ShutDown {
            log::info!("overlay shut down at {} ms; ending replay", snapshot.time_ms);
            break;
        }
    }

    CaptureReport {
        capture: capture.path.display().to_string(),
        producer: capture.producer().to_string(),
        display: [display.0, display.1],
        frames,
        stats: coordinator.stats(),
        gpu_restores: host.gpu_restores(),
        ui_frames: host.ui_frames(),
        bad_link_blocks: host.bad_link_blocks(),
        final_lifecycle: coordinator.lifecycle().state().label(),
    }
}

/// Display size for a replay: explicit overrides first, then the recorded
/// surface, then 1920x1080.
pub fn display_size(capture: &Capture, width: Option<u32>, height: Option<u32>) -> (f32, f32) {
    let recorded = capture
        .config
        .as_ref()
        .map(|config| (config.display_width, config.display_height))
        .filter(|&(w, h)| w > 0 && h > 0)
        .unwrap_or((1920, 1080));
    (
        width.unwrap_or(recorded.0) as f32,
        height.unwrap_or(recorded.1) as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use esp_core::{ConfigStore, HostMode, StatCatalog};
    use esp_link::{MumbleContext, MumbleLinkData};
    use esp_stream::{
        Attitude, CaptureConfig, EntityBase, EntityRecord, FrameSnapshot, HotKey, InputEvent,
        LinkBlock, PlayerRecord,
    };

    fn link_block(time_ms: u64) -> LinkBlock {
        let data = MumbleLinkData {
            ui_version: 2,
            name: "Guild Wars 2".to_string(),
            camera_front: [0.0, 0.0, 1.0],
            context: MumbleContext {
                map_id: 15,
                map_type: 5,
                ..MumbleContext::default()
            },
            ..MumbleLinkData::default()
        };
        LinkBlock {
            time_ms,
            data: data.encode(),
        }
    }

    fn frame(seq: u64, time_ms: u64) -> FrameSnapshot {
        FrameSnapshot {
            seq,
            time_ms,
            entities: vec![EntityRecord::Player(PlayerRecord {
                base: EntityBase {
                    address: 0x10,
                    position: [0.0, 24.6, 0.0],
                    health: 900.0,
                    max_health: 1000.0,
                    barrier: 0.0,
                },
                attitude: Attitude::Hostile,
                name: "Kasmeer".to_string(),
                ..PlayerRecord::default()
            })],
        }
    }

    fn capture(events: Vec<CaptureEvent>) -> Capture {
        Capture {
            path: PathBuf::from("mem.kxsp"),
            hello: None,
            config: Some(CaptureConfig {
                display_width: 1280,
                display_height: 720,
                nominal_fps: None,
            }),
            events,
        }
    }

    fn coordinator(mode: HostMode) -> FrameCoordinator {
        FrameCoordinator::new(ConfigStore::default(), mode, StatCatalog::default())
    }

    #[test]
    fn recorded_session_draws_the_player() {
        let capture = capture(vec![
            CaptureEvent::Link(link_block(0)),
            CaptureEvent::Frame(frame(1, 0)),
            CaptureEvent::Frame(frame(2, 16)),
        ]);
        let mut coordinator = coordinator(HostMode::Plugin);
        let display = display_size(&capture, None, None);
        assert_eq!(display, (1280.0, 720.0));

        let report = replay_capture(&capture, &mut coordinator, &TextMetrics::Fixed, display);
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.drawn_frames(), 2);
        assert_eq!(report.gpu_restores, 2);
        assert!(report.frames[1].texts.iter().any(|text| text == "Kasmeer"));
        assert_eq!(report.final_lifecycle, "Running");
    }

    #[test]
    fn delete_ends_an_injected_replay() {
        let capture = capture(vec![
            CaptureEvent::Link(link_block(0)),
            CaptureEvent::Frame(frame(1, 0)),
            CaptureEvent::Input(InputEvent {
                time_ms: 10,
                key: HotKey::Delete,
            }),
            CaptureEvent::Frame(frame(2, 16)),
            CaptureEvent::Frame(frame(3, 32)),
        ]);
        let mut coordinator = coordinator(HostMode::Injected);
        let report =
            replay_capture(&capture, &mut coordinator, &TextMetrics::Fixed, (1280.0, 720.0));
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[1].outcome, FrameOutcome::ShutDown);
        assert_eq!(report.final_lifecycle, "Shutting down");
    }

    #[test]
    fn explicit_size_overrides_the_recording() {
        let capture = capture(Vec::new());
        assert_eq!(display_size(&capture, Some(800), None), (800.0, 720.0));
    }
}
