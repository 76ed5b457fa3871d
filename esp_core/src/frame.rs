//! The per-frame entry point a host calls from its Present hook.
//!
//! Everything between saving and restoring the GPU state runs inside
//! `catch_unwind`; a panic loses the frame but never reaches the host.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::Serialize;

use esp_link::{LinkReader, LinkState};
use esp_stream::{FrameSnapshot, HotKey};

use crate::camera::CameraPose;
use crate::config::{ConfigStore, HookStatus};
use crate::draw::DrawList;
use crate::error::EspError;
use crate::lifecycle::{HostMode, LifecycleManager, LifecycleState, Readiness};
use crate::pipeline::{EspPipeline, FrameInputs};
use crate::render::info::StatCatalog;

/// Host GPU pipeline state that must survive the overlay's draw calls.
pub trait GpuStateBackend {
    type Saved;

    fn backup_state(&mut self) -> Self::Saved;
    fn restore_state(&mut self, saved: Self::Saved);
}

/// Restores the backed-up GPU state when dropped, including while
/// unwinding.
pub struct GpuStateGuard<'a, B: GpuStateBackend + ?Sized> {
    backend: &'a mut B,
    saved: Option<B::Saved>,
}

impl<'a, B: GpuStateBackend + ?Sized> GpuStateGuard<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        let saved = backend.backup_state();
        Self {
            backend,
            saved: Some(saved),
        }
    }
}

impl<B: GpuStateBackend + ?Sized> Deref for GpuStateGuard<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: GpuStateBackend + ?Sized> DerefMut for GpuStateGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: GpuStateBackend + ?Sized> Drop for GpuStateGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.backend.restore_state(saved);
        }
    }
}

/// Immediate-mode UI drawn on top of the ESP.
pub trait OverlayUi {
    fn is_ui_ready(&self) -> bool;
    fn set_display_size(&mut self, width: f32, height: f32);
    fn render_ui(&mut self, status: &OverlayStatus);
}

pub trait HotkeySource {
    /// True once per physical press.
    fn is_key_edge_pressed(&mut self, key: HotKey) -> bool;
}

pub trait SnapshotProvider {
    fn initialize(&mut self) -> Result<(), EspError> {
        Ok(())
    }

    /// Live entities at `now_ms`, or `None` while the provider has nothing
    /// to offer.
    fn snapshot(&mut self, now_ms: u64) -> Option<FrameSnapshot>;
}

pub trait LinkSource {
    fn poll_link(&mut self, now_ms: u64) -> Option<LinkState>;
}

impl LinkSource for LinkReader {
    fn poll_link(&mut self, now_ms: u64) -> Option<LinkState> {
        self.poll(now_ms)
    }
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Everything the coordinator needs from the process it runs in.
pub trait OverlayHost:
    GpuStateBackend + OverlayUi + HotkeySource + SnapshotProvider + LinkSource + Clock
{
    /// Plugin hosts hand the rendering device over some frames after load.
    fn is_renderer_ready(&self) -> bool {
        true
    }
}

/// What the UI shows about the overlay itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayStatus {
    pub lifecycle: LifecycleState,
    pub hook_status: HookStatus,
    pub entities_drawn: usize,
    pub far_plane: f32,
}

/// How one call to [`FrameCoordinator::execute`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    ShutDown,
    NoDrawList,
    Waiting { state: LifecycleState },
    InitFailed,
    Drawn { entities: usize, slow_tick: bool },
    MapOpen,
    Panicked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frames: u64,
    pub slow_ticks: u64,
    pub recovered_panics: u64,
}

#[derive(Debug)]
pub struct FrameCoordinator {
    config: ConfigStore,
    lifecycle: LifecycleManager,
    pipeline: EspPipeline,
    link: Option<LinkState>,
    ui_visible: bool,
    entities_drawn: usize,
    stats: FrameStats,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl FrameCoordinator {
    pub fn new(config: ConfigStore, mode: HostMode, catalog: StatCatalog) -> Self {
        let lifecycle = LifecycleManager::new(mode, config.shutdown_flag());
        Self {
            config,
            lifecycle,
            pipeline: EspPipeline::new(catalog),
            link: None,
            ui_visible: false,
            entities_drawn: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn pipeline(&self) -> &EspPipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn is_ui_visible(&self) -> bool {
        self.ui_visible
    }

    pub fn status(&self) -> OverlayStatus {
        OverlayStatus {
            lifecycle: self.lifecycle.state(),
            hook_status: self.config.hook_status(),
            entities_drawn: self.entities_drawn,
            far_plane: self.config.adaptive_far_plane(),
        }
    }

    /// Leaves the running state for good, saving settings first when
    /// configured to. Used for the exit hotkey and for host unload.
    pub fn shutdown(&mut self) {
        if self.lifecycle.is_shutting_down() {
            return;
        }
        if self.config.settings().auto_save_on_exit {
            if let Err(err) = self.config.save().map_err(EspError::Settings) {
                log::error!("{err}");
            }
        }
        self.lifecycle.request_shutdown();
    }

    /// Runs one host frame. `draw` is `None` when the host has no draw list
    /// this frame.
    pub fn execute<H, D>(
        &mut self,
        host: &mut H,
        display_width: f32,
        display_height: f32,
        draw: Option<&mut D>,
    ) -> FrameOutcome
    where
        H: OverlayHost + ?Sized,
        D: DrawList + ?Sized,
    {
        if self.config.is_shutdown_requested() {
            self.lifecycle.request_shutdown();
            return FrameOutcome::ShutDown;
        }
        let Some(draw) = draw else {
            return FrameOutcome::NoDrawList;
        };
        self.stats.frames += 1;
        host.set_display_size(display_width, display_height);

        if host.is_key_edge_pressed(HotKey::Insert) {
            self.ui_visible = !self.ui_visible;
            log::debug!("overlay UI {}", if self.ui_visible { "shown" } else { "hidden" });
        }
        if self.lifecycle.mode() == HostMode::Injected && host.is_key_edge_pressed(HotKey::Delete) {
            log::info!("exit key pressed");
            self.shutdown();
            return FrameOutcome::ShutDown;
        }

        let mut gpu = GpuStateGuard::new(host);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_guarded(&mut *gpu, draw, display_width, display_height)
        }));
        match result {
            Ok(outcome) => outcome,
            Err(payload) => {
                self.stats.recovered_panics += 1;
                log::error!("frame abandoned after panic: {}", panic_message(payload.as_ref()));
                FrameOutcome::Panicked
            }
        }
    }

    fn run_guarded<H, D>(&mut self, host: &mut H, draw: &mut D, width: f32, height: f32) -> FrameOutcome
    where
        H: OverlayHost + ?Sized,
        D: DrawList + ?Sized,
    {
        let now = host.now_ms();
        if let Some(link) = host.poll_link(now) {
            self.link = Some(link);
        }
        if let Some(link) = &self.link {
            self.pipeline
                .camera_mut()
                .update(&CameraPose::from_link(link), width, height);
        }

        let readiness = Readiness {
            renderer_ready: host.is_renderer_ready(),
            ui_ready: host.is_ui_ready(),
            map_id: self.link.as_ref().map_or(0, |link| link.map_id),
        };
        let was_running = self.lifecycle.is_running();
        let camera_bound = self.pipeline.camera().is_valid();
        let advanced = self.lifecycle.advance(readiness, || {
            host.initialize()?;
            if !camera_bound {
                return Err(EspError::RendererInit("camera has no pose yet".into()));
            }
            Ok(())
        });
        match advanced {
            Ok(LifecycleState::Running) => {
                if !was_running {
                    self.config.set_hook_status(HookStatus::Ok);
                }
            }
            Ok(state) => {
                self.render_ui(host);
                return FrameOutcome::Waiting { state };
            }
            Err(_) => {
                self.config.set_hook_status(HookStatus::Failed);
                return FrameOutcome::InitFailed;
            }
        }

        let inputs = FrameInputs {
            now_ms: now,
            screen_width: width,
            screen_height: height,
            in_wvw: self.link.as_ref().is_some_and(LinkState::is_in_wvw),
        };

        let mut slow_tick = false;
        if self.pipeline.is_update_due(now, self.config.settings()) && self.pipeline.camera().is_valid() {
            if let Some(snapshot) = host.snapshot(now) {
                slow_tick = self.pipeline.update(&snapshot, &mut self.config, inputs);
            }
        }
        if slow_tick {
            self.stats.slow_ticks += 1;
        }

        if self.link.as_ref().is_some_and(LinkState::is_map_open) {
            self.entities_drawn = 0;
            self.render_ui(host);
            return FrameOutcome::MapOpen;
        }
        self.entities_drawn = self.pipeline.draw(
            draw,
            self.config.settings(),
            &self.config.shutdown_flag(),
            inputs,
        );
        self.render_ui(host);
        FrameOutcome::Drawn {
            entities: self.entities_drawn,
            slow_tick,
        }
    }

    fn render_ui<H: OverlayHost + ?Sized>(&self, host: &mut H) {
        if self.ui_visible && !self.config.is_shutdown_requested() {
            host.render_ui(&self.status());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawCommand, RecordingDrawList};
    use esp_link::UiState;
    use esp_stream::{Attitude, EntityBase, EntityRecord, PlayerRecord};
    use glam::Vec2;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    use crate::color::Color;

    #[derive(Default)]
    struct TestHost {
        now_ms: u64,
        depth: i32,
        backups: usize,
        restores: usize,
        keys: VecDeque<HotKey>,
        ui_frames: usize,
        ui_ready: bool,
        link: Option<LinkState>,
        snapshot: Option<FrameSnapshot>,
        init_error: Option<String>,
    }

    impl TestHost {
        fn ready() -> Self {
            Self {
                ui_ready: true,
                link: Some(link(0)),
                snapshot: Some(FrameSnapshot {
                    seq: 1,
                    time_ms: 0,
                    entities: vec![EntityRecord::Player(PlayerRecord {
                        base: EntityBase {
                            address: 0x40,
                            position: [0.0, 24.6, 0.0],
                            health: 600.0,
                            max_health: 1000.0,
                            barrier: 0.0,
                        },
                        attitude: Attitude::Hostile,
                        name: "Braham".into(),
                        ..PlayerRecord::default()
                    })],
                }),
                ..Self::default()
            }
        }
    }

    fn link(ui_state: u32) -> LinkState {
        LinkState {
            tick: 1,
            camera_position: [0.0, 0.0, 0.0],
            camera_front: [0.0, 0.0, 1.0],
            camera_top: [0.0, 1.0, 0.0],
            avatar_position: [0.0, 0.0, 0.0],
            fov: 1.0472,
            map_id: 15,
            map_type: 5,
            ui_state: UiState(ui_state),
            mount_index: 0,
            identity: None,
        }
    }

    impl GpuStateBackend for TestHost {
        type Saved = i32;

        fn backup_state(&mut self) -> i32 {
            self.backups += 1;
            self.depth += 1;
            self.depth
        }

        fn restore_state(&mut self, saved: i32) {
            assert_eq!(saved, self.depth);
            self.restores += 1;
            self.depth -= 1;
        }
    }

    impl OverlayUi for TestHost {
        fn is_ui_ready(&self) -> bool {
            self.ui_ready
        }

        fn set_display_size(&mut self, _width: f32, _height: f32) {}

        fn render_ui(&mut self, _status: &OverlayStatus) {
            self.ui_frames += 1;
        }
    }

    impl HotkeySource for TestHost {
        fn is_key_edge_pressed(&mut self, key: HotKey) -> bool {
            if self.keys.front() == Some(&key) {
                self.keys.pop_front();
                true
            } else {
                false
            }
        }
    }

    impl SnapshotProvider for TestHost {
        fn initialize(&mut self) -> Result<(), EspError> {
            match &self.init_error {
                Some(message) => Err(EspError::ProviderInit(message.clone())),
                None => Ok(()),
            }
        }

        fn snapshot(&mut self, _now_ms: u64) -> Option<FrameSnapshot> {
            self.snapshot.clone()
        }
    }

    impl LinkSource for TestHost {
        fn poll_link(&mut self, _now_ms: u64) -> Option<LinkState> {
            self.link.clone()
        }
    }

    impl Clock for TestHost {
        fn now_ms(&self) -> u64 {
            self.now_ms
        }
    }

    impl OverlayHost for TestHost {}

    /// Sink that fails as soon as anything is drawn.
    struct ExplodingDrawList;

    impl DrawList for ExplodingDrawList {
        fn add_line(&mut self, _: Vec2, _: Vec2, _: Color, _: f32) {
            panic!("device lost");
        }
        fn add_rect(&mut self, _: Vec2, _: Vec2, _: Color, _: f32, _: f32) {
            panic!("device lost");
        }
        fn add_rect_filled(&mut self, _: Vec2, _: Vec2, _: Color, _: f32) {
            panic!("device lost");
        }
        fn add_circle(&mut self, _: Vec2, _: f32, _: Color, _: f32) {
            panic!("device lost");
        }
        fn add_circle_filled(&mut self, _: Vec2, _: f32, _: Color) {
            panic!("device lost");
        }
        fn add_text(&mut self, _: Vec2, _: f32, _: Color, _: &str) {
            panic!("device lost");
        }
        fn measure_text(&self, font_size: f32, text: &str) -> Vec2 {
            Vec2::new(text.len() as f32 * font_size / 2.0, font_size)
        }
    }

    fn coordinator() -> FrameCoordinator {
        FrameCoordinator::new(ConfigStore::default(), HostMode::Injected, StatCatalog::default())
    }

    fn run(coordinator: &mut FrameCoordinator, host: &mut TestHost, draw: &mut RecordingDrawList) -> FrameOutcome {
        coordinator.execute(host, 1920.0, 1080.0, Some(draw))
    }

    #[test]
    fn running_frame_draws_and_restores_gpu_state() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        let outcome = run(&mut coordinator, &mut host, &mut draw);
        assert_eq!(
            outcome,
            FrameOutcome::Drawn {
                entities: 1,
                slow_tick: true
            }
        );
        assert_eq!(coordinator.config().hook_status(), HookStatus::Ok);
        assert_eq!((host.backups, host.restores, host.depth), (1, 1, 0));
        assert!(draw.texts().any(|text| text == "Braham"));
    }

    #[test]
    fn panics_are_contained_and_state_is_restored() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let outcome = coordinator.execute(&mut host, 1920.0, 1080.0, Some(&mut ExplodingDrawList));
        assert_eq!(outcome, FrameOutcome::Panicked);
        assert_eq!((host.backups, host.restores, host.depth), (1, 1, 0));
        assert_eq!(coordinator.stats().recovered_panics, 1);

        // The next frame runs normally.
        host.now_ms = 100;
        let mut draw = RecordingDrawList::default();
        assert!(matches!(
            run(&mut coordinator, &mut host, &mut draw),
            FrameOutcome::Drawn { entities: 1, .. }
        ));
    }

    #[test]
    fn missing_draw_list_skips_the_frame() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let outcome = coordinator.execute::<_, RecordingDrawList>(&mut host, 1920.0, 1080.0, None);
        assert_eq!(outcome, FrameOutcome::NoDrawList);
        assert_eq!(host.backups, 0);
    }

    #[test]
    fn insert_toggles_the_ui() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        host.keys.push_back(HotKey::Insert);
        run(&mut coordinator, &mut host, &mut draw);
        assert!(coordinator.is_ui_visible());
        assert_eq!(host.ui_frames, 1);

        host.keys.push_back(HotKey::Insert);
        run(&mut coordinator, &mut host, &mut draw);
        assert!(!coordinator.is_ui_visible());
        assert_eq!(host.ui_frames, 1);
    }

    #[test]
    fn delete_saves_and_shuts_down_when_injected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let config = ConfigStore::open(&path).unwrap();
        let mut coordinator = FrameCoordinator::new(config, HostMode::Injected, StatCatalog::default());
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        run(&mut coordinator, &mut host, &mut draw);

        host.keys.push_back(HotKey::Delete);
        assert_eq!(run(&mut coordinator, &mut host, &mut draw), FrameOutcome::ShutDown);
        assert!(path.exists());
        assert!(coordinator.config().is_shutdown_requested());
        assert_eq!(coordinator.lifecycle().state(), LifecycleState::ShuttingDown);

        draw.clear();
        assert_eq!(run(&mut coordinator, &mut host, &mut draw), FrameOutcome::ShutDown);
        assert!(draw.commands().is_empty());
    }

    #[test]
    fn delete_is_ignored_by_plugin_hosts() {
        let mut coordinator =
            FrameCoordinator::new(ConfigStore::default(), HostMode::Plugin, StatCatalog::default());
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        host.keys.push_back(HotKey::Delete);
        run(&mut coordinator, &mut host, &mut draw);
        assert!(!coordinator.config().is_shutdown_requested());
    }

    #[test]
    fn waits_for_the_game_before_running() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        host.link = Some(LinkState {
            map_id: 0,
            ..link(0)
        });
        assert_eq!(
            run(&mut coordinator, &mut host, &mut draw),
            FrameOutcome::Waiting {
                state: LifecycleState::WaitingForGame
            }
        );
        assert!(draw.commands().is_empty());
        assert_eq!(coordinator.pipeline().ticks(), 0);
    }

    #[test]
    fn init_failure_marks_the_hook_failed() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        host.init_error = Some("agent table missing".into());
        let mut draw = RecordingDrawList::default();
        assert_eq!(run(&mut coordinator, &mut host, &mut draw), FrameOutcome::InitFailed);
        assert_eq!(coordinator.config().hook_status(), HookStatus::Failed);
        assert_eq!(coordinator.lifecycle().state(), LifecycleState::ShuttingDown);
    }

    #[test]
    fn open_map_hides_the_esp() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        host.link = Some(link(UiState::MAP_OPEN));
        let mut draw = RecordingDrawList::default();
        assert_eq!(run(&mut coordinator, &mut host, &mut draw), FrameOutcome::MapOpen);
        assert!(draw.commands().is_empty());
    }

    #[test]
    fn empty_provider_does_not_advance_combat_state() {
        let mut coordinator = coordinator();
        let mut host = TestHost::ready();
        let mut draw = RecordingDrawList::default();
        run(&mut coordinator, &mut host, &mut draw);
        assert_eq!(coordinator.pipeline().ticks(), 1);

        host.snapshot = None;
        host.now_ms = 500;
        draw.clear();
        let outcome = run(&mut coordinator, &mut host, &mut draw);
        assert_eq!(coordinator.pipeline().ticks(), 1);
        // The previous list is still drawn.
        assert_eq!(
            outcome,
            FrameOutcome::Drawn {
                entities: 1,
                slow_tick: false
            }
        );
        assert!(
            draw.commands()
                .iter()
                .any(|command| matches!(command, DrawCommand::Text { text, .. } if text == "Braham"))
        );
    }
}
