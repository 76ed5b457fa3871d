use std::collections::VecDeque;

use esp_core::{
    Clock, GpuStateBackend, HotkeySource, LinkSource, OverlayHost, OverlayStatus, OverlayUi,
    SnapshotProvider,
};
use esp_link::LinkState;
use esp_stream::{FrameSnapshot, HotKey, InputEvent, LinkBlock};

/// Stands in for the game process: a manual clock, the latest recorded
/// snapshot and link block, and queued key presses.
#[derive(Debug, Default)]
pub struct ReplayHost {
    now_ms: u64,
    snapshot: Option<FrameSnapshot>,
    link: Option<LinkState>,
    keys: VecDeque<HotKey>,
    display_size: (f32, f32),
    gpu_depth: u32,
    gpu_restores: u64,
    ui_frames: u64,
    last_status: Option<OverlayStatus>,
    bad_link_blocks: u64,
}

impl ReplayHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn push_snapshot(&mut self, snapshot: FrameSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// Decodes a recorded link block. Blocks the game did not write are
    /// counted and dropped, like a live reader would ignore them.
    pub fn push_link_block(&mut self, block: &LinkBlock) {
        match LinkState::parse(&block.data) {
            Ok(state) => self.link = Some(state),
            Err(err) => {
                self.bad_link_blocks += 1;
                log::debug!("skipping link block at {} ms: {err}", block.time_ms);
            }
        }
    }

    pub fn push_input(&mut self, input: &InputEvent) {
        self.keys.push_back(input.key);
    }

    pub fn display_size(&self) -> (f32, f32) {
        self.display_size
    }

    pub fn gpu_restores(&self) -> u64 {
        self.gpu_restores
    }

    pub fn ui_frames(&self) -> u64 {
        self.ui_frames
    }

    pub fn last_status(&self) -> Option<&OverlayStatus> {
        self.last_status.as_ref()
    }

    pub fn bad_link_blocks(&self) -> u64 {
        self.bad_link_blocks
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }
}

impl GpuStateBackend for ReplayHost {
    type Saved = u32;

    fn backup_state(&mut self) -> u32 {
        self.gpu_depth += 1;
        self.gpu_depth
    }

    fn restore_state(&mut self, saved: u32) {
        if saved != self.gpu_depth {
            log::warn!("GPU state restored out of order ({saved} vs {})", self.gpu_depth);
        }
        self.gpu_depth = self.gpu_depth.saturating_sub(1);
        self.gpu_restores += 1;
    }
}

impl OverlayUi for ReplayHost {
    fn is_ui_ready(&self) -> bool {
        true
    }

    fn set_display_size(&mut self, width: f32, height: f32) {
        self.display_size = (width, height);
    }

    fn render_ui(&mut self, status: &OverlayStatus) {
        self.ui_frames += 1;
        self.last_status = Some(*status);
    }
}

impl HotkeySource for ReplayHost {
    fn is_key_edge_pressed(&mut self, key: HotKey) -> bool {
        match self.keys.iter().position(|&queued| queued == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }
}

impl SnapshotProvider for ReplayHost {
    fn snapshot(&mut self, _now_ms: u64) -> Option<FrameSnapshot> {
        self.snapshot.clone()
    }
}

impl LinkSource for ReplayHost {
    fn poll_link(&mut self, _now_ms: u64) -> Option<LinkState> {
        self.link.take()
    }
}

impl Clock for ReplayHost {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

impl OverlayHost for ReplayHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_key_press_is_consumed_once() {
        let mut host = ReplayHost::new();
        host.push_input(&InputEvent {
            time_ms: 0,
            key: HotKey::Delete,
        });
        host.push_input(&InputEvent {
            time_ms: 0,
            key: HotKey::Insert,
        });
        assert!(host.is_key_edge_pressed(HotKey::Insert));
        assert!(!host.is_key_edge_pressed(HotKey::Insert));
        assert_eq!(host.pending_keys(), 1);
        assert!(host.is_key_edge_pressed(HotKey::Delete));
    }

    #[test]
    fn garbage_link_blocks_are_counted_not_applied() {
        let mut host = ReplayHost::new();
        host.push_link_block(&LinkBlock {
            time_ms: 5,
            data: vec![0; 12],
        });
        assert_eq!(host.bad_link_blocks(), 1);
        assert!(host.poll_link(5).is_none());
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut host = ReplayHost::new();
        host.set_time(200);
        host.set_time(100);
        assert_eq!(host.now_ms(), 200);
    }
}
