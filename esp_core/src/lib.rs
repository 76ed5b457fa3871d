//! Per-frame ESP pipeline: snapshot extraction, combat-state tracking,
//! culling, screen-space visuals, layout, and drawing into a host-supplied
//! draw list.
//!
//! A host drives everything through [`FrameCoordinator::execute`] once per
//! presented frame.

pub mod camera;
pub mod color;
pub mod combat;
pub mod config;
pub mod context;
pub mod draw;
pub mod entity;
pub mod error;
pub mod extract;
pub mod far_plane;
pub mod filter;
pub mod frame;
pub mod layout;
pub mod lifecycle;
pub mod pipeline;
pub mod pool;
pub mod render;
pub mod styling;
pub mod text;
pub mod visuals;

pub use camera::{Camera, CameraPose};
pub use color::Color;
pub use combat::{CombatStateKey, CombatStateManager, EntityCombatState};
pub use config::{ConfigStore, HookStatus, Settings, ShutdownFlag};
pub use context::FrameContext;
pub use draw::{DrawCommand, DrawList, RecordingDrawList, TextMetrics};
pub use error::EspError;
pub use frame::{
    Clock, FrameCoordinator, FrameOutcome, FrameStats, GpuStateBackend, GpuStateGuard,
    HotkeySource, LinkSource, OverlayHost, OverlayStatus, OverlayUi, SnapshotProvider,
    SystemClock,
};
pub use lifecycle::{HostMode, LifecycleManager, LifecycleState, Readiness};
pub use pipeline::{EspPipeline, FrameInputs, TickStats};
pub use render::info::StatCatalog;
pub use render::{FinalizedRenderable, render_entity};
