use crate::camera::Camera;
use crate::combat::CombatStateManager;
use crate::config::Settings;

/// Everything a pipeline stage reads that stays fixed for one frame.
///
/// The draw-list sink is passed next to the context rather than inside it
/// because drawing needs it mutably while the context is shared.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub now_ms: u64,
    pub camera: &'a Camera,
    pub combat: &'a CombatStateManager,
    pub settings: &'a Settings,
    pub screen_width: f32,
    pub screen_height: f32,
    pub in_wvw: bool,
    pub adaptive_far_plane: f32,
}
