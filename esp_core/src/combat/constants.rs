//! Timing constants for combat feedback, all in milliseconds.

pub const BURST_INACTIVITY_TIMEOUT_MS: u64 = 1800;
pub const MAX_BURST_DURATION_MS: u64 = 8000;
pub const DAMAGE_ACCUMULATOR_FADE_MS: u64 = 1000;
pub const POST_MORTEM_FLUSH_DELAY_MS: u64 = 200;

pub const DAMAGE_FLASH_HOLD_MS: u64 = 200;
pub const DAMAGE_FLASH_FADE_MS: u64 = 400;
pub const DAMAGE_FLASH_TOTAL_DURATION_MS: u64 = DAMAGE_FLASH_HOLD_MS + DAMAGE_FLASH_FADE_MS;

pub const HEAL_FLASH_DURATION_MS: u64 = 150;
pub const HEAL_OVERLAY_DURATION_MS: u64 = 2000;
pub const HEAL_OVERLAY_FADE_DURATION_MS: u64 = 400;
pub const BURST_HEAL_WINDOW_MS: u64 = 350;

pub const DEATH_BURST_DURATION_MS: u64 = 1000;
pub const DEATH_FINAL_FADE_DURATION_MS: u64 = 2100;
pub const DEATH_ANIMATION_TOTAL_DURATION_MS: u64 =
    DEATH_BURST_DURATION_MS + DEATH_FINAL_FADE_DURATION_MS;

pub const BARRIER_ANIM_DURATION_MS: u64 = 250;

/// Pixels a flushed damage number drifts upward while fading.
pub const DAMAGE_NUMBER_MAX_DRIFT: f32 = 50.0;

/// Metres an entity must move before a new trail point is recorded.
pub const MIN_TRAIL_DISPLACEMENT: f32 = 0.1;

/// Max-health changes larger than this are attribute swaps, not damage.
pub const MAX_HEALTH_CHANGE_TOLERANCE: f32 = 1.0;

/// Bursts shorter than this report no DPS figure.
pub const MIN_BURST_DPS_DURATION_MS: u64 = 100;
