//! Per-tick state transition for one tracked entity.

use glam::Vec3;

use crate::entity::{EntityKind, EntityRef};

use super::constants::{
    BURST_HEAL_WINDOW_MS, BURST_INACTIVITY_TIMEOUT_MS, DAMAGE_ACCUMULATOR_FADE_MS,
    MAX_BURST_DURATION_MS, MAX_HEALTH_CHANGE_TOLERANCE, MIN_TRAIL_DISPLACEMENT,
    POST_MORTEM_FLUSH_DELAY_MS,
};
use super::state::{EntityCombatState, PositionHistoryPoint};

/// The slice of an entity the combat tracker looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatSample {
    pub kind: EntityKind,
    pub health: f32,
    pub max_health: f32,
    pub barrier: f32,
    pub position: Vec3,
}

impl CombatSample {
    pub fn from_entity(entity: EntityRef<'_>) -> Self {
        let base = entity.base();
        Self {
            kind: entity.kind(),
            health: base.health,
            max_health: base.max_health,
            barrier: base.barrier,
            position: base.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatOptions {
    pub max_trail_points: usize,
    pub instant_destruction_resets_gadget: bool,
}

impl Default for CombatOptions {
    fn default() -> Self {
        Self {
            max_trail_points: 30,
            instant_destruction_resets_gadget: true,
        }
    }
}

pub fn update_state(
    state: &mut EntityCombatState,
    sample: &CombatSample,
    now: u64,
    options: &CombatOptions,
) {
    expire_flushed_damage(state, now);

    if swallow_attribute_change(state, sample, now, options) {
        return;
    }

    if sample.barrier != state.last_known_barrier {
        state.barrier_on_last_change = state.last_known_barrier;
        state.last_barrier_change_timestamp = now;
    }

    // A first sighting has nothing to diff against.
    if state.initialized {
        if sample.health < state.last_known_health {
            apply_damage(state, sample.health, now);
        } else if sample.health > state.last_known_health {
            apply_healing(state, sample, now);
        }
    }

    flush_if_due(state, now);
    record_position(state, sample.position, now, options.max_trail_points);

    state.last_known_health = sample.health;
    state.last_known_max_health = sample.max_health;
    state.last_known_barrier = sample.barrier;
    state.last_seen_timestamp = state.last_seen_timestamp.max(now);
    state.initialized = true;
}

/// Starts a fresh baseline at the current health. The barrier baseline
/// survives so the next tick does not see a phantom barrier change.
pub fn reset_for_respawn(state: &mut EntityCombatState, sample: &CombatSample, now: u64) {
    let barrier = state.last_known_barrier;
    let last_seen = state.last_seen_timestamp;
    *state = EntityCombatState {
        last_known_health: sample.health,
        last_known_max_health: sample.max_health,
        last_known_barrier: barrier,
        last_seen_timestamp: last_seen.max(now),
        initialized: true,
        ..EntityCombatState::default()
    };
}

fn expire_flushed_damage(state: &mut EntityCombatState, now: u64) {
    if state.flush_animation_start_time > 0
        && now.saturating_sub(state.flush_animation_start_time) >= DAMAGE_ACCUMULATOR_FADE_MS
    {
        state.accumulated_damage = 0.0;
        state.flush_animation_start_time = 0;
        state.damage_to_display = 0.0;
        state.accumulator_end_percent = None;
    }
}

/// Max-health swaps (mounts, downed state, transforms) move the baseline
/// without producing damage or healing. Returns true when the rest of the
/// tick must be skipped.
fn swallow_attribute_change(
    state: &mut EntityCombatState,
    sample: &CombatSample,
    now: u64,
    options: &CombatOptions,
) -> bool {
    if state.last_known_max_health > 0.0
        && (sample.max_health - state.last_known_max_health).abs() > MAX_HEALTH_CHANGE_TOLERANCE
    {
        state.last_known_health = sample.health;
        state.last_known_max_health = sample.max_health;
        state.last_known_barrier = sample.barrier;
        if sample.health > 0.0 {
            state.death_timestamp = 0;
        }
        state.last_seen_timestamp = state.last_seen_timestamp.max(now);
        return true;
    }

    if options.instant_destruction_resets_gadget
        && sample.kind == EntityKind::Gadget
        && state.last_known_max_health > 0.0
        && state.last_known_health >= state.last_known_max_health
        && sample.health <= 0.0
    {
        reset_for_respawn(state, sample, now);
        return true;
    }

    false
}

fn apply_damage(state: &mut EntityCombatState, health: f32, now: u64) {
    let damage = state.last_known_health - health;
    if damage <= 0.0 {
        return;
    }
    if state.accumulated_damage <= 0.0 {
        state.burst_start_time = now;
    }
    state.accumulated_damage += damage;
    state.last_damage_taken = damage;
    state.last_hit_timestamp = now;
    if health <= 0.0 && state.death_timestamp == 0 {
        state.death_timestamp = now;
    }
}

fn apply_healing(state: &mut EntityCombatState, sample: &CombatSample, now: u64) {
    if state.last_known_health <= 0.0 {
        reset_for_respawn(state, sample, now);
        return;
    }
    if now.saturating_sub(state.last_heal_timestamp) > BURST_HEAL_WINDOW_MS {
        state.heal_start_health = state.last_known_health;
    }
    state.last_heal_timestamp = now;
    state.last_heal_flash_timestamp = now;
}

fn flush_if_due(state: &mut EntityCombatState, now: u64) {
    if state.flush_animation_start_time != 0 || state.accumulated_damage <= 0.0 {
        return;
    }
    let since_hit = now.saturating_sub(state.last_hit_timestamp);
    let due = if state.death_timestamp > 0 {
        since_hit >= POST_MORTEM_FLUSH_DELAY_MS
    } else {
        since_hit >= BURST_INACTIVITY_TIMEOUT_MS
            || now.saturating_sub(state.burst_start_time) >= MAX_BURST_DURATION_MS
    };
    if due {
        state.flush_animation_start_time = now;
        state.damage_to_display = state.accumulated_damage;
    }
}

fn record_position(state: &mut EntityCombatState, position: Vec3, now: u64, capacity: usize) {
    let moved = state
        .history
        .last()
        .is_none_or(|last| last.position.distance(position) >= MIN_TRAIL_DISPLACEMENT);
    if moved {
        state.history.push(
            PositionHistoryPoint {
                position,
                timestamp_ms: now,
            },
            capacity,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::constants::DEATH_ANIMATION_TOTAL_DURATION_MS;

    fn sample(kind: EntityKind, health: f32, max_health: f32) -> CombatSample {
        CombatSample {
            kind,
            health,
            max_health,
            barrier: 0.0,
            position: Vec3::new(1.0, 0.0, 1.0),
        }
    }

    fn npc(health: f32, max_health: f32) -> CombatSample {
        sample(EntityKind::Npc, health, max_health)
    }

    #[test]
    fn first_sighting_records_baseline_only() {
        let mut state = EntityCombatState::default();
        update_state(&mut state, &npc(400.0, 1000.0), 50, &CombatOptions::default());
        assert_eq!(state.last_known_health, 400.0);
        assert_eq!(state.accumulated_damage, 0.0);
        assert_eq!(state.last_hit_timestamp, 0);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn healing_within_window_keeps_heal_start() {
        let options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        update_state(&mut state, &npc(500.0, 1000.0), 10, &options);
        update_state(&mut state, &npc(600.0, 1000.0), 1000, &options);
        assert_eq!(state.heal_start_health, 500.0);
        update_state(&mut state, &npc(700.0, 1000.0), 1200, &options);
        assert_eq!(state.heal_start_health, 500.0);
        assert_eq!(state.last_heal_timestamp, 1200);
        update_state(&mut state, &npc(800.0, 1000.0), 2000, &options);
        assert_eq!(state.heal_start_health, 700.0);
    }

    #[test]
    fn rising_from_zero_is_a_respawn() {
        let options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        update_state(&mut state, &npc(100.0, 1000.0), 10, &options);
        update_state(&mut state, &npc(0.0, 1000.0), 100, &options);
        assert_eq!(state.death_timestamp, 100);
        // Health rising from zero is a respawn, which starts over.
        update_state(&mut state, &npc(1000.0, 1000.0), 5000, &options);
        assert_eq!(state.death_timestamp, 0);
        assert_eq!(state.accumulated_damage, 0.0);
        assert_eq!(state.last_known_health, 1000.0);
        assert_eq!(state.last_heal_flash_timestamp, 0);
    }

    #[test]
    fn death_stays_put_while_the_corpse_lingers() {
        let options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        update_state(&mut state, &npc(100.0, 1000.0), 10, &options);
        update_state(&mut state, &npc(0.0, 1000.0), 100, &options);
        update_state(
            &mut state,
            &npc(0.0, 1000.0),
            100 + DEATH_ANIMATION_TOTAL_DURATION_MS,
            &options,
        );
        assert_eq!(state.death_timestamp, 100);
    }

    #[test]
    fn barrier_change_records_previous_value() {
        let options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        let mut with_barrier = npc(1000.0, 1000.0);
        update_state(&mut state, &with_barrier, 10, &options);
        with_barrier.barrier = 250.0;
        update_state(&mut state, &with_barrier, 20, &options);
        assert_eq!(state.barrier_on_last_change, 0.0);
        assert_eq!(state.last_barrier_change_timestamp, 20);
        assert_eq!(state.last_known_barrier, 250.0);
    }

    #[test]
    fn gadget_destruction_toggle_controls_reset() {
        let mut options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        update_state(&mut state, &sample(EntityKind::Gadget, 5000.0, 5000.0), 10, &options);
        update_state(&mut state, &sample(EntityKind::Gadget, 0.0, 5000.0), 20, &options);
        assert_eq!(state.death_timestamp, 0);
        assert_eq!(state.accumulated_damage, 0.0);

        options.instant_destruction_resets_gadget = false;
        let mut state = EntityCombatState::default();
        update_state(&mut state, &sample(EntityKind::Gadget, 5000.0, 5000.0), 10, &options);
        update_state(&mut state, &sample(EntityKind::Gadget, 0.0, 5000.0), 20, &options);
        assert_eq!(state.death_timestamp, 20);
        assert_eq!(state.accumulated_damage, 5000.0);
    }

    #[test]
    fn small_moves_do_not_extend_the_trail() {
        let options = CombatOptions::default();
        let mut state = EntityCombatState::default();
        let mut moving = npc(1000.0, 1000.0);
        update_state(&mut state, &moving, 10, &options);
        moving.position.x += 0.05;
        update_state(&mut state, &moving, 20, &options);
        assert_eq!(state.history.len(), 1);
        moving.position.x += 0.5;
        update_state(&mut state, &moving, 30, &options);
        assert_eq!(state.history.len(), 2);
    }
}
