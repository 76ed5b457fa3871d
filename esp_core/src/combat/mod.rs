//! Combat state tracking: turns per-tick health snapshots into damage
//! bursts, heals, barrier changes, deaths, and movement trails.

pub mod constants;
pub mod logic;
pub mod state;

use std::collections::{HashMap, HashSet};

use crate::entity::EntityRef;

pub use logic::{CombatOptions, CombatSample, reset_for_respawn, update_state};
pub use state::{EntityCombatState, PositionHistory, PositionHistoryPoint};

use constants::DAMAGE_ACCUMULATOR_FADE_MS;

/// Identity of a tracked entity across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombatStateKey(u64);

impl CombatStateKey {
    const AGENT_TAG: u64 = 1 << 63;

    pub fn from_address(address: u64) -> Self {
        Self(address)
    }

    /// Attack targets carry an agent id that outlives their gadget record,
    /// so they are keyed by it when present.
    pub fn for_entity(entity: EntityRef<'_>) -> Self {
        match entity {
            EntityRef::AttackTarget(target) => match target.agent_id {
                Some(agent) => Self(Self::AGENT_TAG | u64::from(agent)),
                None => Self(target.base.address),
            },
            other => Self(other.base().address),
        }
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct CombatStateManager {
    states: HashMap<CombatStateKey, EntityCombatState>,
    options: CombatOptions,
}

impl CombatStateManager {
    pub fn new(options: CombatOptions) -> Self {
        Self {
            states: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &CombatOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CombatOptions) {
        self.options = options;
    }

    /// Advances every entity that has a health pool.
    pub fn update<'a, I>(&mut self, entities: I, now: u64)
    where
        I: IntoIterator<Item = EntityRef<'a>>,
    {
        for entity in entities {
            self.update_entity(entity, now);
        }
    }

    pub fn update_entity(&mut self, entity: EntityRef<'_>, now: u64) {
        if entity.base().max_health <= 0.0 {
            return;
        }
        let key = CombatStateKey::for_entity(entity);
        let state = self.states.entry(key).or_default();
        update_state(state, &CombatSample::from_entity(entity), now, &self.options);
    }

    /// Drops every state whose key is not in `active`. Returns how many were
    /// removed.
    pub fn prune(&mut self, active: &HashSet<CombatStateKey>) -> usize {
        let before = self.states.len();
        self.states.retain(|key, _| active.contains(key));
        before - self.states.len()
    }

    pub fn get_state(&self, key: CombatStateKey) -> Option<&EntityCombatState> {
        self.states.get(&key)
    }

    pub fn state_for(&self, entity: EntityRef<'_>) -> Option<&EntityCombatState> {
        self.get_state(CombatStateKey::for_entity(entity))
    }

    /// Pins the end of the damage-accumulator chunk to a whole pixel of a
    /// bar `health_bar_width` pixels wide.
    pub fn post_update(&mut self, entity: EntityRef<'_>, health_bar_width: f32, now: u64) {
        let base = entity.base();
        let Some(state) = self.states.get_mut(&CombatStateKey::for_entity(entity)) else {
            return;
        };
        let fading_out = state.flush_animation_start_time > 0
            && now.saturating_sub(state.flush_animation_start_time) >= DAMAGE_ACCUMULATOR_FADE_MS;
        if state.accumulated_damage <= 0.0
            || base.max_health <= 0.0
            || health_bar_width <= 0.0
            || fading_out
        {
            state.accumulator_end_percent = None;
            return;
        }
        let percent = (base.health.max(0.0) + state.accumulated_damage) / base.max_health;
        let pixels = (percent.clamp(0.0, 1.0) * health_bar_width).round();
        state.accumulator_end_percent = Some(pixels / health_bar_width);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CombatStateKey, &EntityCombatState)> {
        self.states.iter()
    }
}
