use std::collections::VecDeque;

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionHistoryPoint {
    pub position: Vec3,
    pub timestamp_ms: u64,
}

/// Bounded trail of recent positions, oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionHistory {
    points: VecDeque<PositionHistoryPoint>,
}

impl PositionHistory {
    /// Appends `point`, discarding the oldest entries beyond `capacity`.
    pub fn push(&mut self, point: PositionHistoryPoint, capacity: usize) {
        if capacity == 0 {
            self.points.clear();
            return;
        }
        self.points.push_back(point);
        while self.points.len() > capacity {
            self.points.pop_front();
        }
    }

    pub fn last(&self) -> Option<&PositionHistoryPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PositionHistoryPoint> + ExactSizeIterator {
        self.points.iter()
    }
}

/// Health history for one tracked entity.
///
/// Timestamps are milliseconds on the overlay clock; zero means "never".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityCombatState {
    pub last_known_health: f32,
    pub last_known_max_health: f32,
    pub last_known_barrier: f32,
    pub last_damage_taken: f32,
    pub last_hit_timestamp: u64,
    pub heal_start_health: f32,
    pub last_heal_timestamp: u64,
    pub last_heal_flash_timestamp: u64,
    pub death_timestamp: u64,
    pub last_seen_timestamp: u64,
    pub accumulated_damage: f32,
    pub flush_animation_start_time: u64,
    pub burst_start_time: u64,
    pub damage_to_display: f32,
    pub barrier_on_last_change: f32,
    pub last_barrier_change_timestamp: u64,
    /// Pixel-rounded end of the accumulator chunk, pinned after layout.
    pub accumulator_end_percent: Option<f32>,
    pub history: PositionHistory,
    /// Set once a baseline has been recorded.
    pub initialized: bool,
}

impl EntityCombatState {
    pub fn is_dead(&self) -> bool {
        self.death_timestamp != 0
    }

    pub fn is_flushing(&self) -> bool {
        self.flush_animation_start_time != 0
    }

    /// Average damage per second over the running burst, if one has lasted
    /// long enough to mean anything.
    pub fn burst_dps(&self, now_ms: u64) -> Option<f32> {
        if self.accumulated_damage <= 0.0 {
            return None;
        }
        let elapsed = now_ms.saturating_sub(self.burst_start_time);
        if elapsed <= super::constants::MIN_BURST_DPS_DURATION_MS {
            return None;
        }
        Some(self.accumulated_damage / (elapsed as f32 / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_newest_points() {
        let mut history = PositionHistory::default();
        for t in 0..5u64 {
            history.push(
                PositionHistoryPoint {
                    position: Vec3::splat(t as f32),
                    timestamp_ms: t,
                },
                3,
            );
        }
        assert_eq!(history.len(), 3);
        let stamps: Vec<u64> = history.iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
    }

    #[test]
    fn burst_dps_needs_a_running_burst() {
        let mut state = EntityCombatState::default();
        assert!(state.burst_dps(1000).is_none());
        state.accumulated_damage = 3000.0;
        state.burst_start_time = 1000;
        assert!(state.burst_dps(1000).is_none());
        assert!(state.burst_dps(1050).is_none());
        let dps = state.burst_dps(3000).unwrap();
        assert!((dps - 1500.0).abs() < 1e-3);
    }
}
