//! Converts provider records into pooled overlay entities.

use glam::Vec3;

use esp_stream::{EntityBase, EntityRecord, FrameSnapshot};

use crate::entity::{EntityHandle, EntityKind, EntityPools, RenderableEntity};

/// Game units per overlay metre.
pub const COORDINATE_SCALE: f32 = 1.23;

/// Game space is Z up; overlay space is Y up.
pub fn game_to_overlay(position: [f32; 3]) -> Vec3 {
    Vec3::new(
        position[0] / COORDINATE_SCALE,
        position[2] / COORDINATE_SCALE,
        position[1] / COORDINATE_SCALE,
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub players: usize,
    pub npcs: usize,
    pub gadgets: usize,
    pub attack_targets: usize,
    pub rejected: usize,
    pub dropped: usize,
}

impl ExtractStats {
    pub fn extracted(&self) -> usize {
        self.players + self.npcs + self.gadgets + self.attack_targets
    }
}

fn sane(base: &EntityBase) -> bool {
    if base.address == 0 {
        return false;
    }
    if !base.position.iter().all(|v| v.is_finite()) || base.position == [0.0; 3] {
        return false;
    }
    base.health.is_finite()
        && base.max_health.is_finite()
        && base.barrier.is_finite()
        && base.max_health >= 0.0
}

fn fill_base(target: &mut RenderableEntity, source: &EntityBase) {
    *target = RenderableEntity {
        address: source.address,
        position: game_to_overlay(source.position),
        health: source.health,
        max_health: source.max_health,
        barrier: source.barrier.max(0.0),
        visual_distance: 0.0,
        gameplay_distance: 0.0,
        valid: true,
    };
}

/// Resets the pools and refills them from `frame`.
///
/// Handles for every accepted entity are appended to `out` in snapshot
/// order. Records failing sanity checks and records past a pool's capacity
/// are skipped.
pub fn extract_entities(
    frame: &FrameSnapshot,
    pools: &mut EntityPools,
    out: &mut Vec<EntityHandle>,
) -> ExtractStats {
    pools.reset();
    out.clear();
    let mut stats = ExtractStats::default();

    for record in &frame.entities {
        if !sane(record.base()) {
            stats.rejected += 1;
            continue;
        }

        let handle = match record {
            EntityRecord::Player(source) => pools.players.acquire().map(|(slot, cell)| {
                fill_base(&mut cell.base, &source.base);
                cell.attitude = source.attitude;
                cell.profession = source.profession;
                cell.race = source.race;
                cell.level = source.level;
                cell.scaled_level = source.scaled_level;
                cell.endurance = source.endurance;
                cell.max_endurance = source.max_endurance;
                cell.special_energy = source.special_energy;
                cell.max_special_energy = source.max_special_energy;
                cell.name.clear();
                cell.name.push_str(&source.name);
                cell.gear.clear();
                cell.gear.extend_from_slice(&source.gear);
                cell.gear.sort_by_key(|slot| slot.slot);
                cell.is_local_player = source.is_local_player;
                stats.players += 1;
                EntityHandle {
                    kind: EntityKind::Player,
                    slot,
                }
            }),
            EntityRecord::Npc(source) => pools.npcs.acquire().map(|(slot, cell)| {
                fill_base(&mut cell.base, &source.base);
                cell.attitude = source.attitude;
                cell.rank = source.rank;
                cell.name.clear();
                cell.name.push_str(&source.name);
                cell.level = source.level;
                stats.npcs += 1;
                EntityHandle {
                    kind: EntityKind::Npc,
                    slot,
                }
            }),
            EntityRecord::Gadget(source) => pools.gadgets.acquire().map(|(slot, cell)| {
                fill_base(&mut cell.base, &source.base);
                cell.gadget_type = source.gadget_type;
                cell.resource_node = source.resource_node;
                cell.gatherable = source.gatherable;
                cell.dimensions = source
                    .dimensions
                    .map(Vec3::from_array)
                    .filter(|dims| dims.is_finite() && dims.cmpgt(Vec3::ZERO).all());
                stats.gadgets += 1;
                EntityHandle {
                    kind: EntityKind::Gadget,
                    slot,
                }
            }),
            EntityRecord::AttackTarget(source) => {
                pools.attack_targets.acquire().map(|(slot, cell)| {
                    fill_base(&mut cell.base, &source.base);
                    cell.combat_state = source.combat_state;
                    cell.agent_id = source.agent_id;
                    stats.attack_targets += 1;
                    EntityHandle {
                        kind: EntityKind::AttackTarget,
                        slot,
                    }
                })
            }
        };

        match handle {
            Some(handle) => out.push(handle),
            None => stats.dropped += 1,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use esp_stream::{Attitude, GadgetRecord, GadgetType, NpcRecord, PlayerRecord};

    fn base(address: u64, position: [f32; 3]) -> EntityBase {
        EntityBase {
            address,
            position,
            health: 100.0,
            max_health: 100.0,
            barrier: 0.0,
        }
    }

    #[test]
    fn converts_game_space_to_overlay_space() {
        let converted = game_to_overlay([123.0, 246.0, 12.3]);
        assert!((converted - Vec3::new(100.0, 10.0, 200.0)).length() < 1e-4);
    }

    #[test]
    fn rejects_null_and_origin_entities() {
        let frame = FrameSnapshot {
            seq: 1,
            time_ms: 0,
            entities: vec![
                EntityRecord::Npc(NpcRecord {
                    base: base(0, [1.0, 1.0, 1.0]),
                    ..NpcRecord::default()
                }),
                EntityRecord::Npc(NpcRecord {
                    base: base(7, [0.0, 0.0, 0.0]),
                    ..NpcRecord::default()
                }),
                EntityRecord::Npc(NpcRecord {
                    base: base(8, [f32::NAN, 0.0, 1.0]),
                    ..NpcRecord::default()
                }),
                EntityRecord::Npc(NpcRecord {
                    base: base(9, [1.0, 2.0, 3.0]),
                    name: "Moa".to_string(),
                    ..NpcRecord::default()
                }),
            ],
        };
        let mut pools = EntityPools::default();
        let mut handles = Vec::new();
        let stats = extract_entities(&frame, &mut pools, &mut handles);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.npcs, 1);
        assert_eq!(handles.len(), 1);
        assert_eq!(pools.used(), stats.extracted());
    }

    #[test]
    fn pool_overflow_drops_extra_entities() {
        let entities = (1..=3)
            .map(|address| {
                EntityRecord::Player(PlayerRecord {
                    base: base(address, [1.0, 1.0, 1.0]),
                    attitude: Attitude::Hostile,
                    ..PlayerRecord::default()
                })
            })
            .collect();
        let frame = FrameSnapshot {
            seq: 1,
            time_ms: 0,
            entities,
        };
        let mut pools = EntityPools::with_capacities(2, 1, 1, 1);
        let mut handles = Vec::new();
        let stats = extract_entities(&frame, &mut pools, &mut handles);
        assert_eq!(stats.players, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(pools.used(), 2);
    }

    #[test]
    fn invalid_physics_dimensions_are_discarded() {
        let frame = FrameSnapshot {
            seq: 1,
            time_ms: 0,
            entities: vec![EntityRecord::Gadget(GadgetRecord {
                base: base(3, [5.0, 5.0, 5.0]),
                gadget_type: GadgetType::Door,
                dimensions: Some([2.0, 0.0, 3.0]),
                ..GadgetRecord::default()
            })],
        };
        let mut pools = EntityPools::default();
        let mut handles = Vec::new();
        extract_entities(&frame, &mut pools, &mut handles);
        match pools.resolve(handles[0]) {
            Some(EntityRef::Gadget(gadget)) => {
                assert_eq!(gadget.gadget_type, GadgetType::Door);
                assert!(gadget.dimensions.is_none());
            }
            other => panic!("unexpected entity {other:?}"),
        }
    }
}
