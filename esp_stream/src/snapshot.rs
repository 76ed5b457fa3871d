//! Plain-data entity records produced by a snapshot provider.
//!
//! Positions are in game space: Z up, game units. The overlay converts them
//! to its own Y-up metre space during extraction.

use serde::{Deserialize, Serialize};

use crate::game::{
    Attitude, AttackTargetCombatState, CharacterRank, EquipmentSlot, GadgetType, ItemRarity,
    Profession, Race, ResourceNodeType,
};

fn vec_is_empty<T>(vec: &Vec<T>) -> bool {
    vec.is_empty()
}

/// Fields every entity kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityBase {
    /// Stable per-entity identifier. Unique within a frame and stable across
    /// frames for the same entity.
    pub address: u64,
    pub position: [f32; 3],
    pub health: f32,
    pub max_health: f32,
    #[serde(default)]
    pub barrier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearSlotRecord {
    pub slot: EquipmentSlot,
    pub stat_id: u32,
    pub rarity: ItemRarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerRecord {
    pub base: EntityBase,
    pub attitude: Attitude,
    #[serde(default)]
    pub profession: Profession,
    #[serde(default)]
    pub race: Race,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub scaled_level: u32,
    #[serde(default)]
    pub endurance: f32,
    #[serde(default)]
    pub max_endurance: f32,
    #[serde(default)]
    pub special_energy: f32,
    #[serde(default)]
    pub max_special_energy: f32,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "vec_is_empty", default)]
    pub gear: Vec<GearSlotRecord>,
    #[serde(default)]
    pub is_local_player: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NpcRecord {
    pub base: EntityBase,
    pub attitude: Attitude,
    #[serde(default)]
    pub rank: CharacterRank,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GadgetRecord {
    pub base: EntityBase,
    pub gadget_type: GadgetType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resource_node: Option<ResourceNodeType>,
    #[serde(default)]
    pub gatherable: bool,
    /// Physics extents (width, depth, height) in metres when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimensions: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AttackTargetRecord {
    pub base: EntityBase,
    #[serde(default)]
    pub combat_state: AttackTargetCombatState,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub agent_id: Option<u32>,
}

/// One live entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityRecord {
    Player(PlayerRecord),
    Npc(NpcRecord),
    Gadget(GadgetRecord),
    AttackTarget(AttackTargetRecord),
}

impl EntityRecord {
    pub fn base(&self) -> &EntityBase {
        match self {
            EntityRecord::Player(record) => &record.base,
            EntityRecord::Npc(record) => &record.base,
            EntityRecord::Gadget(record) => &record.base,
            EntityRecord::AttackTarget(record) => &record.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut EntityBase {
        match self {
            EntityRecord::Player(record) => &mut record.base,
            EntityRecord::Npc(record) => &mut record.base,
            EntityRecord::Gadget(record) => &mut record.base,
            EntityRecord::AttackTarget(record) => &mut record.base,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            EntityRecord::Player(_) => "player",
            EntityRecord::Npc(_) => "npc",
            EntityRecord::Gadget(_) => "gadget",
            EntityRecord::AttackTarget(_) => "attack-target",
        }
    }
}

/// Every live entity the provider saw at `time_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FrameSnapshot {
    pub seq: u64,
    pub time_ms: u64,
    #[serde(skip_serializing_if = "vec_is_empty", default)]
    pub entities: Vec<EntityRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_envelope, decode_payload, encode_message, MessageKind};

    #[test]
    fn frame_payload_keeps_entity_kinds() {
        let frame = FrameSnapshot {
            seq: 3,
            time_ms: 120,
            entities: vec![
                EntityRecord::Player(PlayerRecord {
                    base: EntityBase {
                        address: 0x10,
                        position: [1.0, 2.0, 3.0],
                        health: 900.0,
                        max_health: 1000.0,
                        barrier: 0.0,
                    },
                    attitude: Attitude::Hostile,
                    name: "Rytlock".to_string(),
                    ..PlayerRecord::default()
                }),
                EntityRecord::Gadget(GadgetRecord {
                    base: EntityBase {
                        address: 0x20,
                        position: [4.0, 5.0, 6.0],
                        ..EntityBase::default()
                    },
                    gadget_type: GadgetType::Waypoint,
                    ..GadgetRecord::default()
                }),
            ],
        };

        let message = encode_message(MessageKind::Frame, &frame).unwrap();
        let (_, payload) = decode_envelope(&message).unwrap();
        let decoded: FrameSnapshot = decode_payload(payload).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.entities[0].kind_label(), "player");
        assert_eq!(decoded.entities[1].base().address, 0x20);
    }
}
