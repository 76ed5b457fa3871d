//! Colour and emphasis choices per entity.

use esp_stream::{Attitude, CharacterRank, ItemRarity};

use crate::color::{Color, palette};
use crate::entity::EntityRef;

pub fn attitude_color(attitude: Attitude) -> Color {
    match attitude {
        Attitude::Friendly => palette::FRIENDLY,
        Attitude::Hostile => palette::HOSTILE,
        Attitude::Neutral => palette::NEUTRAL,
        Attitude::Indifferent => palette::INDIFFERENT,
    }
}

/// Base colour before any fading. Players are blue unless hostile; NPCs
/// follow their attitude; world objects share one colour.
pub fn entity_color(entity: EntityRef<'_>) -> Color {
    match entity {
        EntityRef::Player(player) if player.attitude == Attitude::Hostile => palette::HOSTILE,
        EntityRef::Player(_) => palette::PLAYER,
        EntityRef::Npc(npc) => attitude_color(npc.attitude),
        EntityRef::Gadget(_) | EntityRef::AttackTarget(_) => palette::GADGET,
    }
}

pub fn rarity_color(rarity: ItemRarity) -> Color {
    match rarity {
        ItemRarity::None | ItemRarity::Common => palette::RARITY_COMMON,
        ItemRarity::Junk => palette::RARITY_JUNK,
        ItemRarity::Fine => palette::RARITY_FINE,
        ItemRarity::Masterwork => palette::RARITY_MASTERWORK,
        ItemRarity::Rare => palette::RARITY_RARE,
        ItemRarity::Exotic => palette::RARITY_EXOTIC,
        ItemRarity::Ascended => palette::RARITY_ASCENDED,
        ItemRarity::Legendary => palette::RARITY_LEGENDARY,
    }
}

pub fn rank_multiplier(rank: CharacterRank) -> f32 {
    match rank {
        CharacterRank::Ambient | CharacterRank::Normal => 1.0,
        CharacterRank::Veteran => 1.25,
        CharacterRank::Elite => 1.5,
        CharacterRank::Champion => 1.75,
        CharacterRank::Legendary => 2.0,
    }
}

/// Health-bar emphasis for structures with very large health pools.
pub fn gadget_health_multiplier(max_health: f32) -> f32 {
    if max_health >= 1_000_000.0 {
        2.0
    } else if max_health >= 500_000.0 {
        1.75
    } else if max_health >= 250_000.0 {
        1.5
    } else if max_health >= 100_000.0 {
        1.25
    } else {
        1.0
    }
}

pub const DAMAGE_NUMBER_MIN_MULTIPLIER: f32 = 2.0;
pub const DAMAGE_NUMBER_MAX_MULTIPLIER: f32 = 5.0;
pub const DAMAGE_NUMBER_DAMAGE_FOR_MAX: f32 = 400_000.0;

/// Font multiplier for a flushed damage number; bigger bursts read bigger.
pub fn damage_number_multiplier(damage: f32) -> f32 {
    let progress = (damage.max(0.0) / DAMAGE_NUMBER_DAMAGE_FOR_MAX).min(1.0);
    DAMAGE_NUMBER_MIN_MULTIPLIER + progress * (DAMAGE_NUMBER_MAX_MULTIPLIER - DAMAGE_NUMBER_MIN_MULTIPLIER)
}

/// Size multipliers for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityMultipliers {
    pub hostile: f32,
    pub rank: f32,
    pub gadget_health: f32,
}

impl EntityMultipliers {
    pub fn for_entity(entity: EntityRef<'_>, hostile_boost: f32) -> Self {
        let mut multipliers = Self {
            hostile: 1.0,
            rank: 1.0,
            gadget_health: 1.0,
        };
        match entity {
            EntityRef::Player(player) if player.attitude == Attitude::Hostile => {
                multipliers.hostile = hostile_boost;
            }
            EntityRef::Npc(npc) => multipliers.rank = rank_multiplier(npc.rank),
            EntityRef::Gadget(gadget) => {
                multipliers.gadget_health = gadget_health_multiplier(gadget.base.max_health);
            }
            _ => {}
        }
        multipliers
    }

    /// Fonts only take the hostile emphasis.
    pub fn font(&self) -> f32 {
        self.hostile
    }

    pub fn health_bar(&self) -> f32 {
        self.hostile * self.rank * self.gadget_health
    }
}
