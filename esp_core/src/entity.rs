//! Per-tick entity records in overlay space (Y up, metres).

use glam::Vec3;

use esp_stream::{
    Attitude, AttackTargetCombatState, CharacterRank, GadgetType, GearSlotRecord, Profession,
    Race, ResourceNodeType,
};

use crate::pool::{ObjectPool, PoolHandle};

pub const PLAYER_POOL_CAPACITY: usize = 64;
pub const NPC_POOL_CAPACITY: usize = 128;
pub const GADGET_POOL_CAPACITY: usize = 1024;
pub const ATTACK_TARGET_POOL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Player,
    Npc,
    Gadget,
    AttackTarget,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Npc => "npc",
            EntityKind::Gadget => "gadget",
            EntityKind::AttackTarget => "attack-target",
        }
    }

    /// Players and NPCs are creatures; the rest are world objects.
    pub fn is_character(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Npc)
    }
}

/// Fields shared by every entity kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderableEntity {
    pub address: u64,
    pub position: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub barrier: f32,
    /// Camera to entity, drives scaling.
    pub visual_distance: f32,
    /// Local player to entity, drives culling and labels.
    pub gameplay_distance: f32,
    pub valid: bool,
}

impl RenderableEntity {
    pub fn has_health(&self) -> bool {
        self.max_health > 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.has_health() && self.health <= 0.0
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderablePlayer {
    pub base: RenderableEntity,
    pub attitude: Attitude,
    pub profession: Profession,
    pub race: Race,
    pub level: u32,
    pub scaled_level: u32,
    pub endurance: f32,
    pub max_endurance: f32,
    pub special_energy: f32,
    pub max_special_energy: f32,
    pub name: String,
    pub gear: Vec<GearSlotRecord>,
    pub is_local_player: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderableNpc {
    pub base: RenderableEntity,
    pub attitude: Attitude,
    pub rank: CharacterRank,
    pub name: String,
    pub level: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderableGadget {
    pub base: RenderableEntity,
    pub gadget_type: GadgetType,
    pub resource_node: Option<ResourceNodeType>,
    pub gatherable: bool,
    /// Physics extents (width, depth, height) in metres.
    pub dimensions: Option<Vec3>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderableAttackTarget {
    pub base: RenderableEntity,
    pub combat_state: AttackTargetCombatState,
    pub agent_id: Option<u32>,
}

/// Borrowed view of one pooled entity.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Player(&'a RenderablePlayer),
    Npc(&'a RenderableNpc),
    Gadget(&'a RenderableGadget),
    AttackTarget(&'a RenderableAttackTarget),
}

impl<'a> EntityRef<'a> {
    pub fn base(self) -> &'a RenderableEntity {
        match self {
            EntityRef::Player(player) => &player.base,
            EntityRef::Npc(npc) => &npc.base,
            EntityRef::Gadget(gadget) => &gadget.base,
            EntityRef::AttackTarget(target) => &target.base,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            EntityRef::Player(_) => EntityKind::Player,
            EntityRef::Npc(_) => EntityKind::Npc,
            EntityRef::Gadget(_) => EntityKind::Gadget,
            EntityRef::AttackTarget(_) => EntityKind::AttackTarget,
        }
    }

    pub fn attitude(self) -> Option<Attitude> {
        match self {
            EntityRef::Player(player) => Some(player.attitude),
            EntityRef::Npc(npc) => Some(npc.attitude),
            _ => None,
        }
    }

    pub fn is_hostile_player(self) -> bool {
        matches!(self, EntityRef::Player(player) if player.attitude == Attitude::Hostile)
    }
}

/// Stable-for-one-tick reference to a pooled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub kind: EntityKind,
    pub slot: PoolHandle,
}

/// One pool per entity kind.
#[derive(Debug)]
pub struct EntityPools {
    pub players: ObjectPool<RenderablePlayer>,
    pub npcs: ObjectPool<RenderableNpc>,
    pub gadgets: ObjectPool<RenderableGadget>,
    pub attack_targets: ObjectPool<RenderableAttackTarget>,
}

impl Default for EntityPools {
    fn default() -> Self {
        Self::with_capacities(
            PLAYER_POOL_CAPACITY,
            NPC_POOL_CAPACITY,
            GADGET_POOL_CAPACITY,
            ATTACK_TARGET_POOL_CAPACITY,
        )
    }
}

impl EntityPools {
    pub fn with_capacities(
        players: usize,
        npcs: usize,
        gadgets: usize,
        attack_targets: usize,
    ) -> Self {
        Self {
            players: ObjectPool::with_capacity("player", players),
            npcs: ObjectPool::with_capacity("npc", npcs),
            gadgets: ObjectPool::with_capacity("gadget", gadgets),
            attack_targets: ObjectPool::with_capacity("attack-target", attack_targets),
        }
    }

    pub fn reset(&mut self) {
        self.players.reset();
        self.npcs.reset();
        self.gadgets.reset();
        self.attack_targets.reset();
    }

    pub fn used(&self) -> usize {
        self.players.used() + self.npcs.used() + self.gadgets.used() + self.attack_targets.used()
    }

    pub fn resolve(&self, handle: EntityHandle) -> Option<EntityRef<'_>> {
        match handle.kind {
            EntityKind::Player => self.players.get(handle.slot).map(EntityRef::Player),
            EntityKind::Npc => self.npcs.get(handle.slot).map(EntityRef::Npc),
            EntityKind::Gadget => self.gadgets.get(handle.slot).map(EntityRef::Gadget),
            EntityKind::AttackTarget => self
                .attack_targets
                .get(handle.slot)
                .map(EntityRef::AttackTarget),
        }
    }

    pub fn base_mut(&mut self, handle: EntityHandle) -> Option<&mut RenderableEntity> {
        match handle.kind {
            EntityKind::Player => self.players.get_mut(handle.slot).map(|p| &mut p.base),
            EntityKind::Npc => self.npcs.get_mut(handle.slot).map(|n| &mut n.base),
            EntityKind::Gadget => self.gadgets.get_mut(handle.slot).map(|g| &mut g.base),
            EntityKind::AttackTarget => self
                .attack_targets
                .get_mut(handle.slot)
                .map(|t| &mut t.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_requires_a_health_pool() {
        let mut entity = RenderableEntity {
            max_health: 0.0,
            health: 0.0,
            ..RenderableEntity::default()
        };
        assert!(!entity.is_dead());
        entity.max_health = 100.0;
        assert!(entity.is_dead());
        entity.health = 25.0;
        assert!(!entity.is_dead());
        assert!((entity.health_fraction() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn resolve_follows_the_handle_kind() {
        let mut pools = EntityPools::with_capacities(1, 1, 1, 1);
        let (slot, npc) = pools.npcs.acquire().unwrap();
        npc.name.push_str("Skritt");
        let handle = EntityHandle {
            kind: EntityKind::Npc,
            slot,
        };
        match pools.resolve(handle) {
            Some(EntityRef::Npc(npc)) => assert_eq!(npc.name, "Skritt"),
            other => panic!("unexpected entity {other:?}"),
        }
        assert_eq!(pools.used(), 1);

        pools.reset();
        assert!(pools.resolve(handle).is_none());
        assert_eq!(pools.used(), 0);
    }
}
