//! Game-side vocabulary shared by snapshot records and the overlay.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Attitude {
    Friendly,
    Hostile,
    #[default]
    Neutral,
    Indifferent,
}

impl Attitude {
    pub fn label(self) -> &'static str {
        match self {
            Attitude::Friendly => "Friendly",
            Attitude::Hostile => "Hostile",
            Attitude::Neutral => "Neutral",
            Attitude::Indifferent => "Indifferent",
        }
    }
}

/// NPC significance tier, ordered from least to most significant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CharacterRank {
    Ambient,
    #[default]
    Normal,
    Veteran,
    Elite,
    Champion,
    Legendary,
}

impl CharacterRank {
    pub fn label(self) -> &'static str {
        match self {
            CharacterRank::Ambient => "Ambient",
            CharacterRank::Normal => "Normal",
            CharacterRank::Veteran => "Veteran",
            CharacterRank::Elite => "Elite",
            CharacterRank::Champion => "Champion",
            CharacterRank::Legendary => "Legendary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Profession {
    #[default]
    None,
    Guardian,
    Warrior,
    Engineer,
    Ranger,
    Thief,
    Elementalist,
    Mesmer,
    Necromancer,
    Revenant,
}

impl Profession {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Profession::None => None,
            Profession::Guardian => Some("Guardian"),
            Profession::Warrior => Some("Warrior"),
            Profession::Engineer => Some("Engineer"),
            Profession::Ranger => Some("Ranger"),
            Profession::Thief => Some("Thief"),
            Profession::Elementalist => Some("Elementalist"),
            Profession::Mesmer => Some("Mesmer"),
            Profession::Necromancer => Some("Necromancer"),
            Profession::Revenant => Some("Revenant"),
        }
    }

    /// Maps the numeric profession id carried by MumbleLink identity data.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Profession::Guardian,
            2 => Profession::Warrior,
            3 => Profession::Engineer,
            4 => Profession::Ranger,
            5 => Profession::Thief,
            6 => Profession::Elementalist,
            7 => Profession::Mesmer,
            8 => Profession::Necromancer,
            9 => Profession::Revenant,
            _ => Profession::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Race {
    Asura,
    Charr,
    Human,
    Norn,
    Sylvari,
    #[default]
    None,
}

impl Race {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Race::Asura => Some("Asura"),
            Race::Charr => Some("Charr"),
            Race::Human => Some("Human"),
            Race::Norn => Some("Norn"),
            Race::Sylvari => Some("Sylvari"),
            Race::None => None,
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => Race::Asura,
            1 => Race::Charr,
            2 => Race::Human,
            3 => Race::Norn,
            4 => Race::Sylvari,
            _ => Race::None,
        }
    }
}

/// Gadget classification used by the per-type visibility toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GadgetType {
    ResourceNode,
    Waypoint,
    Vista,
    Crafting,
    AttackTarget,
    PlayerCreated,
    Interact,
    Door,
    MapPortal,
    Destructible,
    Point,
    PlayerSpecific,
    Prop,
    BuildSite,
    BountyBoard,
    Rift,
    Generic,
    Generic2,
    #[default]
    Unknown,
}

impl GadgetType {
    pub const ALL: [GadgetType; 19] = [
        GadgetType::ResourceNode,
        GadgetType::Waypoint,
        GadgetType::Vista,
        GadgetType::Crafting,
        GadgetType::AttackTarget,
        GadgetType::PlayerCreated,
        GadgetType::Interact,
        GadgetType::Door,
        GadgetType::MapPortal,
        GadgetType::Destructible,
        GadgetType::Point,
        GadgetType::PlayerSpecific,
        GadgetType::Prop,
        GadgetType::BuildSite,
        GadgetType::BountyBoard,
        GadgetType::Rift,
        GadgetType::Generic,
        GadgetType::Generic2,
        GadgetType::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GadgetType::ResourceNode => "Resource Node",
            GadgetType::Waypoint => "Waypoint",
            GadgetType::Vista => "Vista",
            GadgetType::Crafting => "Crafting Station",
            GadgetType::AttackTarget => "Attack Target",
            GadgetType::PlayerCreated => "Player Created",
            GadgetType::Interact => "Interactable",
            GadgetType::Door => "Door",
            GadgetType::MapPortal => "Map Portal",
            GadgetType::Destructible => "Destructible",
            GadgetType::Point => "Point",
            GadgetType::PlayerSpecific => "Player Specific",
            GadgetType::Prop => "Prop",
            GadgetType::BuildSite => "Build Site",
            GadgetType::BountyBoard => "Bounty Board",
            GadgetType::Rift => "Rift",
            GadgetType::Generic => "Generic",
            GadgetType::Generic2 => "Generic 2",
            GadgetType::Unknown => "Unknown",
        }
    }

    /// Utility gadgets whose health never matters to the player.
    pub fn hides_combat_ui(self) -> bool {
        matches!(
            self,
            GadgetType::Prop
                | GadgetType::Interact
                | GadgetType::ResourceNode
                | GadgetType::Waypoint
                | GadgetType::MapPortal
                | GadgetType::Generic
                | GadgetType::Generic2
                | GadgetType::Crafting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceNodeType {
    Plant,
    Tree,
    Rock,
    Quest,
}

impl ResourceNodeType {
    pub fn label(self) -> &'static str {
        match self {
            ResourceNodeType::Plant => "Plant",
            ResourceNodeType::Tree => "Tree",
            ResourceNodeType::Rock => "Rock",
            ResourceNodeType::Quest => "Quest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackTargetCombatState {
    #[default]
    Idle,
    InCombat,
}

impl AttackTargetCombatState {
    pub fn label(self) -> &'static str {
        match self {
            AttackTargetCombatState::Idle => "Idle",
            AttackTargetCombatState::InCombat => "In Combat",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ItemRarity {
    #[default]
    None,
    Junk,
    Common,
    Fine,
    Masterwork,
    Rare,
    Exotic,
    Ascended,
    Legendary,
}

impl ItemRarity {
    pub fn label(self) -> &'static str {
        match self {
            ItemRarity::None => "None",
            ItemRarity::Junk => "Junk",
            ItemRarity::Common => "Common",
            ItemRarity::Fine => "Fine",
            ItemRarity::Masterwork => "Masterwork",
            ItemRarity::Rare => "Rare",
            ItemRarity::Exotic => "Exotic",
            ItemRarity::Ascended => "Ascended",
            ItemRarity::Legendary => "Legendary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Helm,
    Shoulders,
    Chest,
    Gloves,
    Pants,
    Boots,
    Back,
    Amulet,
    Ring1,
    Ring2,
    Accessory1,
    Accessory2,
    MainhandWeapon1,
    OffhandWeapon1,
    MainhandWeapon2,
    OffhandWeapon2,
}

impl EquipmentSlot {
    /// Order in which detailed gear lines are listed.
    pub const DISPLAY_ORDER: [EquipmentSlot; 16] = [
        EquipmentSlot::Helm,
        EquipmentSlot::Shoulders,
        EquipmentSlot::Chest,
        EquipmentSlot::Gloves,
        EquipmentSlot::Pants,
        EquipmentSlot::Boots,
        EquipmentSlot::Back,
        EquipmentSlot::Amulet,
        EquipmentSlot::Ring1,
        EquipmentSlot::Ring2,
        EquipmentSlot::Accessory1,
        EquipmentSlot::Accessory2,
        EquipmentSlot::MainhandWeapon1,
        EquipmentSlot::OffhandWeapon1,
        EquipmentSlot::MainhandWeapon2,
        EquipmentSlot::OffhandWeapon2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EquipmentSlot::Helm => "Helm",
            EquipmentSlot::Shoulders => "Shoulders",
            EquipmentSlot::Chest => "Chest",
            EquipmentSlot::Gloves => "Gloves",
            EquipmentSlot::Pants => "Pants",
            EquipmentSlot::Boots => "Boots",
            EquipmentSlot::Back => "Back",
            EquipmentSlot::Amulet => "Amulet",
            EquipmentSlot::Ring1 => "Ring 1",
            EquipmentSlot::Ring2 => "Ring 2",
            EquipmentSlot::Accessory1 => "Accessory 1",
            EquipmentSlot::Accessory2 => "Accessory 2",
            EquipmentSlot::MainhandWeapon1 => "Main Hand 1",
            EquipmentSlot::OffhandWeapon1 => "Off Hand 1",
            EquipmentSlot::MainhandWeapon2 => "Main Hand 2",
            EquipmentSlot::OffhandWeapon2 => "Off Hand 2",
        }
    }
}
