//! Detail lines and gear summaries shown under an entity.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use esp_stream::{EquipmentSlot, ItemRarity};

use crate::color::{Color, palette};
use crate::config::Settings;
use crate::entity::{RenderableAttackTarget, RenderableGadget, RenderableNpc, RenderablePlayer};
use crate::styling::rarity_color;
use crate::text::{TextLine, TextSegment};

/// Entries kept by the compact summary and the dominant-stats line.
pub const SUMMARY_ENTRY_LIMIT: usize = 3;
pub const GEAR_DETAILS_HEADER: &str = "--- Gear Stats ---";

const OFFENSIVE_COLOR: Color = Color::rgba(255, 80, 80, 255);
const DEFENSIVE_COLOR: Color = Color::rgba(30, 144, 255, 255);
const SUPPORT_COLOR: Color = Color::rgba(100, 255, 100, 255);

/// Attribute granted by a stat combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Power,
    Precision,
    Toughness,
    Vitality,
    CritDamage,
    Healing,
    ConditionDamage,
    BoonDuration,
    ConditionDuration,
}

impl Attribute {
    /// Parses the attribute names used by the item-stat API.
    pub fn from_api_name(name: &str) -> Option<Self> {
        Some(match name {
            "Power" => Attribute::Power,
            "Precision" => Attribute::Precision,
            "Toughness" => Attribute::Toughness,
            "Vitality" => Attribute::Vitality,
            "CritDamage" | "Ferocity" => Attribute::CritDamage,
            "Healing" | "HealingPower" => Attribute::Healing,
            "ConditionDamage" => Attribute::ConditionDamage,
            "BoonDuration" | "Concentration" => Attribute::BoonDuration,
            "ConditionDuration" | "Expertise" => Attribute::ConditionDuration,
            _ => return None,
        })
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Attribute::Power => "Power",
            Attribute::Precision => "Precision",
            Attribute::Toughness => "Toughness",
            Attribute::Vitality => "Vitality",
            Attribute::CritDamage => "Ferocity",
            Attribute::Healing => "Healing",
            Attribute::ConditionDamage => "Condi Dmg",
            Attribute::BoonDuration => "Boon Dura",
            Attribute::ConditionDuration => "Condi Dura",
        }
    }

    /// Offence reads red, defence blue, support green.
    pub fn tactical_color(self) -> Color {
        match self {
            Attribute::Power
            | Attribute::Precision
            | Attribute::CritDamage
            | Attribute::ConditionDamage => OFFENSIVE_COLOR,
            Attribute::Toughness | Attribute::Vitality => DEFENSIVE_COLOR,
            Attribute::Healing | Attribute::BoonDuration | Attribute::ConditionDuration => {
                SUPPORT_COLOR
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatDefinition {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
struct RawAttribute {
    attribute: String,
}

#[derive(Deserialize)]
struct RawStat {
    id: u32,
    name: String,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
}

/// Stat-combination names keyed by id, as cached from the item-stat API.
#[derive(Debug, Clone, Default)]
pub struct StatCatalog {
    stats: HashMap<u32, StatDefinition>,
}

impl StatCatalog {
    /// Parses an array of `{ "id", "name", "attributes": [{ "attribute" }] }`
    /// records. Unnamed entries and unknown attribute names are skipped.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Vec<RawStat> = serde_json::from_str(text).context("parsing stat catalog")?;
        let stats = raw
            .into_iter()
            .filter(|stat| !stat.name.is_empty())
            .map(|stat| {
                let attributes = stat
                    .attributes
                    .iter()
                    .filter_map(|entry| Attribute::from_api_name(&entry.attribute))
                    .collect();
                (
                    stat.id,
                    StatDefinition {
                        name: stat.name,
                        attributes,
                    },
                )
            })
            .collect();
        Ok(Self { stats })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading stat catalog {}", path.display()))?;
        let catalog = Self::from_json(&text)
            .with_context(|| format!("loading stat catalog {}", path.display()))?;
        log::info!("loaded {} stat combinations from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn insert(&mut self, id: u32, definition: StatDefinition) {
        self.stats.insert(id, definition);
    }

    pub fn get(&self, id: u32) -> Option<&StatDefinition> {
        self.stats.get(&id)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

fn line(text: String) -> TextLine {
    vec![TextSegment::plain(text)]
}

fn position_line(position: glam::Vec3) -> TextLine {
    line(format!("Pos: ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z))
}

fn address_line(address: u64) -> TextLine {
    line(format!("Addr: {address:#x}"))
}

fn hp_line(health: f32, max_health: f32) -> TextLine {
    line(format!("HP: {health:.0}/{max_health:.0}"))
}

pub fn player_details(player: &RenderablePlayer, settings: &Settings) -> Vec<TextLine> {
    let esp = &settings.player_esp;
    let mut lines = Vec::new();
    if esp.show_detail_level && player.level > 0 {
        if player.scaled_level > 0 && player.scaled_level != player.level {
            lines.push(line(format!("Level: {} ({})", player.level, player.scaled_level)));
        } else {
            lines.push(line(format!("Level: {}", player.level)));
        }
    }
    if esp.show_detail_profession {
        if let Some(profession) = player.profession.label() {
            lines.push(line(format!("Prof: {profession}")));
        }
    }
    if esp.show_detail_attitude {
        lines.push(line(format!("Attitude: {}", player.attitude.label())));
    }
    if esp.show_detail_race {
        if let Some(race) = player.race.label() {
            lines.push(line(format!("Race: {race}")));
        }
    }
    if esp.show_detail_hp && player.base.has_health() {
        lines.push(hp_line(player.base.health, player.base.max_health));
    }
    if esp.show_detail_energy && player.max_endurance > 0.0 {
        let percent = (player.endurance / player.max_endurance * 100.0) as i32;
        lines.push(line(format!(
            "Energy: {:.0}/{:.0} ({percent}%)",
            player.endurance, player.max_endurance
        )));
    }
    if esp.show_detail_position {
        lines.push(position_line(player.base.position));
    }
    if settings.show_debug_addresses {
        lines.push(address_line(player.base.address));
    }
    lines
}

pub fn npc_details(npc: &RenderableNpc, settings: &Settings) -> Vec<TextLine> {
    let esp = &settings.npc_esp;
    let mut lines = Vec::new();
    if !npc.name.is_empty() {
        lines.push(line(format!("NPC: {}", npc.name)));
    }
    if esp.show_detail_level && npc.level > 0 {
        lines.push(line(format!("Level: {}", npc.level)));
    }
    if esp.show_detail_hp && npc.base.has_health() {
        lines.push(hp_line(npc.base.health, npc.base.max_health));
    }
    if esp.show_detail_attitude {
        lines.push(line(format!("Attitude: {}", npc.attitude.label())));
    }
    if esp.show_detail_rank {
        lines.push(line(format!("Rank: {}", npc.rank.label())));
    }
    if esp.show_detail_position {
        lines.push(position_line(npc.base.position));
    }
    if settings.show_debug_addresses {
        lines.push(address_line(npc.base.address));
    }
    lines
}

pub fn gadget_details(gadget: &RenderableGadget, settings: &Settings) -> Vec<TextLine> {
    let esp = &settings.object_esp;
    let mut lines = Vec::new();
    if esp.show_detail_gadget_type {
        lines.push(line(format!("Type: {}", gadget.gadget_type.label())));
    }
    if esp.show_detail_health && gadget.base.has_health() {
        lines.push(hp_line(gadget.base.health, gadget.base.max_health));
    }
    if esp.show_detail_resource_info {
        if let Some(node) = gadget.resource_node {
            lines.push(line(format!("Node: {}", node.label())));
        }
    }
    if esp.show_detail_gather_status && gadget.gatherable {
        lines.push(line("Status: Gatherable".to_owned()));
    }
    if esp.show_detail_position {
        lines.push(position_line(gadget.base.position));
    }
    if settings.show_debug_addresses {
        lines.push(address_line(gadget.base.address));
    }
    lines
}

pub fn attack_target_details(target: &RenderableAttackTarget, settings: &Settings) -> Vec<TextLine> {
    let esp = &settings.object_esp;
    let mut lines = vec![line("Type: Attack Target".to_owned())];
    lines.push(line(format!("State: {}", target.combat_state.label())));
    if esp.show_detail_health && target.base.has_health() {
        lines.push(hp_line(target.base.health, target.base.max_health));
    }
    if esp.show_detail_position {
        lines.push(position_line(target.base.position));
    }
    if let Some(agent_id) = target.agent_id {
        lines.push(line(format!("AgentID: {agent_id}")));
    }
    if settings.show_debug_addresses {
        lines.push(address_line(target.base.address));
    }
    lines
}

/// One line per equipped slot in display order, coloured by rarity.
pub fn gear_detail_lines(player: &RenderablePlayer, catalog: &StatCatalog) -> Vec<TextLine> {
    EquipmentSlot::DISPLAY_ORDER
        .iter()
        .filter_map(|slot| player.gear.iter().find(|gear| gear.slot == *slot))
        .map(|gear| {
            let slot = gear.slot.label();
            let text = match (gear.stat_id, catalog.get(gear.stat_id)) {
                (0, _) => format!("{slot}: No Stats"),
                (_, Some(stat)) => format!("{slot}: {}", stat.name),
                (id, None) => format!("{slot}: stat({id})"),
            };
            vec![TextSegment::new(text, rarity_color(gear.rarity))]
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompactStatInfo {
    pub name: String,
    pub count: u32,
    pub percentage: f32,
    pub highest_rarity: ItemRarity,
}

/// Top stat combinations by share of items that carry any stat. Items whose
/// stat id is missing from the catalog count toward the total but are not
/// listed.
pub fn compact_gear_summary(player: &RenderablePlayer, catalog: &StatCatalog) -> Vec<CompactStatInfo> {
    let mut total_items = 0u32;
    let mut stats: Vec<CompactStatInfo> = Vec::new();
    for gear in player.gear.iter().filter(|gear| gear.stat_id > 0) {
        total_items += 1;
        let Some(definition) = catalog.get(gear.stat_id) else {
            continue;
        };
        match stats.iter_mut().find(|entry| entry.name == definition.name) {
            Some(entry) => {
                entry.count += 1;
                entry.highest_rarity = entry.highest_rarity.max(gear.rarity);
            }
            None => stats.push(CompactStatInfo {
                name: definition.name.clone(),
                count: 1,
                percentage: 0.0,
                highest_rarity: gear.rarity,
            }),
        }
    }
    if total_items == 0 {
        return Vec::new();
    }
    for entry in &mut stats {
        entry.percentage = entry.count as f32 / total_items as f32 * 100.0;
    }
    stats.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    stats.truncate(SUMMARY_ENTRY_LIMIT);
    stats
}

/// `Stats: 67% Berserker's, 33% Viper's` with each entry in its rarity colour.
pub fn compact_summary_segments(summary: &[CompactStatInfo]) -> TextLine {
    if summary.is_empty() {
        return Vec::new();
    }
    let mut segments = vec![TextSegment::new("Stats: ", palette::SUMMARY_TEXT)];
    for (index, entry) in summary.iter().enumerate() {
        if index > 0 {
            segments.push(TextSegment::new(", ", palette::SUMMARY_TEXT));
        }
        segments.push(TextSegment::new(
            format!("{:.0}% {}", entry.percentage, entry.name),
            rarity_color(entry.highest_rarity),
        ));
    }
    segments
}

#[derive(Debug, Clone, PartialEq)]
pub struct DominantStat {
    pub attribute: Attribute,
    pub percentage: f32,
}

/// Top attributes by how often they appear across the equipped stat
/// combinations.
pub fn dominant_stats(player: &RenderablePlayer, catalog: &StatCatalog) -> Vec<DominantStat> {
    let mut counts: BTreeMap<Attribute, u32> = BTreeMap::new();
    for gear in player.gear.iter().filter(|gear| gear.stat_id > 0) {
        if let Some(definition) = catalog.get(gear.stat_id) {
            for attribute in &definition.attributes {
                *counts.entry(*attribute).or_default() += 1;
            }
        }
    }
    let total: u32 = counts.values().sum();
    if total == 0 {
        return Vec::new();
    }
    let mut stats: Vec<DominantStat> = counts
        .into_iter()
        .map(|(attribute, count)| DominantStat {
            attribute,
            percentage: count as f32 / total as f32 * 100.0,
        })
        .collect();
    stats.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    stats.truncate(SUMMARY_ENTRY_LIMIT);
    stats
}

/// `[Power 33% | Precision 33% | Ferocity 33%]` in tactical colours.
pub fn dominant_stats_segments(stats: &[DominantStat]) -> TextLine {
    if stats.is_empty() {
        return Vec::new();
    }
    let mut segments = vec![TextSegment::new("[", palette::SUMMARY_TEXT)];
    for (index, stat) in stats.iter().enumerate() {
        if index > 0 {
            segments.push(TextSegment::new(" | ", palette::SUMMARY_TEXT));
        }
        segments.push(TextSegment::new(
            format!("{} {:.0}%", stat.attribute.short_name(), stat.percentage),
            stat.attribute.tactical_color(),
        ));
    }
    segments.push(TextSegment::new("]", palette::SUMMARY_TEXT));
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use esp_stream::{AttackTargetCombatState, GadgetType, GearSlotRecord, Profession, ResourceNodeType};
    use glam::Vec3;

    use crate::entity::RenderableEntity;

    const CATALOG: &str = r#"[
        {"id": 161, "name": "Berserker's", "attributes": [
            {"attribute": "Power"}, {"attribute": "Precision"}, {"attribute": "CritDamage"}]},
        {"id": 1130, "name": "Viper's", "attributes": [
            {"attribute": "Power"}, {"attribute": "ConditionDamage"},
            {"attribute": "Precision"}, {"attribute": "ConditionDuration"}]},
        {"id": 7, "name": "", "attributes": []}
    ]"#;

    fn texts(lines: &[TextLine]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.iter().map(|segment| segment.text.as_str()).collect())
            .collect()
    }

    fn geared_player() -> RenderablePlayer {
        let gear = |slot, stat_id, rarity| GearSlotRecord {
            slot,
            stat_id,
            rarity,
        };
        RenderablePlayer {
            gear: vec![
                gear(EquipmentSlot::Chest, 161, ItemRarity::Exotic),
                gear(EquipmentSlot::Helm, 161, ItemRarity::Ascended),
                gear(EquipmentSlot::Boots, 1130, ItemRarity::Exotic),
                gear(EquipmentSlot::Back, 0, ItemRarity::Fine),
                gear(EquipmentSlot::Amulet, 999, ItemRarity::Legendary),
            ],
            ..RenderablePlayer::default()
        }
    }

    #[test]
    fn catalog_skips_unnamed_stats_and_unknown_attributes() {
        let catalog = StatCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        let berserker = catalog.get(161).unwrap();
        assert_eq!(
            berserker.attributes,
            vec![Attribute::Power, Attribute::Precision, Attribute::CritDamage]
        );
        assert!(catalog.get(7).is_none());
        assert!(StatCatalog::from_json("{").is_err());
    }

    #[test]
    fn player_details_follow_toggles() {
        let mut settings = Settings::default();
        settings.player_esp.show_detail_level = true;
        settings.player_esp.show_detail_profession = true;
        settings.player_esp.show_detail_hp = true;
        settings.player_esp.show_detail_energy = true;
        settings.player_esp.show_detail_attitude = false;
        settings.player_esp.show_detail_race = false;
        settings.player_esp.show_detail_position = false;
        settings.show_debug_addresses = true;
        let player = RenderablePlayer {
            base: RenderableEntity {
                address: 0xbeef,
                health: 1234.4,
                max_health: 20000.0,
                ..RenderableEntity::default()
            },
            level: 80,
            scaled_level: 20,
            profession: Profession::Necromancer,
            endurance: 50.0,
            max_endurance: 100.0,
            ..RenderablePlayer::default()
        };
        assert_eq!(
            texts(&player_details(&player, &settings)),
            vec![
                "Level: 80 (20)",
                "Prof: Necromancer",
                "HP: 1234/20000",
                "Energy: 50/100 (50%)",
                "Addr: 0xbeef",
            ]
        );
    }

    #[test]
    fn gadget_and_attack_target_details() {
        let mut settings = Settings::default();
        settings.object_esp.show_detail_gadget_type = true;
        settings.object_esp.show_detail_resource_info = true;
        settings.object_esp.show_detail_gather_status = true;
        settings.object_esp.show_detail_health = true;
        settings.object_esp.show_detail_position = true;
        settings.show_debug_addresses = false;
        let node = RenderableGadget {
            base: RenderableEntity {
                position: Vec3::new(1.0, 2.3, -3.0),
                ..RenderableEntity::default()
            },
            gadget_type: GadgetType::ResourceNode,
            resource_node: Some(ResourceNodeType::Tree),
            gatherable: true,
            dimensions: None,
        };
        assert_eq!(
            texts(&gadget_details(&node, &settings)),
            vec![
                "Type: Resource Node",
                "Node: Tree",
                "Status: Gatherable",
                "Pos: (1.0, 2.3, -3.0)",
            ]
        );

        settings.object_esp.show_detail_position = false;
        let target = RenderableAttackTarget {
            base: RenderableEntity {
                health: 500.0,
                max_health: 1000.0,
                ..RenderableEntity::default()
            },
            combat_state: AttackTargetCombatState::InCombat,
            agent_id: Some(42),
        };
        assert_eq!(
            texts(&attack_target_details(&target, &settings)),
            vec!["Type: Attack Target", "State: In Combat", "HP: 500/1000", "AgentID: 42"]
        );
    }

    #[test]
    fn gear_lines_use_display_order_and_rarity() {
        let catalog = StatCatalog::from_json(CATALOG).unwrap();
        let lines = gear_detail_lines(&geared_player(), &catalog);
        assert_eq!(
            texts(&lines),
            vec![
                "Helm: Berserker's",
                "Chest: Berserker's",
                "Boots: Viper's",
                "Back: No Stats",
                "Amulet: stat(999)",
            ]
        );
        assert_eq!(lines[0][0].color, palette::RARITY_ASCENDED);
        assert_eq!(lines[4][0].color, palette::RARITY_LEGENDARY);
    }

    #[test]
    fn compact_summary_counts_shares_of_statted_items() {
        let catalog = StatCatalog::from_json(CATALOG).unwrap();
        let summary = compact_gear_summary(&geared_player(), &catalog);
        // Four statted items; the unknown amulet counts toward the total.
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "Berserker's");
        assert_eq!(summary[0].count, 2);
        assert!((summary[0].percentage - 50.0).abs() < 1e-4);
        assert_eq!(summary[0].highest_rarity, ItemRarity::Ascended);

        let segments = compact_summary_segments(&summary);
        let text: String = segments.iter().map(|segment| segment.text.as_str()).collect();
        assert_eq!(text, "Stats: 50% Berserker's, 25% Viper's");
        assert_eq!(segments[1].color, palette::RARITY_ASCENDED);
    }

    #[test]
    fn dominant_stats_keep_the_top_three() {
        let catalog = StatCatalog::from_json(CATALOG).unwrap();
        let stats = dominant_stats(&geared_player(), &catalog);
        // Power 3, Precision 3, CritDamage 2, ConditionDamage 1, ConditionDuration 1.
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].attribute, Attribute::Power);
        assert_eq!(stats[1].attribute, Attribute::Precision);
        assert_eq!(stats[2].attribute, Attribute::CritDamage);
        assert!((stats[0].percentage - 30.0).abs() < 1e-4);

        let segments = dominant_stats_segments(&stats);
        let text: String = segments.iter().map(|segment| segment.text.as_str()).collect();
        assert_eq!(text, "[Power 30% | Precision 30% | Ferocity 20%]");
        assert_eq!(segments[1].color, Attribute::Power.tactical_color());
    }

    #[test]
    fn empty_gear_produces_no_summary() {
        let catalog = StatCatalog::default();
        let player = RenderablePlayer::default();
        assert!(compact_summary_segments(&compact_gear_summary(&player, &catalog)).is_empty());
        assert!(dominant_stats_segments(&dominant_stats(&player, &catalog)).is_empty());
    }
}
