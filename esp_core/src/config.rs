//! Settings record and the process-wide config store.
//!
//! Settings are stored as pretty JSON with camelCase keys. Unknown keys are
//! ignored and missing keys fall back to their defaults, so files written by
//! older builds keep loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use esp_stream::{Attitude, CharacterRank, GadgetType};

use crate::entity::EntityKind;
use crate::far_plane::FAR_PLANE_INITIAL;

pub const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GearDisplayMode {
    Off,
    #[default]
    Compact,
    Attributes,
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EnergyDisplayType {
    #[default]
    Dodge,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrailDisplayMode {
    #[default]
    Hostile,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrailTeleportMode {
    /// Break the trail at teleports.
    #[default]
    Tactical,
    /// Bridge teleports with a dashed segment.
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailSettings {
    pub max_points: usize,
    /// Seconds a trail point stays visible.
    pub max_duration: f32,
    pub display_mode: TrailDisplayMode,
    pub teleport_mode: TrailTeleportMode,
    pub teleport_threshold: f32,
    pub thickness: f32,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            max_points: 30,
            max_duration: 1.0,
            display_mode: TrailDisplayMode::Hostile,
            teleport_mode: TrailTeleportMode::Tactical,
            teleport_threshold: 10.0,
            thickness: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerEspSettings {
    pub enabled: bool,
    pub render_box: bool,
    pub render_distance: bool,
    pub render_dot: bool,
    pub render_details: bool,
    pub render_health_bar: bool,
    pub render_energy_bar: bool,
    pub render_player_name: bool,
    pub show_burst_dps: bool,
    pub show_damage_numbers: bool,
    pub show_only_damaged: bool,
    pub show_health_percentage: bool,
    pub show_local_player: bool,
    pub gear_display_mode: GearDisplayMode,
    pub energy_display_type: EnergyDisplayType,
    pub show_friendly: bool,
    pub show_hostile: bool,
    pub show_neutral: bool,
    pub show_indifferent: bool,
    pub show_detail_level: bool,
    pub show_detail_profession: bool,
    pub show_detail_attitude: bool,
    pub show_detail_race: bool,
    pub show_detail_hp: bool,
    pub show_detail_energy: bool,
    pub show_detail_position: bool,
    pub enable_trails: bool,
    pub trails: TrailSettings,
    pub hostile_boost_multiplier: f32,
}

impl Default for PlayerEspSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            render_box: false,
            render_distance: false,
            render_dot: false,
            render_details: false,
            render_health_bar: true,
            render_energy_bar: false,
            render_player_name: true,
            show_burst_dps: false,
            show_damage_numbers: true,
            show_only_damaged: false,
            show_health_percentage: false,
            show_local_player: false,
            gear_display_mode: GearDisplayMode::Compact,
            energy_display_type: EnergyDisplayType::Dodge,
            show_friendly: true,
            show_hostile: true,
            show_neutral: true,
            show_indifferent: true,
            show_detail_level: true,
            show_detail_profession: true,
            show_detail_attitude: true,
            show_detail_race: true,
            show_detail_hp: true,
            show_detail_energy: true,
            show_detail_position: false,
            enable_trails: false,
            trails: TrailSettings::default(),
            hostile_boost_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NpcEspSettings {
    pub enabled: bool,
    pub render_box: bool,
    pub render_distance: bool,
    pub render_dot: bool,
    pub render_details: bool,
    pub render_health_bar: bool,
    pub show_burst_dps: bool,
    pub show_damage_numbers: bool,
    pub show_health_percentage: bool,
    pub show_only_damaged: bool,
    pub show_dead_npcs: bool,
    pub show_friendly: bool,
    pub show_hostile: bool,
    pub show_neutral: bool,
    pub show_indifferent: bool,
    pub show_ambient: bool,
    pub show_normal: bool,
    pub show_veteran: bool,
    pub show_elite: bool,
    pub show_champion: bool,
    pub show_legendary: bool,
    pub show_detail_level: bool,
    pub show_detail_hp: bool,
    pub show_detail_attitude: bool,
    pub show_detail_rank: bool,
    pub show_detail_position: bool,
}

impl Default for NpcEspSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            render_box: false,
            render_distance: false,
            render_dot: false,
            render_details: false,
            render_health_bar: true,
            show_burst_dps: false,
            show_damage_numbers: true,
            show_health_percentage: false,
            show_only_damaged: false,
            show_dead_npcs: false,
            show_friendly: true,
            show_hostile: true,
            show_neutral: true,
            show_indifferent: true,
            show_ambient: true,
            show_normal: true,
            show_veteran: true,
            show_elite: true,
            show_champion: true,
            show_legendary: true,
            show_detail_level: true,
            show_detail_hp: true,
            show_detail_attitude: true,
            show_detail_rank: true,
            show_detail_position: false,
        }
    }
}

impl NpcEspSettings {
    pub fn shows_rank(&self, rank: CharacterRank) -> bool {
        match rank {
            CharacterRank::Ambient => self.show_ambient,
            CharacterRank::Normal => self.show_normal,
            CharacterRank::Veteran => self.show_veteran,
            CharacterRank::Elite => self.show_elite,
            CharacterRank::Champion => self.show_champion,
            CharacterRank::Legendary => self.show_legendary,
        }
    }

    pub fn shows_attitude(&self, attitude: Attitude) -> bool {
        match attitude {
            Attitude::Friendly => self.show_friendly,
            Attitude::Hostile => self.show_hostile,
            Attitude::Neutral => self.show_neutral,
            Attitude::Indifferent => self.show_indifferent,
        }
    }
}

impl PlayerEspSettings {
    pub fn shows_attitude(&self, attitude: Attitude) -> bool {
        match attitude {
            Attitude::Friendly => self.show_friendly,
            Attitude::Hostile => self.show_hostile,
            Attitude::Neutral => self.show_neutral,
            Attitude::Indifferent => self.show_indifferent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectEspSettings {
    pub enabled: bool,
    pub render_circle: bool,
    /// Physics bounding box, drawn only for gadgets with known dimensions.
    pub render_box: bool,
    pub render_dot: bool,
    pub render_distance: bool,
    pub render_details: bool,
    pub render_health_bar: bool,
    pub show_only_damaged: bool,
    pub show_burst_dps: bool,
    pub show_damage_numbers: bool,
    pub show_health_percentage: bool,
    pub show_dead_gadgets: bool,
    pub show_attack_target_list: bool,
    pub show_attack_target_list_only_in_combat: bool,
    pub show_resource_nodes: bool,
    pub show_waypoints: bool,
    pub show_vistas: bool,
    pub show_crafting_stations: bool,
    pub show_attack_targets: bool,
    pub show_player_created: bool,
    pub show_interactables: bool,
    pub show_doors: bool,
    pub show_portals: bool,
    pub show_destructible: bool,
    pub show_points: bool,
    pub show_player_specific: bool,
    pub show_props: bool,
    pub show_build_sites: bool,
    pub show_bounty_boards: bool,
    pub show_rifts: bool,
    pub show_generic: bool,
    pub show_generic2: bool,
    pub show_unknown: bool,
    pub show_detail_gadget_type: bool,
    pub show_detail_health: bool,
    pub show_detail_resource_info: bool,
    pub show_detail_gather_status: bool,
    pub show_detail_position: bool,
    /// A gadget dropping from full health to zero in one tick restarts its
    /// combat state instead of playing the death animation.
    pub instant_destruction_resets_gadget: bool,
}

impl Default for ObjectEspSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            render_circle: true,
            render_box: false,
            render_dot: true,
            render_distance: false,
            render_details: false,
            render_health_bar: true,
            show_only_damaged: true,
            show_burst_dps: false,
            show_damage_numbers: true,
            show_health_percentage: false,
            show_dead_gadgets: true,
            show_attack_target_list: true,
            show_attack_target_list_only_in_combat: false,
            show_resource_nodes: true,
            show_waypoints: true,
            show_vistas: true,
            show_crafting_stations: true,
            show_attack_targets: true,
            show_player_created: true,
            show_interactables: true,
            show_doors: true,
            show_portals: true,
            show_destructible: true,
            show_points: true,
            show_player_specific: true,
            show_props: false,
            show_build_sites: true,
            show_bounty_boards: true,
            show_rifts: true,
            show_generic: false,
            show_generic2: false,
            show_unknown: true,
            show_detail_gadget_type: true,
            show_detail_health: true,
            show_detail_resource_info: true,
            show_detail_gather_status: true,
            show_detail_position: false,
            instant_destruction_resets_gadget: true,
        }
    }
}

impl ObjectEspSettings {
    pub fn shows_gadget_type(&self, gadget_type: GadgetType) -> bool {
        match gadget_type {
            GadgetType::ResourceNode => self.show_resource_nodes,
            GadgetType::Waypoint => self.show_waypoints,
            GadgetType::Vista => self.show_vistas,
            GadgetType::Crafting => self.show_crafting_stations,
            GadgetType::AttackTarget => self.show_attack_targets,
            GadgetType::PlayerCreated => self.show_player_created,
            GadgetType::Interact => self.show_interactables,
            GadgetType::Door => self.show_doors,
            GadgetType::MapPortal => self.show_portals,
            GadgetType::Destructible => self.show_destructible,
            GadgetType::Point => self.show_points,
            GadgetType::PlayerSpecific => self.show_player_specific,
            GadgetType::Prop => self.show_props,
            GadgetType::BuildSite => self.show_build_sites,
            GadgetType::BountyBoard => self.show_bounty_boards,
            GadgetType::Rift => self.show_rifts,
            GadgetType::Generic => self.show_generic,
            GadgetType::Generic2 => self.show_generic2,
            GadgetType::Unknown => self.show_unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistanceSettings {
    pub use_distance_limit: bool,
    pub render_distance_limit: f32,
    /// Overrides the player/NPC limit on WvW maps when positive.
    pub wvw_distance_limit: f32,
    pub enable_player_npc_fade: bool,
    pub player_npc_min_alpha: f32,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            use_distance_limit: true,
            render_distance_limit: 90.0,
            wvw_distance_limit: 0.0,
            enable_player_npc_fade: true,
            player_npc_min_alpha: 0.5,
        }
    }
}

impl DistanceSettings {
    /// Culling distance for `kind`, or 0 when unbounded.
    pub fn active_limit(&self, kind: EntityKind, in_wvw: bool) -> f32 {
        if !self.use_distance_limit {
            return 0.0;
        }
        if in_wvw && kind.is_character() && self.wvw_distance_limit > 0.0 {
            return self.wvw_distance_limit;
        }
        self.render_distance_limit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalingSettings {
    pub scaling_start_distance: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub limit_distance_factor: f32,
    pub limit_scaling_exponent: f32,
    pub no_limit_scaling_exponent: f32,
}

impl Default for ScalingSettings {
    fn default() -> Self {
        Self {
            scaling_start_distance: 20.0,
            min_scale: 0.1,
            max_scale: 1.0,
            limit_distance_factor: 110.0,
            limit_scaling_exponent: 1.2,
            no_limit_scaling_exponent: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeSettings {
    pub base_font_size: f32,
    pub min_font_size: f32,
    pub base_dot_radius: f32,
    pub base_box_thickness: f32,
    pub base_box_height: f32,
    pub base_box_width: f32,
    pub base_health_bar_width: f32,
    pub base_health_bar_height: f32,
}

impl Default for SizeSettings {
    fn default() -> Self {
        Self {
            base_font_size: 16.0,
            min_font_size: 9.0,
            base_dot_radius: 3.0,
            base_box_thickness: 2.0,
            base_box_height: 90.0,
            base_box_width: 45.0,
            base_health_bar_width: 60.0,
            base_health_bar_height: 7.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearanceSettings {
    pub enable_text_backgrounds: bool,
    pub enable_text_shadows: bool,
    pub global_opacity: f32,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            enable_text_backgrounds: true,
            enable_text_shadows: true,
            global_opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub settings_version: u32,
    #[serde(rename = "playerESP")]
    pub player_esp: PlayerEspSettings,
    #[serde(rename = "npcESP")]
    pub npc_esp: NpcEspSettings,
    #[serde(rename = "objectESP")]
    pub object_esp: ObjectEspSettings,
    pub distance: DistanceSettings,
    pub scaling: ScalingSettings,
    pub sizes: SizeSettings,
    pub appearance: AppearanceSettings,
    pub esp_update_rate: f32,
    pub hide_depleted_nodes: bool,
    pub auto_save_on_exit: bool,
    pub enable_debug_logging: bool,
    pub show_debug_addresses: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat_catalog_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            player_esp: PlayerEspSettings::default(),
            npc_esp: NpcEspSettings::default(),
            object_esp: ObjectEspSettings::default(),
            distance: DistanceSettings::default(),
            scaling: ScalingSettings::default(),
            sizes: SizeSettings::default(),
            appearance: AppearanceSettings::default(),
            esp_update_rate: 60.0,
            hide_depleted_nodes: true,
            auto_save_on_exit: true,
            enable_debug_logging: true,
            show_debug_addresses: cfg!(debug_assertions),
            stat_catalog_path: None,
            font_path: None,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text).context("parsing settings JSON")?;
        if settings.settings_version != SETTINGS_VERSION {
            log::warn!(
                "settings version {} differs from {}; missing keys use defaults",
                settings.settings_version,
                SETTINGS_VERSION
            );
        }
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings =
            Self::from_json(&text).with_context(|| format!("loading {}", path.display()))?;
        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let mut settings = self.clone();
        settings.settings_version = SETTINGS_VERSION;
        let json = serde_json::to_string_pretty(&settings)?;
        fs::write(path, json).with_context(|| format!("writing settings to {}", path.display()))?;
        log::info!("saved settings to {}", path.display());
        Ok(())
    }

    /// Milliseconds between slow pipeline ticks.
    pub fn update_interval_ms(&self) -> u64 {
        let rate = if self.esp_update_rate.is_finite() {
            self.esp_update_rate.max(1.0)
        } else {
            1.0
        };
        (1000.0 / rate).round() as u64
    }
}

/// Process-wide shutdown request. Stored with release ordering and read
/// with acquire ordering so a stage that sees the flag also sees every
/// write made before it was raised.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// User-visible health of the host integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum HookStatus {
    #[default]
    Unknown,
    Ok,
    Failed,
}

impl HookStatus {
    pub fn label(self) -> &'static str {
        match self {
            HookStatus::Unknown => "Unknown",
            HookStatus::Ok => "OK",
            HookStatus::Failed => "Failed",
        }
    }
}

/// Current settings plus the small amount of shared runtime state every
/// stage reads.
#[derive(Debug)]
pub struct ConfigStore {
    settings: Settings,
    path: Option<PathBuf>,
    shutdown: ShutdownFlag,
    hook_status: HookStatus,
    adaptive_far_plane: f32,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl ConfigStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            path: None,
            shutdown: ShutdownFlag::new(),
            hook_status: HookStatus::Unknown,
            adaptive_far_plane: FAR_PLANE_INITIAL,
        }
    }

    /// Loads settings from `path`, starting from defaults when the file does
    /// not exist yet. The path is remembered for [`ConfigStore::save`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            Settings::load(&path)?
        } else {
            log::info!(
                "no settings at {}; starting from defaults",
                path.display()
            );
            Settings::default()
        };
        let mut store = Self::new(settings);
        store.path = Some(path);
        Ok(store)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the settings back to the file they were opened from. A store
    /// without a path has nothing to save.
    pub fn save(&self) -> Result<bool> {
        match &self.path {
            Some(path) => {
                self.settings.save(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn hook_status(&self) -> HookStatus {
        self.hook_status
    }

    pub fn set_hook_status(&mut self, status: HookStatus) {
        if self.hook_status != status {
            log::info!("hook status {} -> {}", self.hook_status.label(), status.label());
        }
        self.hook_status = status;
    }

    pub fn adaptive_far_plane(&self) -> f32 {
        self.adaptive_far_plane
    }

    pub fn set_adaptive_far_plane(&mut self, value: f32) {
        self.adaptive_far_plane = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert!(settings.player_esp.enabled);
        assert!(!settings.player_esp.render_box);
        assert!(settings.player_esp.render_health_bar);
        assert!(settings.player_esp.render_player_name);
        assert!(settings.object_esp.render_dot);
        assert!(settings.object_esp.show_dead_gadgets);
        assert!(!settings.npc_esp.show_dead_npcs);
        assert!(settings.distance.use_distance_limit);
        assert_eq!(settings.distance.render_distance_limit, 90.0);
        assert_eq!(settings.scaling.scaling_start_distance, 20.0);
        assert_eq!(settings.sizes.base_box_width, 45.0);
        assert_eq!(settings.esp_update_rate, 60.0);
        assert_eq!(settings.update_interval_ms(), 17);
    }

    #[test]
    fn update_interval_rounds_to_the_nearest_millisecond() {
        let mut settings = Settings::default();
        settings.esp_update_rate = 144.0;
        assert_eq!(settings.update_interval_ms(), 7);
        settings.esp_update_rate = 30.0;
        assert_eq!(settings.update_interval_ms(), 33);
        settings.esp_update_rate = 0.0;
        assert_eq!(settings.update_interval_ms(), 1000);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let json = r#"{
            "settingsVersion": 1,
            "playerESP": { "renderBox": true, "gearDisplayMode": "Detailed" },
            "distance": { "renderDistanceLimit": 150.0 },
            "futureKey": [1, 2, 3]
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert!(settings.player_esp.render_box);
        assert!(settings.player_esp.render_health_bar);
        assert_eq!(
            settings.player_esp.gear_display_mode,
            GearDisplayMode::Detailed
        );
        assert_eq!(settings.distance.render_distance_limit, 150.0);
        assert!(settings.distance.use_distance_limit);
    }

    #[test]
    fn active_limit_prefers_wvw_override_for_characters() {
        let mut distance = DistanceSettings {
            wvw_distance_limit: 200.0,
            ..DistanceSettings::default()
        };
        assert_eq!(distance.active_limit(EntityKind::Player, true), 200.0);
        assert_eq!(distance.active_limit(EntityKind::Gadget, true), 90.0);
        assert_eq!(distance.active_limit(EntityKind::Npc, false), 90.0);
        distance.use_distance_limit = false;
        assert_eq!(distance.active_limit(EntityKind::Player, true), 0.0);
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("esp").join("settings.json");
        let mut store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.settings(), &Settings::default());

        store.settings_mut().appearance.global_opacity = 0.4;
        assert!(store.save().unwrap());

        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.settings().appearance.global_opacity, 0.4);
    }

    #[test]
    fn shutdown_flag_is_shared_between_clones() {
        let store = ConfigStore::default();
        let flag = store.shutdown_flag();
        assert!(!flag.is_requested());
        store.request_shutdown();
        assert!(flag.is_requested());
    }
}
