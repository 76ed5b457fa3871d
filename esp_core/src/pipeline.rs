//! The slow tick (extract, combat update, filter, visuals, finalize) and
//! the per-frame draw of its result.

use std::collections::HashSet;

use serde::Serialize;

use esp_stream::FrameSnapshot;

use crate::camera::Camera;
use crate::combat::{CombatOptions, CombatStateKey, CombatStateManager};
use crate::config::{ConfigStore, Settings, ShutdownFlag};
use crate::context::FrameContext;
use crate::draw::DrawList;
use crate::entity::{EntityHandle, EntityPools};
use crate::extract::extract_entities;
use crate::far_plane::AdaptiveFarPlane;
use crate::filter::filter_entities;
use crate::render::info::StatCatalog;
use crate::render::{EntityRenderContext, FinalizedRenderable, render_entity};
use crate::visuals::calculate_visuals;

/// Per-frame values every stage shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub now_ms: u64,
    pub screen_width: f32,
    pub screen_height: f32,
    pub in_wvw: bool,
}

/// Counts from the most recent slow tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub extracted: usize,
    pub rejected: usize,
    pub dropped: usize,
    pub pruned: usize,
    pub filtered: usize,
    pub finalized: usize,
    pub combat_states: usize,
}

#[derive(Debug, Default)]
pub struct EspPipeline {
    camera: Camera,
    combat: CombatStateManager,
    pools: EntityPools,
    far_plane: AdaptiveFarPlane,
    catalog: StatCatalog,
    extracted: Vec<EntityHandle>,
    filtered: Vec<EntityHandle>,
    finalized: Vec<FinalizedRenderable>,
    bar_widths: Vec<(EntityHandle, f32)>,
    last_update_ms: Option<u64>,
    ticks: u64,
    last_tick: TickStats,
}

impl EspPipeline {
    pub fn new(catalog: StatCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn with_pools(pools: EntityPools, catalog: StatCatalog) -> Self {
        Self {
            pools,
            catalog,
            ..Self::default()
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn combat(&self) -> &CombatStateManager {
        &self.combat
    }

    pub fn pools(&self) -> &EntityPools {
        &self.pools
    }

    pub fn extracted(&self) -> &[EntityHandle] {
        &self.extracted
    }

    pub fn filtered(&self) -> &[EntityHandle] {
        &self.filtered
    }

    pub fn finalized(&self) -> &[FinalizedRenderable] {
        &self.finalized
    }

    pub fn catalog(&self) -> &StatCatalog {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: StatCatalog) {
        self.catalog = catalog;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane.value()
    }

    /// True when at least one update interval has passed since the last
    /// slow tick, or none has run yet.
    pub fn is_update_due(&self, now_ms: u64, settings: &Settings) -> bool {
        match self.last_update_ms {
            Some(last) => now_ms.saturating_sub(last) >= settings.update_interval_ms(),
            None => true,
        }
    }

    /// Runs the slow tick against `snapshot` and rebuilds the finalized
    /// list. Returns false when shutdown was requested and nothing ran.
    pub fn update(&mut self, snapshot: &FrameSnapshot, config: &mut ConfigStore, frame: FrameInputs) -> bool {
        if config.is_shutdown_requested() {
            return false;
        }
        let now = frame.now_ms;
        self.last_update_ms = Some(now);
        self.ticks += 1;

        let extract = extract_entities(snapshot, &mut self.pools, &mut self.extracted);

        let settings = config.settings();
        self.combat.set_options(CombatOptions {
            max_trail_points: settings.player_esp.trails.max_points,
            instant_destruction_resets_gadget: settings.object_esp.instant_destruction_resets_gadget,
        });
        let active: HashSet<CombatStateKey> = self
            .extracted
            .iter()
            .filter_map(|&handle| self.pools.resolve(handle))
            .map(CombatStateKey::for_entity)
            .collect();
        let pruned = self.combat.prune(&active);
        self.combat.update(
            self.extracted.iter().filter_map(|&handle| self.pools.resolve(handle)),
            now,
        );

        let camera_position = self.camera.position();
        let far_plane = self.far_plane.update(
            self.pools
                .gadgets
                .iter()
                .map(|(_, gadget)| gadget.base.position.distance(camera_position)),
            now,
        );
        config.set_adaptive_far_plane(far_plane);
        let settings = config.settings();

        let ctx = FrameContext {
            now_ms: now,
            camera: &self.camera,
            combat: &self.combat,
            settings,
            screen_width: frame.screen_width,
            screen_height: frame.screen_height,
            in_wvw: frame.in_wvw,
            adaptive_far_plane: far_plane,
        };
        filter_entities(&self.extracted, &mut self.pools, &ctx, &mut self.filtered);

        self.finalized.clear();
        self.bar_widths.clear();
        for &handle in &self.filtered {
            let Some(entity) = self.pools.resolve(handle) else {
                continue;
            };
            let Some(visuals) = calculate_visuals(entity, &ctx) else {
                continue;
            };
            let context = EntityRenderContext::build(entity, settings, &self.catalog);
            if context.shows_health_bar(ctx.combat.get_state(context.key), now) {
                self.bar_widths.push((handle, visuals.health_bar_width));
            }
            self.finalized.push(FinalizedRenderable { context, visuals });
        }

        for &(handle, width) in &self.bar_widths {
            if let Some(entity) = self.pools.resolve(handle) {
                self.combat.post_update(entity, width, now);
            }
        }

        self.last_tick = TickStats {
            extracted: extract.extracted(),
            rejected: extract.rejected,
            dropped: extract.dropped,
            pruned,
            filtered: self.filtered.len(),
            finalized: self.finalized.len(),
            combat_states: self.combat.len(),
        };
        log::trace!("slow tick {} at {now} ms: {:?}", self.ticks, self.last_tick);
        true
    }

    /// Draws the most recent finalized list with this frame's camera.
    /// Returns how many entities were drawn.
    pub fn draw<D: DrawList + ?Sized>(
        &self,
        draw: &mut D,
        settings: &Settings,
        shutdown: &ShutdownFlag,
        frame: FrameInputs,
    ) -> usize {
        if shutdown.is_requested() || !self.camera.is_valid() {
            return 0;
        }
        let ctx = FrameContext {
            now_ms: frame.now_ms,
            camera: &self.camera,
            combat: &self.combat,
            settings,
            screen_width: frame.screen_width,
            screen_height: frame.screen_height,
            in_wvw: frame.in_wvw,
            adaptive_far_plane: self.far_plane.value(),
        };
        self.finalized
            .iter()
            .filter(|renderable| render_entity(draw, &ctx, renderable))
            .count()
    }
}
