//! Draw stage: turns finalized entities into draw-list calls.
//!
//! Everything an entity needs at draw time is copied into an owned
//! [`EntityRenderContext`] when the slow tick finalizes, so drawing never
//! reaches back into the entity pools. Animations are evaluated against the
//! combat state at the frame's own timestamp, and positions are re-projected
//! with the frame's camera.

pub mod health_bar;
pub mod info;
pub mod shapes;
pub mod trails;

use glam::{Vec2, Vec3};

use esp_stream::{Attitude, GadgetType};

use crate::color::{Color, palette};
use crate::combat::{CombatStateKey, EntityCombatState};
use crate::combat::constants::DEATH_ANIMATION_TOTAL_DURATION_MS;
use crate::config::{EnergyDisplayType, GearDisplayMode, Settings, TrailDisplayMode, TrailSettings};
use crate::context::FrameContext;
use crate::draw::DrawList;
use crate::entity::{EntityKind, EntityRef, RenderableEntity};
use crate::layout::{LayoutElementKey, LayoutItem, LayoutResult, calculate_layout};
use crate::styling::entity_color;
use crate::text::{
    DEFAULT_LINE_SPACING, TextAlignment, TextAnchor, TextElement, TextLine, TextRenderer,
    TextSegment, TextStyle,
};
use crate::visuals::{VisualProperties, project_physics_box};

use health_bar::{
    BURST_DPS_FALLBACK_Y_OFFSET, BURST_DPS_PADDING, HealthBar, HealthBarAnimationState,
    draw_burst_dps, draw_damage_number, draw_energy_bar, draw_health_bar, health_percent_width,
};
use info::{
    GEAR_DETAILS_HEADER, StatCatalog, attack_target_details, compact_gear_summary,
    compact_summary_segments, dominant_stats, dominant_stats_segments, gadget_details,
    gear_detail_lines, npc_details, player_details,
};

/// Which parts of an entity are drawn, resolved from the per-kind settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderFlags {
    pub render_box: bool,
    pub render_physics_box: bool,
    pub render_circle: bool,
    pub render_dot: bool,
    pub render_distance: bool,
    pub render_details: bool,
    pub render_health_bar: bool,
    pub render_energy_bar: bool,
    pub render_name: bool,
    pub show_burst_dps: bool,
    pub show_damage_numbers: bool,
    pub show_health_percentage: bool,
    pub show_only_damaged: bool,
    /// Dead entities keep their bar after the death animation.
    pub keep_dead_bar: bool,
    /// Utility gadgets never show bars, numbers, or DPS.
    pub show_combat_ui: bool,
}

impl RenderFlags {
    pub fn for_entity(entity: EntityRef<'_>, settings: &Settings) -> Self {
        match entity {
            EntityRef::Player(_) => {
                let esp = &settings.player_esp;
                Self {
                    render_box: esp.render_box,
                    render_dot: esp.render_dot,
                    render_distance: esp.render_distance,
                    render_details: esp.render_details,
                    render_health_bar: esp.render_health_bar,
                    render_energy_bar: esp.render_energy_bar,
                    render_name: esp.render_player_name,
                    show_burst_dps: esp.show_burst_dps,
                    show_damage_numbers: esp.show_damage_numbers,
                    show_health_percentage: esp.show_health_percentage,
                    show_only_damaged: esp.show_only_damaged,
                    keep_dead_bar: true,
                    show_combat_ui: true,
                    ..Self::default()
                }
            }
            EntityRef::Npc(_) => {
                let esp = &settings.npc_esp;
                Self {
                    render_box: esp.render_box,
                    render_dot: esp.render_dot,
                    render_distance: esp.render_distance,
                    render_details: esp.render_details,
                    render_health_bar: esp.render_health_bar,
                    show_burst_dps: esp.show_burst_dps,
                    show_damage_numbers: esp.show_damage_numbers,
                    show_health_percentage: esp.show_health_percentage,
                    show_only_damaged: esp.show_only_damaged,
                    keep_dead_bar: esp.show_dead_npcs,
                    show_combat_ui: true,
                    ..Self::default()
                }
            }
            EntityRef::Gadget(gadget) => {
                let esp = &settings.object_esp;
                Self {
                    render_physics_box: esp.render_box && gadget.dimensions.is_some(),
                    render_circle: esp.render_circle,
                    render_dot: esp.render_dot,
                    render_distance: esp.render_distance,
                    render_details: esp.render_details,
                    render_health_bar: esp.render_health_bar,
                    show_burst_dps: esp.show_burst_dps,
                    show_damage_numbers: esp.show_damage_numbers,
                    show_health_percentage: esp.show_health_percentage,
                    show_only_damaged: esp.show_only_damaged,
                    keep_dead_bar: esp.show_dead_gadgets,
                    show_combat_ui: !gadget.gadget_type.hides_combat_ui(),
                    ..Self::default()
                }
            }
            EntityRef::AttackTarget(_) => {
                let esp = &settings.object_esp;
                Self {
                    render_circle: esp.render_circle,
                    render_dot: esp.render_dot,
                    render_distance: esp.render_distance,
                    render_details: esp.render_details,
                    show_burst_dps: esp.show_burst_dps,
                    show_damage_numbers: esp.show_damage_numbers,
                    show_combat_ui: true,
                    ..Self::default()
                }
            }
        }
    }
}

/// Owned copy of everything needed to draw one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRenderContext {
    pub key: CombatStateKey,
    pub kind: EntityKind,
    pub entity: RenderableEntity,
    pub gadget_type: Option<GadgetType>,
    pub attitude: Option<Attitude>,
    /// Unfaded entity colour.
    pub color: Color,
    pub flags: RenderFlags,
    pub name: Option<String>,
    pub details: Vec<TextLine>,
    pub gear_summary: TextLine,
    pub dominant_stats: TextLine,
    /// Fill of the energy bar, when the entity has one.
    pub energy_percent: Option<f32>,
    pub physics_dimensions: Option<Vec3>,
    /// Set for players whose movement trail is drawn.
    pub trail: Option<TrailSettings>,
}

fn energy_percent(current: f32, max: f32) -> Option<f32> {
    (max > 0.0).then(|| current / max)
}

impl EntityRenderContext {
    pub fn build(entity: EntityRef<'_>, settings: &Settings, catalog: &StatCatalog) -> Self {
        let flags = RenderFlags::for_entity(entity, settings);
        let mut context = Self {
            key: CombatStateKey::for_entity(entity),
            kind: entity.kind(),
            entity: entity.base().clone(),
            gadget_type: None,
            attitude: entity.attitude(),
            color: entity_color(entity),
            flags,
            name: None,
            details: Vec::new(),
            gear_summary: Vec::new(),
            dominant_stats: Vec::new(),
            energy_percent: None,
            physics_dimensions: None,
            trail: None,
        };

        match entity {
            EntityRef::Player(player) => {
                let esp = &settings.player_esp;
                if flags.render_name {
                    let name = if player.name.is_empty() {
                        player.profession.label().unwrap_or_default().to_owned()
                    } else {
                        player.name.clone()
                    };
                    context.name = (!name.is_empty()).then_some(name);
                }
                if flags.render_details {
                    context.details = player_details(player, settings);
                }
                match esp.gear_display_mode {
                    GearDisplayMode::Off => {}
                    GearDisplayMode::Compact => {
                        context.gear_summary =
                            compact_summary_segments(&compact_gear_summary(player, catalog));
                    }
                    GearDisplayMode::Attributes => {
                        context.dominant_stats =
                            dominant_stats_segments(&dominant_stats(player, catalog));
                    }
                    GearDisplayMode::Detailed => {
                        let gear = gear_detail_lines(player, catalog);
                        if !gear.is_empty() {
                            context.details.push(vec![TextSegment::new(
                                GEAR_DETAILS_HEADER,
                                palette::SUMMARY_TEXT,
                            )]);
                            context.details.extend(gear);
                        }
                    }
                }
                context.energy_percent = match esp.energy_display_type {
                    EnergyDisplayType::Dodge => {
                        energy_percent(player.endurance, player.max_endurance)
                    }
                    EnergyDisplayType::Special => {
                        energy_percent(player.special_energy, player.max_special_energy)
                    }
                };
                let trail_shown = match esp.trails.display_mode {
                    TrailDisplayMode::All => true,
                    TrailDisplayMode::Hostile => player.attitude == Attitude::Hostile,
                };
                if esp.enable_trails && trail_shown {
                    context.trail = Some(esp.trails.clone());
                }
            }
            EntityRef::Npc(npc) => {
                if flags.render_details {
                    context.details = npc_details(npc, settings);
                }
            }
            EntityRef::Gadget(gadget) => {
                context.gadget_type = Some(gadget.gadget_type);
                context.physics_dimensions = gadget.dimensions;
                if flags.render_details {
                    context.details = gadget_details(gadget, settings);
                }
            }
            EntityRef::AttackTarget(target) => {
                if flags.render_details {
                    context.details = attack_target_details(target, settings);
                }
            }
        }
        context
    }

    pub fn is_hostile(&self) -> bool {
        self.attitude == Some(Attitude::Hostile)
    }

    /// Whether the health bar shows this frame. Dead and undamaged entities
    /// keep their bar while the death animation plays.
    pub fn shows_health_bar(&self, state: Option<&EntityCombatState>, now: u64) -> bool {
        let flags = &self.flags;
        if !flags.render_health_bar || !flags.show_combat_ui || !self.entity.has_health() {
            return false;
        }
        let death_animating = state
            .filter(|state| state.death_timestamp != 0)
            .is_some_and(|state| {
                now.saturating_sub(state.death_timestamp) <= DEATH_ANIMATION_TOTAL_DURATION_MS
            });
        let undamaged = self.entity.health >= self.entity.max_health;
        if flags.show_only_damaged && undamaged {
            // Players drop the bar at full health even mid-animation.
            if self.kind == EntityKind::Player || !death_animating {
                return false;
            }
        }
        if self.entity.health <= 0.0 && !death_animating && !flags.keep_dead_bar {
            return false;
        }
        true
    }
}

/// One entity that survived the slow tick, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedRenderable {
    pub context: EntityRenderContext,
    /// Visuals as computed at the slow tick.
    pub visuals: VisualProperties,
}

impl FinalizedRenderable {
    /// Moves the slow-tick visuals to where the entity projects with this
    /// frame's camera. `None` when it no longer projects.
    pub fn live_visuals(&self, ctx: &FrameContext<'_>) -> Option<VisualProperties> {
        let screen_pos = ctx.camera.world_to_screen(
            self.context.entity.position,
            ctx.screen_width,
            ctx.screen_height,
        )?;
        let delta = screen_pos - self.visuals.screen_pos;
        let mut visuals = self.visuals;
        visuals.screen_pos = screen_pos;
        visuals.box_min += delta;
        visuals.box_max += delta;
        visuals.center += delta;
        if let Some(dimensions) = self.context.physics_dimensions.filter(|_| self.visuals.physics_box.is_some()) {
            visuals.physics_box = project_physics_box(self.context.entity.position, dimensions, ctx);
            if let Some((min, max)) = visuals.physics_box {
                visuals.box_min = min;
                visuals.box_max = max;
                visuals.center = (min + max) / 2.0;
            }
        }
        Some(visuals)
    }
}

fn label_element(lines: Vec<TextLine>, style: TextStyle) -> TextElement {
    TextElement::from_lines(lines, Vec2::ZERO, TextAnchor::Custom(Vec2::ZERO))
        .with_style(style)
        .with_line_spacing(DEFAULT_LINE_SPACING)
}

/// Text blocks of one entity before placement.
struct Labels {
    distance: Option<TextElement>,
    name: Option<TextElement>,
    gear_summary: Option<TextElement>,
    dominant_stats: Option<TextElement>,
    details: Option<TextElement>,
}

impl Labels {
    fn build(context: &EntityRenderContext, visuals: &VisualProperties, ctx: &FrameContext<'_>) -> Self {
        let appearance = &ctx.settings.appearance;
        let font_size = visuals.font_size;
        let alpha = visuals.final_alpha;
        let distance = context.flags.render_distance.then(|| {
            label_element(
                vec![vec![TextSegment::plain(format!("{:.1}m", context.entity.gameplay_distance))]],
                TextStyle::distance(appearance, font_size, alpha),
            )
        });
        let name = context.name.as_ref().map(|name| {
            label_element(
                vec![vec![TextSegment::plain(name.clone())]],
                TextStyle::player_name(appearance, context.color, font_size, alpha),
            )
        });
        let summary = |segments: &TextLine| {
            (!segments.is_empty()).then(|| {
                label_element(
                    vec![segments.clone()],
                    TextStyle::summary(appearance, font_size, alpha),
                )
            })
        };
        let details = (!context.details.is_empty()).then(|| {
            label_element(
                context.details.clone(),
                TextStyle::details(appearance, font_size, alpha),
            )
        });
        Self {
            distance,
            name,
            gear_summary: summary(&context.gear_summary),
            dominant_stats: summary(&context.dominant_stats),
            details,
        }
    }

    fn text_items(&self) -> impl Iterator<Item = (LayoutElementKey, &TextElement)> {
        [
            (LayoutElementKey::Distance, self.distance.as_ref()),
            (LayoutElementKey::PlayerName, self.name.as_ref()),
            (LayoutElementKey::GearSummary, self.gear_summary.as_ref()),
            (LayoutElementKey::DominantStats, self.dominant_stats.as_ref()),
            (LayoutElementKey::Details, self.details.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, element)| element.map(|element| (key, element)))
    }
}

fn draw_shapes<D: DrawList + ?Sized>(
    draw: &mut D,
    context: &EntityRenderContext,
    visuals: &VisualProperties,
) {
    let flags = &context.flags;
    if flags.render_box {
        shapes::draw_bounding_box(draw, visuals.box_min, visuals.box_max, visuals.color, visuals.box_thickness);
    }
    if flags.render_physics_box {
        if let Some((min, max)) = visuals.physics_box {
            shapes::draw_physics_box(draw, min, max, visuals.color, visuals.box_thickness);
        }
    }
    if flags.render_circle {
        shapes::draw_gadget_circle(
            draw,
            visuals.screen_pos,
            visuals.circle_radius,
            visuals.color,
            visuals.box_thickness,
        );
    }
    if flags.render_dot {
        if context.kind.is_character() {
            shapes::draw_entity_dot(draw, visuals.screen_pos, visuals.color, visuals.dot_radius);
        } else {
            shapes::draw_white_dot(draw, visuals.screen_pos, visuals.final_alpha, visuals.dot_radius);
        }
    }
}

fn draw_trail<D: DrawList + ?Sized>(
    draw: &mut D,
    context: &EntityRenderContext,
    visuals: &VisualProperties,
    state: Option<&EntityCombatState>,
    ctx: &FrameContext<'_>,
) {
    let (Some(settings), Some(state)) = (context.trail.as_ref(), state) else {
        return;
    };
    let project = |world: Vec3| ctx.camera.world_to_screen(world, ctx.screen_width, ctx.screen_height);
    trails::draw_trail(
        draw,
        &state.history,
        context.entity.position,
        visuals.color,
        settings,
        ctx.now_ms,
        &project,
    );
}

/// Draws one entity: shapes and trail, then the stacked labels and bars.
/// Returns false when the entity no longer projects onto the screen.
pub fn render_entity<D: DrawList + ?Sized>(
    draw: &mut D,
    ctx: &FrameContext<'_>,
    renderable: &FinalizedRenderable,
) -> bool {
    let Some(visuals) = renderable.live_visuals(ctx) else {
        return false;
    };
    let context = &renderable.context;
    let flags = &context.flags;
    let state = ctx.combat.get_state(context.key);
    let appearance = &ctx.settings.appearance;

    draw_shapes(draw, context, &visuals);
    draw_trail(draw, context, &visuals, state, ctx);

    let anim = HealthBarAnimationState::populate(&context.entity, state, ctx.now_ms);
    let show_health_bar = context.shows_health_bar(state, ctx.now_ms);
    let bar_size = Vec2::new(visuals.health_bar_width, visuals.health_bar_height);
    let show_energy_bar = flags.render_energy_bar
        && context
            .energy_percent
            .is_some_and(|percent| (0.0..=1.0).contains(&percent));

    let labels = Labels::build(context, &visuals, ctx);
    let mut items: Vec<LayoutItem> = labels
        .text_items()
        .map(|(key, element)| LayoutItem::new(key, TextRenderer::measure(&*draw, element)))
        .collect();
    if show_health_bar {
        items.push(LayoutItem::new(LayoutElementKey::HealthBar, bar_size));
    }
    if show_energy_bar {
        items.push(LayoutItem::new(LayoutElementKey::EnergyBar, bar_size));
    }
    let layout = calculate_layout(&visuals, &items);

    let bar = layout.health_bar_anchor.map(|min| HealthBar {
        min,
        width: bar_size.x,
        height: bar_size.y,
        health: context.entity.health,
        max_health: context.entity.max_health,
        color: context.color,
        final_alpha: visuals.final_alpha,
        hostile: context.is_hostile(),
        show_percentage: flags.show_health_percentage,
        font_size: visuals.font_size,
        appearance,
    });
    if let Some(bar) = &bar {
        draw_health_bar(draw, bar, &anim);
    }

    if flags.show_combat_ui {
        draw_combat_text(draw, context, &visuals, bar.as_ref(), &anim, state, ctx);
    }

    if let (Some(position), Some(percent)) = (
        layout.position(LayoutElementKey::EnergyBar),
        context.energy_percent,
    ) {
        let min = Vec2::new(position.x - bar_size.x / 2.0, position.y);
        draw_energy_bar(draw, min, bar_size, percent, visuals.final_alpha);
    }

    draw_labels(draw, &labels, &layout);
    true
}

fn draw_combat_text<D: DrawList + ?Sized>(
    draw: &mut D,
    context: &EntityRenderContext,
    visuals: &VisualProperties,
    bar: Option<&HealthBar<'_>>,
    anim: &HealthBarAnimationState,
    state: Option<&EntityCombatState>,
    ctx: &FrameContext<'_>,
) {
    let appearance = &ctx.settings.appearance;
    if context.flags.show_damage_numbers {
        let anchor = match bar {
            Some(bar) => Vec2::new(bar.min.x + bar.width / 2.0, bar.min.y),
            None => visuals.center,
        };
        draw_damage_number(draw, anchor, anim, visuals.font_size, appearance);
    }

    let dps = state.and_then(|state| state.burst_dps(ctx.now_ms));
    let fade = visuals.final_alpha * anim.health_bar_fade_alpha;
    if let (true, Some(dps)) = (context.flags.show_burst_dps, dps) {
        match bar {
            Some(bar) => {
                let mut x = bar.max().x + BURST_DPS_PADDING;
                let percent_width = health_percent_width(&*draw, bar);
                if percent_width > 0.0 {
                    x += percent_width + BURST_DPS_PADDING;
                }
                let anchor = Vec2::new(x, bar.min.y + bar.height / 2.0);
                draw_burst_dps(draw, anchor, dps, visuals.font_size, fade, TextAlignment::Left, appearance);
            }
            None => {
                let anchor = visuals.screen_pos + Vec2::new(0.0, BURST_DPS_FALLBACK_Y_OFFSET);
                draw_burst_dps(draw, anchor, dps, visuals.font_size, fade, TextAlignment::Center, appearance);
            }
        }
    }
}

fn draw_labels<D: DrawList + ?Sized>(draw: &mut D, labels: &Labels, layout: &LayoutResult) {
    for (key, element) in labels.text_items() {
        let Some(position) = layout.position(key) else {
            continue;
        };
        let mut placed = element.clone();
        placed.anchor = position;
        placed.alignment = TextAlignment::Center;
        TextRenderer::render(draw, &placed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraPose};
    use crate::combat::{CombatOptions, CombatStateManager};
    use crate::draw::{DrawCommand, RecordingDrawList};
    use crate::entity::{RenderableGadget, RenderableNpc, RenderablePlayer};
    use crate::visuals::calculate_visuals;

    struct Scene {
        camera: Camera,
        combat: CombatStateManager,
        settings: Settings,
    }

    impl Scene {
        fn new() -> Self {
            let mut camera = Camera::default();
            camera.update(
                &CameraPose {
                    position: Vec3::ZERO,
                    forward: Vec3::Z,
                    avatar_position: Vec3::ZERO,
                    fov_radians: std::f32::consts::FRAC_PI_2,
                },
                1920.0,
                1080.0,
            );
            Self {
                camera,
                combat: CombatStateManager::new(CombatOptions::default()),
                settings: Settings::default(),
            }
        }

        fn ctx(&self, now_ms: u64) -> FrameContext<'_> {
            FrameContext {
                now_ms,
                camera: &self.camera,
                combat: &self.combat,
                settings: &self.settings,
                screen_width: 1920.0,
                screen_height: 1080.0,
                in_wvw: false,
                adaptive_far_plane: 1500.0,
            }
        }

        fn finalize(&self, entity: EntityRef<'_>, now_ms: u64) -> FinalizedRenderable {
            let ctx = self.ctx(now_ms);
            let visuals = calculate_visuals(entity, &ctx).unwrap();
            FinalizedRenderable {
                context: EntityRenderContext::build(entity, &self.settings, &StatCatalog::default()),
                visuals,
            }
        }
    }

    fn player(health: f32) -> RenderablePlayer {
        RenderablePlayer {
            base: RenderableEntity {
                address: 0x1000,
                position: Vec3::new(0.0, 0.0, 20.0),
                health,
                max_health: 1000.0,
                visual_distance: 20.0,
                gameplay_distance: 20.0,
                valid: true,
                ..RenderableEntity::default()
            },
            attitude: Attitude::Hostile,
            name: "Logan".to_owned(),
            ..RenderablePlayer::default()
        }
    }

    #[test]
    fn player_draws_name_and_bar() {
        let scene = Scene::new();
        let hurt = player(500.0);
        let renderable = scene.finalize(EntityRef::Player(&hurt), 1000);
        let mut draw = RecordingDrawList::default();
        render_entity(&mut draw, &scene.ctx(1000), &renderable);
        assert!(draw.texts().any(|text| text == "Logan"));
        // Background and fill.
        assert!(draw.count("rect_filled") >= 2);
        let fill = palette::HOSTILE.with_scaled_alpha(220, renderable.visuals.final_alpha);
        assert!(draw.commands().iter().any(|command| command.color() == fill));
    }

    #[test]
    fn name_falls_back_to_profession() {
        let settings = Settings::default();
        let mut anonymous = player(500.0);
        anonymous.name.clear();
        anonymous.profession = esp_stream::Profession::Thief;
        let context = EntityRenderContext::build(
            EntityRef::Player(&anonymous),
            &settings,
            &StatCatalog::default(),
        );
        assert_eq!(context.name.as_deref(), Some("Thief"));
    }

    #[test]
    fn show_only_damaged_hides_full_health_bars() {
        let mut scene = Scene::new();
        scene.settings.player_esp.show_only_damaged = true;
        scene.settings.appearance.enable_text_backgrounds = false;
        let healthy = player(1000.0);
        let renderable = scene.finalize(EntityRef::Player(&healthy), 1000);
        let mut draw = RecordingDrawList::default();
        render_entity(&mut draw, &scene.ctx(1000), &renderable);
        assert_eq!(draw.count("rect_filled"), 0);
    }

    #[test]
    fn utility_gadgets_hide_combat_ui() {
        let scene = Scene::new();
        let node = RenderableGadget {
            base: RenderableEntity {
                address: 0x2000,
                position: Vec3::new(0.0, 0.0, 30.0),
                health: 10.0,
                max_health: 100.0,
                visual_distance: 30.0,
                gameplay_distance: 30.0,
                valid: true,
                ..RenderableEntity::default()
            },
            gadget_type: GadgetType::ResourceNode,
            ..RenderableGadget::default()
        };
        let renderable = scene.finalize(EntityRef::Gadget(&node), 1000);
        assert!(!renderable.context.flags.show_combat_ui);
        let mut draw = RecordingDrawList::default();
        render_entity(&mut draw, &scene.ctx(1000), &renderable);
        assert_eq!(draw.count("rect_filled"), 0);
        // The gadget circle still draws.
        assert_eq!(draw.count("circle"), 1);
    }

    #[test]
    fn dead_npc_bar_lasts_for_the_death_animation() {
        let mut scene = Scene::new();
        let mut npc = RenderableNpc {
            base: RenderableEntity {
                address: 0x3000,
                position: Vec3::new(0.0, 0.0, 15.0),
                health: 100.0,
                max_health: 100.0,
                visual_distance: 15.0,
                gameplay_distance: 15.0,
                valid: true,
                ..RenderableEntity::default()
            },
            attitude: Attitude::Hostile,
            ..RenderableNpc::default()
        };
        scene.combat.update_entity(EntityRef::Npc(&npc), 1000);
        npc.base.health = 0.0;
        scene.combat.update_entity(EntityRef::Npc(&npc), 2000);

        let context = EntityRenderContext::build(EntityRef::Npc(&npc), &scene.settings, &StatCatalog::default());
        let state = scene.combat.get_state(context.key);
        assert!(context.shows_health_bar(state, 2500));
        assert!(!context.shows_health_bar(state, 2000 + DEATH_ANIMATION_TOTAL_DURATION_MS + 1));
    }

    #[test]
    fn entities_off_screen_this_frame_are_skipped() {
        let mut scene = Scene::new();
        let hurt = player(500.0);
        let renderable = scene.finalize(EntityRef::Player(&hurt), 1000);
        scene.camera.update(
            &CameraPose {
                position: Vec3::ZERO,
                forward: -Vec3::Z,
                avatar_position: Vec3::ZERO,
                fov_radians: std::f32::consts::FRAC_PI_2,
            },
            1920.0,
            1080.0,
        );
        let mut draw = RecordingDrawList::default();
        assert!(!render_entity(&mut draw, &scene.ctx(1100), &renderable));
        assert!(draw.commands().is_empty());
    }

    #[test]
    fn burst_dps_sits_right_of_the_bar() {
        let mut scene = Scene::new();
        scene.settings.player_esp.show_burst_dps = true;
        let mut target = player(1000.0);
        scene.combat.update_entity(EntityRef::Player(&target), 1000);
        target.base.health = 400.0;
        scene.combat.update_entity(EntityRef::Player(&target), 1100);

        let renderable = scene.finalize(EntityRef::Player(&target), 2100);
        let mut draw = RecordingDrawList::default();
        render_entity(&mut draw, &scene.ctx(2100), &renderable);
        let bar_right = draw
            .commands()
            .iter()
            .find_map(|command| match command {
                DrawCommand::RectFilled { max, .. } => Some(max[0]),
                _ => None,
            })
            .unwrap();
        let dps = draw
            .commands()
            .iter()
            .find_map(|command| match command {
                DrawCommand::Text { position, text, color, .. }
                    if text == "600" && color.r == palette::BURST_DPS_TEXT.r =>
                {
                    Some(position[0])
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(dps, bar_right + BURST_DPS_PADDING);
    }
}
