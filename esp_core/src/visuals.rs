//! Screen placement, scale, fade, and final sizes for one entity.

use glam::{Vec2, Vec3};

use crate::color::Color;
use crate::config::Settings;
use crate::context::FrameContext;
use crate::entity::{EntityKind, EntityRef};
use crate::styling::{EntityMultipliers, entity_color};

pub const FADE_ZONE_FRACTION: f32 = 0.11;

pub const GADGET_FADE_START_DISTANCE: f32 = 90.0;
pub const GADGET_MIN_ALPHA: f32 = 0.5;
pub const PLAYER_NPC_FADE_START_DISTANCE: f32 = 80.0;
pub const PLAYER_NPC_FADE_END_DISTANCE: f32 = 120.0;

pub const PLAYER_NPC_DISTANCE_FACTOR: f32 = 150.0;
pub const MIN_GADGET_DISTANCE_FACTOR: f32 = 150.0;

pub const NPC_BOX_RATIO: f32 = 0.8;
pub const GADGET_RADIUS_RATIO: f32 = 0.15;
pub const MIN_PLAYER_BOX: Vec2 = Vec2::new(10.0, 20.0);
pub const MIN_NPC_BOX: f32 = 15.0;
pub const MIN_GADGET_SIZE: f32 = 3.0;

pub const MAX_FONT_SIZE: f32 = 40.0;
pub const MIN_BOX_THICKNESS: f32 = 1.0;
pub const MAX_BOX_THICKNESS: f32 = 10.0;
pub const MIN_DOT_RADIUS: f32 = 1.0;
pub const MAX_DOT_RADIUS: f32 = 15.0;
pub const MIN_HEALTH_BAR_WIDTH: f32 = 10.0;
pub const MAX_HEALTH_BAR_WIDTH: f32 = 200.0;
pub const MIN_HEALTH_BAR_HEIGHT: f32 = 2.0;
pub const MAX_HEALTH_BAR_HEIGHT: f32 = 25.0;

/// Minimum projected corners for a physics box to be drawn.
pub const MIN_VALID_BOX_CORNERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualProperties {
    pub screen_pos: Vec2,
    pub scale: f32,
    pub distance_fade_alpha: f32,
    pub final_alpha: f32,
    /// Entity colour with `final_alpha` already applied.
    pub color: Color,
    pub box_min: Vec2,
    pub box_max: Vec2,
    pub center: Vec2,
    pub circle_radius: f32,
    /// Projected physics bounds, for gadgets that have them.
    pub physics_box: Option<(Vec2, Vec2)>,
    pub font_size: f32,
    pub box_thickness: f32,
    pub dot_radius: f32,
    pub health_bar_width: f32,
    pub health_bar_height: f32,
}

/// Linear fade across the last 11% of `limit`.
pub fn distance_fade_alpha(distance: f32, limit: f32) -> f32 {
    if limit <= 0.0 {
        return 1.0;
    }
    let fade_zone = limit * FADE_ZONE_FRACTION;
    let fade_start = limit - fade_zone;
    if distance <= fade_start {
        1.0
    } else if distance >= limit {
        0.0
    } else {
        1.0 - (distance - fade_start) / fade_zone
    }
}

/// `factor / (factor + (distance - start)^exponent)`, clamped.
pub fn distance_scale(distance: f32, factor: f32, exponent: f32, settings: &Settings) -> f32 {
    let scaling = &settings.scaling;
    let effective = (distance - scaling.scaling_start_distance).max(0.0);
    let raw = factor / (factor + effective.powf(exponent));
    raw.clamp(scaling.min_scale, scaling.max_scale)
}

fn entity_scale(kind: EntityKind, distance: f32, limit_mode: bool, ctx: &FrameContext<'_>) -> f32 {
    let scaling = &ctx.settings.scaling;
    if limit_mode {
        return distance_scale(
            distance,
            scaling.limit_distance_factor,
            scaling.limit_scaling_exponent,
            ctx.settings,
        );
    }
    let factor = if kind.is_character() {
        PLAYER_NPC_DISTANCE_FACTOR
    } else {
        MIN_GADGET_DISTANCE_FACTOR.max(ctx.adaptive_far_plane / 2.0)
    };
    distance_scale(distance, factor, scaling.no_limit_scaling_exponent, ctx.settings)
}

/// Alpha from distance effects alone, before global opacity.
fn adaptive_alpha(
    kind: EntityKind,
    distance: f32,
    distance_fade: f32,
    limit_mode: bool,
    ctx: &FrameContext<'_>,
) -> f32 {
    if limit_mode {
        return distance_fade;
    }
    if kind.is_character() {
        let distance_settings = &ctx.settings.distance;
        if !distance_settings.enable_player_npc_fade || distance <= PLAYER_NPC_FADE_START_DISTANCE {
            return 1.0;
        }
        let floor = distance_settings.player_npc_min_alpha.clamp(0.0, 1.0);
        let progress = ((distance - PLAYER_NPC_FADE_START_DISTANCE)
            / (PLAYER_NPC_FADE_END_DISTANCE - PLAYER_NPC_FADE_START_DISTANCE))
            .min(1.0);
        return 1.0 - progress * (1.0 - floor);
    }
    if distance <= GADGET_FADE_START_DISTANCE {
        return 1.0;
    }
    let far_plane = ctx.adaptive_far_plane.max(GADGET_FADE_START_DISTANCE + 1.0);
    let progress = ((distance - GADGET_FADE_START_DISTANCE)
        / (far_plane - GADGET_FADE_START_DISTANCE))
        .clamp(0.0, 1.0);
    (1.0 - progress).max(GADGET_MIN_ALPHA)
}

fn clamp_size(base: f32, scale: f32, multiplier: f32, min: f32, max: f32) -> f32 {
    (base * scale * multiplier).clamp(min, max)
}

/// Screen-space bounds of a gadget's physics box, when enough of its
/// corners project.
pub fn project_physics_box(
    position: Vec3,
    dimensions: Vec3,
    ctx: &FrameContext<'_>,
) -> Option<(Vec2, Vec2)> {
    let half_width = dimensions.x / 2.0;
    let half_depth = dimensions.y / 2.0;
    let height = dimensions.z;
    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    let mut valid = 0;
    for corner in 0..8u8 {
        let offset = Vec3::new(
            if corner & 1 == 0 { -half_width } else { half_width },
            if corner & 2 == 0 { 0.0 } else { height },
            if corner & 4 == 0 { -half_depth } else { half_depth },
        );
        if let Some(screen) = ctx.camera.world_to_screen(
            position + offset,
            ctx.screen_width,
            ctx.screen_height,
        ) {
            min = min.min(screen);
            max = max.max(screen);
            valid += 1;
        }
    }
    (valid >= MIN_VALID_BOX_CORNERS).then_some((min, max))
}

/// Computes how `entity` should look this frame, or `None` when it should
/// not be drawn at all.
pub fn calculate_visuals(entity: EntityRef<'_>, ctx: &FrameContext<'_>) -> Option<VisualProperties> {
    let base = entity.base();
    let kind = entity.kind();
    let settings = ctx.settings;

    let screen_pos = ctx
        .camera
        .world_to_screen(base.position, ctx.screen_width, ctx.screen_height)?;

    let limit = settings.distance.active_limit(kind, ctx.in_wvw);
    let limit_mode = limit > 0.0;
    let distance_fade = if limit_mode {
        distance_fade_alpha(base.gameplay_distance, limit)
    } else {
        1.0
    };
    if distance_fade <= 0.0 {
        return None;
    }

    let scale = entity_scale(kind, base.visual_distance, limit_mode, ctx);
    let opacity = settings.appearance.global_opacity.clamp(0.0, 1.0);
    let final_alpha = adaptive_alpha(kind, base.gameplay_distance, distance_fade, limit_mode, ctx)
        * opacity;
    if final_alpha <= 0.0 {
        return None;
    }
    let color = entity_color(entity).apply_alpha(final_alpha);

    let sizes = &settings.sizes;
    let (mut box_min, mut box_max, circle_radius) = match kind {
        EntityKind::Player => {
            let mut size = Vec2::new(sizes.base_box_width, sizes.base_box_height) * scale;
            if size.y < MIN_PLAYER_BOX.y {
                size = MIN_PLAYER_BOX;
            }
            (
                Vec2::new(screen_pos.x - size.x / 2.0, screen_pos.y - size.y),
                Vec2::new(screen_pos.x + size.x / 2.0, screen_pos.y),
                0.0,
            )
        }
        EntityKind::Npc => {
            let side = (sizes.base_box_width * NPC_BOX_RATIO * scale).max(MIN_NPC_BOX);
            (
                Vec2::new(screen_pos.x - side / 2.0, screen_pos.y - side),
                Vec2::new(screen_pos.x + side / 2.0, screen_pos.y),
                0.0,
            )
        }
        EntityKind::Gadget | EntityKind::AttackTarget => {
            let radius = (sizes.base_box_width * GADGET_RADIUS_RATIO * scale)
                .max(MIN_GADGET_SIZE / 2.0);
            (
                screen_pos - Vec2::splat(radius),
                screen_pos + Vec2::splat(radius),
                radius,
            )
        }
    };

    let physics_box = match entity {
        EntityRef::Gadget(gadget) if settings.object_esp.render_box => gadget
            .dimensions
            .and_then(|dims| project_physics_box(base.position, dims, ctx)),
        _ => None,
    };
    if let Some((min, max)) = physics_box {
        box_min = min;
        box_max = max;
    }

    let multipliers =
        EntityMultipliers::for_entity(entity, settings.player_esp.hostile_boost_multiplier);

    Some(VisualProperties {
        screen_pos,
        scale,
        distance_fade_alpha: distance_fade,
        final_alpha,
        color,
        box_min,
        box_max,
        center: (box_min + box_max) / 2.0,
        circle_radius,
        physics_box,
        font_size: clamp_size(
            sizes.base_font_size,
            scale,
            multipliers.font(),
            sizes.min_font_size,
            MAX_FONT_SIZE.max(sizes.min_font_size),
        ),
        box_thickness: clamp_size(
            sizes.base_box_thickness,
            scale,
            1.0,
            MIN_BOX_THICKNESS,
            MAX_BOX_THICKNESS,
        ),
        dot_radius: clamp_size(sizes.base_dot_radius, scale, 1.0, MIN_DOT_RADIUS, MAX_DOT_RADIUS),
        health_bar_width: clamp_size(
            sizes.base_health_bar_width,
            scale,
            multipliers.health_bar(),
            MIN_HEALTH_BAR_WIDTH,
            MAX_HEALTH_BAR_WIDTH,
        ),
        health_bar_height: clamp_size(
            sizes.base_health_bar_height,
            scale,
            multipliers.health_bar(),
            MIN_HEALTH_BAR_HEIGHT,
            MAX_HEALTH_BAR_HEIGHT,
        ),
    })
}
