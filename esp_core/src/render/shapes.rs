use glam::Vec2;

use crate::color::{Color, palette};
use crate::draw::DrawList;

/// Corner accents run this many box thicknesses along each edge.
pub const CORNER_LENGTH_FACTOR: f32 = 4.0;
pub const DOT_RADIUS_MULTIPLIER: f32 = 0.8;
pub const DOT_SHADOW_OFFSET: f32 = 1.0;
const OUTLINE_ALPHA: u8 = 180;
const WHITE_DOT_SHADOW_ALPHA: u8 = 120;
const OUTER_STROKE_OUTSET: f32 = 1.0;

/// Thin outlined rectangle with heavier accents on each corner. `color`
/// already carries the entity fade.
pub fn draw_bounding_box<D: DrawList + ?Sized>(
    draw: &mut D,
    min: Vec2,
    max: Vec2,
    color: Color,
    thickness: f32,
) {
    if color.is_transparent() || min.x >= max.x || min.y >= max.y {
        return;
    }
    let outline = palette::BLACK.with_scaled_alpha(OUTLINE_ALPHA, color.alpha_fraction());
    draw.add_rect(
        min - Vec2::splat(OUTER_STROKE_OUTSET),
        max + Vec2::splat(OUTER_STROKE_OUTSET),
        outline,
        0.0,
        1.0,
    );
    draw.add_rect(min, max, color, 0.0, 1.0);

    let size = max - min;
    let length = (thickness * CORNER_LENGTH_FACTOR).min(size.x / 2.0).min(size.y / 2.0);
    let corners = [
        (min, Vec2::new(1.0, 1.0)),
        (Vec2::new(max.x, min.y), Vec2::new(-1.0, 1.0)),
        (Vec2::new(min.x, max.y), Vec2::new(1.0, -1.0)),
        (max, Vec2::new(-1.0, -1.0)),
    ];
    for (corner, inward) in corners {
        draw.add_line(corner, corner + Vec2::new(inward.x * length, 0.0), color, thickness);
        draw.add_line(corner, corner + Vec2::new(0.0, inward.y * length), color, thickness);
    }
}

/// Filled dot in the entity colour over a dark halo.
pub fn draw_entity_dot<D: DrawList + ?Sized>(draw: &mut D, position: Vec2, color: Color, radius: f32) {
    if color.is_transparent() {
        return;
    }
    draw.add_circle_filled(
        position,
        radius,
        palette::BLACK.with_scaled_alpha(OUTLINE_ALPHA, color.alpha_fraction()),
    );
    draw.add_circle_filled(position, radius * DOT_RADIUS_MULTIPLIER, color);
}

/// Plain white dot with a drop shadow, used for world objects.
pub fn draw_white_dot<D: DrawList + ?Sized>(draw: &mut D, position: Vec2, alpha: f32, radius: f32) {
    if alpha <= 0.0 {
        return;
    }
    draw.add_circle_filled(
        position + Vec2::splat(DOT_SHADOW_OFFSET),
        radius,
        palette::BLACK.with_scaled_alpha(WHITE_DOT_SHADOW_ALPHA, alpha),
    );
    draw.add_circle_filled(
        position,
        radius * DOT_RADIUS_MULTIPLIER,
        palette::WHITE.apply_alpha(alpha),
    );
}

pub fn draw_gadget_circle<D: DrawList + ?Sized>(
    draw: &mut D,
    center: Vec2,
    radius: f32,
    color: Color,
    thickness: f32,
) {
    if color.is_transparent() || radius <= 0.0 {
        return;
    }
    draw.add_circle(center, radius, color, thickness);
}

/// Screen-space bounds of a projected physics box.
pub fn draw_physics_box<D: DrawList + ?Sized>(
    draw: &mut D,
    min: Vec2,
    max: Vec2,
    color: Color,
    thickness: f32,
) {
    if color.is_transparent() || min.x >= max.x || min.y >= max.y {
        return;
    }
    draw.add_rect(min, max, color, 0.0, thickness);
}
