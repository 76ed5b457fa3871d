//! Smoothed movement trails drawn from an entity's position history.

use glam::{Vec2, Vec3};

use crate::color::Color;
use crate::combat::{PositionHistory, PositionHistoryPoint};
use crate::config::{TrailSettings, TrailTeleportMode};
use crate::draw::DrawList;

pub const SPLINE_SEGMENTS_PER_CURVE: u32 = 4;
pub const TELEPORT_DASH_LENGTH: f32 = 10.0;
pub const TELEPORT_GAP_LENGTH: f32 = 5.0;
pub const TELEPORT_ALPHA: f32 = 0.8;
/// The head is stretched to the live position while the newest point is
/// younger than this.
pub const HEAD_INTERPOLATION_WINDOW_MS: u64 = 150;
const MIN_VISIBLE_FADE: f32 = 0.01;

pub fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Shared inputs for every stroke of one trail.
struct TrailStroke<'a, P> {
    project: &'a P,
    now_ms: u64,
    max_duration_secs: f32,
    color: Color,
    thickness: f32,
}

impl<P> TrailStroke<'_, P>
where
    P: Fn(Vec3) -> Option<Vec2>,
{
    fn time_fade(&self, timestamp_ms: u64) -> f32 {
        if self.max_duration_secs <= 0.0 {
            return 0.0;
        }
        let age = self.now_ms.saturating_sub(timestamp_ms) as f32 / 1000.0;
        let fade = 1.0 - (age / self.max_duration_secs).clamp(0.0, 1.0);
        fade * fade
    }

    fn spline<D: DrawList + ?Sized>(
        &self,
        draw: &mut D,
        p0: &PositionHistoryPoint,
        p1: &PositionHistoryPoint,
        p2: &PositionHistoryPoint,
        p3: &PositionHistoryPoint,
    ) {
        let mut previous = (self.project)(p1.position);
        let span = p2.timestamp_ms.saturating_sub(p1.timestamp_ms);
        for step in 1..=SPLINE_SEGMENTS_PER_CURVE {
            let t = step as f32 / SPLINE_SEGMENTS_PER_CURVE as f32;
            let world = catmull_rom(p0.position, p1.position, p2.position, p3.position, t);
            let timestamp = p1.timestamp_ms + (span as f32 * t) as u64;
            let fade = self.time_fade(timestamp);
            if fade <= MIN_VISIBLE_FADE {
                continue;
            }
            match (self.project)(world) {
                Some(current) => {
                    if let Some(from) = previous {
                        draw.add_line(from, current, self.color.apply_alpha(fade), self.thickness);
                    }
                    previous = Some(current);
                }
                None => previous = None,
            }
        }
    }

    fn teleport<D: DrawList + ?Sized>(
        &self,
        draw: &mut D,
        from: &PositionHistoryPoint,
        to: &PositionHistoryPoint,
    ) {
        let fade = self.time_fade(from.timestamp_ms);
        let (Some(start), Some(end)) = ((self.project)(from.position), (self.project)(to.position))
        else {
            return;
        };
        let length = start.distance(end);
        if length < 0.01 {
            return;
        }
        let direction = (end - start) / length;
        let color = self.color.apply_alpha(fade * TELEPORT_ALPHA);
        let mut offset = 0.0;
        while offset < length {
            let dash_end = (offset + TELEPORT_DASH_LENGTH).min(length);
            draw.add_line(
                start + direction * offset,
                start + direction * dash_end,
                color,
                self.thickness,
            );
            offset += TELEPORT_DASH_LENGTH + TELEPORT_GAP_LENGTH;
        }
    }
}

/// Draws the trail for one entity. `color` is the entity colour with its
/// final alpha applied; `live_position` is where the entity is now.
pub fn draw_trail<D, P>(
    draw: &mut D,
    history: &PositionHistory,
    live_position: Vec3,
    color: Color,
    settings: &TrailSettings,
    now_ms: u64,
    project: &P,
) where
    D: DrawList + ?Sized,
    P: Fn(Vec3) -> Option<Vec2>,
{
    if history.len() < 2 {
        return;
    }
    let points: Vec<PositionHistoryPoint> = history.iter().copied().collect();
    let stroke = TrailStroke {
        project,
        now_ms,
        max_duration_secs: settings.max_duration,
        color,
        thickness: settings.thickness,
    };
    let bridge_teleports = settings.teleport_mode == TrailTeleportMode::Analysis;

    for index in 0..points.len() - 1 {
        let p1 = &points[index];
        let p2 = &points[index + 1];
        if p1.position.distance(p2.position) > settings.teleport_threshold {
            if bridge_teleports {
                stroke.teleport(draw, p1, p2);
            }
            continue;
        }
        let p0 = if index > 0 { &points[index - 1] } else { p1 };
        let p3 = points.get(index + 2).unwrap_or(p2);
        stroke.spline(draw, p0, p1, p2, p3);
    }

    let newest = &points[points.len() - 1];
    if now_ms.saturating_sub(newest.timestamp_ms) >= HEAD_INTERPOLATION_WINDOW_MS {
        return;
    }
    let second_newest = &points[points.len() - 2];
    let head = interpolated_head(second_newest, newest, live_position, now_ms);
    stroke.spline(draw, second_newest, newest, &head, &head);
}

/// Point between the newest sample and the live position, advanced by how
/// far into the next sampling interval `now_ms` is.
fn interpolated_head(
    second_newest: &PositionHistoryPoint,
    newest: &PositionHistoryPoint,
    live_position: Vec3,
    now_ms: u64,
) -> PositionHistoryPoint {
    let mut head = PositionHistoryPoint {
        position: live_position,
        timestamp_ms: now_ms,
    };
    if now_ms >= newest.timestamp_ms && newest.timestamp_ms > second_newest.timestamp_ms {
        let interval = newest.timestamp_ms - second_newest.timestamp_ms;
        let since_newest = now_ms - newest.timestamp_ms;
        let t = (since_newest as f32 / interval as f32).clamp(0.0, 1.0);
        head.position = newest.position.lerp(live_position, t);
        head.timestamp_ms = newest.timestamp_ms + (since_newest as f32 * t) as u64;
    }
    head
}
