//! Health and energy bars with their combat feedback overlays.

use glam::Vec2;

use crate::color::{Color, palette};
use crate::combat::EntityCombatState;
use crate::combat::constants::{
    BARRIER_ANIM_DURATION_MS, DAMAGE_ACCUMULATOR_FADE_MS, DAMAGE_FLASH_FADE_MS,
    DAMAGE_FLASH_HOLD_MS, DAMAGE_FLASH_TOTAL_DURATION_MS, DAMAGE_NUMBER_MAX_DRIFT,
    DEATH_BURST_DURATION_MS, DEATH_FINAL_FADE_DURATION_MS, HEAL_FLASH_DURATION_MS,
    HEAL_OVERLAY_DURATION_MS, HEAL_OVERLAY_FADE_DURATION_MS,
};
use crate::config::AppearanceSettings;
use crate::draw::DrawList;
use crate::entity::RenderableEntity;
use crate::styling::damage_number_multiplier;
use crate::text::{TextAlignment, TextAnchor, TextElement, TextRenderer, TextStyle};

pub const BAR_BACKGROUND_ALPHA: u8 = 180;
pub const BAR_FILL_ALPHA: u8 = 220;
pub const BAR_BORDER_ALPHA: u8 = 100;
pub const BAR_ROUNDING: f32 = 1.0;
pub const BAR_BORDER_THICKNESS: f32 = 1.0;
pub const BAR_OUTER_STROKE_OUTSET: f32 = 1.0;

pub const STATUS_TEXT_FONT_MULTIPLIER: f32 = 0.8;
pub const HEALTH_PERCENT_PADDING: f32 = 5.0;
pub const BURST_DPS_PADDING: f32 = 5.0;
pub const BURST_DPS_FALLBACK_Y_OFFSET: f32 = 20.0;
pub const DPS_FORMATTING_THRESHOLD: f32 = 1000.0;

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

fn progress(elapsed: u64, duration: u64) -> f32 {
    if duration == 0 {
        1.0
    } else {
        elapsed as f32 / duration as f32
    }
}

/// Per-frame animation values for one health bar. Percentages are
/// fractions of max health.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBarAnimationState {
    pub health_bar_fade_alpha: f32,
    pub death_burst_alpha: f32,
    pub death_burst_width: f32,
    pub damage_accumulator_alpha: f32,
    pub damage_accumulator_start_percent: f32,
    pub damage_accumulator_end_percent: f32,
    pub damage_number_to_display: f32,
    pub damage_number_alpha: f32,
    pub damage_number_y_offset: f32,
    pub heal_overlay_start_percent: f32,
    pub heal_overlay_end_percent: f32,
    pub heal_overlay_alpha: f32,
    pub heal_flash_alpha: f32,
    pub damage_flash_start_percent: f32,
    pub damage_flash_alpha: f32,
    pub animated_barrier: f32,
}

impl Default for HealthBarAnimationState {
    fn default() -> Self {
        Self {
            health_bar_fade_alpha: 1.0,
            death_burst_alpha: 0.0,
            death_burst_width: 0.0,
            damage_accumulator_alpha: 0.0,
            damage_accumulator_start_percent: 0.0,
            damage_accumulator_end_percent: 0.0,
            damage_number_to_display: 0.0,
            damage_number_alpha: 0.0,
            damage_number_y_offset: 0.0,
            heal_overlay_start_percent: 0.0,
            heal_overlay_end_percent: 0.0,
            heal_overlay_alpha: 0.0,
            heal_flash_alpha: 0.0,
            damage_flash_start_percent: 0.0,
            damage_flash_alpha: 0.0,
            animated_barrier: 0.0,
        }
    }
}

impl HealthBarAnimationState {
    /// Derives every animation value from the entity's health and its
    /// combat history at `now`.
    pub fn populate(
        entity: &RenderableEntity,
        state: Option<&EntityCombatState>,
        now: u64,
    ) -> Self {
        let mut anim = Self {
            animated_barrier: entity.barrier,
            ..Self::default()
        };
        let Some(state) = state else {
            return anim;
        };

        anim.animate_overall_fade(state, now);
        if anim.health_bar_fade_alpha <= 0.0 {
            return anim;
        }
        anim.animate_death_burst(state, now);
        anim.animate_damage_accumulator(entity, state, now);
        if state.death_timestamp == 0 && entity.max_health > 0.0 {
            anim.animate_heal_overlay(entity, state, now);
            anim.animate_damage_flash(entity, state, now);
            anim.animate_heal_flash(state, now);
        }
        anim.animate_barrier(entity, state, now);
        anim
    }

    fn animate_overall_fade(&mut self, state: &EntityCombatState, now: u64) {
        if state.death_timestamp == 0 {
            return;
        }
        let since_death = now.saturating_sub(state.death_timestamp);
        if since_death <= DEATH_BURST_DURATION_MS {
            return;
        }
        let into_fade = since_death - DEATH_BURST_DURATION_MS;
        self.health_bar_fade_alpha = if into_fade < DEATH_FINAL_FADE_DURATION_MS {
            1.0 - progress(into_fade, DEATH_FINAL_FADE_DURATION_MS)
        } else {
            0.0
        };
    }

    fn animate_death_burst(&mut self, state: &EntityCombatState, now: u64) {
        if state.death_timestamp == 0 {
            return;
        }
        let since_death = now.saturating_sub(state.death_timestamp);
        if since_death < DEATH_BURST_DURATION_MS {
            let remaining = 1.0 - ease_out_cubic(progress(since_death, DEATH_BURST_DURATION_MS));
            self.death_burst_alpha = remaining;
            self.death_burst_width = remaining;
        }
    }

    fn animate_damage_accumulator(&mut self, entity: &RenderableEntity, state: &EntityCombatState, now: u64) {
        if state.accumulated_damage <= 0.0 {
            return;
        }
        self.damage_accumulator_alpha = 1.0;
        if state.flush_animation_start_time > 0 {
            let elapsed = now.saturating_sub(state.flush_animation_start_time);
            if elapsed < DAMAGE_ACCUMULATOR_FADE_MS {
                let eased = ease_out_cubic(progress(elapsed, DAMAGE_ACCUMULATOR_FADE_MS));
                self.damage_accumulator_alpha = 1.0 - eased;
                self.damage_number_to_display = state.damage_to_display;
                self.damage_number_alpha = 1.0 - eased;
                self.damage_number_y_offset = eased * DAMAGE_NUMBER_MAX_DRIFT;
            } else {
                self.damage_accumulator_alpha = 0.0;
                self.damage_number_alpha = 0.0;
            }
        }
        if entity.max_health > 0.0 {
            self.damage_accumulator_start_percent = entity.health.max(0.0) / entity.max_health;
            let end = state.accumulator_end_percent.unwrap_or(
                (entity.health.max(0.0) + state.accumulated_damage) / entity.max_health,
            );
            self.damage_accumulator_end_percent = end.min(1.0);
        }
    }

    fn animate_heal_overlay(&mut self, entity: &RenderableEntity, state: &EntityCombatState, now: u64) {
        if state.last_heal_timestamp == 0 {
            return;
        }
        let elapsed = now.saturating_sub(state.last_heal_timestamp);
        if elapsed >= HEAL_OVERLAY_DURATION_MS {
            return;
        }
        self.heal_overlay_start_percent = state.heal_start_health / entity.max_health;
        self.heal_overlay_end_percent = entity.health / entity.max_health;
        let fade_start = HEAL_OVERLAY_DURATION_MS - HEAL_OVERLAY_FADE_DURATION_MS;
        self.heal_overlay_alpha = if elapsed > fade_start {
            1.0 - ease_out_cubic(progress(elapsed - fade_start, HEAL_OVERLAY_FADE_DURATION_MS))
        } else {
            1.0
        };
    }

    fn animate_damage_flash(&mut self, entity: &RenderableEntity, state: &EntityCombatState, now: u64) {
        if state.last_hit_timestamp == 0 {
            return;
        }
        let elapsed = now.saturating_sub(state.last_hit_timestamp);
        if elapsed >= DAMAGE_FLASH_TOTAL_DURATION_MS {
            return;
        }
        self.damage_flash_alpha = if elapsed > DAMAGE_FLASH_HOLD_MS {
            1.0 - progress(elapsed - DAMAGE_FLASH_HOLD_MS, DAMAGE_FLASH_FADE_MS)
        } else {
            1.0
        };
        self.damage_flash_start_percent =
            (entity.health + state.last_damage_taken) / entity.max_health;
    }

    fn animate_heal_flash(&mut self, state: &EntityCombatState, now: u64) {
        if state.last_heal_flash_timestamp == 0 {
            return;
        }
        let elapsed = now.saturating_sub(state.last_heal_flash_timestamp);
        if elapsed < HEAL_FLASH_DURATION_MS {
            self.heal_flash_alpha = 1.0 - ease_out_cubic(progress(elapsed, HEAL_FLASH_DURATION_MS));
        }
    }

    fn animate_barrier(&mut self, entity: &RenderableEntity, state: &EntityCombatState, now: u64) {
        if state.last_barrier_change_timestamp == 0 {
            return;
        }
        let elapsed = now.saturating_sub(state.last_barrier_change_timestamp);
        if elapsed < BARRIER_ANIM_DURATION_MS {
            let eased = ease_out_cubic(progress(elapsed, BARRIER_ANIM_DURATION_MS));
            self.animated_barrier = state.barrier_on_last_change
                + (entity.barrier - state.barrier_on_last_change) * eased;
        }
    }
}

/// Everything needed to draw one standalone health bar.
#[derive(Debug, Clone, Copy)]
pub struct HealthBar<'a> {
    pub min: Vec2,
    pub width: f32,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
    /// Entity colour before fading; only its RGB is used for the fill.
    pub color: Color,
    /// Entity alpha after distance fade and global opacity.
    pub final_alpha: f32,
    pub hostile: bool,
    pub show_percentage: bool,
    pub font_size: f32,
    pub appearance: &'a AppearanceSettings,
}

impl HealthBar<'_> {
    pub fn max(&self) -> Vec2 {
        self.min + Vec2::new(self.width, self.height)
    }

    fn health_percent(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    fn span(&self, start: f32, end: f32) -> (Vec2, Vec2) {
        (
            Vec2::new(self.min.x + self.width * start, self.min.y),
            Vec2::new(self.min.x + self.width * end, self.min.y + self.height),
        )
    }
}

fn fill_rect<D: DrawList + ?Sized>(draw: &mut D, min: Vec2, max: Vec2, color: Color) {
    if min.x < max.x && min.y < max.y && !color.is_transparent() {
        draw.add_rect_filled(min, max, color, BAR_ROUNDING);
    }
}

pub fn health_percent_text(health_percent: f32) -> String {
    format!("{:.0}%", health_percent * 100.0)
}

fn health_percent_element(bar: &HealthBar<'_>, fade: f32) -> TextElement {
    let anchor = Vec2::new(bar.max().x + HEALTH_PERCENT_PADDING, bar.min.y + bar.height / 2.0);
    TextElement::new(health_percent_text(bar.health_percent()), anchor, TextAnchor::Center)
        .with_alignment(TextAlignment::Left)
        .with_style(TextStyle {
            font_size: bar.font_size * STATUS_TEXT_FONT_MULTIPLIER,
            text_color: palette::WHITE,
            enable_shadow: true,
            enable_background: false,
            fade_alpha: fade,
            ..TextStyle::default()
        })
}

/// Width the percentage label takes to the right of `bar`, zero when it
/// is not shown.
pub fn health_percent_width<D: DrawList + ?Sized>(draw: &D, bar: &HealthBar<'_>) -> f32 {
    if !bar.show_percentage || bar.max_health <= 0.0 {
        return 0.0;
    }
    TextRenderer::measure(draw, &health_percent_element(bar, 1.0)).x
}

/// Draws the bar and its overlays. Returns the opacity the bar was drawn
/// at, zero when nothing was drawn.
pub fn draw_health_bar<D: DrawList + ?Sized>(
    draw: &mut D,
    bar: &HealthBar<'_>,
    anim: &HealthBarAnimationState,
) -> f32 {
    let fade = bar.final_alpha * anim.health_bar_fade_alpha;
    if fade <= 0.0 || bar.width <= 0.0 || bar.height <= 0.0 {
        return 0.0;
    }
    let bar_max = bar.max();
    draw.add_rect_filled(
        bar.min,
        bar_max,
        palette::BLACK.with_scaled_alpha(BAR_BACKGROUND_ALPHA, fade),
        BAR_ROUNDING,
    );

    if bar.health > 0.0 {
        draw_alive(draw, bar, anim, fade);
    } else if anim.death_burst_alpha > 0.0 {
        let burst_width = bar.width * anim.death_burst_width;
        let center_x = bar.min.x + bar.width / 2.0;
        fill_rect(
            draw,
            Vec2::new(center_x - burst_width / 2.0, bar.min.y),
            Vec2::new(center_x + burst_width / 2.0, bar_max.y),
            palette::DEATH_BURST.apply_alpha(anim.death_burst_alpha * fade),
        );
    }

    let outer = palette::BLACK.with_scaled_alpha(BAR_BORDER_ALPHA, fade);
    if bar.hostile {
        draw.add_rect(bar.min, bar_max, outer, BAR_ROUNDING, BAR_BORDER_THICKNESS);
    }
    draw.add_rect(
        bar.min - Vec2::splat(BAR_OUTER_STROKE_OUTSET),
        bar_max + Vec2::splat(BAR_OUTER_STROKE_OUTSET),
        outer,
        BAR_ROUNDING + BAR_OUTER_STROKE_OUTSET,
        1.0,
    );
    fade
}

fn draw_alive<D: DrawList + ?Sized>(
    draw: &mut D,
    bar: &HealthBar<'_>,
    anim: &HealthBarAnimationState,
    fade: f32,
) {
    let health_percent = bar.health_percent();

    let (min, max) = bar.span(0.0, health_percent.clamp(0.0, 1.0));
    fill_rect(draw, min, max, bar.color.with_scaled_alpha(BAR_FILL_ALPHA, fade));

    if anim.heal_overlay_end_percent > anim.heal_overlay_start_percent {
        let (min, max) = bar.span(anim.heal_overlay_start_percent, anim.heal_overlay_end_percent);
        if anim.heal_overlay_alpha > 0.0 {
            fill_rect(draw, min, max, palette::HEAL_OVERLAY.apply_alpha(anim.heal_overlay_alpha * fade));
        }
        if anim.heal_flash_alpha > 0.0 {
            fill_rect(draw, min, max, palette::HEAL_FLASH.apply_alpha(anim.heal_flash_alpha * fade));
        }
    }

    if anim.damage_accumulator_alpha > 0.0 && anim.damage_accumulator_end_percent > health_percent {
        let (min, max) = bar.span(health_percent, anim.damage_accumulator_end_percent.min(1.0));
        fill_rect(
            draw,
            min,
            max,
            palette::DAMAGE_ACCUMULATOR.apply_alpha(anim.damage_accumulator_alpha * fade),
        );
    }

    let flash_start = anim.damage_flash_start_percent.min(1.0);
    if anim.damage_flash_alpha > 0.0 && flash_start > health_percent {
        let (min, max) = bar.span(health_percent, flash_start);
        fill_rect(draw, min, max, palette::DAMAGE_FLASH.apply_alpha(anim.damage_flash_alpha * fade));
    }

    draw_barrier(draw, bar, anim.animated_barrier, fade);

    if bar.show_percentage && bar.max_health > 0.0 {
        TextRenderer::render(draw, &health_percent_element(bar, fade));
    }
}

fn draw_barrier<D: DrawList + ?Sized>(draw: &mut D, bar: &HealthBar<'_>, barrier: f32, fade: f32) {
    if bar.max_health <= 0.0 || barrier <= 0.0 {
        return;
    }
    let health_percent = bar.health_percent();
    let barrier_percent = barrier / bar.max_health;
    let color = palette::BARRIER.apply_alpha(fade);

    if health_percent < 1.0 {
        let end = (health_percent + barrier_percent).min(1.0);
        let (min, max) = bar.span(health_percent, end);
        fill_rect(draw, min, max, color);
    }

    let overflow = health_percent + barrier_percent - 1.0;
    if overflow > 0.0 {
        let bar_max = bar.max();
        let overflow_width = bar.width * overflow.min(1.0);
        let min = Vec2::new(bar_max.x - overflow_width, bar.min.y);
        fill_rect(draw, min, bar_max, color);
        draw.add_rect(
            min,
            bar_max,
            palette::BARRIER_SEPARATOR.apply_alpha(fade),
            BAR_ROUNDING,
            BAR_BORDER_THICKNESS,
        );
    }
}

/// Background plus a single fill, sized like the health bar.
pub fn draw_energy_bar<D: DrawList + ?Sized>(
    draw: &mut D,
    min: Vec2,
    size: Vec2,
    energy_percent: f32,
    fade: f32,
) {
    if !(0.0..=1.0).contains(&energy_percent) || fade <= 0.0 {
        return;
    }
    let max = min + size;
    draw.add_rect_filled(
        min,
        max,
        palette::BLACK.with_scaled_alpha(BAR_BACKGROUND_ALPHA, fade),
        BAR_ROUNDING,
    );
    fill_rect(
        draw,
        min,
        Vec2::new(min.x + size.x * energy_percent, max.y),
        palette::ENERGY_BAR.apply_alpha(fade),
    );
}

pub fn format_burst_dps(dps: f32) -> String {
    if dps >= DPS_FORMATTING_THRESHOLD {
        format!("{:.1}k", dps / DPS_FORMATTING_THRESHOLD)
    } else {
        format!("{dps:.0}")
    }
}

/// Flushed burst total drifting up from `anchor` (top-centre of the bar,
/// or the box centre when there is no bar).
pub fn draw_damage_number<D: DrawList + ?Sized>(
    draw: &mut D,
    anchor: Vec2,
    anim: &HealthBarAnimationState,
    font_size: f32,
    appearance: &AppearanceSettings,
) {
    if anim.damage_number_alpha <= 0.0 || anim.damage_number_to_display <= 0.0 {
        return;
    }
    let position = Vec2::new(anchor.x, anchor.y - anim.damage_number_y_offset);
    let font_size = font_size * damage_number_multiplier(anim.damage_number_to_display);
    let element = TextElement::new(
        format!("{:.0}", anim.damage_number_to_display),
        position,
        TextAnchor::Above,
    )
    .with_style(TextStyle::damage_number(appearance, font_size, anim.damage_number_alpha));
    TextRenderer::render(draw, &element);
}

/// Running burst DPS, left-aligned at `anchor` and vertically centred on
/// it.
pub fn draw_burst_dps<D: DrawList + ?Sized>(
    draw: &mut D,
    anchor: Vec2,
    dps: f32,
    font_size: f32,
    fade: f32,
    alignment: TextAlignment,
    appearance: &AppearanceSettings,
) {
    if dps <= 0.0 || fade <= 0.0 {
        return;
    }
    let element = TextElement::new(format_burst_dps(dps), anchor, TextAnchor::Center)
        .with_alignment(alignment)
        .with_style(TextStyle {
            font_size: font_size * STATUS_TEXT_FONT_MULTIPLIER,
            text_color: palette::BURST_DPS_TEXT,
            enable_shadow: appearance.enable_text_shadows,
            enable_background: false,
            fade_alpha: fade,
            ..TextStyle::default()
        });
    TextRenderer::render(draw, &element);
}
