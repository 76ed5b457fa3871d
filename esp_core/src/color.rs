use serde::{Deserialize, Serialize};

/// 8-bit RGBA colour as handed to the draw-list sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Scales the alpha channel by `multiplier`, clamped to `[0, 1]`.
    pub fn apply_alpha(self, multiplier: f32) -> Self {
        let multiplier = if multiplier.is_finite() {
            multiplier.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let a = (self.a as f32 * multiplier + 0.5) as u8;
        self.with_alpha(a)
    }

    /// Replaces the alpha with `base_alpha` scaled by `multiplier`.
    pub fn with_scaled_alpha(self, base_alpha: u8, multiplier: f32) -> Self {
        self.with_alpha(base_alpha).apply_alpha(multiplier)
    }

    pub fn alpha_fraction(self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    /// Packed as `0xAABBGGRR`, the layout immediate-mode draw lists use.
    pub fn to_packed(self) -> u32 {
        (self.a as u32) << 24 | (self.b as u32) << 16 | (self.g as u32) << 8 | self.r as u32
    }
}

pub mod palette {
    use super::Color;

    pub const PLAYER: Color = Color::rgba(30, 144, 255, 230);
    pub const HOSTILE: Color = Color::rgba(255, 80, 80, 210);
    pub const FRIENDLY: Color = Color::rgba(100, 255, 100, 210);
    pub const NEUTRAL: Color = Color::rgba(127, 255, 0, 210);
    pub const INDIFFERENT: Color = Color::rgba(240, 240, 240, 210);
    pub const UNKNOWN: Color = Color::rgba(255, 0, 255, 210);
    pub const GADGET: Color = Color::rgba(255, 165, 80, 200);
    pub const ENERGY_BAR: Color = Color::rgba(0, 120, 255, 220);
    pub const DEFAULT_TEXT: Color = Color::rgba(255, 255, 255, 255);
    pub const SUMMARY_TEXT: Color = Color::rgba(200, 210, 255, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const HEAL_OVERLAY: Color = Color::rgba(120, 255, 160, 200);
    pub const HEAL_FLASH: Color = Color::rgba(220, 255, 255, 255);
    pub const DAMAGE_ACCUMULATOR: Color = Color::rgba(255, 170, 60, 180);
    pub const DAMAGE_FLASH: Color = Color::rgba(255, 255, 255, 255);
    pub const BARRIER: Color = Color::rgba(255, 230, 180, 240);
    pub const BARRIER_SEPARATOR: Color = Color::rgba(255, 255, 255, 210);
    pub const DEATH_BURST: Color = Color::rgba(200, 255, 255, 255);
    pub const BURST_DPS_TEXT: Color = Color::rgba(255, 200, 50, 255);
    pub const DAMAGE_NUMBER: Color = Color::rgba(255, 255, 255, 255);

    pub const RARITY_JUNK: Color = Color::rgb(170, 170, 170);
    pub const RARITY_COMMON: Color = Color::rgb(255, 255, 255);
    pub const RARITY_FINE: Color = Color::rgb(98, 164, 218);
    pub const RARITY_MASTERWORK: Color = Color::rgb(26, 147, 6);
    pub const RARITY_RARE: Color = Color::rgb(252, 208, 11);
    pub const RARITY_EXOTIC: Color = Color::rgb(255, 164, 5);
    pub const RARITY_ASCENDED: Color = Color::rgb(251, 62, 141);
    pub const RARITY_LEGENDARY: Color = Color::rgb(139, 79, 219);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_alpha_rounds_and_clamps() {
        let color = Color::rgba(10, 20, 30, 200);
        assert_eq!(color.apply_alpha(0.5).a, 100);
        assert_eq!(color.apply_alpha(0.01).a, 2);
        assert_eq!(color.apply_alpha(2.0).a, 200);
        assert_eq!(color.apply_alpha(-1.0).a, 0);
        assert_eq!(color.apply_alpha(f32::NAN).a, 0);
        assert_eq!(color.apply_alpha(0.5).r, 10);
    }

    #[test]
    fn packs_in_draw_list_order() {
        assert_eq!(Color::rgba(0x11, 0x22, 0x33, 0x44).to_packed(), 0x4433_2211);
    }
}
