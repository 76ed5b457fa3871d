//! Multi-line, multi-colour text labels.
//!
//! Measuring and drawing share [`TextRenderer::layout`], so the size the
//! layout stage reserves is exactly the size that gets drawn.

use glam::Vec2;

use crate::color::{Color, palette};
use crate::config::AppearanceSettings;
use crate::draw::DrawList;

pub const TEXT_ANCHOR_GAP: f32 = 5.0;
pub const DEFAULT_FONT_SIZE: f32 = 14.0;
pub const DEFAULT_LINE_SPACING: f32 = 2.0;
pub const DEFAULT_SHADOW_OFFSET: Vec2 = Vec2::new(1.0, 1.0);
pub const DEFAULT_SHADOW_ALPHA: u8 = 128;
pub const DEFAULT_BACKGROUND_PADDING: Vec2 = Vec2::new(4.0, 2.0);
pub const DEFAULT_BACKGROUND_ALPHA: u8 = 180;
pub const DEFAULT_BACKGROUND_ROUNDING: f32 = 3.0;
pub const DEFAULT_BORDER_COLOR: Color = Color::rgba(255, 255, 255, 128);
pub const DEFAULT_BORDER_THICKNESS: f32 = 1.0;

const LABEL_TEXT_ALPHA: u8 = 220;
const LABEL_SHADOW_ALPHA: u8 = 180;
const LABEL_BACKGROUND_ALPHA: u8 = 60;
const SUMMARY_BACKGROUND_ALPHA: u8 = 70;

#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub color: Color,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, palette::DEFAULT_TEXT)
    }
}

pub type TextLine = Vec<TextSegment>;

/// Where a text block sits relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextAnchor {
    Above,
    Below,
    Center,
    /// Top edge at `anchor + offset`.
    Custom(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub text_color: Color,
    /// Use each segment's colour instead of `text_color`.
    pub use_custom_text_color: bool,
    pub enable_shadow: bool,
    pub shadow_offset: Vec2,
    pub shadow_alpha: u8,
    pub enable_background: bool,
    pub background_padding: Vec2,
    pub background_alpha: u8,
    pub background_rounding: f32,
    pub enable_border: bool,
    pub border_color: Color,
    pub border_thickness: f32,
    pub fade_alpha: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            text_color: palette::DEFAULT_TEXT,
            use_custom_text_color: false,
            enable_shadow: true,
            shadow_offset: DEFAULT_SHADOW_OFFSET,
            shadow_alpha: DEFAULT_SHADOW_ALPHA,
            enable_background: true,
            background_padding: DEFAULT_BACKGROUND_PADDING,
            background_alpha: DEFAULT_BACKGROUND_ALPHA,
            background_rounding: DEFAULT_BACKGROUND_ROUNDING,
            enable_border: false,
            border_color: DEFAULT_BORDER_COLOR,
            border_thickness: DEFAULT_BORDER_THICKNESS,
            fade_alpha: 1.0,
        }
    }
}

impl TextStyle {
    fn label(appearance: &AppearanceSettings, font_size: f32, fade_alpha: f32) -> Self {
        Self {
            font_size,
            fade_alpha,
            enable_shadow: appearance.enable_text_shadows,
            shadow_alpha: LABEL_SHADOW_ALPHA,
            enable_background: appearance.enable_text_backgrounds,
            background_alpha: LABEL_BACKGROUND_ALPHA,
            ..Self::default()
        }
    }

    /// Player names take the entity colour at a fixed text alpha.
    pub fn player_name(
        appearance: &AppearanceSettings,
        entity_color: Color,
        font_size: f32,
        fade_alpha: f32,
    ) -> Self {
        Self {
            text_color: entity_color.with_alpha(LABEL_TEXT_ALPHA),
            ..Self::label(appearance, font_size, fade_alpha)
        }
    }

    pub fn distance(appearance: &AppearanceSettings, font_size: f32, fade_alpha: f32) -> Self {
        Self {
            text_color: palette::WHITE.with_alpha(LABEL_TEXT_ALPHA),
            background_padding: Vec2::new(3.0, 1.0),
            background_rounding: 2.0,
            ..Self::label(appearance, font_size, fade_alpha)
        }
    }

    pub fn details(appearance: &AppearanceSettings, font_size: f32, fade_alpha: f32) -> Self {
        Self {
            use_custom_text_color: true,
            background_rounding: 2.0,
            ..Self::label(appearance, font_size, fade_alpha)
        }
    }

    pub fn summary(appearance: &AppearanceSettings, font_size: f32, fade_alpha: f32) -> Self {
        Self {
            text_color: palette::SUMMARY_TEXT.with_alpha(LABEL_TEXT_ALPHA),
            use_custom_text_color: true,
            background_padding: Vec2::new(5.0, 3.0),
            background_alpha: SUMMARY_BACKGROUND_ALPHA,
            ..Self::label(appearance, font_size, fade_alpha)
        }
    }

    /// Bare white number with an optional shadow.
    pub fn damage_number(appearance: &AppearanceSettings, font_size: f32, fade_alpha: f32) -> Self {
        Self {
            font_size,
            fade_alpha,
            text_color: palette::DAMAGE_NUMBER,
            enable_shadow: appearance.enable_text_shadows,
            enable_background: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub lines: Vec<TextLine>,
    pub anchor: Vec2,
    pub positioning: TextAnchor,
    pub alignment: TextAlignment,
    pub style: TextStyle,
    pub line_spacing: f32,
}

impl TextElement {
    pub fn new(text: impl Into<String>, anchor: Vec2, positioning: TextAnchor) -> Self {
        Self::from_lines(vec![vec![TextSegment::plain(text)]], anchor, positioning)
    }

    pub fn from_segments(segments: TextLine, anchor: Vec2, positioning: TextAnchor) -> Self {
        Self::from_lines(vec![segments], anchor, positioning)
    }

    pub fn from_lines(lines: Vec<TextLine>, anchor: Vec2, positioning: TextAnchor) -> Self {
        Self {
            lines,
            anchor,
            positioning,
            alignment: TextAlignment::Center,
            style: TextStyle::default(),
            line_spacing: DEFAULT_LINE_SPACING,
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_fade_alpha(mut self, fade_alpha: f32) -> Self {
        self.style.fade_alpha = fade_alpha;
        self
    }

    pub fn with_line_spacing(mut self, spacing: f32) -> Self {
        self.line_spacing = spacing;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines
            .iter()
            .all(|line| line.iter().all(|segment| segment.text.is_empty()))
    }
}

/// Placement of one line: top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLayout {
    pub position: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    pub lines: Vec<LineLayout>,
    /// Widest line by the full block height, line spacing included.
    pub size: Vec2,
}

pub struct TextRenderer;

impl TextRenderer {
    pub fn layout<D: DrawList + ?Sized>(draw: &D, element: &TextElement) -> TextLayout {
        if element.lines.is_empty() {
            return TextLayout::default();
        }
        let font_size = element.style.font_size;
        let line_height = draw.measure_text(font_size, " ").y;
        let widths: Vec<f32> = element
            .lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|segment| draw.measure_text(font_size, &segment.text).x)
                    .sum()
            })
            .collect();
        let count = element.lines.len() as f32;
        let total_height = line_height * count + element.line_spacing * (count - 1.0);
        let max_width = widths.iter().copied().fold(0.0, f32::max);

        let top = match element.positioning {
            TextAnchor::Above => element.anchor.y - total_height - TEXT_ANCHOR_GAP,
            TextAnchor::Below => element.anchor.y + TEXT_ANCHOR_GAP,
            TextAnchor::Center => element.anchor.y - total_height / 2.0,
            TextAnchor::Custom(offset) => element.anchor.y + offset.y,
        };
        let anchor_x = match element.positioning {
            TextAnchor::Custom(offset) => element.anchor.x + offset.x,
            _ => element.anchor.x,
        };

        let lines = widths
            .iter()
            .enumerate()
            .map(|(index, &width)| {
                let x = match element.alignment {
                    TextAlignment::Left => anchor_x,
                    TextAlignment::Center => anchor_x - width / 2.0,
                    TextAlignment::Right => anchor_x - width,
                };
                LineLayout {
                    position: Vec2::new(x, top + index as f32 * (line_height + element.line_spacing)),
                    size: Vec2::new(width, line_height),
                }
            })
            .collect();
        TextLayout {
            lines,
            size: Vec2::new(max_width, total_height),
        }
    }

    pub fn measure<D: DrawList + ?Sized>(draw: &D, element: &TextElement) -> Vec2 {
        Self::layout(draw, element).size
    }

    pub fn render<D: DrawList + ?Sized>(draw: &mut D, element: &TextElement) -> TextLayout {
        let layout = Self::layout(&*draw, element);
        let style = &element.style;
        if style.fade_alpha <= 0.0 {
            return layout;
        }
        for (line, placement) in element.lines.iter().zip(&layout.lines) {
            let pad_min = placement.position - style.background_padding;
            let pad_max = placement.position + placement.size + style.background_padding;
            if style.enable_background {
                let background = palette::BLACK.with_scaled_alpha(style.background_alpha, style.fade_alpha);
                draw.add_rect_filled(pad_min, pad_max, background, style.background_rounding);
            }
            if style.enable_border {
                draw.add_rect(
                    pad_min,
                    pad_max,
                    style.border_color.apply_alpha(style.fade_alpha),
                    style.background_rounding,
                    style.border_thickness,
                );
            }
            Self::render_line(draw, line, placement.position, style);
        }
        layout
    }

    fn render_line<D: DrawList + ?Sized>(draw: &mut D, line: &[TextSegment], origin: Vec2, style: &TextStyle) {
        let mut cursor = origin;
        for segment in line {
            if segment.text.is_empty() {
                continue;
            }
            let width = draw.measure_text(style.font_size, &segment.text).x;
            if style.enable_shadow {
                let shadow = palette::BLACK.with_scaled_alpha(style.shadow_alpha, style.fade_alpha);
                draw.add_text(cursor + style.shadow_offset, style.font_size, shadow, &segment.text);
            }
            let color = if style.use_custom_text_color {
                segment.color
            } else {
                style.text_color
            };
            draw.add_text(cursor, style.font_size, color.apply_alpha(style.fade_alpha), &segment.text);
            cursor.x += width;
        }
    }
}
