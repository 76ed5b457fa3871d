//! The draw-list sink the overlay renders into, plus a recording sink for
//! headless hosts and tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use fontdue::{Font, FontSettings};
use glam::Vec2;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::color::Color;

/// Immediate-mode sink in pixel coordinates, Y down.
pub trait DrawList {
    fn add_line(&mut self, from: Vec2, to: Vec2, color: Color, thickness: f32);
    fn add_rect(&mut self, min: Vec2, max: Vec2, color: Color, rounding: f32, thickness: f32);
    fn add_rect_filled(&mut self, min: Vec2, max: Vec2, color: Color, rounding: f32);
    fn add_circle(&mut self, center: Vec2, radius: f32, color: Color, thickness: f32);
    fn add_circle_filled(&mut self, center: Vec2, radius: f32, color: Color);
    fn add_text(&mut self, position: Vec2, font_size: f32, color: Color, text: &str);
    /// Size of `text` rendered at `font_size`.
    fn measure_text(&self, font_size: f32, text: &str) -> Vec2;
}

static NEXT_FONT_ID: AtomicUsize = AtomicUsize::new(1);
/// Advances at `ADVANCE_REFERENCE_PX`, keyed by font id and glyph.
static ADVANCE_CACHE: Lazy<Mutex<HashMap<(usize, char), f32>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Glyph advances are linear in pixel size, so one size per glyph is cached.
const ADVANCE_REFERENCE_PX: f32 = 64.0;

/// Average glyph advance used when no font is loaded, as a fraction of the
/// font size.
const FALLBACK_ADVANCE_RATIO: f32 = 0.5;

/// Glyph metrics behind `measure_text`.
#[derive(Clone, Default)]
pub enum TextMetrics {
    /// Every glyph advances by half the font size; lines are one font size
    /// tall.
    #[default]
    Fixed,
    Font { id: usize, font: Arc<Font> },
}

impl std::fmt::Debug for TextMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextMetrics::Fixed => f.write_str("TextMetrics::Fixed"),
            TextMetrics::Font { id, .. } => write!(f, "TextMetrics::Font({id})"),
        }
    }
}

impl TextMetrics {
    pub fn from_font_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|err| anyhow!("parsing font: {err}"))?;
        Ok(TextMetrics::Font {
            id: NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed),
            font: Arc::new(font),
        })
    }

    pub fn from_font_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        Self::from_font_bytes(&bytes).with_context(|| format!("loading font {}", path.display()))
    }

    fn advance(&self, ch: char, font_size: f32) -> f32 {
        match self {
            TextMetrics::Fixed => font_size * FALLBACK_ADVANCE_RATIO,
            TextMetrics::Font { id, font } => {
                scaled_advance(&ADVANCE_CACHE, *id, ch, font_size, |ch, px| {
                    font.metrics(ch, px).advance_width
                })
            }
        }
    }

    fn line_height(&self, font_size: f32) -> f32 {
        match self {
            TextMetrics::Fixed => font_size,
            TextMetrics::Font { font, .. } => font
                .horizontal_line_metrics(font_size)
                .map(|metrics| metrics.new_line_size)
                .unwrap_or(font_size),
        }
    }

    /// Width of the widest line and the height of all lines.
    pub fn measure(&self, font_size: f32, text: &str) -> Vec2 {
        if text.is_empty() || font_size <= 0.0 {
            return Vec2::ZERO;
        }
        let mut width: f32 = 0.0;
        let mut lines = 0;
        for line in text.split('\n') {
            let line_width: f32 = line
                .chars()
                .filter(|ch| *ch != '\r')
                .map(|ch| self.advance(ch, font_size))
                .sum();
            width = width.max(line_width);
            lines += 1;
        }
        Vec2::new(width, self.line_height(font_size) * lines as f32)
    }
}

fn scaled_advance<F>(
    cache: &Mutex<HashMap<(usize, char), f32>>,
    font_id: usize,
    ch: char,
    font_size: f32,
    measure: F,
) -> f32
where
    F: FnOnce(char, f32) -> f32,
{
    let key = (font_id, ch);
    let cached = cache.lock().ok().and_then(|cache| cache.get(&key).copied());
    let reference = match cached {
        Some(advance) => advance,
        None => {
            let advance = measure(ch, ADVANCE_REFERENCE_PX);
            if let Ok(mut cache) = cache.lock() {
                cache.insert(key, advance);
            }
            advance
        }
    };
    reference * font_size / ADVANCE_REFERENCE_PX
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Line {
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
        thickness: f32,
    },
    Rect {
        min: [f32; 2],
        max: [f32; 2],
        color: Color,
        rounding: f32,
        thickness: f32,
    },
    RectFilled {
        min: [f32; 2],
        max: [f32; 2],
        color: Color,
        rounding: f32,
    },
    Circle {
        center: [f32; 2],
        radius: f32,
        color: Color,
        thickness: f32,
    },
    CircleFilled {
        center: [f32; 2],
        radius: f32,
        color: Color,
    },
    Text {
        position: [f32; 2],
        font_size: f32,
        color: Color,
        text: String,
    },
}

impl DrawCommand {
    pub fn kind_label(&self) -> &'static str {
        match self {
            DrawCommand::Line { .. } => "line",
            DrawCommand::Rect { .. } => "rect",
            DrawCommand::RectFilled { .. } => "rect_filled",
            DrawCommand::Circle { .. } => "circle",
            DrawCommand::CircleFilled { .. } => "circle_filled",
            DrawCommand::Text { .. } => "text",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            DrawCommand::Line { color, .. }
            | DrawCommand::Rect { color, .. }
            | DrawCommand::RectFilled { color, .. }
            | DrawCommand::Circle { color, .. }
            | DrawCommand::CircleFilled { color, .. }
            | DrawCommand::Text { color, .. } => *color,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DrawCommand::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Draw list that keeps every command for inspection.
#[derive(Debug, Default)]
pub struct RecordingDrawList {
    commands: Vec<DrawCommand>,
    metrics: TextMetrics,
}

impl RecordingDrawList {
    pub fn new(metrics: TextMetrics) -> Self {
        Self {
            commands: Vec::new(),
            metrics,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(DrawCommand::text)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.commands
            .iter()
            .filter(|command| command.kind_label() == kind)
            .count()
    }
}

impl DrawList for RecordingDrawList {
    fn add_line(&mut self, from: Vec2, to: Vec2, color: Color, thickness: f32) {
        self.commands.push(DrawCommand::Line {
            from: from.to_array(),
            to: to.to_array(),
            color,
            thickness,
        });
    }

    fn add_rect(&mut self, min: Vec2, max: Vec2, color: Color, rounding: f32, thickness: f32) {
        self.commands.push(DrawCommand::Rect {
            min: min.to_array(),
            max: max.to_array(),
            color,
            rounding,
            thickness,
        });
    }

    fn add_rect_filled(&mut self, min: Vec2, max: Vec2, color: Color, rounding: f32) {
        self.commands.push(DrawCommand::RectFilled {
            min: min.to_array(),
            max: max.to_array(),
            color,
            rounding,
        });
    }

    fn add_circle(&mut self, center: Vec2, radius: f32, color: Color, thickness: f32) {
        self.commands.push(DrawCommand::Circle {
            center: center.to_array(),
            radius,
            color,
            thickness,
        });
    }

    fn add_circle_filled(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::CircleFilled {
            center: center.to_array(),
            radius,
            color,
        });
    }

    fn add_text(&mut self, position: Vec2, font_size: f32, color: Color, text: &str) {
        self.commands.push(DrawCommand::Text {
            position: position.to_array(),
            font_size,
            color,
            text: text.to_string(),
        });
    }

    fn measure_text(&self, font_size: f32, text: &str) -> Vec2 {
        self.metrics.measure(font_size, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_metrics_scale_with_font_size() {
        let metrics = TextMetrics::Fixed;
        assert_eq!(metrics.measure(16.0, "abcd"), Vec2::new(32.0, 16.0));
        assert_eq!(metrics.measure(10.0, "ab\nabcd"), Vec2::new(20.0, 20.0));
        assert_eq!(metrics.measure(10.0, ""), Vec2::ZERO);
    }

    #[test]
    fn advance_cache_holds_one_entry_per_glyph() {
        let cache = Mutex::new(HashMap::new());
        let mut measured = 0;
        let text = "Health 100%";
        let distinct = text.chars().collect::<std::collections::HashSet<_>>().len();

        for step in 0..2000 {
            let font_size = 10.0 + step as f32 * 0.0137;
            let width: f32 = text
                .chars()
                .map(|ch| {
                    scaled_advance(&cache, 7, ch, font_size, |_, px| {
                        measured += 1;
                        px * 0.6
                    })
                })
                .sum();
            assert!((width - text.len() as f32 * font_size * 0.6).abs() < 1e-3);
        }

        assert_eq!(cache.lock().map(|cache| cache.len()).unwrap_or(0), distinct);
        assert_eq!(measured, distinct);
    }

    #[test]
    fn invalid_font_bytes_are_an_error() {
        assert!(TextMetrics::from_font_bytes(b"not a font").is_err());
    }

    #[test]
    fn recording_counts_by_kind() {
        let mut draw = RecordingDrawList::default();
        draw.add_line(Vec2::ZERO, Vec2::ONE, Color::rgb(1, 2, 3), 1.0);
        draw.add_text(Vec2::ZERO, 12.0, Color::rgb(1, 2, 3), "Kralkatorrik");
        draw.add_text(Vec2::ZERO, 12.0, Color::rgb(1, 2, 3), "12.0m");
        assert_eq!(draw.count("text"), 2);
        assert_eq!(draw.count("line"), 1);
        assert_eq!(draw.texts().collect::<Vec<_>>(), vec!["Kralkatorrik", "12.0m"]);
        assert_eq!(draw.take_commands().len(), 3);
        assert!(draw.commands().is_empty());
    }
}
