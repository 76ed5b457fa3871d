//! Stacks an entity's labels and bars around its box.
//!
//! Every position is the top-centre of its element. The distance label sits
//! above the box; everything else stacks downward from the box bottom in
//! presentation order.

use glam::Vec2;

use crate::visuals::VisualProperties;

pub const REGION_MARGIN_VERTICAL: f32 = 8.0;
pub const ELEMENT_MARGIN_VERTICAL: f32 = 4.0;

/// Elements in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutElementKey {
    Distance,
    HealthBar,
    EnergyBar,
    PlayerName,
    GearSummary,
    DominantStats,
    Details,
}

impl LayoutElementKey {
    pub fn is_above_box(self) -> bool {
        matches!(self, LayoutElementKey::Distance)
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutElementKey::Distance => "distance",
            LayoutElementKey::HealthBar => "health-bar",
            LayoutElementKey::EnergyBar => "energy-bar",
            LayoutElementKey::PlayerName => "player-name",
            LayoutElementKey::GearSummary => "gear-summary",
            LayoutElementKey::DominantStats => "dominant-stats",
            LayoutElementKey::Details => "details",
        }
    }
}

/// One element to place and its measured size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutItem {
    pub key: LayoutElementKey,
    pub size: Vec2,
}

impl LayoutItem {
    pub fn new(key: LayoutElementKey, size: Vec2) -> Self {
        Self { key, size }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    positions: Vec<(LayoutElementKey, Vec2)>,
    /// Top-left corner of the health bar, when one was placed.
    pub health_bar_anchor: Option<Vec2>,
}

impl LayoutResult {
    pub fn position(&self, key: LayoutElementKey) -> Option<Vec2> {
        self.positions
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, position)| *position)
    }

    pub fn positions(&self) -> &[(LayoutElementKey, Vec2)] {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Places `items` around the box in `visuals`. Zero-height items are
/// skipped; duplicate keys keep the first occurrence.
pub fn calculate_layout(visuals: &VisualProperties, items: &[LayoutItem]) -> LayoutResult {
    let mut ordered: Vec<LayoutItem> = items
        .iter()
        .copied()
        .filter(|item| item.size.y > 0.0)
        .collect();
    ordered.sort_by_key(|item| item.key);
    ordered.dedup_by_key(|item| item.key);

    let center_x = visuals.center.x;
    let mut result = LayoutResult::default();

    let mut above_cursor = visuals.box_min.y - REGION_MARGIN_VERTICAL;
    let mut below_cursor = visuals.box_max.y + REGION_MARGIN_VERTICAL;
    for item in ordered {
        let position = if item.key.is_above_box() {
            let top = above_cursor - item.size.y;
            above_cursor = top - ELEMENT_MARGIN_VERTICAL;
            Vec2::new(center_x, top)
        } else {
            let top = below_cursor;
            below_cursor += item.size.y + ELEMENT_MARGIN_VERTICAL;
            Vec2::new(center_x, top)
        };
        if item.key == LayoutElementKey::HealthBar {
            result.health_bar_anchor = Some(Vec2::new(position.x - item.size.x / 2.0, position.y));
        }
        result.positions.push((item.key, position));
    }
    result
}
