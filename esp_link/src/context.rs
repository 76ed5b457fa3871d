use serde::Serialize;

/// Bit set the game publishes in the context `ui_state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UiState(pub u32);

impl UiState {
    pub const MAP_OPEN: u32 = 1 << 0;
    pub const COMPASS_TOP_RIGHT: u32 = 1 << 1;
    pub const COMPASS_ROTATION: u32 = 1 << 2;
    pub const GAME_HAS_FOCUS: u32 = 1 << 3;
    pub const COMPETITIVE_MODE: u32 = 1 << 4;
    pub const INPUT_HAS_FOCUS: u32 = 1 << 5;
    pub const IN_COMBAT: u32 = 1 << 6;

    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn is_map_open(self) -> bool {
        self.has(Self::MAP_OPEN)
    }

    pub fn is_compass_top_right(self) -> bool {
        self.has(Self::COMPASS_TOP_RIGHT)
    }

    pub fn is_compass_rotation_enabled(self) -> bool {
        self.has(Self::COMPASS_ROTATION)
    }

    pub fn game_has_focus(self) -> bool {
        self.has(Self::GAME_HAS_FOCUS)
    }

    pub fn is_competitive_mode(self) -> bool {
        self.has(Self::COMPETITIVE_MODE)
    }

    pub fn input_has_focus(self) -> bool {
        self.has(Self::INPUT_HAS_FOCUS)
    }

    pub fn is_in_combat(self) -> bool {
        self.has(Self::IN_COMBAT)
    }
}

/// World-vs-world map types: the eternal battlegrounds type plus the
/// borderland range, which also contains the unrelated type 13.
pub fn is_wvw_map_type(map_type: u32) -> bool {
    map_type == 18 || ((9..=15).contains(&map_type) && map_type != 13)
}
