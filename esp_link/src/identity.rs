use serde::{Deserialize, Serialize};

use crate::LinkError;

/// Vertical field of view used when the game reports none.
pub const DEFAULT_FOV_RADIANS: f32 = 1.0472;

/// JSON document the game writes into the identity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub profession: u32,
    pub spec: u32,
    pub race: u32,
    pub map_id: u32,
    pub world_id: u64,
    pub team_color_id: u32,
    pub commander: bool,
    pub fov: f32,
    pub uisz: u32,
}

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        let trimmed = raw.trim_matches(char::from(0)).trim();
        if trimmed.is_empty() {
            return Err(LinkError::EmptyIdentity);
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    pub fn fov_radians(&self) -> f32 {
        if self.fov <= 0.01 {
            DEFAULT_FOV_RADIANS
        } else {
            self.fov
        }
    }
}
