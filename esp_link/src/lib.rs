//! MumbleLink shared-memory decoding.
//!
//! The game publishes its camera, avatar, and map context through the
//! MumbleLink positional-audio section. The overlay only ever reads it.

pub mod context;
pub mod identity;
pub mod layout;
pub mod reader;

use serde::Serialize;
use thiserror::Error;

pub use context::{UiState, is_wvw_map_type};
pub use identity::{DEFAULT_FOV_RADIANS, Identity};
pub use layout::{LINK_SIZE, MumbleContext, MumbleLinkData};
pub use reader::{LinkReader, RETRY_INTERVAL_MS};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link section holds {actual} bytes, expected at least {expected}")]
    TooShort { expected: usize, actual: usize },
    #[error("link section was not written by the game (version {version}, name {name:?})")]
    NotGameLink { version: u32, name: String },
    #[error("identity field is empty")]
    EmptyIdentity,
    #[error("identity JSON: {0}")]
    Identity(#[from] serde_json::Error),
}

/// The parts of the link the overlay consumes each frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkState {
    pub tick: u32,
    pub camera_position: [f32; 3],
    pub camera_front: [f32; 3],
    pub camera_top: [f32; 3],
    pub avatar_position: [f32; 3],
    pub fov: f32,
    pub map_id: u32,
    pub map_type: u32,
    pub ui_state: UiState,
    pub mount_index: u8,
    pub identity: Option<Identity>,
}

impl LinkState {
    pub fn from_data(data: &MumbleLinkData) -> Result<Self, LinkError> {
        if !data.is_game_link() {
            return Err(LinkError::NotGameLink {
                version: data.ui_version,
                name: data.name.clone(),
            });
        }

        let identity = match Identity::parse(&data.identity) {
            Ok(identity) => Some(identity),
            Err(err) => {
                log::debug!("ignoring MumbleLink identity: {err}");
                None
            }
        };
        let fov = identity
            .as_ref()
            .map(Identity::fov_radians)
            .unwrap_or(DEFAULT_FOV_RADIANS);

        Ok(Self {
            tick: data.ui_tick,
            camera_position: data.camera_position,
            camera_front: data.camera_front,
            camera_top: data.camera_top,
            avatar_position: data.avatar_position,
            fov,
            map_id: data.context.map_id,
            map_type: data.context.map_type,
            ui_state: UiState(data.context.ui_state),
            mount_index: data.context.mount_index,
            identity,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, LinkError> {
        Self::from_data(&MumbleLinkData::parse(bytes)?)
    }

    /// A map id of zero means the character select or a loading screen.
    pub fn is_in_map(&self) -> bool {
        self.map_id != 0
    }

    pub fn is_in_wvw(&self) -> bool {
        is_wvw_map_type(self.map_type)
    }

    pub fn is_map_open(&self) -> bool {
        self.ui_state.is_map_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_block(identity: &str) -> MumbleLinkData {
        MumbleLinkData {
            ui_version: 2,
            ui_tick: 10,
            name: layout::EXPECTED_NAME.to_string(),
            camera_position: [1.0, 2.0, 3.0],
            camera_front: [0.0, 0.0, 1.0],
            identity: identity.to_string(),
            context: MumbleContext {
                map_id: 38,
                map_type: 9,
                ui_state: UiState::MAP_OPEN,
                ..MumbleContext::default()
            },
            ..MumbleLinkData::default()
        }
    }

    #[test]
    fn state_reflects_context_block() {
        let state = LinkState::parse(&game_block(r#"{"fov":0.9}"#).encode()).unwrap();
        assert!(state.is_in_map());
        assert!(state.is_in_wvw());
        assert!(state.is_map_open());
        assert_eq!(state.camera_position, [1.0, 2.0, 3.0]);
        assert!((state.fov - 0.9).abs() < 1e-6);
    }

    #[test]
    fn broken_identity_keeps_default_fov() {
        let state = LinkState::from_data(&game_block("garbage")).unwrap();
        assert!(state.identity.is_none());
        assert_eq!(state.fov, DEFAULT_FOV_RADIANS);
    }

    #[test]
    fn foreign_links_are_rejected() {
        let mut data = game_block("{}");
        data.ui_version = 1;
        assert!(matches!(
            LinkState::from_data(&data),
            Err(LinkError::NotGameLink { version: 1, .. })
        ));
    }
}
