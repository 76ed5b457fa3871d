use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::LinkError;

pub const NAME_UNITS: usize = 256;
pub const IDENTITY_UNITS: usize = 256;
pub const CONTEXT_BYTES: usize = 256;
pub const DESCRIPTION_UNITS: usize = 2048;
pub const SERVER_ADDRESS_BYTES: usize = 28;

pub const OFFSET_UI_VERSION: usize = 0;
pub const OFFSET_UI_TICK: usize = 4;
pub const OFFSET_AVATAR_POSITION: usize = 8;
pub const OFFSET_AVATAR_FRONT: usize = 20;
pub const OFFSET_AVATAR_TOP: usize = 32;
pub const OFFSET_NAME: usize = 44;
pub const OFFSET_CAMERA_POSITION: usize = OFFSET_NAME + NAME_UNITS * 2;
pub const OFFSET_CAMERA_FRONT: usize = OFFSET_CAMERA_POSITION + 12;
pub const OFFSET_CAMERA_TOP: usize = OFFSET_CAMERA_FRONT + 12;
pub const OFFSET_IDENTITY: usize = OFFSET_CAMERA_TOP + 12;
pub const OFFSET_CONTEXT_LEN: usize = OFFSET_IDENTITY + IDENTITY_UNITS * 2;
pub const OFFSET_CONTEXT: usize = OFFSET_CONTEXT_LEN + 4;
pub const OFFSET_DESCRIPTION: usize = OFFSET_CONTEXT + CONTEXT_BYTES;

/// Size of the complete shared-memory block.
pub const LINK_SIZE: usize = OFFSET_DESCRIPTION + DESCRIPTION_UNITS * 2;

/// Version value the game writes into `ui_version`.
pub const EXPECTED_UI_VERSION: u32 = 2;
/// Application name the game writes into `name`.
pub const EXPECTED_NAME: &str = "Guild Wars 2";

// Offsets inside the 256-byte context block.
const CTX_MAP_ID: usize = 28;
const CTX_MAP_TYPE: usize = 32;
const CTX_SHARD_ID: usize = 36;
const CTX_INSTANCE: usize = 40;
const CTX_BUILD_ID: usize = 44;
const CTX_UI_STATE: usize = 48;
const CTX_COMPASS_WIDTH: usize = 52;
const CTX_COMPASS_HEIGHT: usize = 54;
const CTX_COMPASS_ROTATION: usize = 56;
const CTX_PLAYER_X: usize = 60;
const CTX_PLAYER_Y: usize = 64;
const CTX_MAP_CENTER_X: usize = 68;
const CTX_MAP_CENTER_Y: usize = 72;
const CTX_MAP_SCALE: usize = 76;
const CTX_PROCESS_ID: usize = 80;
const CTX_MOUNT_INDEX: usize = 84;

/// Game-specific context block carried inside the link.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MumbleContext {
    #[serde(skip)]
    pub server_address: [u8; SERVER_ADDRESS_BYTES],
    pub map_id: u32,
    pub map_type: u32,
    pub shard_id: u32,
    pub instance: u32,
    pub build_id: u32,
    pub ui_state: u32,
    pub compass_width: u16,
    pub compass_height: u16,
    pub compass_rotation: f32,
    pub player_x: f32,
    pub player_y: f32,
    pub map_center_x: f32,
    pub map_center_y: f32,
    pub map_scale: f32,
    pub process_id: u32,
    pub mount_index: u8,
}

impl MumbleContext {
    fn parse(bytes: &[u8]) -> Self {
        let mut server_address = [0u8; SERVER_ADDRESS_BYTES];
        server_address.copy_from_slice(&bytes[..SERVER_ADDRESS_BYTES]);
        Self {
            server_address,
            map_id: LittleEndian::read_u32(&bytes[CTX_MAP_ID..]),
            map_type: LittleEndian::read_u32(&bytes[CTX_MAP_TYPE..]),
            shard_id: LittleEndian::read_u32(&bytes[CTX_SHARD_ID..]),
            instance: LittleEndian::read_u32(&bytes[CTX_INSTANCE..]),
            build_id: LittleEndian::read_u32(&bytes[CTX_BUILD_ID..]),
            ui_state: LittleEndian::read_u32(&bytes[CTX_UI_STATE..]),
            compass_width: LittleEndian::read_u16(&bytes[CTX_COMPASS_WIDTH..]),
            compass_height: LittleEndian::read_u16(&bytes[CTX_COMPASS_HEIGHT..]),
            compass_rotation: LittleEndian::read_f32(&bytes[CTX_COMPASS_ROTATION..]),
            player_x: LittleEndian::read_f32(&bytes[CTX_PLAYER_X..]),
            player_y: LittleEndian::read_f32(&bytes[CTX_PLAYER_Y..]),
            map_center_x: LittleEndian::read_f32(&bytes[CTX_MAP_CENTER_X..]),
            map_center_y: LittleEndian::read_f32(&bytes[CTX_MAP_CENTER_Y..]),
            map_scale: LittleEndian::read_f32(&bytes[CTX_MAP_SCALE..]),
            process_id: LittleEndian::read_u32(&bytes[CTX_PROCESS_ID..]),
            mount_index: bytes[CTX_MOUNT_INDEX],
        }
    }

    fn write(&self, out: &mut [u8]) {
        out[..SERVER_ADDRESS_BYTES].copy_from_slice(&self.server_address);
        LittleEndian::write_u32(&mut out[CTX_MAP_ID..], self.map_id);
        LittleEndian::write_u32(&mut out[CTX_MAP_TYPE..], self.map_type);
        LittleEndian::write_u32(&mut out[CTX_SHARD_ID..], self.shard_id);
        LittleEndian::write_u32(&mut out[CTX_INSTANCE..], self.instance);
        LittleEndian::write_u32(&mut out[CTX_BUILD_ID..], self.build_id);
        LittleEndian::write_u32(&mut out[CTX_UI_STATE..], self.ui_state);
        LittleEndian::write_u16(&mut out[CTX_COMPASS_WIDTH..], self.compass_width);
        LittleEndian::write_u16(&mut out[CTX_COMPASS_HEIGHT..], self.compass_height);
        LittleEndian::write_f32(&mut out[CTX_COMPASS_ROTATION..], self.compass_rotation);
        LittleEndian::write_f32(&mut out[CTX_PLAYER_X..], self.player_x);
        LittleEndian::write_f32(&mut out[CTX_PLAYER_Y..], self.player_y);
        LittleEndian::write_f32(&mut out[CTX_MAP_CENTER_X..], self.map_center_x);
        LittleEndian::write_f32(&mut out[CTX_MAP_CENTER_Y..], self.map_center_y);
        LittleEndian::write_f32(&mut out[CTX_MAP_SCALE..], self.map_scale);
        LittleEndian::write_u32(&mut out[CTX_PROCESS_ID..], self.process_id);
        out[CTX_MOUNT_INDEX] = self.mount_index;
    }
}

/// Decoded copy of the shared-memory block.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MumbleLinkData {
    pub ui_version: u32,
    pub ui_tick: u32,
    pub avatar_position: [f32; 3],
    pub avatar_front: [f32; 3],
    pub avatar_top: [f32; 3],
    pub name: String,
    pub camera_position: [f32; 3],
    pub camera_front: [f32; 3],
    pub camera_top: [f32; 3],
    pub identity: String,
    pub context_len: u32,
    pub context: MumbleContext,
    pub description: String,
}

impl MumbleLinkData {
    pub fn parse(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() < LINK_SIZE {
            return Err(LinkError::TooShort {
                expected: LINK_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            ui_version: LittleEndian::read_u32(&bytes[OFFSET_UI_VERSION..]),
            ui_tick: LittleEndian::read_u32(&bytes[OFFSET_UI_TICK..]),
            avatar_position: read_vec3(bytes, OFFSET_AVATAR_POSITION),
            avatar_front: read_vec3(bytes, OFFSET_AVATAR_FRONT),
            avatar_top: read_vec3(bytes, OFFSET_AVATAR_TOP),
            name: read_wide(bytes, OFFSET_NAME, NAME_UNITS),
            camera_position: read_vec3(bytes, OFFSET_CAMERA_POSITION),
            camera_front: read_vec3(bytes, OFFSET_CAMERA_FRONT),
            camera_top: read_vec3(bytes, OFFSET_CAMERA_TOP),
            identity: read_wide(bytes, OFFSET_IDENTITY, IDENTITY_UNITS),
            context_len: LittleEndian::read_u32(&bytes[OFFSET_CONTEXT_LEN..]),
            context: MumbleContext::parse(&bytes[OFFSET_CONTEXT..OFFSET_CONTEXT + CONTEXT_BYTES]),
            description: read_wide(bytes, OFFSET_DESCRIPTION, DESCRIPTION_UNITS),
        })
    }

    /// True when the block was written by the game rather than another
    /// Mumble-aware application or a half-initialised section.
    pub fn is_game_link(&self) -> bool {
        self.ui_version == EXPECTED_UI_VERSION && self.name == EXPECTED_NAME
    }

    /// Serialise back into the shared-memory layout. Strings longer than
    /// their field are truncated and always keep a terminating zero.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; LINK_SIZE];
        LittleEndian::write_u32(&mut out[OFFSET_UI_VERSION..], self.ui_version);
        LittleEndian::write_u32(&mut out[OFFSET_UI_TICK..], self.ui_tick);
        write_vec3(&mut out, OFFSET_AVATAR_POSITION, self.avatar_position);
        write_vec3(&mut out, OFFSET_AVATAR_FRONT, self.avatar_front);
        write_vec3(&mut out, OFFSET_AVATAR_TOP, self.avatar_top);
        write_wide(&mut out, OFFSET_NAME, NAME_UNITS, &self.name);
        write_vec3(&mut out, OFFSET_CAMERA_POSITION, self.camera_position);
        write_vec3(&mut out, OFFSET_CAMERA_FRONT, self.camera_front);
        write_vec3(&mut out, OFFSET_CAMERA_TOP, self.camera_top);
        write_wide(&mut out, OFFSET_IDENTITY, IDENTITY_UNITS, &self.identity);
        LittleEndian::write_u32(&mut out[OFFSET_CONTEXT_LEN..], self.context_len);
        self.context
            .write(&mut out[OFFSET_CONTEXT..OFFSET_CONTEXT + CONTEXT_BYTES]);
        write_wide(
            &mut out,
            OFFSET_DESCRIPTION,
            DESCRIPTION_UNITS,
            &self.description,
        );
        out
    }
}

fn read_vec3(bytes: &[u8], offset: usize) -> [f32; 3] {
    [
        LittleEndian::read_f32(&bytes[offset..]),
        LittleEndian::read_f32(&bytes[offset + 4..]),
        LittleEndian::read_f32(&bytes[offset + 8..]),
    ]
}

fn write_vec3(out: &mut [u8], offset: usize, value: [f32; 3]) {
    for (index, component) in value.iter().enumerate() {
        LittleEndian::write_f32(&mut out[offset + index * 4..], *component);
    }
}

fn read_wide(bytes: &[u8], offset: usize, units: usize) -> String {
    let field = &bytes[offset..offset + units * 2];
    let decoded: Vec<u16> = field
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&decoded)
}

fn write_wide(out: &mut [u8], offset: usize, units: usize, value: &str) {
    for (index, unit) in value.encode_utf16().take(units - 1).enumerate() {
        LittleEndian::write_u16(&mut out[offset + index * 2..], unit);
    }
}
