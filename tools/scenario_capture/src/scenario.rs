//! Scripted sessions: keyframed entities and camera sampled at a fixed tick.

use esp_link::{MumbleContext, MumbleLinkData};
use esp_stream::{
    CaptureConfig, EntityRecord, FrameSnapshot, Hello, HotKey, InputEvent, LinkBlock, MessageKind,
    ProtocolError, encode_message,
};
use serde::Deserialize;
use thiserror::Error;

const GAME_NAME: &str = "Guild Wars 2";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("tickMs must be greater than zero")]
    ZeroTick,
    #[error("scenario needs at least one camera keyframe")]
    NoCamera,
    #[error("{owner} keyframes must be in ascending time order")]
    UnsortedKeyframes { owner: String },
    #[error("entity {address:#x} has no keyframes")]
    NoKeyframes { address: u64 },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default = "default_producer")]
    pub producer: String,
    #[serde(default = "default_display")]
    pub display: [u32; 2],
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
    pub duration_ms: u64,
    pub camera: Vec<CameraKeyframe>,
    #[serde(default)]
    pub entities: Vec<ScriptedEntity>,
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
}

fn default_producer() -> String {
    "scenario_capture".to_string()
}

fn default_display() -> [u32; 2] {
    [1920, 1080]
}

fn default_tick() -> u64 {
    33
}

/// Camera pose as published through the link, in link space (Y up, metres).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraKeyframe {
    pub time_ms: u64,
    pub position: [f32; 3],
    #[serde(default = "default_front")]
    pub front: [f32; 3],
    /// Defaults to the camera position.
    #[serde(default)]
    pub avatar: Option<[f32; 3]>,
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_map_id")]
    pub map_id: u32,
    #[serde(default = "default_map_type")]
    pub map_type: u32,
    #[serde(default)]
    pub ui_state: u32,
}

fn default_front() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

fn default_fov() -> f32 {
    1.0472
}

fn default_map_id() -> u32 {
    15
}

fn default_map_type() -> u32 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum HealthMode {
    /// Health moves smoothly between keyframes.
    #[default]
    Linear,
    /// Health holds until the next keyframe, like discrete hits.
    Step,
}

/// One entity: a record template whose base is driven by keyframes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedEntity {
    pub record: EntityRecord,
    #[serde(default)]
    pub spawn_ms: u64,
    #[serde(default)]
    pub despawn_ms: Option<u64>,
    #[serde(default)]
    pub health_mode: HealthMode,
    pub keyframes: Vec<EntityKeyframe>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKeyframe {
    pub time_ms: u64,
    /// Game space (Z up).
    pub position: [f32; 3],
    pub health: f32,
    #[serde(default)]
    pub max_health: Option<f32>,
    #[serde(default)]
    pub barrier: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptedKey {
    Insert,
    Delete,
}

impl From<ScriptedKey> for HotKey {
    fn from(key: ScriptedKey) -> Self {
        match key {
            ScriptedKey::Insert => HotKey::Insert,
            ScriptedKey::Delete => HotKey::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedInput {
    pub time_ms: u64,
    pub key: ScriptedKey,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

/// The keyframes around `time` and how far between them it lies. Times
/// outside the keyframe range clamp to the nearest end.
fn bracket<K>(keys: &[K], time: u64, time_of: impl Fn(&K) -> u64) -> Option<(&K, &K, f32)> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= time_of(first) {
        return Some((first, first, 0.0));
    }
    if time >= time_of(last) {
        return Some((last, last, 0.0));
    }
    let next = keys.iter().position(|key| time_of(key) > time)?;
    let (a, b) = (&keys[next - 1], &keys[next]);
    let span = time_of(b) - time_of(a);
    let t = if span == 0 {
        1.0
    } else {
        (time - time_of(a)) as f32 / span as f32
    };
    Some((a, b, t))
}

fn is_sorted_by_time<K>(keys: &[K], time_of: impl Fn(&K) -> u64) -> bool {
    keys.windows(2).all(|pair| time_of(&pair[0]) <= time_of(&pair[1]))
}

impl Scenario {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.tick_ms == 0 {
            return Err(ScenarioError::ZeroTick);
        }
        if self.camera.is_empty() {
            return Err(ScenarioError::NoCamera);
        }
        if !is_sorted_by_time(&self.camera, |key| key.time_ms) {
            return Err(ScenarioError::UnsortedKeyframes {
                owner: "camera".to_string(),
            });
        }
        for entity in &self.entities {
            let address = entity.record.base().address;
            if entity.keyframes.is_empty() {
                return Err(ScenarioError::NoKeyframes { address });
            }
            if !is_sorted_by_time(&entity.keyframes, |key| key.time_ms) {
                return Err(ScenarioError::UnsortedKeyframes {
                    owner: format!("entity {address:#x}"),
                });
            }
        }
        Ok(())
    }

    /// Sample times from zero through `duration_ms` inclusive.
    pub fn ticks(&self) -> impl Iterator<Item = u64> + '_ {
        let step = self.tick_ms.max(1) as usize;
        (0..=self.duration_ms).step_by(step)
    }

    pub fn link_at(&self, time_ms: u64, tick: u32) -> Option<MumbleLinkData> {
        let (a, b, t) = bracket(&self.camera, time_ms, |key| key.time_ms)?;
        let position = lerp3(a.position, b.position, t);
        let front = normalize(lerp3(a.front, b.front, t)).unwrap_or(b.front);
        let avatar = lerp3(
            a.avatar.unwrap_or(a.position),
            b.avatar.unwrap_or(b.position),
            t,
        );
        // Discrete context fields switch when the next keyframe is reached.
        let context_key = if t >= 1.0 { b } else { a };
        Some(MumbleLinkData {
            ui_version: 2,
            ui_tick: tick,
            name: GAME_NAME.to_string(),
            avatar_position: avatar,
            camera_position: position,
            camera_front: front,
            camera_top: [0.0, 1.0, 0.0],
            identity: format!(
                r#"{{"name":"Scenario","map_id":{},"fov":{}}}"#,
                context_key.map_id,
                lerp(a.fov, b.fov, t)
            ),
            context: MumbleContext {
                map_id: context_key.map_id,
                map_type: context_key.map_type,
                ui_state: context_key.ui_state,
                ..MumbleContext::default()
            },
            ..MumbleLinkData::default()
        })
    }

    pub fn snapshot_at(&self, seq: u64, time_ms: u64) -> FrameSnapshot {
        let entities = self
            .entities
            .iter()
            .filter_map(|entity| entity.sample(time_ms))
            .collect();
        FrameSnapshot {
            seq,
            time_ms,
            entities,
        }
    }

    /// Encodes the whole session as a capture: hello, display config, then
    /// per tick any due inputs, a link block, and a frame.
    pub fn to_capture(&self) -> Result<Vec<u8>, ScenarioError> {
        self.validate()?;
        let mut out = encode_message(MessageKind::Hello, &Hello::new(self.producer.clone(), None))?;
        out.extend(encode_message(
            MessageKind::CaptureConfig,
            &CaptureConfig {
                display_width: self.display[0],
                display_height: self.display[1],
                nominal_fps: Some(1000.0 / self.tick_ms as f32),
            },
        )?);

        let mut inputs = self.inputs.clone();
        inputs.sort_by_key(|input| input.time_ms);
        let mut pending = inputs.iter().peekable();

        for (index, time_ms) in self.ticks().enumerate() {
            while let Some(input) = pending.next_if(|input| input.time_ms <= time_ms) {
                out.extend(encode_message(
                    MessageKind::Input,
                    &InputEvent {
                        time_ms: input.time_ms,
                        key: input.key.into(),
                    },
                )?);
            }
            if let Some(link) = self.link_at(time_ms, index as u32 + 1) {
                out.extend(encode_message(
                    MessageKind::LinkBlock,
                    &LinkBlock {
                        time_ms,
                        data: link.encode(),
                    },
                )?);
            }
            out.extend(encode_message(
                MessageKind::Frame,
                &self.snapshot_at(index as u64 + 1, time_ms),
            )?);
        }
        Ok(out)
    }
}

fn normalize(v: [f32; 3]) -> Option<[f32; 3]> {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    (length > f32::EPSILON).then(|| [v[0] / length, v[1] / length, v[2] / length])
}

impl ScriptedEntity {
    pub fn is_alive_at(&self, time_ms: u64) -> bool {
        time_ms >= self.spawn_ms && self.despawn_ms.is_none_or(|despawn| time_ms < despawn)
    }

    /// The entity as a provider would report it at `time_ms`, or `None`
    /// outside its lifetime.
    pub fn sample(&self, time_ms: u64) -> Option<EntityRecord> {
        if !self.is_alive_at(time_ms) {
            return None;
        }
        let (a, b, t) = bracket(&self.keyframes, time_ms, |key| key.time_ms)?;
        let mut record = self.record.clone();
        let template = *record.base();
        let base = record.base_mut();
        base.position = lerp3(a.position, b.position, t);
        let health_t = match self.health_mode {
            HealthMode::Linear => t,
            HealthMode::Step if t >= 1.0 => 1.0,
            HealthMode::Step => 0.0,
        };
        base.health = lerp(a.health, b.health, health_t);
        // Optional fields carry forward from the last keyframe that set them.
        let reached = if health_t >= 1.0 { b.time_ms } else { a.time_ms };
        let pick = |field: fn(&EntityKeyframe) -> Option<f32>, fallback: f32| {
            self.keyframes
                .iter()
                .take_while(|key| key.time_ms <= reached)
                .filter_map(field)
                .last()
                .unwrap_or(fallback)
        };
        base.max_health = pick(|key| key.max_health, template.max_health);
        base.barrier = pick(|key| key.barrier, template.barrier);
        Some(record)
    }
}
