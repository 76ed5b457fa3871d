//! Capture framing and snapshot records for the ESP overlay.
//!
//! A capture is a sequence of messages, each a fixed-size header followed by
//! a MessagePack payload. Live snapshot providers and the replay host share
//! the record types in this crate so a recorded session reaches the
//! pipeline in exactly the shape a live frame would.

use std::convert::TryFrom;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

pub mod game;
pub mod snapshot;

pub use game::{
    Attitude, AttackTargetCombatState, CharacterRank, EquipmentSlot, GadgetType, ItemRarity,
    Profession, Race, ResourceNodeType,
};
pub use snapshot::{
    AttackTargetRecord, EntityBase, EntityRecord, FrameSnapshot, GadgetRecord, GearSlotRecord,
    NpcRecord, PlayerRecord,
};

/// Bytes that prefix every capture message ("KXSP").
pub const HEADER_MAGIC: [u8; 4] = *b"KXSP";

/// Protocol revision understood by this crate.
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Length of the binary header in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 4;

/// Message kinds found in a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, Hash)]
#[repr(u16)]
pub enum MessageKind {
    Hello = 0x0001,
    CaptureConfig = 0x0002,
    Frame = 0x0003,
    LinkBlock = 0x0004,
    Input = 0x0005,
    Heartbeat = 0x0006,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::Hello,
        MessageKind::CaptureConfig,
        MessageKind::Frame,
        MessageKind::LinkBlock,
        MessageKind::Input,
        MessageKind::Heartbeat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Hello => "hello",
            MessageKind::CaptureConfig => "capture-config",
            MessageKind::Frame => "frame",
            MessageKind::LinkBlock => "link-block",
            MessageKind::Input => "input",
            MessageKind::Heartbeat => "heartbeat",
        }
    }
}

/// Envelope describing the upcoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u16,
    pub kind: MessageKind,
    pub length: u32,
}

impl MessageHeader {
    /// Appends the big-endian header to `out`.
    pub fn write_to<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&HEADER_MAGIC);
        out.put_u16(self.version);
        out.put_u16(self.kind as u16);
        out.put_u32(self.length);
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        self.write_to(&mut &mut out[..]);
        out
    }

    /// Decode a header from raw bytes.
    pub fn decode(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader);
        }
        if input[..4] != HEADER_MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let mut rest = &input[4..HEADER_LEN];
        let version = rest.get_u16();
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        let kind_raw = rest.get_u16();
        let kind = MessageKind::try_from(kind_raw)
            .map_err(|_| ProtocolError::UnknownMessageKind(kind_raw))?;
        let length = rest.get_u32();
        Ok(Self {
            version,
            kind,
            length,
        })
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = ();

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| *kind as u16 == value)
            .ok_or(())
    }
}

/// Opens a capture and names whoever produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub protocol: String,
    pub producer: String,
    pub build: Option<String>,
}

impl Hello {
    pub fn new(producer: impl Into<String>, build: Option<String>) -> Self {
        Self {
            protocol: "KxSnapshot".to_string(),
            producer: producer.into(),
            build,
        }
    }
}

/// Display surface the capture was recorded against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub display_width: u32,
    pub display_height: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nominal_fps: Option<f32>,
}

/// Raw MumbleLink shared-memory block sampled at `time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkBlock {
    pub time_ms: u64,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Hotkeys the overlay reacts to, keyed by their virtual-key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum HotKey {
    Insert = 0x2D,
    Delete = 0x2E,
}

/// A key press recorded at `time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEvent {
    pub time_ms: u64,
    pub key: HotKey,
}

/// Error conditions returned by the protocol helpers.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("header smaller than {HEADER_LEN} bytes")]
    TruncatedHeader,
    #[error("header magic mismatch")]
    BadMagic,
    #[error("protocol version {0:#06x} is not supported")]
    UnsupportedVersion(u16),
    #[error("message kind {0:#06x} is unknown")]
    UnknownMessageKind(u16),
    #[error("payload length mismatch: header declared {expected} bytes but read {actual}")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
}

/// Wraps a payload with framing suitable for a capture file.
pub fn encode_message<T>(kind: MessageKind, payload: &T) -> Result<Vec<u8>, ProtocolError>
where
    T: Serialize,
{
    let payload_bytes = rmp_serde::to_vec_named(payload)?;
    let header = MessageHeader {
        version: PROTOCOL_VERSION,
        kind,
        length: u32::try_from(payload_bytes.len()).map_err(|_| ProtocolError::LengthMismatch {
            expected: u32::MAX,
            actual: payload_bytes.len(),
        })?,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload_bytes.len());
    header.write_to(&mut out);
    out.put_slice(&payload_bytes);
    Ok(out)
}

/// Decodes a single framed message returning both header and payload bytes.
pub fn decode_envelope(bytes: &[u8]) -> std::result::Result<(MessageHeader, &[u8]), ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader);
    }
    let header = MessageHeader::decode(&bytes[..HEADER_LEN])?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.length as usize {
        return Err(ProtocolError::LengthMismatch {
            expected: header.length,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

/// Decode a payload straight into the requested type.
pub fn decode_payload<T>(payload: &[u8]) -> std::result::Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = rmp_serde::from_slice(payload)?;
    Ok(value)
}

/// Walks a buffer holding back-to-back framed messages.
pub struct MessageIter<'a> {
    remaining: &'a [u8],
    failed: bool,
}

impl<'a> MessageIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            remaining: bytes,
            failed: false,
        }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(MessageHeader, &'a [u8]), ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }
        let header = match MessageHeader::decode(self.remaining) {
            Ok(header) => header,
            Err(err) => {
                self.failed = true;
                return Some(Err(err));
            }
        };
        let end = HEADER_LEN + header.length as usize;
        if self.remaining.len() < end {
            self.failed = true;
            return Some(Err(ProtocolError::LengthMismatch {
                expected: header.length,
                actual: self.remaining.len() - HEADER_LEN,
            }));
        }
        let payload = &self.remaining[HEADER_LEN..end];
        self.remaining = &self.remaining[end..];
        Some(Ok((header, payload)))
    }
}

/// Iterate over every framed message in `bytes`, stopping at the first error.
pub fn iter_messages(bytes: &[u8]) -> MessageIter<'_> {
    MessageIter::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rejects_foreign_magic() {
        let mut bytes = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Frame,
            length: 0,
        }
        .encode();
        bytes[0] = b'G';
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::BadMagic)
        ));
    }

    #[test]
    fn header_rejects_unknown_kind() {
        let mut bytes = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Frame,
            length: 0,
        }
        .encode();
        bytes[6..8].copy_from_slice(&0x0042u16.to_be_bytes());
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::UnknownMessageKind(0x0042))
        ));
    }

    #[test]
    fn envelope_detects_short_payload() {
        let mut message = encode_message(MessageKind::Hello, &Hello::new("test", None)).unwrap();
        message.pop();
        assert!(matches!(
            decode_envelope(&message),
            Err(ProtocolError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn iterates_back_to_back_messages() {
        let mut capture = Vec::new();
        capture.extend(encode_message(MessageKind::Hello, &Hello::new("test", None)).unwrap());
        capture.extend(
            encode_message(
                MessageKind::Input,
                &InputEvent {
                    time_ms: 40,
                    key: HotKey::Insert,
                },
            )
            .unwrap(),
        );

        let messages: Vec<_> = iter_messages(&capture).collect::<Result<_, _>>().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0.kind, MessageKind::Hello);
        assert_eq!(messages[1].0.kind, MessageKind::Input);
        let input: InputEvent = decode_payload(messages[1].1).unwrap();
        assert_eq!(input.time_ms, 40);
        assert_eq!(input.key, HotKey::Insert);
    }

    #[test]
    fn iteration_stops_after_truncated_tail() {
        let mut capture = encode_message(MessageKind::Hello, &Hello::new("test", None)).unwrap();
        capture.extend_from_slice(&HEADER_MAGIC);
        let results: Vec<_> = iter_messages(&capture).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn link_block_keeps_raw_bytes() {
        let block = LinkBlock {
            time_ms: 7,
            data: vec![2, 0, 0, 0, 9],
        };
        let message = encode_message(MessageKind::LinkBlock, &block).unwrap();
        let (header, payload) = decode_envelope(&message).unwrap();
        assert_eq!(header.kind, MessageKind::LinkBlock);
        let decoded: LinkBlock = decode_payload(payload).unwrap();
        assert_eq!(decoded.data, block.data);
    }
}
