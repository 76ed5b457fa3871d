use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use esp_stream::{
    CaptureConfig, FrameSnapshot, Hello, InputEvent, LinkBlock, MessageKind, ProtocolError,
    decode_payload, iter_messages,
};
use thiserror::Error;
use walkdir::WalkDir;

/// File extension used for recorded sessions.
pub const CAPTURE_EXTENSION: &str = "kxsp";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("message {index} ({kind}): {source}")]
    Message {
        index: usize,
        kind: &'static str,
        #[source]
        source: ProtocolError,
    },
    #[error("framing broke after {index} messages: {source}")]
    Framing {
        index: usize,
        #[source]
        source: ProtocolError,
    },
    #[error("capture holds no frames")]
    NoFrames,
}

/// Something that happens at a point in capture time.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Frame(FrameSnapshot),
    Link(LinkBlock),
    Input(InputEvent),
}

impl CaptureEvent {
    pub fn time_ms(&self) -> u64 {
        match self {
            CaptureEvent::Frame(frame) => frame.time_ms,
            CaptureEvent::Link(block) => block.time_ms,
            CaptureEvent::Input(input) => input.time_ms,
        }
    }
}

/// A decoded capture with its events in time order.
#[derive(Debug, Clone)]
pub struct Capture {
    pub path: PathBuf,
    pub hello: Option<Hello>,
    pub config: Option<CaptureConfig>,
    pub events: Vec<CaptureEvent>,
}

impl Capture {
    pub fn frame_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, CaptureEvent::Frame(_)))
            .count()
    }

    pub fn producer(&self) -> &str {
        self.hello
            .as_ref()
            .map(|hello| hello.producer.as_str())
            .unwrap_or("unknown")
    }
}

/// Decodes a capture held in memory. Heartbeats are skipped; a repeated
/// `CaptureConfig` replaces the earlier one.
pub fn parse_capture(path: &Path, bytes: &[u8]) -> Result<Capture, CaptureError> {
    let mut capture = Capture {
        path: path.to_path_buf(),
        hello: None,
        config: None,
        events: Vec::new(),
    };

    for (index, message) in iter_messages(bytes).enumerate() {
        let (header, payload) =
            message.map_err(|source| CaptureError::Framing { index, source })?;
        let wrap = |source| CaptureError::Message {
            index,
            kind: header.kind.label(),
            source,
        };
        match header.kind {
            MessageKind::Hello => capture.hello = Some(decode_payload(payload).map_err(wrap)?),
            MessageKind::CaptureConfig => {
                capture.config = Some(decode_payload(payload).map_err(wrap)?)
            }
            MessageKind::Frame => capture
                .events
                .push(CaptureEvent::Frame(decode_payload(payload).map_err(wrap)?)),
            MessageKind::LinkBlock => capture
                .events
                .push(CaptureEvent::Link(decode_payload(payload).map_err(wrap)?)),
            MessageKind::Input => capture
                .events
                .push(CaptureEvent::Input(decode_payload(payload).map_err(wrap)?)),
            MessageKind::Heartbeat => {}
        }
    }

    if capture.frame_count() == 0 {
        return Err(CaptureError::NoFrames);
    }
    // Stable, so links and inputs recorded just before a frame stay ahead of it.
    capture.events.sort_by_key(CaptureEvent::time_ms);
    Ok(capture)
}

pub fn load_capture(path: &Path) -> Result<Capture> {
    let bytes = fs::read(path).with_context(|| format!("reading capture {}", path.display()))?;
    let capture = parse_capture(path, &bytes)
        .with_context(|| format!("decoding capture {}", path.display()))?;
    log::info!(
        "loaded {} ({} events, {} frames, producer {})",
        path.display(),
        capture.events.len(),
        capture.frame_count(),
        capture.producer()
    );
    Ok(capture)
}

/// Expands `root` into the capture files to replay: the file itself, or
/// every `.kxsp` file below a directory in path order.
pub fn discover_captures(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("failed to traverse {}: {err}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_capture = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CAPTURE_EXTENSION));
        if is_capture {
            found.push(entry.into_path());
        }
    }
    found.sort();
    if found.is_empty() {
        anyhow::bail!("no .{CAPTURE_EXTENSION} captures under {}", root.display());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esp_stream::{HotKey, encode_message};

    fn frame(seq: u64, time_ms: u64) -> Vec<u8> {
        encode_message(
            MessageKind::Frame,
            &FrameSnapshot {
                seq,
                time_ms,
                entities: Vec::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn events_are_ordered_by_time() {
        let mut bytes = encode_message(MessageKind::Hello, &Hello::new("test", None)).unwrap();
        bytes.extend(frame(2, 100));
        bytes.extend(
            encode_message(
                MessageKind::Input,
                &InputEvent {
                    time_ms: 50,
                    key: HotKey::Insert,
                },
            )
            .unwrap(),
        );
        bytes.extend(frame(1, 0));

        let capture = parse_capture(Path::new("mem"), &bytes).unwrap();
        let times: Vec<_> = capture.events.iter().map(CaptureEvent::time_ms).collect();
        assert_eq!(times, vec![0, 50, 100]);
        assert_eq!(capture.frame_count(), 2);
        assert_eq!(capture.producer(), "test");
    }

    #[test]
    fn captures_without_frames_are_rejected() {
        let bytes = encode_message(MessageKind::Hello, &Hello::new("test", None)).unwrap();
        assert!(matches!(
            parse_capture(Path::new("mem"), &bytes),
            Err(CaptureError::NoFrames)
        ));
    }

    #[test]
    fn directories_are_walked_for_captures() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("wvw");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("b.kxsp"), frame(1, 0)).unwrap();
        fs::write(dir.path().join("a.KXSP"), frame(1, 0)).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let found = discover_captures(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("a.KXSP"));
    }
}
