use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use esp_stream::{FrameSnapshot, MessageKind, decode_payload, iter_messages};
use tempfile::tempdir;

const SCENARIO: &str = r#"{
  "display": [1600, 900],
  "tickMs": 50,
  "durationMs": 1000,
  "camera": [
    { "timeMs": 0, "position": [0.0, 2.0, 0.0], "mapId": 38, "mapType": 9 }
  ],
  "entities": [
    {
      "record": {
        "Player": {
          "base": { "address": 4096, "position": [0.0, 0.0, 0.0], "health": 0.0, "max_health": 0.0 },
          "attitude": "Hostile",
          "name": "Logan"
        }
      },
      "healthMode": "step",
      "keyframes": [
        { "timeMs": 0, "position": [0.0, 40.0, 0.0], "health": 20000.0, "maxHealth": 20000.0 },
        { "timeMs": 500, "position": [10.0, 40.0, 0.0], "health": 15000.0 },
        { "timeMs": 800, "position": [10.0, 40.0, 0.0], "health": 0.0 }
      ]
    }
  ],
  "inputs": [ { "timeMs": 100, "key": "insert" } ]
}"#;

#[test]
fn scenario_becomes_a_capture() -> Result<()> {
    let dir = tempdir().context("creating scratch directory")?;
    let scenario = dir.path().join("fight.json");
    fs::write(&scenario, SCENARIO)?;
    let output = dir.path().join("captures").join("fight.kxsp");

    let status = Command::new(env!("CARGO_BIN_EXE_scenario_capture"))
        .arg("--scenario")
        .arg(&scenario)
        .arg("--output")
        .arg(&output)
        .output()
        .context("running scenario_capture")?;
    assert!(
        status.status.success(),
        "scenario_capture failed: {}",
        String::from_utf8_lossy(&status.stderr)
    );

    let bytes = fs::read(&output)?;
    let mut frames = Vec::new();
    let mut inputs = 0;
    let mut links = 0;
    for message in iter_messages(&bytes) {
        let (header, payload) = message?;
        match header.kind {
            MessageKind::Frame => frames.push(decode_payload::<FrameSnapshot>(payload)?),
            MessageKind::Input => inputs += 1,
            MessageKind::LinkBlock => links += 1,
            _ => {}
        }
    }
    assert_eq!(frames.len(), 21);
    assert_eq!(links, 21);
    assert_eq!(inputs, 1);

    let at = |time_ms: u64| {
        frames
            .iter()
            .find(|frame| frame.time_ms == time_ms)
            .map(|frame| frame.entities[0].base().health)
    };
    assert_eq!(at(450), Some(20000.0));
    assert_eq!(at(500), Some(15000.0));
    assert_eq!(at(1000), Some(0.0));
    Ok(())
}

#[test]
fn scenarios_without_a_camera_are_rejected() -> Result<()> {
    let dir = tempdir().context("creating scratch directory")?;
    let scenario = dir.path().join("empty.json");
    fs::write(&scenario, r#"{ "durationMs": 100, "camera": [] }"#)?;

    let output = Command::new(env!("CARGO_BIN_EXE_scenario_capture"))
        .arg("--scenario")
        .arg(&scenario)
        .arg("--output")
        .arg(dir.path().join("empty.kxsp"))
        .output()
        .context("running scenario_capture")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one camera keyframe"), "stderr: {stderr}");
    Ok(())
}
