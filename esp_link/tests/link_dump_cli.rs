use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use esp_link::{MumbleContext, MumbleLinkData, UiState};
use serde_json::Value;
use tempfile::tempdir;

fn game_link() -> MumbleLinkData {
    MumbleLinkData {
        ui_version: 2,
        ui_tick: 812,
        name: "Guild Wars 2".to_string(),
        avatar_position: [10.0, 2.0, -4.0],
        camera_position: [10.0, 4.5, -9.0],
        camera_front: [0.0, 0.0, 1.0],
        identity: r#"{"name":"Rytlock","profession":8,"race":1,"map_id":1206,"fov":0.873}"#
            .to_string(),
        context: MumbleContext {
            map_id: 1206,
            map_type: 5,
            ui_state: UiState::GAME_HAS_FOCUS,
            ..MumbleContext::default()
        },
        ..MumbleLinkData::default()
    }
}

#[test]
fn link_dump_prints_the_overlay_view() -> Result<()> {
    let dir = tempdir().context("creating scratch directory")?;
    let path = dir.path().join("MumbleLink");
    fs::write(&path, game_link().encode())?;

    let output = Command::new(env!("CARGO_BIN_EXE_link_dump"))
        .arg("--path")
        .arg(&path)
        .output()
        .context("running link_dump")?;
    assert!(
        output.status.success(),
        "link_dump failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["tick"], 812);
    assert_eq!(json["map_id"], 1206);
    assert_eq!(json["identity"]["name"], "Rytlock");
    let fov = json["fov"].as_f64().context("fov should be a number")?;
    assert!((fov - 0.873).abs() < 1e-4);
    Ok(())
}

#[test]
fn link_dump_rejects_foreign_sections() -> Result<()> {
    let dir = tempdir().context("creating scratch directory")?;
    let path = dir.path().join("MumbleLink");
    let mut data = game_link();
    data.name = "Voice Chat".to_string();
    fs::write(&path, data.encode())?;

    let output = Command::new(env!("CARGO_BIN_EXE_link_dump"))
        .arg("--path")
        .arg(&path)
        .output()
        .context("running link_dump")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not written by the game"), "stderr: {stderr}");
    Ok(())
}
