use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use memmap2::{Mmap, MmapOptions};

use crate::layout::LINK_SIZE;
use crate::{LinkState, MumbleLinkData};

/// Minimum delay between attempts to open a missing link section.
pub const RETRY_INTERVAL_MS: u64 = 5_000;

/// Read-only view of the MumbleLink section that reconnects lazily.
///
/// Opening never blocks: when the section is missing the reader waits for
/// the retry interval before touching the filesystem again.
#[derive(Debug)]
pub struct LinkReader {
    path: PathBuf,
    mmap: Option<Mmap>,
    last_attempt_ms: Option<u64>,
    retry_interval_ms: u64,
}

impl LinkReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mmap: None,
            last_attempt_ms: None,
            retry_interval_ms: RETRY_INTERVAL_MS,
        }
    }

    pub fn with_retry_interval(mut self, interval_ms: u64) -> Self {
        self.retry_interval_ms = interval_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.mmap.is_some()
    }

    /// Latest decoded link state, or `None` while the game has not
    /// published one yet.
    pub fn poll(&mut self, now_ms: u64) -> Option<LinkState> {
        if self.mmap.is_none() {
            self.try_open(now_ms);
        }
        let mmap = self.mmap.as_ref()?;
        match MumbleLinkData::parse(&mmap[..]) {
            Ok(data) if data.is_game_link() => LinkState::from_data(&data).ok(),
            Ok(_) => None,
            Err(err) => {
                log::debug!("MumbleLink section unreadable: {err}");
                None
            }
        }
    }

    fn try_open(&mut self, now_ms: u64) {
        if let Some(last) = self.last_attempt_ms {
            if now_ms.saturating_sub(last) < self.retry_interval_ms {
                return;
            }
        }
        self.last_attempt_ms = Some(now_ms);

        match open_section(&self.path) {
            Ok(mmap) => {
                log::info!("attached to MumbleLink at {}", self.path.display());
                self.mmap = Some(mmap);
            }
            Err(err) => log::debug!("MumbleLink not available yet: {err:#}"),
        }
    }
}

fn open_section(path: &Path) -> Result<Mmap> {
    let file = File::open(path)
        .with_context(|| format!("opening MumbleLink section at {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("reading metadata for {}", path.display()))?
        .len();
    ensure!(
        len as usize >= LINK_SIZE,
        "MumbleLink section {} holds {len} bytes, expected {LINK_SIZE}",
        path.display()
    );
    // The section is only ever read; the game owns all writes.
    let mmap = unsafe { MmapOptions::new().len(LINK_SIZE).map(&file) }
        .with_context(|| format!("memory-mapping {}", path.display()))?;
    Ok(mmap)
}
