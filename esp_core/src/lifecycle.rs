//! Readiness state machine gating the pipeline.
//!
//! ```text
//! PreInit -> WaitingForRenderer -> WaitingForImGui -> WaitingForGame
//!         -> InitializingServices -> Running -> ShuttingDown
//! ```
//!
//! Injected hosts own the renderer from the moment the Present hook is
//! installed, so they skip `WaitingForRenderer`.

use serde::Serialize;

use crate::config::ShutdownFlag;
use crate::error::EspError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LifecycleState {
    PreInit,
    WaitingForRenderer,
    WaitingForImGui,
    WaitingForGame,
    InitializingServices,
    Running,
    ShuttingDown,
}

impl LifecycleState {
    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::PreInit => "Pre-initialisation",
            LifecycleState::WaitingForRenderer => "Waiting for renderer",
            LifecycleState::WaitingForImGui => "Waiting for UI backend",
            LifecycleState::WaitingForGame => "Waiting for game",
            LifecycleState::InitializingServices => "Initialising services",
            LifecycleState::Running => "Running",
            LifecycleState::ShuttingDown => "Shutting down",
        }
    }
}

/// How the overlay is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HostMode {
    /// Loaded into the game process with a hooked Present call.
    #[default]
    Injected,
    /// Loaded by an addon loader that hands over the rendering device later.
    Plugin,
}

/// What the host reports about its own readiness this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub renderer_ready: bool,
    pub ui_ready: bool,
    /// Zero at character select and on loading screens.
    pub map_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug)]
pub struct LifecycleManager {
    state: LifecycleState,
    mode: HostMode,
    shutdown: ShutdownFlag,
    transitions: Vec<Transition>,
}

impl LifecycleManager {
    pub fn new(mode: HostMode, shutdown: ShutdownFlag) -> Self {
        Self {
            state: LifecycleState::PreInit,
            mode,
            shutdown,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state == LifecycleState::ShuttingDown
    }

    /// Every transition taken so far, oldest first.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn transition(&mut self, to: LifecycleState) {
        if self.state == to {
            return;
        }
        log::info!("lifecycle: {} -> {}", self.state.label(), to.label());
        self.transitions.push(Transition {
            from: self.state,
            to,
        });
        self.state = to;
    }

    /// Raises the shutdown flag and leaves whatever state we were in.
    pub fn request_shutdown(&mut self) {
        self.shutdown.request();
        self.transition(LifecycleState::ShuttingDown);
    }

    /// Takes every transition `readiness` allows, running `initialize` once
    /// when the game is reached. A failed initialiser is not retried: the
    /// manager shuts down and hands the error back.
    pub fn advance<F>(&mut self, readiness: Readiness, initialize: F) -> Result<LifecycleState, EspError>
    where
        F: FnOnce() -> Result<(), EspError>,
    {
        if self.shutdown.is_requested() {
            self.transition(LifecycleState::ShuttingDown);
            return Ok(self.state);
        }
        let mut initialize = Some(initialize);
        loop {
            let next = match self.state {
                LifecycleState::PreInit => Some(match self.mode {
                    HostMode::Injected => LifecycleState::WaitingForImGui,
                    HostMode::Plugin => LifecycleState::WaitingForRenderer,
                }),
                LifecycleState::WaitingForRenderer => {
                    readiness.renderer_ready.then_some(LifecycleState::WaitingForImGui)
                }
                LifecycleState::WaitingForImGui => {
                    readiness.ui_ready.then_some(LifecycleState::WaitingForGame)
                }
                LifecycleState::WaitingForGame => {
                    (readiness.map_id != 0).then_some(LifecycleState::InitializingServices)
                }
                LifecycleState::InitializingServices => {
                    let result = match initialize.take() {
                        Some(initialize) => initialize(),
                        None => Err(EspError::not_ready(self.state)),
                    };
                    match result {
                        Ok(()) => Some(LifecycleState::Running),
                        Err(err) => {
                            log::error!("initialisation failed: {err}");
                            self.transition(LifecycleState::ShuttingDown);
                            return Err(err);
                        }
                    }
                }
                LifecycleState::Running | LifecycleState::ShuttingDown => None,
            };
            match next {
                Some(state) => self.transition(state),
                None => return Ok(self.state),
            }
        }
    }
}
