//! System and component phase state machines.

use serde::{Deserialize, Serialize};

/// Phase of the whole system.
///
/// Startup walks forward through
/// `Initializing -> LoadingConfig -> SettingUpServices -> InitializingComponents -> Ready`,
/// shutdown goes `Ready -> ShuttingDown -> Offline`. Any live phase may drop to
/// `Error` or `Offline`; both are terminal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemPhase {
    Initializing,
    LoadingConfig,
    SettingUpServices,
    InitializingComponents,
    Ready,
    ShuttingDown,
    Offline,
    Error,
}

impl SystemPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SystemPhase::Offline | SystemPhase::Error)
    }

    pub fn can_transition_to(&self, next: SystemPhase) -> bool {
        use SystemPhase::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Error)
                | (_, Offline)
                | (Initializing, LoadingConfig)
                | (LoadingConfig, SettingUpServices)
                | (SettingUpServices, InitializingComponents)
                | (InitializingComponents, Ready)
                | (Ready, ShuttingDown)
        )
    }
}

impl std::fmt::Display for SystemPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SystemPhase::Initializing => "initializing",
            SystemPhase::LoadingConfig => "loading_config",
            SystemPhase::SettingUpServices => "setting_up_services",
            SystemPhase::InitializingComponents => "initializing_components",
            SystemPhase::Ready => "ready",
            SystemPhase::ShuttingDown => "shutting_down",
            SystemPhase::Offline => "offline",
            SystemPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Phase of a single managed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentPhase {
    Registered,
    Initializing,
    Ready,
    Busy,
    Error,
    ShuttingDown,
    Offline,
}

impl ComponentPhase {
    /// `Error` and `Offline` may re-enter `Initializing` on restart.
    pub fn can_transition_to(&self, next: ComponentPhase) -> bool {
        use ComponentPhase::*;
        if *self == next {
            return false;
        }
        matches!(
            (self, next),
            (_, Error)
                | (Registered, Initializing)
                | (Initializing, Ready)
                | (Ready, Busy)
                | (Busy, Ready)
                | (Ready, ShuttingDown)
                | (Busy, ShuttingDown)
                | (Error, ShuttingDown)
                | (ShuttingDown, Offline)
                | (Error, Initializing)
                | (Offline, Initializing)
        )
    }

    /// Whether teardown has anything to stop.
    pub fn is_started(&self) -> bool {
        matches!(
            self,
            ComponentPhase::Ready | ComponentPhase::Busy | ComponentPhase::Error
        )
    }
}

impl std::fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentPhase::Registered => "registered",
            ComponentPhase::Initializing => "initializing",
            ComponentPhase::Ready => "ready",
            ComponentPhase::Busy => "busy",
            ComponentPhase::Error => "error",
            ComponentPhase::ShuttingDown => "shutting_down",
            ComponentPhase::Offline => "offline",
        };
        f.write_str(name)
    }
}
