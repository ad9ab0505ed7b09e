//! Single control thread owning the coordinator
//!
//! Every reconfiguration goes through one thread, so enable, disable and
//! reconfigure never overlap. Requests arrive on a channel and are answered
//! with the resulting status.

use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::coordinator::{CoordinatorError, HotkeyCoordinator, MonitorConfig, MonitorKind};
use crate::hotkey::ModifierCombo;
use crate::remap::EditFlagSet;
use crate::settings::{SettingsError, SettingsStore};

/// Something the UI layer wants changed or read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetLayoutCombo(ModifierCombo),
    SetEditFlags(EditFlagSet),
    SetEnabled(bool),
    SetAutostart(bool),
    Status,
    Shutdown,
}

/// A command plus the channel its answer goes back on
#[derive(Debug)]
pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: oneshot::Sender<Result<SwitcherStatus, ControlError>>,
}

/// Errors reported back to the UI layer
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Monitor(#[from] CoordinatorError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("control thread has stopped")]
    Stopped,
}

impl ControlError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::Monitor(_) => "monitor_install_failed",
            ControlError::Settings(_) => "settings_write_failed",
            ControlError::Stopped => "stopped",
        }
    }
}

/// What the daemon is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitcherStatus {
    /// Master switch
    pub enabled: bool,
    /// Layout-switch combination in effect
    pub layout_combo: ModifierCombo,
    /// Index of `layout_combo`
    pub combo_index: usize,
    /// Mask of remapped shortcut groups in effect
    pub edit_flag_mask: u32,
    /// Launch-at-login preference
    pub autostart: bool,
    /// Whether a layout tap is installed
    pub layout_monitor_active: bool,
    /// Whether an edit tap is installed
    pub edit_monitor_active: bool,
}

/// Applies UI requests to the coordinator and the settings store
pub struct Controller<S: SettingsStore> {
    coordinator: HotkeyCoordinator,
    settings: S,
    enabled: bool,
}

impl<S: SettingsStore> Controller<S> {
    pub fn new(coordinator: HotkeyCoordinator, settings: S) -> Self {
        Self {
            coordinator,
            settings,
            enabled: true,
        }
    }

    /// The persisted combination; an out-of-range index falls back to the
    /// default
    pub fn combo(&self) -> ModifierCombo {
        let index = self.settings.selected_combo_index();
        ModifierCombo::from_index(index).unwrap_or_else(|| {
            warn!(index, "unknown layout combo index, using default");
            ModifierCombo::default()
        })
    }

    pub fn edit_flags(&self) -> EditFlagSet {
        EditFlagSet::from_mask(self.settings.edit_flag_mask())
    }

    /// Install both monitors from the persisted settings
    pub fn start(&mut self) -> Result<(), ControlError> {
        let (combo, flags) = (self.combo(), self.edit_flags());
        info!(%combo, edit_flags = flags.mask(), "starting monitors");
        self.coordinator.enable_all(combo, flags)?;
        Ok(())
    }

    pub fn handle(&mut self, command: ControlCommand) -> Result<SwitcherStatus, ControlError> {
        match command {
            // A change is stored only once the monitor runs with it
            ControlCommand::SetLayoutCombo(combo) => {
                if self.enabled {
                    self.apply(MonitorConfig::Layout(combo))?;
                }
                self.settings.set_selected_combo_index(combo.index())?;
                info!(%combo, "layout combo changed");
            }
            ControlCommand::SetEditFlags(flags) => {
                if self.enabled {
                    self.apply(MonitorConfig::Edit(flags))?;
                }
                self.settings.set_edit_flag_mask(flags.mask())?;
                info!(edit_flags = flags.mask(), "edit shortcuts changed");
            }
            ControlCommand::SetEnabled(enabled) => {
                self.enabled = enabled;
                info!(enabled, "master switch changed");
                if enabled {
                    self.coordinator.enable_all(self.combo(), self.edit_flags())?;
                } else {
                    self.coordinator.disable_all();
                }
            }
            ControlCommand::SetAutostart(enabled) => {
                self.settings.set_autostart_enabled(enabled)?;
                info!(enabled, "autostart preference changed");
            }
            ControlCommand::Status | ControlCommand::Shutdown => {}
        }
        Ok(self.status())
    }

    /// Current state. A live monitor's configuration wins over the stored
    /// one.
    pub fn status(&self) -> SwitcherStatus {
        let combo = match self.coordinator.live_config(MonitorKind::Layout) {
            Some(MonitorConfig::Layout(combo)) => combo,
            _ => self.combo(),
        };
        let flags = match self.coordinator.live_config(MonitorKind::Edit) {
            Some(MonitorConfig::Edit(flags)) => flags,
            _ => self.edit_flags(),
        };
        SwitcherStatus {
            enabled: self.enabled,
            layout_combo: combo,
            combo_index: combo.index(),
            edit_flag_mask: flags.mask(),
            autostart: self.settings.autostart_enabled(),
            layout_monitor_active: self.coordinator.live_handle(MonitorKind::Layout).is_some(),
            edit_monitor_active: self.coordinator.live_handle(MonitorKind::Edit).is_some(),
        }
    }

    /// Reconfigure the live monitor of this kind, or install one if none is
    /// live (e.g. an earlier install failed)
    fn apply(&mut self, config: MonitorConfig) -> Result<(), ControlError> {
        match self.coordinator.live_handle(config.kind()) {
            Some(handle) => self.coordinator.reconfigure(handle, config)?,
            None => match config {
                MonitorConfig::Layout(combo) => self.coordinator.enable_layout_monitor(combo)?,
                MonitorConfig::Edit(flags) => self.coordinator.enable_edit_monitor(flags)?,
            },
        };
        Ok(())
    }
}

/// Run `controller` on its own thread until a shutdown request arrives or
/// every sender is gone. Monitors are removed when the thread exits.
pub fn spawn<S: SettingsStore + 'static>(
    mut controller: Controller<S>,
    mut requests: mpsc::Receiver<ControlRequest>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("switcher-control".to_string())
        .spawn(move || {
            info!("control thread started");
            while let Some(ControlRequest { command, reply }) = requests.blocking_recv() {
                let result = controller.handle(command);
                if let Err(e) = &result {
                    error!(?command, %e, "control request failed");
                }
                let _ = reply.send(result);
                if command == ControlCommand::Shutdown {
                    break;
                }
            }
            controller.coordinator.disable_all();
            info!("control thread stopped");
        })
}

/// Cloneable handle for sending requests to the control thread
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    pub fn new(tx: mpsc::Sender<ControlRequest>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, command: ControlCommand) -> Result<SwitcherStatus, ControlError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ControlRequest { command, reply })
            .await
            .map_err(|_| ControlError::Stopped)?;
        response.await.map_err(|_| ControlError::Stopped)?
    }
}
