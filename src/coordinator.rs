//! Wires the combo detector and the remap engine to OS event taps
//!
//! At most one monitor per kind is live. Every change of configuration
//! installs a brand new tap with fresh detector / engine state; nothing is
//! patched in place.
//!
//! Swapping a monitor is staged: the new tap is installed disarmed, the old
//! tap is removed (synchronously), then the new tap is armed. If installing
//! the new tap fails the old one keeps running. Events arriving between the
//! removal and the arming are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::hotkey::{ModifierCombo, Modifiers};
use crate::input_source::{InputSourceRegistry, LayoutRotator};
use crate::platform::{
    Backend, FlagsCallback, KeyDisposition, KeyDown, KeyDownCallback, TapError, TapHandle,
};
use crate::remap::{Action, EditFlagSet, EditKeyRemapEngine, SyntheticKeyStroke};
use crate::state::ModifierComboDetector;

/// The two kinds of monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    /// Flags-changed tap driving layout rotation
    Layout,
    /// Key-down tap driving shortcut remapping
    Edit,
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorKind::Layout => write!(f, "layout"),
            MonitorKind::Edit => write!(f, "edit"),
        }
    }
}

/// Configuration of one monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorConfig {
    /// Rotate layouts when this combination is pressed
    Layout(ModifierCombo),
    /// Remap the Control shortcuts of these groups
    Edit(EditFlagSet),
}

impl MonitorConfig {
    /// Which slot this configuration belongs in
    pub fn kind(&self) -> MonitorKind {
        match self {
            MonitorConfig::Layout(_) => MonitorKind::Layout,
            MonitorConfig::Edit(_) => MonitorKind::Edit,
        }
    }
}

/// Token for one installed monitor. Handles are never reused, so a handle
/// that outlived its monitor is simply stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorHandle {
    id: u64,
    kind: MonitorKind,
}

/// Errors surfaced to whoever enables or reconfigures a monitor
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("failed to install {kind} monitor: {source}")]
    TapInstall {
        kind: MonitorKind,
        #[source]
        source: TapError,
    },
}

struct LiveMonitor {
    handle: MonitorHandle,
    config: MonitorConfig,
    tap: TapHandle,
    armed: Arc<AtomicBool>,
}

/// Owns the live taps and everything their callbacks reference
pub struct HotkeyCoordinator {
    backend: Backend,
    registry: InputSourceRegistry,
    layout: Option<LiveMonitor>,
    edit: Option<LiveMonitor>,
    next_id: u64,
}

impl HotkeyCoordinator {
    pub fn new(backend: Backend) -> Self {
        let registry = InputSourceRegistry::new(Arc::clone(&backend.input_sources));
        Self {
            backend,
            registry,
            layout: None,
            edit: None,
            next_id: 1,
        }
    }

    /// Snapshot the selectable sources and start rotating them on `combo`
    pub fn enable_layout_monitor(
        &mut self,
        combo: ModifierCombo,
    ) -> Result<MonitorHandle, CoordinatorError> {
        self.swap_in(MonitorConfig::Layout(combo), None)
    }

    /// Start remapping the Control shortcuts in `flags`
    pub fn enable_edit_monitor(
        &mut self,
        flags: EditFlagSet,
    ) -> Result<MonitorHandle, CoordinatorError> {
        self.swap_in(MonitorConfig::Edit(flags), None)
    }

    /// Replace the monitor behind `handle` with one built from `config`
    pub fn reconfigure(
        &mut self,
        handle: MonitorHandle,
        config: MonitorConfig,
    ) -> Result<MonitorHandle, CoordinatorError> {
        self.swap_in(config, Some(handle))
    }

    /// Remove the monitor behind `handle`. Stale handles are ignored.
    pub fn disable(&mut self, handle: MonitorHandle) {
        let slot = self.slot_mut(handle.kind);
        if slot.as_ref().map(|m| m.handle) != Some(handle) {
            debug!(kind = %handle.kind, id = handle.id, "monitor already disabled");
            return;
        }
        if let Some(monitor) = slot.take() {
            self.teardown(monitor);
        }
    }

    /// Master switch on: install both monitors
    pub fn enable_all(
        &mut self,
        combo: ModifierCombo,
        flags: EditFlagSet,
    ) -> Result<(), CoordinatorError> {
        self.enable_layout_monitor(combo)?;
        self.enable_edit_monitor(flags)?;
        Ok(())
    }

    /// Master switch off: remove both monitors
    pub fn disable_all(&mut self) {
        for kind in [MonitorKind::Layout, MonitorKind::Edit] {
            if let Some(handle) = self.live_handle(kind) {
                self.disable(handle);
            }
        }
    }

    /// Handle of the live monitor of `kind`
    pub fn live_handle(&self, kind: MonitorKind) -> Option<MonitorHandle> {
        self.slot(kind).as_ref().map(|m| m.handle)
    }

    /// Configuration of the live monitor of `kind`
    pub fn live_config(&self, kind: MonitorKind) -> Option<MonitorConfig> {
        self.slot(kind).as_ref().map(|m| m.config)
    }

    fn slot(&self, kind: MonitorKind) -> &Option<LiveMonitor> {
        match kind {
            MonitorKind::Layout => &self.layout,
            MonitorKind::Edit => &self.edit,
        }
    }

    fn slot_mut(&mut self, kind: MonitorKind) -> &mut Option<LiveMonitor> {
        match kind {
            MonitorKind::Layout => &mut self.layout,
            MonitorKind::Edit => &mut self.edit,
        }
    }

    fn swap_in(
        &mut self,
        config: MonitorConfig,
        retire: Option<MonitorHandle>,
    ) -> Result<MonitorHandle, CoordinatorError> {
        let staged = self.stage(config)?;

        if let Some(handle) = retire {
            self.disable(handle);
        }
        if let Some(old) = self.slot_mut(config.kind()).take() {
            self.teardown(old);
        }

        staged.armed.store(true, Ordering::Release);
        let handle = staged.handle;
        info!(kind = %handle.kind, id = handle.id, ?config, "monitor enabled");
        *self.slot_mut(config.kind()) = Some(staged);
        Ok(handle)
    }

    /// Install a disarmed tap for `config`
    fn stage(&mut self, config: MonitorConfig) -> Result<LiveMonitor, CoordinatorError> {
        let armed = Arc::new(AtomicBool::new(false));
        let installed = match config {
            MonitorConfig::Layout(combo) => {
                let callback = self.layout_callback(combo, Arc::clone(&armed));
                self.backend.taps.install_flags_changed_tap(callback)
            }
            MonitorConfig::Edit(flags) => {
                let callback = self.edit_callback(flags, Arc::clone(&armed));
                self.backend.taps.install_key_down_tap(callback)
            }
        };
        let tap = installed.map_err(|source| CoordinatorError::TapInstall {
            kind: config.kind(),
            source,
        })?;

        let handle = MonitorHandle {
            id: self.next_id,
            kind: config.kind(),
        };
        self.next_id += 1;
        Ok(LiveMonitor {
            handle,
            config,
            tap,
            armed,
        })
    }

    fn teardown(&self, monitor: LiveMonitor) {
        monitor.armed.store(false, Ordering::Release);
        self.backend.taps.remove(monitor.tap);
        info!(kind = %monitor.handle.kind, id = monitor.handle.id, "monitor disabled");
    }

    fn layout_callback(&self, combo: ModifierCombo, armed: Arc<AtomicBool>) -> FlagsCallback {
        let registry = self.registry.clone();
        let rotator = LayoutRotator::new(registry.list_selectable_sources());
        info!(%combo, sources = rotator.sources().len(), "input sources snapshot taken");

        let mut detector =
            ModifierComboDetector::new(combo, move || select_next_layout(&registry, &rotator));
        Box::new(move |modifiers: Modifiers| {
            if armed.load(Ordering::Acquire) {
                detector.handle_modifier_change(modifiers);
            }
        })
    }

    fn edit_callback(&self, flags: EditFlagSet, armed: Arc<AtomicBool>) -> KeyDownCallback {
        let engine = EditKeyRemapEngine::new(flags);
        let poster = Arc::clone(&self.backend.poster);

        Box::new(move |key: &KeyDown| {
            if !armed.load(Ordering::Acquire) {
                return KeyDisposition::Pass;
            }
            match engine.handle_key_down(key.character, key.key_code, key.modifiers) {
                Action::PassThrough => KeyDisposition::Pass,
                Action::Substitute(key_code) => {
                    SyntheticKeyStroke::command(key_code).post(poster.as_ref());
                    KeyDisposition::Suppress
                }
            }
        })
    }
}

impl Drop for HotkeyCoordinator {
    fn drop(&mut self) {
        self.disable_all();
    }
}

fn select_next_layout(registry: &InputSourceRegistry, rotator: &LayoutRotator) {
    let Some(current) = registry.current_source_id() else {
        debug!("no current input source");
        return;
    };
    match rotator.next(&current) {
        Some(next) => {
            debug!(from = %current, to = %next, "switching input source");
            registry.activate(&next);
        }
        None => debug!(%current, "nothing to rotate to"),
    }
}
