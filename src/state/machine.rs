//! Rising-edge detector for the layout-switch combination
//!
//! Two explicit states: Idle and ComboHeld. A modifier snapshot that holds
//! the configured pair moves Idle to ComboHeld and fires once; holding the
//! pair keeps ComboHeld without firing again; any snapshot without the pair
//! returns to Idle.

use tracing::debug;

use crate::hotkey::{ModifierCombo, Modifiers};

/// Detector state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComboState {
    /// Waiting for the combination
    #[default]
    Idle,
    /// The combination is held and has already fired
    ComboHeld,
}

impl std::fmt::Display for ComboState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComboState::Idle => write!(f, "Idle"),
            ComboState::ComboHeld => write!(f, "ComboHeld"),
        }
    }
}

/// Fires a callback on each press of the configured combination.
///
/// A detector watches exactly one combination for its whole life; a new
/// combination means a new detector.
pub struct ModifierComboDetector<F: FnMut()> {
    combo: ModifierCombo,
    state: ComboState,
    on_trigger: F,
}

impl<F: FnMut()> ModifierComboDetector<F> {
    /// Create a detector in the Idle state
    pub fn new(combo: ModifierCombo, on_trigger: F) -> Self {
        Self {
            combo,
            state: ComboState::Idle,
            on_trigger,
        }
    }

    /// The combination this detector watches
    #[cfg(test)]
    pub fn combo(&self) -> ModifierCombo {
        self.combo
    }

    /// Get the current state
    #[cfg(test)]
    pub fn state(&self) -> ComboState {
        self.state
    }

    /// Feed one flags-changed snapshot. Returns true when the callback fired.
    pub fn handle_modifier_change(&mut self, modifiers: Modifiers) -> bool {
        let held = self.combo.is_held(&modifiers);
        let next = if held {
            ComboState::ComboHeld
        } else {
            ComboState::Idle
        };

        let fired = self.state == ComboState::Idle && next == ComboState::ComboHeld;
        if next != self.state {
            debug!(combo = %self.combo, from = %self.state, to = %next, "combo state transition");
            self.state = next;
        }

        if fired {
            (self.on_trigger)();
        }
        fired
    }
}
