//! Modifier key definitions and the layout-switch combinations
//!
//! Provides the raw macOS event flag bits, a struct for tracking the
//! modifier keys present in one event, and the four selectable
//! Shift-based combinations used to rotate keyboard layouts.

use serde::{Deserialize, Serialize};

/// Modifier flag masks as laid out in macOS `CGEventFlags`
pub mod flags {
    /// Shift key modifier flag
    pub const SHIFT: u64 = 0x0002_0000;
    /// Control key modifier flag
    pub const CONTROL: u64 = 0x0004_0000;
    /// Option/Alt key modifier flag
    pub const OPTION: u64 = 0x0008_0000;
    /// Command key modifier flag
    pub const COMMAND: u64 = 0x0010_0000;
    /// Fn key modifier flag (`kCGEventFlagMaskSecondaryFn`)
    pub const FUNCTION: u64 = 0x0080_0000;
}

/// Modifier keys present in a single event snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held
    pub shift: bool,
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
    /// Fn key is held
    pub function: bool,
}

impl Modifiers {
    /// Only the Command modifier
    pub const COMMAND: Self = Self {
        shift: false,
        control: false,
        option: false,
        command: true,
        function: false,
    };

    /// Decode a raw event flag word. Bits outside the five modifiers
    /// (caps lock, numeric pad, device-dependent bits) are dropped.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            shift: raw & flags::SHIFT != 0,
            control: raw & flags::CONTROL != 0,
            option: raw & flags::OPTION != 0,
            command: raw & flags::COMMAND != 0,
            function: raw & flags::FUNCTION != 0,
        }
    }

    /// Encode back into a raw flag word containing only modifier bits
    pub fn to_raw(self) -> u64 {
        let mut raw = 0;
        if self.shift {
            raw |= flags::SHIFT;
        }
        if self.control {
            raw |= flags::CONTROL;
        }
        if self.option {
            raw |= flags::OPTION;
        }
        if self.command {
            raw |= flags::COMMAND;
        }
        if self.function {
            raw |= flags::FUNCTION;
        }
        raw
    }


    /// Check whether a single modifier is held
    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Control => self.control,
            Modifier::Option => self.option,
            Modifier::Command => self.command,
            Modifier::Function => self.function,
        }
    }
}

/// A modifier that pairs with Shift in a layout-switch combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Option,
    Command,
    Function,
}

/// The Shift-based pairs that can rotate the keyboard layout.
///
/// The discriminant order is the persisted index order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCombo {
    /// Shift + Fn
    #[default]
    ShiftFunction,
    /// Shift + Option
    ShiftOption,
    /// Shift + Control
    ShiftControl,
    /// Shift + Command
    ShiftCommand,
}

impl ModifierCombo {
    /// All combinations in persisted index order
    pub const ALL: [ModifierCombo; 4] = [
        ModifierCombo::ShiftFunction,
        ModifierCombo::ShiftOption,
        ModifierCombo::ShiftControl,
        ModifierCombo::ShiftCommand,
    ];

    /// Look up a combination by its persisted index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Persisted index of this combination
    pub fn index(self) -> usize {
        match self {
            ModifierCombo::ShiftFunction => 0,
            ModifierCombo::ShiftOption => 1,
            ModifierCombo::ShiftControl => 2,
            ModifierCombo::ShiftCommand => 3,
        }
    }

    /// The modifier paired with Shift
    pub fn secondary(self) -> Modifier {
        match self {
            ModifierCombo::ShiftFunction => Modifier::Function,
            ModifierCombo::ShiftOption => Modifier::Option,
            ModifierCombo::ShiftControl => Modifier::Control,
            ModifierCombo::ShiftCommand => Modifier::Command,
        }
    }

    /// Whether the snapshot contains both Shift and the secondary modifier.
    /// Other held modifiers do not matter.
    pub fn is_held(self, modifiers: &Modifiers) -> bool {
        modifiers.shift && modifiers.contains(self.secondary())
    }
}

impl std::fmt::Display for ModifierCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModifierCombo::ShiftFunction => write!(f, "Shift+Fn"),
            ModifierCombo::ShiftOption => write!(f, "Shift+Option"),
            ModifierCombo::ShiftControl => write!(f, "Shift+Control"),
            ModifierCombo::ShiftCommand => write!(f, "Shift+Command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = Modifiers::default();
        assert_eq!(state.to_raw(), 0);
        assert_eq!(Modifiers::from_raw(0), state);
    }

    #[test]
    fn test_from_raw_drops_unrelated_bits() {
        // caps lock and numeric pad bits
        let raw = flags::SHIFT | flags::COMMAND | 0x0001_0000 | 0x0020_0000;
        let state = Modifiers::from_raw(raw);
        assert!(state.shift);
        assert!(state.command);
        assert!(!state.control);
        assert_eq!(state.to_raw(), flags::SHIFT | flags::COMMAND);
    }

    #[test]
    fn test_command_constant() {
        assert_eq!(Modifiers::COMMAND.to_raw(), flags::COMMAND);
    }

    #[test]
    fn test_combo_index_order() {
        for (i, combo) in ModifierCombo::ALL.iter().enumerate() {
            assert_eq!(combo.index(), i);
            assert_eq!(ModifierCombo::from_index(i), Some(*combo));
        }
        assert_eq!(ModifierCombo::from_index(4), None);
    }

    #[test]
    fn test_combo_held_uses_containment() {
        let shift_option_control = Modifiers {
            shift: true,
            option: true,
            control: true,
            ..Default::default()
        };
        assert!(ModifierCombo::ShiftOption.is_held(&shift_option_control));
        assert!(ModifierCombo::ShiftControl.is_held(&shift_option_control));
        assert!(!ModifierCombo::ShiftCommand.is_held(&shift_option_control));
    }

    #[test]
    fn test_combo_requires_shift() {
        let option_only = Modifiers {
            option: true,
            ..Default::default()
        };
        assert!(!ModifierCombo::ShiftOption.is_held(&option_only));

        let shift_only = Modifiers {
            shift: true,
            ..Default::default()
        };
        for combo in ModifierCombo::ALL {
            assert!(!combo.is_held(&shift_only));
        }
    }
}
