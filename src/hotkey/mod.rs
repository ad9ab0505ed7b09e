//! Hotkey module: modifier snapshots and layout-switch combinations

mod keys;

pub use keys::{ModifierCombo, Modifiers};
