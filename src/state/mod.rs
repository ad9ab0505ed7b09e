//! State machine module for layout-switch combo detection
//!
//! Provides an explicit two-state machine:
//! - Idle: waiting for the configured Shift combination
//! - ComboHeld: combination held, already fired for this press

mod machine;

pub use machine::ModifierComboDetector;
