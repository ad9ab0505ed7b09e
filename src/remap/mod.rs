//! Editing shortcut remapping: Control+key becomes Command+key

mod engine;
mod flags;

pub use engine::{Action, EditKeyRemapEngine, SyntheticKeyStroke};
pub use flags::EditFlagSet;
#[cfg(test)]
pub use flags::EditHotKeyFlag;
