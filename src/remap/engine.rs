//! Control-to-Command shortcut remapping
//!
//! The engine only decides. Posting the synthetic keystroke and suppressing
//! the original event is left to the tap that owns the engine.

use std::collections::HashSet;
use std::sync::Arc;

use super::flags::EditFlagSet;
use crate::hotkey::Modifiers;
use crate::platform::EventPoster;

/// Characters whose Control shortcut is remapped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTable(HashSet<char>);

impl TriggerTable {
    /// Union of the trigger characters of every group in `flags`
    pub fn for_flags(flags: EditFlagSet) -> Self {
        Self(
            flags
                .iter()
                .flat_map(|flag| flag.triggers().iter().copied())
                .collect(),
        )
    }

    /// Whether `c` triggers a remap
    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }
}

/// Decision for one key-down event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the event alone
    PassThrough,
    /// Drop the event and type the same physical key with Command instead
    Substitute(u16),
}

/// Decides which Control shortcuts become Command shortcuts
#[derive(Debug, Clone, Default)]
pub struct EditKeyRemapEngine {
    triggers: Arc<TriggerTable>,
}

impl EditKeyRemapEngine {
    pub fn new(flags: EditFlagSet) -> Self {
        let mut engine = Self::default();
        engine.set_active_flags(flags);
        engine
    }

    #[cfg(test)]
    pub fn trigger_table(&self) -> &TriggerTable {
        &self.triggers
    }

    /// Replace the enabled groups and rebuild the trigger table
    pub fn set_active_flags(&mut self, flags: EditFlagSet) {
        self.triggers = Arc::new(TriggerTable::for_flags(flags));
    }

    pub fn handle_key_down(
        &self,
        character: Option<char>,
        key_code: u16,
        modifiers: Modifiers,
    ) -> Action {
        if !modifiers.control {
            return Action::PassThrough;
        }
        // Case is significant: Ctrl+Shift+Z reports 'Z' and stays as typed
        let triggered = character.is_some_and(|c| self.triggers.contains(c));
        if triggered {
            Action::Substitute(key_code)
        } else {
            Action::PassThrough
        }
    }
}

/// One synthetic key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticKeyEvent {
    pub key_code: u16,
    pub down: bool,
    pub flags: Modifiers,
}

/// Key-down plus key-up of one physical key with fixed flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticKeyStroke {
    key_code: u16,
    flags: Modifiers,
}

impl SyntheticKeyStroke {
    /// The Command shortcut for `key_code`. Flags are exactly Command;
    /// nothing from the original event is carried over.
    pub fn command(key_code: u16) -> Self {
        Self {
            key_code,
            flags: Modifiers::COMMAND,
        }
    }

    /// The two events in posting order: down, then up
    pub fn events(&self) -> [SyntheticKeyEvent; 2] {
        [true, false].map(|down| SyntheticKeyEvent {
            key_code: self.key_code,
            down,
            flags: self.flags,
        })
    }

    pub fn post(&self, poster: &dyn EventPoster) {
        for event in self.events() {
            poster.post_key_event(event.key_code, event.down, event.flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePoster;
    use crate::remap::EditHotKeyFlag;

    const KEY_C: u16 = 8;

    fn control() -> Modifiers {
        Modifiers {
            control: true,
            ..Default::default()
        }
    }

    fn flags(list: &[EditHotKeyFlag]) -> EditFlagSet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_trigger_table_union() {
        let engine =
            EditKeyRemapEngine::new(flags(&[EditHotKeyFlag::UndoRedo, EditHotKeyFlag::CopyPaste]));
        let mut chars: Vec<char> = engine.trigger_table().chars().collect();
        chars.sort_unstable();
        assert_eq!(chars, ['c', 'v', 'x', 'z']);
    }

    #[test]
    fn test_empty_mask_passes_everything() {
        let engine = EditKeyRemapEngine::new(EditFlagSet::from_mask(0));
        assert!(engine.trigger_table().is_empty());
        for c in ('a'..='z').chain('0'..='9') {
            assert_eq!(engine.handle_key_down(Some(c), 0, control()), Action::PassThrough);
        }
    }

    #[test]
    fn test_control_c_with_copy_paste() {
        let mut engine = EditKeyRemapEngine::new(flags(&[EditHotKeyFlag::CopyPaste]));
        assert_eq!(
            engine.handle_key_down(Some('c'), KEY_C, control()),
            Action::Substitute(KEY_C)
        );

        engine.set_active_flags(flags(&[EditHotKeyFlag::Find]));
        assert_eq!(engine.handle_key_down(Some('c'), KEY_C, control()), Action::PassThrough);
    }

    #[test]
    fn test_without_control_always_passes() {
        let engine = EditKeyRemapEngine::new(EditFlagSet::all());
        assert_eq!(
            engine.handle_key_down(Some('c'), KEY_C, Modifiers::default()),
            Action::PassThrough
        );
        assert_eq!(
            engine.handle_key_down(Some('c'), KEY_C, Modifiers::COMMAND),
            Action::PassThrough
        );
    }

    #[test]
    fn test_shifted_character_passes() {
        let engine = EditKeyRemapEngine::new(flags(&[EditHotKeyFlag::UndoRedo]));
        let control_shift = Modifiers {
            control: true,
            shift: true,
            ..Default::default()
        };
        // Ctrl+Shift+Z is redo, not undo
        assert_eq!(
            engine.handle_key_down(Some('Z'), 6, control_shift),
            Action::PassThrough
        );
    }

    #[test]
    fn test_extra_modifiers_still_match() {
        let engine = EditKeyRemapEngine::new(flags(&[EditHotKeyFlag::UndoRedo]));
        let control_option = Modifiers {
            control: true,
            option: true,
            ..Default::default()
        };
        assert_eq!(
            engine.handle_key_down(Some('z'), 6, control_option),
            Action::Substitute(6)
        );
    }

    #[test]
    fn test_missing_character_passes() {
        let engine = EditKeyRemapEngine::new(EditFlagSet::all());
        assert_eq!(engine.handle_key_down(None, KEY_C, control()), Action::PassThrough);
    }

    #[test]
    fn test_stroke_is_down_then_up_with_command_only() {
        let poster = FakePoster::default();
        SyntheticKeyStroke::command(KEY_C).post(&poster);

        let posted = poster.posted();
        assert_eq!(posted.len(), 2);
        assert!(posted[0].down);
        assert!(!posted[1].down);
        for event in posted {
            assert_eq!(event.key_code, KEY_C);
            assert_eq!(event.flags, Modifiers::COMMAND);
        }
    }
}
