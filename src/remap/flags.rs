//! Editing shortcut groups and the set type persisted as a bitmask

use serde::{Deserialize, Serialize};

/// One group of Control shortcuts that can be remapped to Command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditHotKeyFlag {
    /// Control+Z
    UndoRedo,
    /// Control+X / C / V
    CopyPaste,
    /// Control+F
    Find,
    /// Control+A
    SelectAll,
    /// Control+O / S
    OpenSave,
    /// Control+P
    Print,
}

impl EditHotKeyFlag {
    /// Every group in bit order
    pub const ALL: [EditHotKeyFlag; 6] = [
        EditHotKeyFlag::UndoRedo,
        EditHotKeyFlag::CopyPaste,
        EditHotKeyFlag::Find,
        EditHotKeyFlag::SelectAll,
        EditHotKeyFlag::OpenSave,
        EditHotKeyFlag::Print,
    ];

    /// Bit of this group in the persisted mask
    pub const fn bit(self) -> u32 {
        match self {
            EditHotKeyFlag::UndoRedo => 1 << 0,
            EditHotKeyFlag::CopyPaste => 1 << 1,
            EditHotKeyFlag::Find => 1 << 2,
            EditHotKeyFlag::SelectAll => 1 << 3,
            EditHotKeyFlag::OpenSave => 1 << 4,
            EditHotKeyFlag::Print => 1 << 5,
        }
    }

    /// Characters that trigger this group. Fixed, never user editable.
    pub const fn triggers(self) -> &'static [char] {
        match self {
            EditHotKeyFlag::UndoRedo => &['z'],
            EditHotKeyFlag::CopyPaste => &['x', 'c', 'v'],
            EditHotKeyFlag::Find => &['f'],
            EditHotKeyFlag::SelectAll => &['a'],
            EditHotKeyFlag::OpenSave => &['o', 's'],
            EditHotKeyFlag::Print => &['p'],
        }
    }
}

/// Set of enabled shortcut groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EditFlagSet(u32);

impl EditFlagSet {
    /// No group enabled
    pub const EMPTY: Self = Self(0);

    /// Build from a persisted mask; unknown bits are dropped
    pub fn from_mask(mask: u32) -> Self {
        Self(mask & Self::all().0)
    }

    /// Every group enabled
    pub fn all() -> Self {
        EditHotKeyFlag::ALL.into_iter().collect()
    }

    /// The mask to persist
    pub fn mask(self) -> u32 {
        self.0
    }

    /// Whether `flag` is enabled
    pub fn contains(self, flag: EditHotKeyFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Enable `flag`
    pub fn insert(&mut self, flag: EditHotKeyFlag) {
        self.0 |= flag.bit();
    }

    /// Enabled groups in declaration order
    pub fn iter(self) -> impl Iterator<Item = EditHotKeyFlag> {
        EditHotKeyFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }
}

impl FromIterator<EditHotKeyFlag> for EditFlagSet {
    fn from_iter<I: IntoIterator<Item = EditHotKeyFlag>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}
