//! Key event decoding and synthetic key event posting
//!
//! Synthetic events come from a HID-system-state event source and are
//! posted at the HID tap, the same level as physical keyboard input.

use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, EventField};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use foreign_types::ForeignType;
use tracing::{debug, warn};

use crate::hotkey::Modifiers;
use crate::platform::{EventPoster, KeyDown};

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventKeyboardGetUnicodeString(
        event: core_graphics::sys::CGEventRef,
        max_len: usize,
        actual_len: *mut usize,
        buffer: *mut u16,
    );
}

/// Decode a key-down CGEvent
pub fn key_down_from_event(event: &CGEvent) -> KeyDown {
    let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
    let modifiers = Modifiers::from_raw(event.get_flags().bits());
    KeyDown {
        character: unmodified_character(event, modifiers.shift),
        key_code,
        modifiers,
    }
}

/// First character the event types, with the Control transform undone
fn unmodified_character(event: &CGEvent, shift: bool) -> Option<char> {
    let mut buffer = [0u16; 4];
    let mut len = 0usize;
    unsafe {
        CGEventKeyboardGetUnicodeString(
            event.as_ptr(),
            buffer.len(),
            &mut len,
            buffer.as_mut_ptr(),
        );
    }
    let unit = *buffer.get(..len)?.first()?;
    strip_control(char::decode_utf16([unit]).next()?.ok()?, shift)
}

/// With Control held the OS reports letters as C0 control codes
/// (Ctrl+A = 0x01 .. Ctrl+Z = 0x1A) whatever the Shift state; map those
/// back to the letter Shift would have typed.
fn strip_control(c: char, shift: bool) -> Option<char> {
    let base = if shift { b'A' } else { b'a' };
    match c as u32 {
        code @ 0x01..=0x1A => char::from_u32(u32::from(base) + code - 1),
        0x00 | 0x1B..=0x1F | 0x7F => None,
        _ => Some(c),
    }
}

/// Posts synthetic key events at the HID event tap
pub struct HidEventPoster;

impl EventPoster for HidEventPoster {
    fn post_key_event(&self, key_code: u16, down: bool, flags: Modifiers) {
        let Ok(source) = CGEventSource::new(CGEventSourceStateID::HIDSystemState) else {
            warn!(key_code, "failed to create event source");
            return;
        };
        let Ok(event) = CGEvent::new_keyboard_event(source, key_code, down) else {
            warn!(key_code, down, "failed to create keyboard event");
            return;
        };

        // Replace whatever the source pre-filled
        event.set_flags(CGEventFlags::from_bits_truncate(flags.to_raw()));
        event.post(CGEventTapLocation::HID);
        debug!(key_code, down, ?flags, "posted synthetic key event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_control_letters() {
        assert_eq!(strip_control('\u{03}', false), Some('c'));
        assert_eq!(strip_control('\u{1A}', false), Some('z'));
        assert_eq!(strip_control('\u{01}', false), Some('a'));
    }

    #[test]
    fn test_strip_control_keeps_shift_case() {
        assert_eq!(strip_control('\u{1A}', true), Some('Z'));
        assert_eq!(strip_control('\u{13}', true), Some('S'));
    }

    #[test]
    fn test_strip_control_passthrough() {
        assert_eq!(strip_control('c', false), Some('c'));
        assert_eq!(strip_control('Z', true), Some('Z'));
        assert_eq!(strip_control('\u{1B}', false), None);
    }
}
