//! Keyboard input sources via the Carbon Text Input Sources API

use std::os::raw::c_void;

use core_foundation::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{Boolean, CFRelease, CFTypeRef, TCFType};
use core_foundation::boolean::{CFBoolean, CFBooleanRef};
use core_foundation::dictionary::CFDictionaryRef;
use core_foundation::string::{CFString, CFStringRef};
use tracing::debug;

use crate::platform::{InputSourceApi, InputSourceError, RawInputSource, SourceCategory};

type TISInputSourceRef = *const c_void;

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    fn TISCreateInputSourceList(
        properties: CFDictionaryRef,
        include_all_installed: Boolean,
    ) -> CFArrayRef;
    fn TISCopyCurrentKeyboardInputSource() -> TISInputSourceRef;
    fn TISGetInputSourceProperty(source: TISInputSourceRef, key: CFStringRef) -> *const c_void;
    fn TISSelectInputSource(source: TISInputSourceRef) -> i32;

    static kTISPropertyInputSourceID: CFStringRef;
    static kTISPropertyInputSourceCategory: CFStringRef;
    static kTISPropertyInputSourceIsSelectCapable: CFStringRef;
    static kTISCategoryKeyboardInputSource: CFStringRef;
}

/// Owned list of enabled input sources
struct SourceList(CFArrayRef);

impl SourceList {
    fn enabled() -> Option<Self> {
        let list = unsafe { TISCreateInputSourceList(std::ptr::null(), 0) };
        (!list.is_null()).then_some(Self(list))
    }

    fn iter(&self) -> impl Iterator<Item = TISInputSourceRef> + '_ {
        let count = unsafe { CFArrayGetCount(self.0) };
        (0..count).map(move |i| unsafe { CFArrayGetValueAtIndex(self.0, i) as TISInputSourceRef })
    }
}

impl Drop for SourceList {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) }
    }
}

fn string_property(source: TISInputSourceRef, key: CFStringRef) -> Option<String> {
    let value = unsafe { TISGetInputSourceProperty(source, key) };
    if value.is_null() {
        return None;
    }
    Some(unsafe { CFString::wrap_under_get_rule(value as CFStringRef) }.to_string())
}

fn bool_property(source: TISInputSourceRef, key: CFStringRef) -> Option<bool> {
    let value = unsafe { TISGetInputSourceProperty(source, key) };
    if value.is_null() {
        return None;
    }
    Some(unsafe { CFBoolean::wrap_under_get_rule(value as CFBooleanRef) }.into())
}

fn source_id(source: TISInputSourceRef) -> Option<String> {
    string_property(source, unsafe { kTISPropertyInputSourceID })
}

/// Text Input Sources backed implementation of [`InputSourceApi`]
pub struct TisInputSources;

impl InputSourceApi for TisInputSources {
    fn enumerate(&self) -> Result<Vec<RawInputSource>, InputSourceError> {
        let list = SourceList::enabled().ok_or(InputSourceError::Unavailable)?;
        let keyboard = unsafe { CFString::wrap_under_get_rule(kTISCategoryKeyboardInputSource) }
            .to_string();

        let sources = list
            .iter()
            .filter_map(|source| {
                let id = source_id(source)?;
                let category = string_property(source, unsafe { kTISPropertyInputSourceCategory })
                    .map(|category| {
                        if category == keyboard {
                            SourceCategory::KeyboardInput
                        } else {
                            SourceCategory::Other(category)
                        }
                    });
                let selectable =
                    bool_property(source, unsafe { kTISPropertyInputSourceIsSelectCapable });
                Some(RawInputSource {
                    id,
                    category,
                    selectable,
                })
            })
            .collect();
        Ok(sources)
    }

    fn current(&self) -> Option<String> {
        let source = unsafe { TISCopyCurrentKeyboardInputSource() };
        if source.is_null() {
            return None;
        }
        let id = source_id(source);
        unsafe { CFRelease(source as CFTypeRef) };
        id
    }

    fn select(&self, id: &str) -> Result<bool, InputSourceError> {
        let list = SourceList::enabled().ok_or(InputSourceError::Unavailable)?;
        let Some(source) = list.iter().find(|s| source_id(*s).as_deref() == Some(id)) else {
            return Ok(false);
        };

        let status = unsafe { TISSelectInputSource(source) };
        if status != 0 {
            return Err(InputSourceError::Select {
                id: id.to_string(),
                status,
            });
        }
        debug!(id, "input source selected");
        Ok(true)
    }
}
