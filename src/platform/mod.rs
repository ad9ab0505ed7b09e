//! OS collaborator interfaces
//!
//! Everything the daemon needs from the operating system goes through the
//! three traits here: input source enumeration and selection, global event
//! taps, and synthetic key event posting. The macOS backend implements them
//! with CoreGraphics and Carbon; tests use the recording fakes in `fake`.

use std::sync::Arc;

use crate::hotkey::Modifiers;

#[cfg(test)]
pub mod fake;
#[cfg(target_os = "macos")]
pub mod macos;

/// One input source as reported by the OS, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInputSource {
    /// Stable input source identifier (e.g. `com.apple.keylayout.US`)
    pub id: String,
    /// Reported category, `None` when the property is missing
    pub category: Option<SourceCategory>,
    /// Reported select capability, `None` when the property is missing
    pub selectable: Option<bool>,
}

/// Input source category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCategory {
    /// A keyboard layout or input method
    KeyboardInput,
    /// Palettes, ink and other non-keyboard sources
    Other(String),
}

/// A key-down event delivered to a key-down tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDown {
    /// Character produced by the key with modifiers ignored, if any
    pub character: Option<char>,
    /// Physical (virtual) key code
    pub key_code: u16,
    /// Modifiers held with the key
    pub modifiers: Modifiers,
}

/// What a key-down tap wants done with the original event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Deliver the event unchanged
    Pass,
    /// Drop the event
    Suppress,
}

/// Callback invoked for every flags-changed event
pub type FlagsCallback = Box<dyn FnMut(Modifiers) + Send>;

/// Callback invoked for every key-down event
pub type KeyDownCallback = Box<dyn FnMut(&KeyDown) -> KeyDisposition + Send>;

/// Opaque identifier of one installed OS tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapHandle(pub u64);

/// Errors raised at the OS boundary
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn tap thread: {0}")]
    ThreadSpawn(String),

    #[error("event taps are not supported on this platform")]
    Unsupported,
}

/// Errors raised while enumerating or selecting input sources
#[derive(Debug, thiserror::Error)]
pub enum InputSourceError {
    #[error("input source list unavailable")]
    Unavailable,

    #[error("failed to select input source {id}: status {status}")]
    Select { id: String, status: i32 },
}

/// Keyboard input source queries and selection
pub trait InputSourceApi: Send + Sync {
    /// Enumerate all enabled input sources in OS order
    fn enumerate(&self) -> Result<Vec<RawInputSource>, InputSourceError>;

    /// Identifier of the active keyboard input source
    fn current(&self) -> Option<String>;

    /// Select the source with the given identifier.
    /// Returns `Ok(false)` when no such source exists.
    fn select(&self, id: &str) -> Result<bool, InputSourceError>;
}

/// Global event taps
pub trait EventTapApi: Send + Sync {
    /// Install a listen-only tap for modifier flag changes
    fn install_flags_changed_tap(&self, callback: FlagsCallback) -> Result<TapHandle, TapError>;

    /// Install an active tap for key-down events
    fn install_key_down_tap(&self, callback: KeyDownCallback) -> Result<TapHandle, TapError>;

    /// Remove a tap. Unknown handles are ignored. No callback for the
    /// removed tap runs after this returns.
    fn remove(&self, handle: TapHandle);
}

/// Synthetic key event injection
pub trait EventPoster: Send + Sync {
    /// Post one hardware-level key event whose flags are exactly `flags`
    fn post_key_event(&self, key_code: u16, down: bool, flags: Modifiers);
}

/// Errors raised while preparing the platform backend
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("accessibility permission has not been granted")]
    PermissionDenied,

    #[error("this platform is not supported")]
    Unsupported,
}

/// The set of OS collaborators the coordinator works with
#[derive(Clone)]
pub struct Backend {
    pub input_sources: Arc<dyn InputSourceApi>,
    pub taps: Arc<dyn EventTapApi>,
    pub poster: Arc<dyn EventPoster>,
}

/// Check that the process may monitor and inject input, prompting the
/// user when it may not, then build the native backend.
#[cfg(target_os = "macos")]
pub fn native() -> Result<Backend, PlatformError> {
    if !macos::permissions::is_trusted(true) {
        macos::permissions::open_privacy_settings();
        return Err(PlatformError::PermissionDenied);
    }

    Ok(Backend {
        input_sources: Arc::new(macos::input_sources::TisInputSources),
        taps: Arc::new(macos::tap::EventTaps::new()),
        poster: Arc::new(macos::events::HidEventPoster),
    })
}

/// Check that the process may monitor and inject input, prompting the
/// user when it may not, then build the native backend.
#[cfg(not(target_os = "macos"))]
pub fn native() -> Result<Backend, PlatformError> {
    Err(PlatformError::Unsupported)
}
