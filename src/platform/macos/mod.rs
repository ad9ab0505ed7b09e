//! macOS backend: CGEventTap, CGEventPost and Text Input Sources

pub mod events;
pub mod input_sources;
pub mod permissions;
pub mod tap;
