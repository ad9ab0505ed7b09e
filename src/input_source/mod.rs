//! Keyboard input source discovery and rotation

mod registry;
mod rotator;

pub use registry::InputSourceRegistry;
pub use rotator::LayoutRotator;
