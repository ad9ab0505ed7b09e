//! Selectable keyboard input sources

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::platform::{InputSourceApi, RawInputSource, SourceCategory};

/// Stable identifier of one OS keyboard input source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputSourceId(String);

impl InputSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InputSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free list of selectable keyboard sources
pub type InputSourceList = Vec<InputSourceId>;

/// Queries and selects keyboard input sources through the OS
#[derive(Clone)]
pub struct InputSourceRegistry {
    api: Arc<dyn InputSourceApi>,
}

impl InputSourceRegistry {
    pub fn new(api: Arc<dyn InputSourceApi>) -> Self {
        Self { api }
    }

    /// Keyboard sources the user can switch to, in OS order.
    /// Enumeration failures yield an empty list.
    pub fn list_selectable_sources(&self) -> InputSourceList {
        match self.api.enumerate() {
            Ok(sources) => filter_selectable(sources),
            Err(e) => {
                warn!(?e, "failed to enumerate input sources");
                Vec::new()
            }
        }
    }

    /// The active keyboard source
    pub fn current_source_id(&self) -> Option<InputSourceId> {
        self.api.current().map(InputSourceId)
    }

    /// Switch to `id`. Ids the OS no longer knows are ignored.
    pub fn activate(&self, id: &InputSourceId) {
        match self.api.select(id.as_str()) {
            Ok(true) => debug!(%id, "input source activated"),
            Ok(false) => debug!(%id, "input source no longer present, ignoring"),
            Err(e) => warn!(?e, %id, "failed to activate input source"),
        }
    }
}

/// A missing category or select-capable property does not disqualify a
/// source; only an explicit non-keyboard category or `false` does.
fn is_selectable(source: &RawInputSource) -> bool {
    let keyboard = !matches!(source.category, Some(SourceCategory::Other(_)));
    keyboard && source.selectable != Some(false)
}

fn filter_selectable(sources: Vec<RawInputSource>) -> InputSourceList {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(is_selectable)
        .filter(|s| seen.insert(s.id.clone()))
        .map(|s| InputSourceId(s.id))
        .collect()
}
