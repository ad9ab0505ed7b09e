//! Recording fakes of the OS collaborators for unit tests.
//!
//! Tests drive installed taps with [`FakeTaps::emit_flags`] and
//! [`FakeTaps::emit_key_down`] instead of a running CFRunLoop.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    Backend, EventPoster, EventTapApi, FlagsCallback, InputSourceApi, InputSourceError,
    KeyDisposition, KeyDown, KeyDownCallback, RawInputSource, SourceCategory, TapError, TapHandle,
};
use crate::hotkey::Modifiers;

/// A selectable keyboard source with the given id
pub fn keyboard(id: &str) -> RawInputSource {
    RawInputSource {
        id: id.to_string(),
        category: Some(SourceCategory::KeyboardInput),
        selectable: Some(true),
    }
}

/// Input sources held in memory
#[derive(Default)]
pub struct FakeInputSources {
    sources: Mutex<Vec<RawInputSource>>,
    current: Mutex<Option<String>>,
    selected: Mutex<Vec<String>>,
    fail_enumeration: AtomicBool,
}

impl FakeInputSources {
    pub fn with_sources(sources: Vec<RawInputSource>, current: Option<&str>) -> Self {
        let fake = Self::default();
        *fake.sources.lock().expect("lock poisoned") = sources;
        *fake.current.lock().expect("lock poisoned") = current.map(str::to_string);
        fake
    }

    pub fn set_sources(&self, sources: Vec<RawInputSource>) {
        *self.sources.lock().expect("lock poisoned") = sources;
    }

    pub fn set_current(&self, id: Option<&str>) {
        *self.current.lock().expect("lock poisoned") = id.map(str::to_string);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    /// Ids passed to successful `select` calls, oldest first
    pub fn selected(&self) -> Vec<String> {
        self.selected.lock().expect("lock poisoned").clone()
    }
}

impl InputSourceApi for FakeInputSources {
    fn enumerate(&self) -> Result<Vec<RawInputSource>, InputSourceError> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(InputSourceError::Unavailable);
        }
        Ok(self.sources.lock().expect("lock poisoned").clone())
    }

    fn current(&self) -> Option<String> {
        self.current.lock().expect("lock poisoned").clone()
    }

    fn select(&self, id: &str) -> Result<bool, InputSourceError> {
        let known = self
            .sources
            .lock()
            .expect("lock poisoned")
            .iter()
            .any(|s| s.id == id);
        if !known {
            return Ok(false);
        }
        self.selected.lock().expect("lock poisoned").push(id.to_string());
        self.set_current(Some(id));
        Ok(true)
    }
}

enum FakeTap {
    Flags(FlagsCallback),
    KeyDown(KeyDownCallback),
}

/// Taps whose callbacks run when a test emits an event
#[derive(Default)]
pub struct FakeTaps {
    next_id: AtomicU64,
    taps: Mutex<BTreeMap<u64, FakeTap>>,
    fail_install: AtomicBool,
    removed: Mutex<Vec<TapHandle>>,
}

impl FakeTaps {
    /// Make subsequent installs fail
    pub fn fail_install(&self, fail: bool) {
        self.fail_install.store(fail, Ordering::SeqCst);
    }

    pub fn live_count(&self) -> usize {
        self.taps.lock().expect("lock poisoned").len()
    }

    pub fn removed(&self) -> Vec<TapHandle> {
        self.removed.lock().expect("lock poisoned").clone()
    }

    /// Deliver a flags-changed event to every live flags tap
    pub fn emit_flags(&self, modifiers: Modifiers) {
        let mut taps = self.taps.lock().expect("lock poisoned");
        for tap in taps.values_mut() {
            if let FakeTap::Flags(callback) = tap {
                callback(modifiers);
            }
        }
    }

    /// Deliver a key-down event to every live key-down tap.
    /// The event is suppressed if any tap suppresses it.
    pub fn emit_key_down(&self, key: KeyDown) -> KeyDisposition {
        let mut taps = self.taps.lock().expect("lock poisoned");
        let mut disposition = KeyDisposition::Pass;
        for tap in taps.values_mut() {
            if let FakeTap::KeyDown(callback) = tap {
                if callback(&key) == KeyDisposition::Suppress {
                    disposition = KeyDisposition::Suppress;
                }
            }
        }
        disposition
    }

    fn install(&self, tap: FakeTap) -> Result<TapHandle, TapError> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(TapError::EventTapCreation);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.taps.lock().expect("lock poisoned").insert(id, tap);
        Ok(TapHandle(id))
    }
}

impl EventTapApi for FakeTaps {
    fn install_flags_changed_tap(&self, callback: FlagsCallback) -> Result<TapHandle, TapError> {
        self.install(FakeTap::Flags(callback))
    }

    fn install_key_down_tap(&self, callback: KeyDownCallback) -> Result<TapHandle, TapError> {
        self.install(FakeTap::KeyDown(callback))
    }

    fn remove(&self, handle: TapHandle) {
        if self
            .taps
            .lock()
            .expect("lock poisoned")
            .remove(&handle.0)
            .is_some()
        {
            self.removed.lock().expect("lock poisoned").push(handle);
        }
    }
}

/// One posted synthetic event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedEvent {
    pub key_code: u16,
    pub down: bool,
    pub flags: Modifiers,
}

/// Poster that records instead of injecting
#[derive(Default)]
pub struct FakePoster {
    posted: Mutex<Vec<PostedEvent>>,
}

impl FakePoster {
    pub fn posted(&self) -> Vec<PostedEvent> {
        self.posted.lock().expect("lock poisoned").clone()
    }
}

impl EventPoster for FakePoster {
    fn post_key_event(&self, key_code: u16, down: bool, flags: Modifiers) {
        self.posted.lock().expect("lock poisoned").push(PostedEvent {
            key_code,
            down,
            flags,
        });
    }
}

/// Fakes plus a [`Backend`] that shares them
pub struct FakeBackend {
    pub input_sources: Arc<FakeInputSources>,
    pub taps: Arc<FakeTaps>,
    pub poster: Arc<FakePoster>,
}

impl FakeBackend {
    pub fn new(sources: Vec<RawInputSource>, current: Option<&str>) -> Self {
        Self {
            input_sources: Arc::new(FakeInputSources::with_sources(sources, current)),
            taps: Arc::new(FakeTaps::default()),
            poster: Arc::new(FakePoster::default()),
        }
    }

    pub fn backend(&self) -> Backend {
        Backend {
            input_sources: self.input_sources.clone(),
            taps: self.taps.clone(),
            poster: self.poster.clone(),
        }
    }
}
