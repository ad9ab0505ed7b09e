//! Global event taps using macOS CGEventTap
//!
//! Each tap runs on a dedicated thread with its own CFRunLoop. Removing a
//! tap closes its gate, stops the loop and joins the thread, so no callback
//! for that tap can still be running once `remove` returns.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
};
use tracing::{debug, error, info, warn};

use super::events::key_down_from_event;
use crate::hotkey::Modifiers;
use crate::platform::{
    EventTapApi, FlagsCallback, KeyDisposition, KeyDownCallback, TapError, TapHandle,
};

/// How long the run loop waits before re-checking the running flag
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

enum TapCallback {
    Flags(FlagsCallback),
    KeyDown(KeyDownCallback),
}

impl TapCallback {
    fn kind(&self) -> &'static str {
        match self {
            TapCallback::Flags(_) => "flags-changed",
            TapCallback::KeyDown(_) => "key-down",
        }
    }
}

struct TapThread {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// CGEventTap-backed implementation of [`EventTapApi`]
pub struct EventTaps {
    next_id: AtomicU64,
    taps: Mutex<HashMap<u64, TapThread>>,
}

impl EventTaps {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            taps: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the tap thread and wait until the tap is created or has failed
    fn spawn(&self, callback: TapCallback) -> Result<TapHandle, TapError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let kind = callback.kind();
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), TapError>>();

        let thread_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("event-tap-{id}"))
            .spawn(move || {
                debug!(id, kind, "tap thread started");
                run_tap_loop(callback, thread_running, ready_tx);
                debug!(id, kind, "tap thread stopped");
            })
            .map_err(|e| TapError::ThreadSpawn(e.to_string()))?;

        // A dropped sender means the thread died before reporting
        let ready = ready_rx
            .recv()
            .unwrap_or(Err(TapError::EventTapCreation));
        if let Err(e) = ready {
            running.store(false, Ordering::SeqCst);
            let _ = thread.join();
            return Err(e);
        }

        self.taps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, TapThread { running, thread });

        info!(id, kind, "event tap installed");
        Ok(TapHandle(id))
    }
}

impl Default for EventTaps {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTapApi for EventTaps {
    fn install_flags_changed_tap(&self, callback: FlagsCallback) -> Result<TapHandle, TapError> {
        self.spawn(TapCallback::Flags(callback))
    }

    fn install_key_down_tap(&self, callback: KeyDownCallback) -> Result<TapHandle, TapError> {
        self.spawn(TapCallback::KeyDown(callback))
    }

    fn remove(&self, handle: TapHandle) {
        let entry = self
            .taps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);

        let Some(tap) = entry else {
            debug!(id = handle.0, "tap already removed");
            return;
        };

        tap.running.store(false, Ordering::SeqCst);
        if tap.thread.join().is_err() {
            error!(id = handle.0, "tap thread panicked");
        }
        info!(id = handle.0, "event tap removed");
    }
}

impl Drop for EventTaps {
    fn drop(&mut self) {
        let ids: Vec<u64> = self
            .taps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        for id in ids {
            self.remove(TapHandle(id));
        }
    }
}

/// Whether the system has switched the tap off. macOS delivers these to
/// every tap regardless of its event mask.
fn switched_off(event_type: CGEventType) -> bool {
    matches!(
        event_type,
        CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput
    )
}

/// Create the tap on the current thread and run its CFRunLoop until the
/// running flag is cleared
fn run_tap_loop(
    callback: TapCallback,
    running: Arc<AtomicBool>,
    ready_tx: std_mpsc::Sender<Result<(), TapError>>,
) {
    let (options, events) = match &callback {
        TapCallback::Flags(_) => (CGEventTapOptions::ListenOnly, vec![CGEventType::FlagsChanged]),
        TapCallback::KeyDown(_) => (CGEventTapOptions::Default, vec![CGEventType::KeyDown]),
    };

    // Only this thread touches the callback
    let callback = RefCell::new(callback);
    let gate = Arc::clone(&running);
    // Set by the callback when the system switches the tap off
    let disabled = Rc::new(Cell::new(false));
    let disabled_by_system = Rc::clone(&disabled);

    // CGEventTap callback - must be fast and non-blocking
    let tap_callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
          -> Option<CGEvent> {
        if !gate.load(Ordering::Acquire) {
            return Some(event.clone());
        }

        match (event_type, &mut *callback.borrow_mut()) {
            (CGEventType::FlagsChanged, TapCallback::Flags(on_flags)) => {
                on_flags(Modifiers::from_raw(event.get_flags().bits()));
                Some(event.clone())
            }
            (CGEventType::KeyDown, TapCallback::KeyDown(on_key_down)) => {
                match on_key_down(&key_down_from_event(event)) {
                    KeyDisposition::Pass => Some(event.clone()),
                    KeyDisposition::Suppress => None,
                }
            }
            (event_type, _) if switched_off(event_type) => {
                warn!("event tap disabled by the system, re-enabling");
                disabled_by_system.set(true);
                Some(event.clone())
            }
            _ => Some(event.clone()),
        }
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        options,
        events,
        tap_callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready_tx.send(Err(TapError::EventTapCreation));
            return;
        }
    };

    let Ok(run_loop_source) = tap.mach_port.create_runloop_source(0) else {
        error!("failed to create run loop source for event tap");
        let _ = ready_tx.send(Err(TapError::EventTapCreation));
        return;
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();
    let _ = ready_tx.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, true);
        }
        if disabled.replace(false) {
            tap.enable();
            info!("event tap re-enabled");
        }
    }

    unsafe {
        run_loop.remove_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    // Tap is released when it goes out of scope
}
