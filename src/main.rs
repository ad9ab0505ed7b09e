//! layout-switcher: background daemon for keyboard layout switching on macOS
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Layout rotation on a Shift-based modifier combination (Shift+Fn,
//!   Shift+Option, Shift+Control or Shift+Command) via a CGEventTap
//! - Remapping of Control editing shortcuts (undo, copy/paste, find,
//!   select all, open/save, print) to their Command equivalents
//! - IPC server through which the menu bar app changes settings
//!
//! Out of scope: menu rendering, the About dialog and login item
//! registration; those live in the menu bar app.

mod config;
mod control;
mod coordinator;
mod hotkey;
mod input_source;
mod ipc;
mod lifecycle;
mod platform;
mod remap;
mod settings;
mod state;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::control::{ControlCommand, ControlHandle, Controller};
use crate::coordinator::HotkeyCoordinator;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::platform::PlatformError;
use crate::settings::JsonSettingsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "layout-switcher starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.settings_path, "configuration loaded");

    // Without Accessibility trust nothing works; the OS prompt has been shown
    let backend = match platform::native() {
        Ok(backend) => backend,
        Err(PlatformError::PermissionDenied) => {
            error!("accessibility permission missing - grant it in System Settings and restart");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("failed to initialize platform backend"),
    };

    let settings = JsonSettingsStore::open(&config.settings_path);
    let mut controller = Controller::new(HotkeyCoordinator::new(backend), settings);

    match controller.start() {
        Ok(()) => {
            info!("monitors started");
        }
        Err(e) => {
            error!(%e, "failed to start monitors");
            warn!("continuing - monitors can be re-enabled over IPC");
        }
    }

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // IPC server -> control thread
    let (control_tx, control_rx) = mpsc::channel(32);
    let control_thread = control::spawn(controller, control_rx)
        .context("failed to spawn control thread")?;
    let control = ControlHandle::new(control_tx);

    let server = Server::new(&config.socket_path, control.clone())?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    if let Err(e) = control.send(ControlCommand::Shutdown).await {
        warn!(%e, "control thread already stopped");
    }
    server.shutdown().await;

    match tokio::task::spawn_blocking(move || control_thread.join()).await {
        Ok(Ok(())) => {}
        _ => error!("control thread did not exit cleanly"),
    }

    info!("layout-switcher stopped");

    Ok(())
}
