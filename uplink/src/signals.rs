//! Signal handling and the forced-exit watchdog
//!
//! Signal delivery only flips atomic flags; the control loop acts on them at
//! tick boundaries. SIGHUP schedules a configuration reload, SIGINT and
//! SIGTERM request a stop.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::control::ControlFlags;

/// Install the signal tasks on the current runtime.
#[cfg(unix)]
pub fn install(flags: &ControlFlags) {
    use tokio::signal::unix::{signal, SignalKind};

    let stop = flags.stop.clone();
    let reload = flags.reload.clone();

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!("failed to install the SIGTERM handler: {err}");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!("failed to install the SIGINT handler: {err}");
                return;
            }
        };
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!("failed to install the SIGHUP handler: {err}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, stopping");
                    stop.store(true, Ordering::SeqCst);
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT, stopping");
                    stop.store(true, Ordering::SeqCst);
                }
                _ = sighup.recv() => {
                    tracing::info!("received SIGHUP, scheduling a config reload");
                    reload.store(true, Ordering::SeqCst);
                }
            }
        }
    });
}

#[cfg(not(unix))]
pub fn install(flags: &ControlFlags) {
    let stop = flags.stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping");
            stop.store(true, Ordering::SeqCst);
        }
    });
}

/// Force the process down if the cooperative drain blocks.
///
/// Exits with success: the watchdog only runs on a deliberate shutdown.
pub fn arm_exit_watchdog(timeout: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(timeout);
        tracing::error!("shutdown stalled, forcing exit");
        std::process::exit(0);
    });
}
