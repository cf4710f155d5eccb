use std::{error::Error, io::Write, sync::Arc};

use tokio::time::MissedTickBehavior;

use crate::{
    config::Config,
    control_surface::{midi::MidiError, ControlSurface, NotificationForwarder},
    input::{event::Notification, manager::TabletManager},
};

/// Run the daemon: play the MIDI control surface from the tablet until
/// interrupted or the input session fails.
pub async fn handle_run(config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut surface = ControlSurface::open(&config.control_surface)?;
    let (forwarder, mut notifications) = NotificationForwarder::new();
    let manager = TabletManager::new(&config.source, Arc::new(forwarder))?;
    log::info!("Listening for tablets in {}", config.source.devices_path);

    let mut ticker = tokio::time::interval(config.control_surface.update_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result: Result<(), Box<dyn Error + Send + Sync>> = loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    log::error!("Unable to listen for shutdown signal: {e}");
                }
                log::info!("Shutting down");
                break Ok(());
            }
            Some(notification) = notifications.recv() => {
                if let Err(e) = handle_notification(&mut surface, &manager, notification) {
                    break Err(e.into());
                }
            }
            _ = ticker.tick() => {
                if !manager.is_running() {
                    log::error!("Input session stopped");
                    break Err("input session stopped unexpectedly".into());
                }
                if let Err(e) = surface.update(manager.pressure(), manager.position()) {
                    break Err(e.into());
                }
            }
        }
    };

    if let Err(e) = surface.release() {
        log::warn!("Unable to stop sounding note: {e}");
    }

    // Joining the input thread blocks for up to one poll interval
    tokio::task::spawn_blocking(move || drop(manager)).await?;
    log::info!("tabletpressure stopped");

    result
}

fn handle_notification<W: Write>(
    surface: &mut ControlSurface<W>,
    manager: &TabletManager,
    notification: Notification,
) -> Result<(), MidiError> {
    match notification {
        Notification::DeviceAdded(info) => {
            log::info!("Using tablet '{}' at {}", info.name, info.path);
            surface.set_x_range(info.x);
        }
        Notification::DeviceRemoved(info) => {
            log::info!("Tablet '{}' at {} was removed", info.name, info.path);
            surface.release()?;
        }
        Notification::Button(button) => {
            if !button.is_tip() {
                log::debug!("Button {:?} pressed: {}", button.key(), button.pressed);
                return Ok(());
            }
            if button.pressed {
                surface.contact(manager.pressure(), manager.position())?;
            } else {
                surface.release()?;
            }
        }
    }

    Ok(())
}
