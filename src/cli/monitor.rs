use std::{error::Error, sync::Arc};

use tokio::time::MissedTickBehavior;

use crate::{
    config::Config,
    input::{
        event::{Notification, Position},
        manager::TabletManager,
    },
};

/// Print the stylus state whenever it changes until interrupted
pub async fn handle_monitor(config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = |notification: Notification| match notification {
        Notification::DeviceAdded(info) => println!("Added: {} ({})", info.name, info.path),
        Notification::DeviceRemoved(info) => println!("Removed: {} ({})", info.name, info.path),
        Notification::Button(button) => println!(
            "Button: {:?} {}",
            button.key(),
            if button.pressed { "pressed" } else { "released" }
        ),
    };
    let manager = TabletManager::new(&config.source, Arc::new(listener))?;

    let mut ticker = tokio::time::interval(config.control_surface.update_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last: Option<(f32, Position)> = None;
    let result: Result<(), Box<dyn Error + Send + Sync>> = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            _ = ticker.tick() => {
                if !manager.is_running() {
                    break Err("input session stopped unexpectedly".into());
                }
                let current = (manager.pressure(), manager.position());
                if last != Some(current) {
                    println!(
                        "pressure: {:.3}  x: {:.0}  y: {:.0}",
                        current.0, current.1.x, current.1.y
                    );
                    last = Some(current);
                }
            }
        }
    };

    tokio::task::spawn_blocking(move || drop(manager)).await?;

    result
}
