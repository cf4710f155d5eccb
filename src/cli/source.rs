use std::error::Error;

use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::{
    config::SourceConfig,
    input::{event::AxisRange, source::evdev::discover_tablets},
};

#[derive(Tabled)]
struct TabletRow {
    path: String,
    name: String,
    x: String,
    y: String,
    pressure: String,
    used: bool,
}

fn format_range(range: Option<AxisRange>) -> String {
    match range {
        Some(range) => format!("{}..{}", range.minimum, range.maximum),
        None => "-".to_string(),
    }
}

pub fn handle_devices(config: &SourceConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tablets = discover_tablets(&config.devices_path)?;
    let count = tablets.len();

    let rows: Vec<TabletRow> = tablets
        .into_iter()
        .map(|info| TabletRow {
            used: config.matches_name(&info.name),
            path: info.path,
            name: info.name,
            x: format_range(info.x),
            y: format_range(info.y),
            pressure: format_range(info.pressure),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Pen Tablets"));
    println!("{table}");
    println!("Found {count} tablet(s)");

    Ok(())
}
