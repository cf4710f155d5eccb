pub mod cli;
pub mod config;
pub mod constants;
pub mod control_surface;
pub mod input;
pub mod watcher;
