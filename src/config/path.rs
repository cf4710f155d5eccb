//! Module for searching for tabletpressure config files

use std::path::PathBuf;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/tabletpressure";

/// Name of the config file in every search location
const CONFIG_FILE: &str = "config.yaml";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("tabletpressure") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns the per-user config file, if XDG can resolve one.
/// E.g. "~/.config/tabletpressure/config.yaml"
pub fn get_user_config_path() -> Option<PathBuf> {
    let base_dirs = match xdg::BaseDirectories::with_prefix("tabletpressure") {
        Ok(base_dirs) => base_dirs,
        Err(e) => {
            log::debug!("Unable to determine user config path: {e}");
            return None;
        }
    };
    Some(base_dirs.get_config_home().join(CONFIG_FILE))
}

/// Returns a list of config files in load order.
/// E.g. ["/etc/tabletpressure/config.yaml", "~/.config/tabletpressure/config.yaml",
/// "/usr/share/tabletpressure/config.yaml"]
pub fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tabletpressure").join(CONFIG_FILE)];
    if let Some(path) = get_user_config_path() {
        paths.push(path);
    }
    paths.push(get_base_path().join(CONFIG_FILE));

    paths
}
