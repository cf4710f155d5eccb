use std::{fs, thread, time::Duration};

use super::{WatchEvent, Watcher};

/// Read from the watcher until at least one event arrives or we give up
fn read_some(watcher: &mut Watcher) -> Vec<WatchEvent> {
    for _ in 0..200 {
        let events = watcher.read_events().expect("failed to read watch events");
        if !events.is_empty() {
            return events;
        }
        thread::sleep(Duration::from_millis(5));
    }
    vec![]
}

#[test]
fn test_no_events_when_idle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    let mut watcher = Watcher::new(&path).unwrap();
    assert_eq!(watcher.path(), path);
    assert!(watcher.read_events().unwrap().is_empty());
}

#[test]
fn test_create_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    let mut watcher = Watcher::new(&path).unwrap();

    fs::write(dir.path().join("event42"), b"").unwrap();
    let events = read_some(&mut watcher);
    assert!(events.contains(&WatchEvent::Create {
        name: "event42".to_string(),
        base_path: path.clone(),
    }));

    fs::remove_file(dir.path().join("event42")).unwrap();
    let events = read_some(&mut watcher);
    assert!(events.contains(&WatchEvent::Delete {
        name: "event42".to_string(),
        base_path: path.clone(),
    }));
}

#[test]
fn test_directory_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    let mut watcher = Watcher::new(&path).unwrap();

    dir.close().unwrap();
    let events = read_some(&mut watcher);
    assert!(events.contains(&WatchEvent::Removed { base_path: path }));
}

#[test]
fn test_missing_directory() {
    assert!(Watcher::new("/nonexistent/tabletpressure/watch").is_err());
}
