#[cfg(test)]
mod watcher_test;

use std::{
    io,
    os::fd::{AsRawFd, RawFd},
};

use inotify::{EventMask, Inotify, WatchMask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Create { name: String, base_path: String },
    Delete { name: String, base_path: String },
    /// Permissions or ownership of an entry changed
    Attrib { name: String, base_path: String },
    /// The kernel dropped events; the directory should be rescanned
    Overflow { base_path: String },
    /// The watched directory itself went away
    Removed { base_path: String },
}

/// Watches a directory for entries being created and deleted. The underlying
/// inotify descriptor is non-blocking, so [Watcher::read_events] can be called
/// whenever a poller reports the descriptor as readable.
#[derive(Debug)]
pub struct Watcher {
    inotify: Inotify,
    path: String,
    buffer: [u8; 4096],
}

impl Watcher {
    /// Start watching the given directory
    pub fn new(path: &str) -> io::Result<Self> {
        let inotify = Inotify::init()?;
        inotify.watches().add(
            path,
            WatchMask::CREATE
                | WatchMask::DELETE
                | WatchMask::ATTRIB
                | WatchMask::MOVED_TO
                | WatchMask::MOVED_FROM
                | WatchMask::DELETE_SELF
                | WatchMask::MOVE_SELF,
        )?;
        log::debug!("Watching {path} for device changes");

        Ok(Self {
            inotify,
            path: path.to_string(),
            buffer: [0u8; 4096],
        })
    }

    /// Returns the directory being watched
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Read all watch events that are currently queued. Returns an empty list
    /// if nothing is pending.
    pub fn read_events(&mut self) -> io::Result<Vec<WatchEvent>> {
        let events = match self.inotify.read_events(&mut self.buffer) {
            Ok(events) => events,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let base_path = self.path.clone();
        let mut watch_events = Vec::new();
        for event in events {
            if event.mask.contains(EventMask::Q_OVERFLOW) {
                log::warn!("inotify queue overflowed for {base_path}");
                watch_events.push(WatchEvent::Overflow {
                    base_path: base_path.clone(),
                });
                continue;
            }
            if event
                .mask
                .intersects(EventMask::DELETE_SELF | EventMask::MOVE_SELF | EventMask::IGNORED)
            {
                log::debug!("inotify watch removed: {base_path}");
                watch_events.push(WatchEvent::Removed {
                    base_path: base_path.clone(),
                });
                continue;
            }

            let Some(name) = event.name.and_then(|name| name.to_str()) else {
                continue;
            };
            let name = name.to_string();
            let base_path = base_path.clone();

            if event.mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
                log::debug!("inotify CREATE: {name}");
                watch_events.push(WatchEvent::Create { name, base_path });
            } else if event.mask.intersects(EventMask::DELETE | EventMask::MOVED_FROM) {
                log::debug!("inotify DELETE: {name}");
                watch_events.push(WatchEvent::Delete { name, base_path });
            } else if event.mask.contains(EventMask::ATTRIB) {
                log::trace!("inotify ATTRIB: {name}");
                watch_events.push(WatchEvent::Attrib { name, base_path });
            }
        }

        Ok(watch_events)
    }
}

impl AsRawFd for Watcher {
    fn as_raw_fd(&self) -> RawFd {
        self.inotify.as_raw_fd()
    }
}
