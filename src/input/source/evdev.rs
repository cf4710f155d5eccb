pub mod tablet;

#[cfg(test)]
mod tablet_test;

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fs,
    io,
    os::fd::AsRawFd,
    path::Path,
    time::Duration,
};

use evdev::Device;
use mio::{unix::SourceFd, Events, Interest, Poll, Token};
use nix::fcntl::OFlag;

use crate::{
    config::SourceConfig,
    constants::EVENT_DEVICE_PREFIX,
    input::{access::DeviceInterface, event::DeviceInfo, event::Event},
    watcher::{WatchEvent, Watcher},
};

use self::tablet::{is_tablet, query_device_info, ReadStatus, TabletEventDevice};

use super::{EventDecodeError, EventSource, SessionError};

const WATCHER_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 64;

/// [EvdevSource] is an input session over the kernel evdev interface.
///
/// Tablets are discovered by scanning the device directory (e.g. /dev/input)
/// and then by watching it with inotify for nodes being added, removed, or
/// having their permissions changed. Every node is opened through the
/// [DeviceInterface] given at construction; nodes that are not pen tablets, or
/// whose name does not match the configured filters, are closed again right
/// away. Open tablets and the watcher are multiplexed with a single poller.
pub struct EvdevSource {
    poll: Poll,
    events: Events,
    watcher: Watcher,
    interface: Box<dyn DeviceInterface>,
    config: SourceConfig,
    /// Mapping of poll tokens to open tablets
    devices: HashMap<Token, TabletEventDevice>,
    /// Mapping of device node paths to poll tokens
    tokens: HashMap<String, Token>,
    next_token: usize,
    /// Devices that may still have queued events
    ready: HashSet<Token>,
    pending: VecDeque<Result<Event, EventDecodeError>>,
}

impl EvdevSource {
    /// Create a new session, open all tablets that are currently connected,
    /// and start watching for hotplug.
    pub fn new(
        config: &SourceConfig,
        interface: Box<dyn DeviceInterface>,
    ) -> Result<Self, SessionError> {
        let path = config.devices_path.clone();
        let poll = Poll::new().map_err(SessionError::Poll)?;
        let watcher = Watcher::new(&path).map_err(|source| SessionError::Watch {
            path: path.clone(),
            source,
        })?;
        poll.registry()
            .register(
                &mut SourceFd(&watcher.as_raw_fd()),
                WATCHER_TOKEN,
                Interest::READABLE,
            )
            .map_err(SessionError::Poll)?;

        let mut source = Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            watcher,
            interface,
            config: config.clone(),
            devices: HashMap::new(),
            tokens: HashMap::new(),
            next_token: WATCHER_TOKEN.0 + 1,
            ready: HashSet::new(),
            pending: VecDeque::new(),
        };

        // Perform an initial device discovery
        source.scan()?;

        Ok(source)
    }

    /// Returns information about every tablet that is currently open
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .devices
            .values()
            .map(|device| device.info().clone())
            .collect();
        devices.sort_by(|a, b| a.path.cmp(&b.path));
        devices
    }

    /// Open every event device in the device directory that is not open yet
    fn scan(&mut self) -> Result<(), SessionError> {
        let base_path = self.config.devices_path.clone();
        let entries = fs::read_dir(&base_path).map_err(|source| SessionError::Scan {
            path: base_path.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => entry.file_name().into_string().ok(),
                Err(e) => {
                    log::warn!("Unable to read from directory: {:?}", e);
                    None
                }
            })
            .filter(|name| name.starts_with(EVENT_DEVICE_PREFIX))
            .collect();
        names.sort();

        for name in names {
            log::debug!("Discovered event device: {:?}", name);
            self.on_device_added(&name);
        }

        Ok(())
    }

    /// Called when an event device (e.g. /dev/input/event5) appears or its
    /// permissions change
    fn on_device_added(&mut self, name: &str) {
        let path = format!("{}/{}", self.config.devices_path, name);
        if self.tokens.contains_key(&path) {
            return;
        }

        let flags = OFlag::O_RDONLY | OFlag::O_NONBLOCK | OFlag::O_CLOEXEC;
        let fd = match self.interface.open_restricted(Path::new(&path), flags) {
            Ok(fd) => fd,
            Err(e) => {
                log::debug!("Skipping device {path}: {e}");
                return;
            }
        };

        // The evdev handle reads through a duplicate so the original descriptor
        // can be handed back to the shim on removal.
        let device = match fd.try_clone().and_then(Device::from_fd) {
            Ok(device) => device,
            Err(e) => {
                log::debug!("Ignoring {path}, not an event device: {e}");
                self.interface.close_restricted(fd);
                return;
            }
        };

        if !is_tablet(&device) {
            log::trace!("Ignoring {path}, not a pen tablet");
            drop(device);
            self.interface.close_restricted(fd);
            return;
        }

        let name = device.name().unwrap_or_default().to_string();
        if !self.config.matches_name(&name) {
            log::debug!("Ignoring tablet '{name}' at {path}, excluded by name filters");
            drop(device);
            self.interface.close_restricted(fd);
            return;
        }

        let tablet = TabletEventDevice::new(path.clone(), fd, device, self.config.grab);
        let token = Token(self.next_token);
        self.next_token += 1;

        let result = self.poll.registry().register(
            &mut SourceFd(&tablet.as_raw_fd()),
            token,
            Interest::READABLE,
        );
        if let Err(e) = result {
            log::error!("Unable to poll {path}: {e}");
            let (fd, _) = tablet.into_parts();
            self.interface.close_restricted(fd);
            return;
        }

        log::debug!("Opened tablet: {:?}", tablet.info());
        let info = tablet.info().clone();
        self.devices.insert(token, tablet);
        self.tokens.insert(path, token);
        // Events may already be queued from before registration
        self.ready.insert(token);
        self.pending.push_back(Ok(Event::DeviceAdded(info)));
    }

    /// Called when an event device (e.g. /dev/input/event5) is removed
    fn on_device_removed(&mut self, name: &str) {
        let path = format!("{}/{}", self.config.devices_path, name);
        let Some(token) = self.tokens.get(&path).copied() else {
            return;
        };
        self.remove_device(token);
    }

    /// Close the tablet with the given token and emit [Event::DeviceRemoved]
    fn remove_device(&mut self, token: Token) {
        let Some(info) = self.close_device(token) else {
            return;
        };
        self.pending.push_back(Ok(Event::DeviceRemoved(info)));
    }

    fn close_device(&mut self, token: Token) -> Option<DeviceInfo> {
        let tablet = self.devices.remove(&token)?;
        self.ready.remove(&token);
        self.tokens.remove(&tablet.info().path);

        let raw_fd = tablet.as_raw_fd();
        if let Err(e) = self.poll.registry().deregister(&mut SourceFd(&raw_fd)) {
            log::debug!("Unable to stop polling {}: {e}", tablet.info().path);
        }

        let (fd, info) = tablet.into_parts();
        self.interface.close_restricted(fd);
        log::debug!("Closed tablet: {}", info.path);
        Some(info)
    }

    /// Handle everything the directory watcher has queued
    fn process_watch_events(&mut self) -> Result<(), SessionError> {
        loop {
            let events = self
                .watcher
                .read_events()
                .map_err(|source| SessionError::Watch {
                    path: self.watcher.path().to_string(),
                    source,
                })?;
            if events.is_empty() {
                return Ok(());
            }

            for event in events {
                log::trace!("Received watch event: {:?}", event);
                match event {
                    WatchEvent::Create { name, .. } | WatchEvent::Attrib { name, .. } => {
                        if name.starts_with(EVENT_DEVICE_PREFIX) {
                            self.on_device_added(&name);
                        }
                    }
                    WatchEvent::Delete { name, .. } => {
                        if name.starts_with(EVENT_DEVICE_PREFIX) {
                            self.on_device_removed(&name);
                        }
                    }
                    WatchEvent::Overflow { .. } => self.scan()?,
                    WatchEvent::Removed { base_path } => {
                        return Err(SessionError::WatchRemoved(base_path));
                    }
                }
            }
        }
    }
}

impl EventSource for EvdevSource {
    fn dispatch(&mut self, timeout: Duration) -> Result<(), SessionError> {
        // Don't wait for the kernel if there is still work queued
        let timeout = if self.ready.is_empty() && self.pending.is_empty() {
            timeout
        } else {
            Duration::ZERO
        };

        if let Err(e) = self.poll.poll(&mut self.events, Some(timeout)) {
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(SessionError::Poll(e));
        }

        let mut watcher_ready = false;
        for event in self.events.iter() {
            if event.token() == WATCHER_TOKEN {
                watcher_ready = true;
            } else {
                self.ready.insert(event.token());
            }
        }

        if watcher_ready {
            self.process_watch_events()?;
        }

        let ready: Vec<Token> = self.ready.drain().collect();
        let mut decoded = Vec::new();
        for token in ready {
            let Some(tablet) = self.devices.get_mut(&token) else {
                continue;
            };
            let status = tablet.read_events(&mut decoded);
            self.pending.extend(decoded.drain(..));
            match status {
                ReadStatus::Drained => (),
                ReadStatus::Pending => {
                    self.ready.insert(token);
                }
                ReadStatus::Gone => self.remove_device(token),
            }
        }

        Ok(())
    }

    fn next_event(&mut self) -> Option<Result<Event, EventDecodeError>> {
        self.pending.pop_front()
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        let tokens: Vec<Token> = self.devices.keys().copied().collect();
        for token in tokens {
            self.close_device(token);
        }
        log::debug!("Input session closed");
    }
}

/// Returns information about every pen tablet in the given device directory
/// that the current user can open (e.g. /dev/input)
pub fn discover_tablets(base_path: &str) -> io::Result<Vec<DeviceInfo>> {
    let mut paths: Vec<String> = fs::read_dir(base_path)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(EVENT_DEVICE_PREFIX))
        .map(|name| format!("{base_path}/{name}"))
        .collect();
    paths.sort();

    let mut tablets = Vec::new();
    for path in paths {
        log::debug!("Opening device at: {}", path);
        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                log::debug!("Unable to open {path}: {e}");
                continue;
            }
        };
        if !is_tablet(&device) {
            continue;
        }
        tablets.push(query_device_info(path, &device));
    }

    Ok(tablets)
}
