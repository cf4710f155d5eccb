use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use super::{
    event::{Event, Notification},
    listener::Listener,
    source::EventSource,
    state::TabletState,
};

/// Lifecycle of the input loop thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl From<u8> for WorkerState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Current [WorkerState] of an input loop, readable from any thread
#[derive(Debug)]
pub struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    pub fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Starting as u8))
    }

    pub fn get(&self) -> WorkerState {
        WorkerState::from(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        log::trace!("Input loop state: {state:?}");
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the input loop as stopped when it exits, also when a listener panics
struct StoppedOnExit(Arc<WorkerStatus>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("Input loop panicked");
        }
        self.0.set(WorkerState::Stopped);
    }
}

/// The [InputLoop] pulls events from an [EventSource], applies motion and
/// pressure to the shared [TabletState], and forwards everything else to the
/// [Listener].
pub struct InputLoop<S: EventSource> {
    source: S,
    state: Arc<TabletState>,
    listener: Arc<dyn Listener>,
    quit: Arc<AtomicBool>,
    status: Arc<WorkerStatus>,
    poll_interval: Duration,
}

impl<S: EventSource> InputLoop<S> {
    pub fn new(
        source: S,
        state: Arc<TabletState>,
        listener: Arc<dyn Listener>,
        quit: Arc<AtomicBool>,
        status: Arc<WorkerStatus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            state,
            listener,
            quit,
            status,
            poll_interval,
        }
    }

    /// Run the loop until the quit flag is raised or the session fails. The
    /// event source is handed back so the caller decides when it is torn down.
    pub fn run(mut self) -> S {
        let _stopped = StoppedOnExit(self.status.clone());
        self.status.set(WorkerState::Running);
        log::debug!("Input loop started");

        'input: loop {
            if self.should_quit() {
                break;
            }

            if let Err(e) = self.source.dispatch(self.poll_interval) {
                log::error!("Input session failed, stopping input loop: {e}");
                return self.source;
            }

            while let Some(result) = self.source.next_event() {
                match result {
                    Ok(event) => self.handle_event(event),
                    Err(e) => log::debug!("Dropping event: {e}"),
                }
                if self.should_quit() {
                    break 'input;
                }
            }
        }

        log::debug!("Input loop stopped");
        self.source
    }

    fn should_quit(&self) -> bool {
        if !self.quit.load(Ordering::Acquire) {
            return false;
        }
        self.status.set(WorkerState::Stopping);
        true
    }

    fn handle_event(&self, event: Event) {
        log::trace!("Received event: {event:?}");
        match event {
            Event::Motion(position) => self.state.set_position(position),
            Event::Pressure(pressure) => match pressure.normalize() {
                Ok(value) => self.state.set_pressure(value),
                Err(e) => log::debug!("Dropping pressure event: {e}"),
            },
            Event::DeviceAdded(info) => {
                log::info!("Tablet added: {} ({})", info.name, info.path);
                self.listener.notify(Notification::DeviceAdded(info));
            }
            Event::DeviceRemoved(info) => {
                log::info!("Tablet removed: {} ({})", info.name, info.path);
                self.listener.notify(Notification::DeviceRemoved(info));
            }
            Event::Button(button) => self.listener.notify(Notification::Button(button)),
        }
    }
}
