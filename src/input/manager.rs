use std::{
    sync::{atomic::AtomicBool, atomic::Ordering, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{config::SourceConfig, constants::INPUT_THREAD_NAME};

use super::{
    access::RestrictedAccess,
    event::Position,
    listener::Listener,
    source::{evdev::EvdevSource, EventSource, SessionError},
    state::TabletState,
    worker::{InputLoop, WorkerState, WorkerStatus},
};

/// Manages the input session for pen tablets
///
/// The [TabletManager] owns an [EventSource] and a dedicated input loop thread
/// that reads events from it. The latest pressure and position can be queried
/// at any time without blocking. Dropping the manager stops the thread, waits
/// for it to exit, and then tears down the session, so no descriptor or thread
/// outlives it.
pub struct TabletManager<S: EventSource + 'static = EvdevSource> {
    state: Arc<TabletState>,
    status: Arc<WorkerStatus>,
    /// Raised when the input loop should exit
    quit: Arc<AtomicBool>,
    /// The input loop hands the event source back when it exits
    worker: Option<JoinHandle<S>>,
}

impl TabletManager<EvdevSource> {
    /// Open an evdev input session using the given configuration and start
    /// reading events from it.
    pub fn new(config: &SourceConfig, listener: Arc<dyn Listener>) -> Result<Self, SessionError> {
        let source = EvdevSource::new(config, Box::new(RestrictedAccess))?;
        Self::with_source(source, listener, config.poll_interval())
    }
}

impl<S: EventSource + 'static> TabletManager<S> {
    /// Start reading events from the given source. The input loop waits at
    /// most `poll_interval` for new events before checking whether it should
    /// stop, which bounds how long [TabletManager::stop] can take.
    pub fn with_source(
        source: S,
        listener: Arc<dyn Listener>,
        poll_interval: Duration,
    ) -> Result<Self, SessionError> {
        let state = Arc::new(TabletState::new());
        let status = Arc::new(WorkerStatus::new());
        let quit = Arc::new(AtomicBool::new(false));

        let input_loop = InputLoop::new(
            source,
            state.clone(),
            listener,
            quit.clone(),
            status.clone(),
            poll_interval,
        );
        let worker = thread::Builder::new()
            .name(INPUT_THREAD_NAME.to_string())
            .spawn(move || input_loop.run())
            .map_err(SessionError::Thread)?;
        log::debug!("Started input thread");

        Ok(Self {
            state,
            status,
            quit,
            worker: Some(worker),
        })
    }

    /// Returns the latest stylus pressure between 0.0 and 1.0. If the session
    /// failed, this keeps returning the last value that was read.
    pub fn pressure(&self) -> f32 {
        self.state.pressure()
    }

    /// Returns the latest stylus position in device units
    pub fn position(&self) -> Position {
        self.state.position()
    }

    /// Returns the current state of the input loop
    pub fn worker_state(&self) -> WorkerState {
        self.status.get()
    }

    /// Returns true while the input loop is reading events
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.status.get() != WorkerState::Stopped
    }

    /// Stop the input loop, wait for the thread to exit, and tear down the
    /// input session. Calling this more than once has no effect.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        log::debug!("Stopping input thread");
        self.quit.store(true, Ordering::Release);

        match worker.join() {
            Ok(source) => {
                log::debug!("Tearing down input session");
                drop(source);
            }
            Err(_) => log::error!("Input thread panicked"),
        }
    }
}

impl<S: EventSource + 'static> Drop for TabletManager<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
