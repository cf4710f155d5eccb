pub mod evdev;

#[cfg(test)]
pub mod scripted;

use std::{io, time::Duration};

use ::evdev::AbsoluteAxisCode;
use thiserror::Error;

use super::event::Event;

/// Errors that make an input session unusable. These are fatal: returned to
/// the caller during construction, or stop the input loop when they occur
/// while it is running.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("unable to create event poller: {0}")]
    Poll(#[source] io::Error),
    #[error("unable to watch device directory '{path}': {source}")]
    Watch {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to scan device directory '{path}': {source}")]
    Scan {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("device directory '{0}' was removed")]
    WatchRemoved(String),
    #[error("unable to start input thread: {0}")]
    Thread(#[source] io::Error),
    #[error("event source closed")]
    Closed,
}

/// Errors for a single event. The event is dropped and the input loop continues.
#[derive(Error, Debug)]
pub enum EventDecodeError {
    #[error("axis range [{minimum}, {maximum}] is empty")]
    InvalidRange { minimum: i32, maximum: i32 },
    #[error("pressure value {0} is not a finite number")]
    NotFinite(f32),
    #[error("device '{path}' has no range for axis {axis:?}")]
    MissingAxis {
        path: String,
        axis: AbsoluteAxisCode,
    },
    #[error("unexpected value {value} for key {code} from '{path}'")]
    InvalidKeyValue { path: String, code: u16, value: i32 },
    #[error("kernel dropped events from '{0}'")]
    Dropped(String),
    #[error("failed to read events from '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// An [EventSource] is a session with the host input subsystem. It produces a
/// lazy, infinite sequence of [Event] that ends only when the session fails or
/// the source is dropped. A source cannot be restarted.
pub trait EventSource: Send {
    /// Wait at most `timeout` for notifications from the host and decode any
    /// that arrived. Returns an error if the session itself is broken.
    fn dispatch(&mut self, timeout: Duration) -> Result<(), SessionError>;

    /// Returns the next decoded event, if one is pending
    fn next_event(&mut self) -> Option<Result<Event, EventDecodeError>>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn dispatch(&mut self, timeout: Duration) -> Result<(), SessionError> {
        (**self).dispatch(timeout)
    }

    fn next_event(&mut self) -> Option<Result<Event, EventDecodeError>> {
        (**self).next_event()
    }
}
