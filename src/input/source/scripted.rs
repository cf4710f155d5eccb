use std::{
    collections::VecDeque,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use crate::input::event::Event;

use super::{EventDecodeError, EventSource, SessionError};

const MAX_STEPS_PER_DISPATCH: usize = 256;

/// Steps fed into a [ScriptedSource]
#[derive(Debug)]
pub enum Step {
    Event(Event),
    DecodeError(EventDecodeError),
    /// Break the session
    Fail,
}

/// Event source that replays steps sent over a channel
pub struct ScriptedSource {
    rx: Receiver<Step>,
    pending: VecDeque<Result<Event, EventDecodeError>>,
    failed: bool,
}

pub fn scripted() -> (Sender<Step>, ScriptedSource) {
    let (tx, rx) = mpsc::channel();
    let source = ScriptedSource {
        rx,
        pending: VecDeque::new(),
        failed: false,
    };
    (tx, source)
}

impl ScriptedSource {
    fn push(&mut self, step: Step) {
        match step {
            Step::Event(event) => self.pending.push_back(Ok(event)),
            Step::DecodeError(err) => self.pending.push_back(Err(err)),
            Step::Fail => self.failed = true,
        }
    }
}

impl EventSource for ScriptedSource {
    fn dispatch(&mut self, timeout: Duration) -> Result<(), SessionError> {
        if self.failed && self.pending.is_empty() {
            return Err(SessionError::Closed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(step) => self.push(step),
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                return Ok(());
            }
        }
        // Bounded so a fast producer cannot keep a dispatch from returning
        for _ in 0..MAX_STEPS_PER_DISPATCH {
            if self.failed {
                break;
            }
            let Ok(step) = self.rx.try_recv() else {
                break;
            };
            self.push(step);
        }
        Ok(())
    }

    fn next_event(&mut self) -> Option<Result<Event, EventDecodeError>> {
        self.pending.pop_front()
    }
}
