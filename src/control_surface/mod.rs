//! MIDI control surface driven by the tablet.
//!
//! Touching the surface with the stylus plays a note whose pitch follows the
//! horizontal position of the pen. The pressure at contact sets the velocity,
//! and while the pen stays down pitch bend follows the pen and polyphonic
//! aftertouch follows the pressure.

pub mod midi;


use std::{
    fs::OpenOptions,
    io::{self, Write},
};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    config::ControlSurfaceConfig,
    input::{
        event::{AxisRange, Notification, Position},
        listener::Listener,
    },
};

use self::midi::{Message, MidiError};

/// Size of the notification queue between the input thread and the daemon
pub const BUFFER_SIZE: usize = 256;

/// [Listener] that hands notifications to an async task
#[derive(Debug, Clone)]
pub struct NotificationForwarder {
    tx: mpsc::Sender<Notification>,
}

impl NotificationForwarder {
    /// Returns a new forwarder and the receiving end of its queue
    pub fn new() -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(BUFFER_SIZE);
        (Self { tx }, rx)
    }
}

impl Listener for NotificationForwarder {
    fn notify(&self, notification: Notification) {
        // Never block the input thread on a slow consumer
        match self.tx.try_send(notification) {
            Ok(_) => (),
            Err(TrySendError::Full(notification)) => {
                log::warn!("Notification queue is full. Dropping {notification:?}");
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Notification receiver was dropped");
            }
        }
    }
}

/// The note that is currently sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveNote {
    note: u8,
    channel: u8,
}

/// Turns stylus contact, position and pressure into MIDI messages
#[derive(Debug)]
pub struct ControlSurface<W: Write> {
    config: ControlSurfaceConfig,
    output: W,
    /// Horizontal range of the tablet that is being played
    x_range: Option<AxisRange>,
    active: Option<ActiveNote>,
}

impl ControlSurface<Box<dyn Write + Send>> {
    /// Open the MIDI output named in the config. Without one, messages are
    /// discarded.
    pub fn open(config: &ControlSurfaceConfig) -> Result<Self, MidiError> {
        let output: Box<dyn Write + Send> = match config.midi_output.as_ref() {
            Some(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .map_err(|source| MidiError::Open {
                        path: path.clone(),
                        source,
                    })?;
                log::info!("Sending MIDI to {path}");
                Box::new(file)
            }
            None => {
                log::warn!("No MIDI output configured. MIDI messages will be discarded.");
                Box::new(io::sink())
            }
        };
        Ok(Self::new(config, output))
    }
}

impl<W: Write> ControlSurface<W> {
    pub fn new(config: &ControlSurfaceConfig, output: W) -> Self {
        Self {
            config: config.clone(),
            output,
            x_range: None,
            active: None,
        }
    }

    /// Set the horizontal range of the tablet that maps onto the pitch range
    pub fn set_x_range(&mut self, range: Option<AxisRange>) {
        log::debug!("Using horizontal range: {range:?}");
        self.x_range = range;
    }

    /// Returns true if a note is currently sounding
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Consume the surface and return the MIDI output
    pub fn into_output(self) -> W {
        self.output
    }

    /// The stylus touched the surface. Starts a note at the position of the pen
    /// unless one is already sounding.
    pub fn contact(&mut self, pressure: f32, position: Position) -> Result<(), MidiError> {
        if self.active.is_some() {
            return Ok(());
        }

        let pitch = self.pitch_at(position);
        let note = ActiveNote {
            note: midi::note_number(pitch),
            channel: self.config.midi_channel,
        };
        let offset = pitch - note.note as f32;
        log::debug!("Note on: {} (pitch {pitch}, pressure {pressure})", note.note);

        self.send(midi::pitch_bend(
            offset,
            self.config.pitch_bend_half_range,
            note.channel,
        ))?;
        self.send(midi::aftertouch(pressure, note.note, note.channel))?;
        self.send(midi::note_on(note.note, note.channel, pressure))?;
        self.active = Some(note);

        Ok(())
    }

    /// Follow the pen while the note is sounding
    pub fn update(&mut self, pressure: f32, position: Position) -> Result<(), MidiError> {
        let Some(note) = self.active else {
            return Ok(());
        };

        let offset = self.pitch_at(position) - note.note as f32;
        self.send(midi::pitch_bend(
            offset,
            self.config.pitch_bend_half_range,
            note.channel,
        ))?;
        self.send(midi::aftertouch(pressure, note.note, note.channel))?;

        Ok(())
    }

    /// The stylus left the surface. Stops the sounding note, if any.
    pub fn release(&mut self) -> Result<(), MidiError> {
        let Some(note) = self.active.take() else {
            return Ok(());
        };
        log::debug!("Note off: {}", note.note);
        self.send(midi::note_off(note.note, note.channel))
    }

    fn pitch_at(&self, position: Position) -> f32 {
        let fraction = match self.x_range {
            Some(range) => match range.normalize(position.x.round() as i32) {
                Ok(fraction) => fraction,
                Err(e) => {
                    log::trace!("Unable to map position {position:?}: {e}");
                    0.0
                }
            },
            None => 0.0,
        };
        midi::coord_to_note(
            fraction,
            self.config.lowest_pitch,
            self.config.highest_pitch,
        )
    }

    fn send(&mut self, message: Message) -> Result<(), MidiError> {
        log::trace!("Sending MIDI message: {message:02X?}");
        self.output.write_all(&message)?;
        self.output.flush()?;
        Ok(())
    }
}
