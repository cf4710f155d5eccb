//! MIDI channel voice messages used by the control surface

use std::io;

use thiserror::Error;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_AFTERTOUCH: u8 = 0xA0;
const PITCH_BEND: u8 = 0xE0;

/// Largest 14-bit pitch bend value. The center (no bend) is 8192.
const PITCH_BEND_MAX: f32 = 16383.0;
const PITCH_BEND_CENTER: u16 = 8192;

/// Represents all possible errors sending MIDI
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("Unable to open MIDI output '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Unable to write MIDI message: {0}")]
    Write(#[from] io::Error),
}

/// A three byte MIDI message
pub type Message = [u8; 3];

/// Convert a value between 0.0 and 1.0 into a 7-bit MIDI value
pub fn midi_value(value: f32) -> u8 {
    (value * 128.0).floor().clamp(0.0, 127.0) as u8
}

/// Returns the MIDI note number closest to the given pitch
pub fn note_number(pitch: f32) -> u8 {
    pitch.round().clamp(0.0, 127.0) as u8
}

/// Map a position between 0.0 (left edge) and 1.0 (right edge) onto a
/// continuous pitch between `lowest` and `highest`
pub fn coord_to_note(fraction: f32, lowest: f32, highest: f32) -> f32 {
    if lowest == highest {
        return lowest;
    }
    lowest + fraction * (highest - lowest)
}

pub fn note_on(note: u8, channel: u8, velocity: f32) -> Message {
    [NOTE_ON | (channel & 0x0F), note & 0x7F, midi_value(velocity)]
}

pub fn note_off(note: u8, channel: u8) -> Message {
    [NOTE_OFF | (channel & 0x0F), note & 0x7F, 0]
}

/// Polyphonic key pressure for a sounding note
pub fn aftertouch(value: f32, note: u8, channel: u8) -> Message {
    [
        POLY_AFTERTOUCH | (channel & 0x0F),
        note & 0x7F,
        midi_value(value),
    ]
}

/// Pitch bend by `semitones`, where the receiver bends `half_range` semitones
/// at full deflection. The 14-bit value is sent least significant 7 bits first.
pub fn pitch_bend(semitones: f32, half_range: f32, channel: u8) -> Message {
    let value = if half_range > 0.0 && semitones.is_finite() {
        let scaled = (PITCH_BEND_MAX + 1.0) * (semitones / (2.0 * half_range) + 0.5);
        scaled.clamp(0.0, PITCH_BEND_MAX) as u16
    } else {
        PITCH_BEND_CENTER
    };

    let lsb = (value & 0x7F) as u8;
    let msb = (value >> 7) as u8;
    [PITCH_BEND | (channel & 0x0F), lsb, msb]
}
