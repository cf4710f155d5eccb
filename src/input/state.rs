use std::sync::atomic::{AtomicU32, Ordering};

use super::event::Position;

/// Latest known stylus position and pressure.
///
/// Only the input loop writes to the state; any number of threads may read
/// it. Each field is stored as the bit pattern of an `f32` inside an atomic, so
/// a read always yields a value that was actually written. There is no
/// snapshot across fields: a reader may see a position from a later event
/// than the pressure.
#[derive(Debug, Default)]
pub struct TabletState {
    x: AtomicU32,
    y: AtomicU32,
    pressure: AtomicU32,
}

impl TabletState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latest pressure between 0.0 and 1.0. This is 0.0 until the
    /// first pressure event arrives.
    pub fn pressure(&self) -> f32 {
        load(&self.pressure)
    }

    /// Returns the latest absolute position in device units
    pub fn position(&self) -> Position {
        Position::new(load(&self.x), load(&self.y))
    }

    pub(crate) fn set_pressure(&self, pressure: f32) {
        store(&self.pressure, pressure);
    }

    pub(crate) fn set_position(&self, position: Position) {
        store(&self.x, position.x);
        store(&self.y, position.y);
    }
}

fn load(field: &AtomicU32) -> f32 {
    f32::from_bits(field.load(Ordering::Acquire))
}

fn store(field: &AtomicU32, value: f32) {
    field.store(value.to_bits(), Ordering::Release);
}
