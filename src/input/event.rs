use evdev::{AbsInfo, KeyCode};

use super::source::EventDecodeError;

/// Minimum and maximum values an absolute axis reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub minimum: i32,
    pub maximum: i32,
}

impl AxisRange {
    pub fn new(minimum: i32, maximum: i32) -> Self {
        Self { minimum, maximum }
    }

    /// Returns a value between 0.0 and 1.0 based on where the given raw value
    /// falls within this range. Values outside of the range are clamped.
    pub fn normalize(&self, raw_value: i32) -> Result<f32, EventDecodeError> {
        if self.maximum <= self.minimum {
            return Err(EventDecodeError::InvalidRange {
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }
        let span = self.maximum as f64 - self.minimum as f64;
        let value = (raw_value as f64 - self.minimum as f64) / span;

        Ok(value.clamp(0.0, 1.0) as f32)
    }
}

impl From<AbsInfo> for AxisRange {
    fn from(info: AbsInfo) -> Self {
        Self::new(info.minimum(), info.maximum())
    }
}

/// Information about a tablet device reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Path to the device node (e.g. /dev/input/event12)
    pub path: String,
    /// Name the device reports
    pub name: String,
    pub x: Option<AxisRange>,
    pub y: Option<AxisRange>,
    pub pressure: Option<AxisRange>,
}

/// Absolute stylus position in device units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Stylus pressure as reported by an event source. Sources that already know
/// the normalized value send [Pressure::Normalized]; evdev sources send the raw
/// axis value along with the range the device advertised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pressure {
    Normalized(f32),
    Raw { value: i32, range: AxisRange },
}

impl Pressure {
    /// Returns the pressure as a value between 0.0 and 1.0
    pub fn normalize(&self) -> Result<f32, EventDecodeError> {
        match self {
            Pressure::Normalized(value) => {
                if !value.is_finite() {
                    return Err(EventDecodeError::NotFinite(*value));
                }
                Ok(value.clamp(0.0, 1.0))
            }
            Pressure::Raw { value, range } => range.normalize(*value),
        }
    }
}

/// A button on the stylus or tablet changed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Path of the device that emitted the event
    pub device: String,
    /// The evdev key code of the button (e.g. BTN_TOUCH, BTN_STYLUS)
    pub code: u16,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn key(&self) -> KeyCode {
        KeyCode(self.code)
    }

    /// Returns true if this is the stylus tip touching or leaving the surface
    pub fn is_tip(&self) -> bool {
        self.key() == KeyCode::BTN_TOUCH
    }
}

/// One decoded occurrence from an event source
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DeviceAdded(DeviceInfo),
    DeviceRemoved(DeviceInfo),
    Motion(Position),
    Pressure(Pressure),
    Button(ButtonEvent),
}

/// Input activity forwarded to a [crate::input::listener::Listener]. Motion and
/// pressure are not forwarded; they are only reflected in the tablet state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DeviceAdded(DeviceInfo),
    DeviceRemoved(DeviceInfo),
    Button(ButtonEvent),
}
