use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use evdev::{
    AbsInfo, AbsoluteAxisCode, Device, EventSummary, InputEvent, KeyCode, SynchronizationCode,
};
use nix::errno::Errno;

use crate::input::{
    event::{AxisRange, ButtonEvent, DeviceInfo, Event, Position, Pressure},
    source::EventDecodeError,
};

/// Upper bound on reads from a single device per dispatch so one busy tablet
/// cannot starve the others or the stop flag.
const MAX_READS_PER_DISPATCH: usize = 16;

/// Outcome of reading pending events from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// All queued events were read
    Drained,
    /// More events may still be queued
    Pending,
    /// The device is gone or unusable and should be closed
    Gone,
}

/// Axis values seen since the last SYN_REPORT
#[derive(Debug, Default)]
struct Frame {
    x: Option<i32>,
    y: Option<i32>,
    pressure: Option<i32>,
    buttons: Vec<ButtonEvent>,
}

/// Translates the raw evdev stream of one tablet into [Event]s.
///
/// Axis values are collected until the kernel closes the frame with a
/// SYN_REPORT. The frame then becomes a [Event::Motion] if the position changed,
/// a [Event::Pressure] if the pressure changed, and one [Event::Button] per key
/// change, in that order. Emitting pressure before buttons means a listener
/// reacting to the tip touching down already sees the pressure of that frame.
#[derive(Debug)]
pub struct FrameTranslator {
    info: DeviceInfo,
    position: Position,
    frame: Frame,
}

impl FrameTranslator {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            position: Position::default(),
            frame: Frame::default(),
        }
    }

    /// Start from the axis values the device reported when it was opened
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Translate the given evdev event. Returns any events completed by it.
    pub fn translate(&mut self, event: InputEvent) -> Vec<Result<Event, EventDecodeError>> {
        log::trace!("Received event: {:?}", event);

        match event.destructure() {
            // Synchronization events indicate that the frame is complete
            EventSummary::Synchronization(_, SynchronizationCode::SYN_REPORT, _) => {
                return self.flush();
            }
            // The kernel buffer overran and part of the frame was lost
            EventSummary::Synchronization(_, SynchronizationCode::SYN_DROPPED, _) => {
                self.frame = Frame::default();
                return vec![Err(EventDecodeError::Dropped(self.info.path.clone()))];
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_X, value) => {
                self.frame.x = Some(value);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_Y, value) => {
                self.frame.y = Some(value);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_PRESSURE, value) => {
                self.frame.pressure = Some(value);
            }
            EventSummary::Key(_, code, value) => match value {
                0 | 1 => self.frame.buttons.push(ButtonEvent {
                    device: self.info.path.clone(),
                    code: code.0,
                    pressed: value == 1,
                }),
                // Autorepeat
                2 => (),
                _ => {
                    return vec![Err(EventDecodeError::InvalidKeyValue {
                        path: self.info.path.clone(),
                        code: code.0,
                        value,
                    })];
                }
            },
            // Tilt, distance, serial numbers and timestamps are not tracked
            _ => (),
        }

        vec![]
    }

    fn flush(&mut self) -> Vec<Result<Event, EventDecodeError>> {
        let frame = std::mem::take(&mut self.frame);
        let mut events = Vec::with_capacity(2 + frame.buttons.len());

        if frame.x.is_some() || frame.y.is_some() {
            if let Some(x) = frame.x {
                self.position.x = x as f32;
            }
            if let Some(y) = frame.y {
                self.position.y = y as f32;
            }
            events.push(Ok(Event::Motion(self.position)));
        }

        if let Some(value) = frame.pressure {
            let event = match self.info.pressure {
                Some(range) => Ok(Event::Pressure(Pressure::Raw { value, range })),
                None => Err(EventDecodeError::MissingAxis {
                    path: self.info.path.clone(),
                    axis: AbsoluteAxisCode::ABS_PRESSURE,
                }),
            };
            events.push(event);
        }

        events.extend(frame.buttons.into_iter().map(|b| Ok(Event::Button(b))));
        events
    }
}

/// Source device implementation for evdev pen tablets
pub struct TabletEventDevice {
    /// Descriptor handed out by the device access shim
    fd: OwnedFd,
    device: Device,
    translator: FrameTranslator,
}

impl TabletEventDevice {
    /// Create a tablet device from an opened evdev device. The device reads
    /// through its own duplicate of `fd`; `fd` itself is handed back by
    /// [TabletEventDevice::into_parts] so it can be released through the shim.
    pub fn new(path: String, fd: OwnedFd, mut device: Device, grab: bool) -> Self {
        let axes_info = get_axes_info(&device);
        let info = device_info(path, &device, &axes_info);

        if grab {
            if let Err(e) = device.grab() {
                log::warn!("Unable to grab {}: {e}", info.path);
            }
        }

        // Start from the values the device currently reports
        let position = Position::new(
            axes_info
                .get(&AbsoluteAxisCode::ABS_X)
                .map(|info| info.value() as f32)
                .unwrap_or_default(),
            axes_info
                .get(&AbsoluteAxisCode::ABS_Y)
                .map(|info| info.value() as f32)
                .unwrap_or_default(),
        );
        let translator = FrameTranslator::new(info).with_position(position);

        Self {
            fd,
            device,
            translator,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        self.translator.info()
    }

    /// Read queued events from the device and append the translated events to
    /// `out`.
    pub fn read_events(&mut self, out: &mut Vec<Result<Event, EventDecodeError>>) -> ReadStatus {
        for _ in 0..MAX_READS_PER_DISPATCH {
            let events: Vec<InputEvent> = match self.device.fetch_events() {
                Ok(events) => events.collect(),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return ReadStatus::Drained;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    let path = self.translator.info().path.clone();
                    if err.raw_os_error() == Some(Errno::ENODEV as i32) {
                        log::debug!("Device {path} is gone");
                    } else {
                        log::trace!("Failed to fetch events: {:?}", err);
                        out.push(Err(EventDecodeError::Read { path, source: err }));
                    }
                    return ReadStatus::Gone;
                }
            };
            log::trace!("Read events from device: {events:?}");

            for event in events {
                out.extend(self.translator.translate(event));
            }
        }

        ReadStatus::Pending
    }

    /// Close the evdev handle and return the shim descriptor and device info
    pub fn into_parts(self) -> (OwnedFd, DeviceInfo) {
        let Self {
            fd,
            device,
            translator,
        } = self;
        drop(device);
        (fd, translator.info)
    }
}

impl AsRawFd for TabletEventDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }
}

impl Debug for TabletEventDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabletEventDevice")
            .field("fd", &self.fd)
            .field("info", self.info())
            .finish()
    }
}

/// Returns true if the device looks like a pen tablet: it reports absolute
/// position and pressure and has a pen tool.
pub fn is_tablet(device: &Device) -> bool {
    let Some(axes) = device.supported_absolute_axes() else {
        return false;
    };
    let has_axes = axes.contains(AbsoluteAxisCode::ABS_X)
        && axes.contains(AbsoluteAxisCode::ABS_Y)
        && axes.contains(AbsoluteAxisCode::ABS_PRESSURE);
    let has_pen = device
        .supported_keys()
        .map(|keys| keys.contains(KeyCode::BTN_TOOL_PEN))
        .unwrap_or(false);

    has_axes && has_pen
}

/// Query information about the device to get the absolute ranges
fn get_axes_info(device: &Device) -> HashMap<AbsoluteAxisCode, AbsInfo> {
    let mut axes_info = HashMap::new();
    let absinfo = match device.get_absinfo() {
        Ok(absinfo) => absinfo,
        Err(e) => {
            log::warn!("Unable to query axis ranges: {e}");
            return axes_info;
        }
    };
    for (axis, info) in absinfo {
        log::trace!("Found axis: {:?}", axis);
        log::trace!("Found info: {:?}", info);
        axes_info.insert(axis, info);
    }
    axes_info
}

/// Build the [DeviceInfo] for the given device
pub fn device_info(
    path: String,
    device: &Device,
    axes_info: &HashMap<AbsoluteAxisCode, AbsInfo>,
) -> DeviceInfo {
    let range = |axis| axes_info.get(&axis).map(|info| AxisRange::from(*info));
    DeviceInfo {
        path,
        name: device.name().unwrap_or("Unknown").to_string(),
        x: range(AbsoluteAxisCode::ABS_X),
        y: range(AbsoluteAxisCode::ABS_Y),
        pressure: range(AbsoluteAxisCode::ABS_PRESSURE),
    }
}

/// Build the [DeviceInfo] for the given device, querying its axis ranges
pub fn query_device_info(path: String, device: &Device) -> DeviceInfo {
    let axes_info = get_axes_info(device);
    device_info(path, device, &axes_info)
}
