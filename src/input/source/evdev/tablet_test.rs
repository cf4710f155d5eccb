use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode, SynchronizationCode};

use crate::input::{
    event::{AxisRange, ButtonEvent, DeviceInfo, Event, Position, Pressure},
    source::EventDecodeError,
};

use super::tablet::FrameTranslator;

const PATH: &str = "/dev/input/event9";

fn abs(axis: AbsoluteAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE.0, axis.0, value)
}

fn key(code: KeyCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY.0, code.0, value)
}

fn syn(code: SynchronizationCode) -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION.0, code.0, 0)
}

fn pen() -> DeviceInfo {
    DeviceInfo {
        path: PATH.to_string(),
        name: "Wacom Intuos S Pen".to_string(),
        x: Some(AxisRange::new(0, 15200)),
        y: Some(AxisRange::new(0, 9500)),
        pressure: Some(AxisRange::new(0, 4095)),
    }
}

/// Feed the events through the translator and collect the successful results
fn translate_all(translator: &mut FrameTranslator, events: &[InputEvent]) -> Vec<Event> {
    events
        .iter()
        .flat_map(|event| translator.translate(*event))
        .map(|result| result.expect("unexpected decode error"))
        .collect()
}

#[test]
fn test_nothing_is_emitted_before_sync() {
    let mut translator = FrameTranslator::new(pen());
    assert!(translator
        .translate(abs(AbsoluteAxisCode::ABS_X, 100))
        .is_empty());
    assert!(translator
        .translate(abs(AbsoluteAxisCode::ABS_PRESSURE, 200))
        .is_empty());
}

#[test]
fn test_frame_order() {
    let mut translator = FrameTranslator::new(pen());
    let events = translate_all(
        &mut translator,
        &[
            key(KeyCode::BTN_TOUCH, 1),
            abs(AbsoluteAxisCode::ABS_PRESSURE, 1024),
            abs(AbsoluteAxisCode::ABS_X, 10),
            abs(AbsoluteAxisCode::ABS_Y, 20),
            syn(SynchronizationCode::SYN_REPORT),
        ],
    );

    assert_eq!(
        events,
        vec![
            Event::Motion(Position::new(10.0, 20.0)),
            Event::Pressure(Pressure::Raw {
                value: 1024,
                range: AxisRange::new(0, 4095),
            }),
            Event::Button(ButtonEvent {
                device: PATH.to_string(),
                code: KeyCode::BTN_TOUCH.0,
                pressed: true,
            }),
        ]
    );
}

#[test]
fn test_partial_motion_keeps_other_axis() {
    let mut translator = FrameTranslator::new(pen()).with_position(Position::new(5.0, 6.0));
    let events = translate_all(
        &mut translator,
        &[
            abs(AbsoluteAxisCode::ABS_Y, 42),
            syn(SynchronizationCode::SYN_REPORT),
            abs(AbsoluteAxisCode::ABS_X, 7),
            syn(SynchronizationCode::SYN_REPORT),
        ],
    );

    assert_eq!(
        events,
        vec![
            Event::Motion(Position::new(5.0, 42.0)),
            Event::Motion(Position::new(7.0, 42.0)),
        ]
    );
}

#[test]
fn test_empty_frame_and_untracked_axes() {
    let mut translator = FrameTranslator::new(pen());
    let events = translate_all(
        &mut translator,
        &[
            abs(AbsoluteAxisCode::ABS_TILT_X, 12),
            abs(AbsoluteAxisCode::ABS_DISTANCE, 3),
            syn(SynchronizationCode::SYN_REPORT),
        ],
    );
    assert!(events.is_empty());
}

#[test]
fn test_autorepeat_is_ignored() {
    let mut translator = FrameTranslator::new(pen());
    let events = translate_all(
        &mut translator,
        &[
            key(KeyCode::BTN_STYLUS, 2),
            syn(SynchronizationCode::SYN_REPORT),
        ],
    );
    assert!(events.is_empty());
}

#[test]
fn test_dropped_frame_is_discarded() {
    let mut translator = FrameTranslator::new(pen());
    translator.translate(abs(AbsoluteAxisCode::ABS_PRESSURE, 3000));
    let results = translator.translate(syn(SynchronizationCode::SYN_DROPPED));
    assert!(matches!(
        results.as_slice(),
        [Err(EventDecodeError::Dropped(path))] if path == PATH
    ));

    // The pressure from before the drop is not reported
    let results = translator.translate(syn(SynchronizationCode::SYN_REPORT));
    assert!(results.is_empty());
}

#[test]
fn test_pressure_without_range() {
    let info = DeviceInfo {
        pressure: None,
        ..pen()
    };
    let mut translator = FrameTranslator::new(info);
    translator.translate(abs(AbsoluteAxisCode::ABS_PRESSURE, 3000));
    let results = translator.translate(syn(SynchronizationCode::SYN_REPORT));
    assert!(matches!(
        results.as_slice(),
        [Err(EventDecodeError::MissingAxis { .. })]
    ));
}

#[test]
fn test_invalid_key_value() {
    let mut translator = FrameTranslator::new(pen());
    let results = translator.translate(key(KeyCode::BTN_STYLUS, 7));
    assert!(matches!(
        results.as_slice(),
        [Err(EventDecodeError::InvalidKeyValue { value: 7, .. })]
    ));
}

#[test]
fn test_raw_pressure_normalizes_to_reported_range() {
    let mut translator = FrameTranslator::new(pen());
    let events = translate_all(
        &mut translator,
        &[
            abs(AbsoluteAxisCode::ABS_PRESSURE, 4095),
            syn(SynchronizationCode::SYN_REPORT),
        ],
    );
    let [Event::Pressure(pressure)] = events.as_slice() else {
        panic!("expected a single pressure event, got {events:?}");
    };
    assert_eq!(pressure.normalize().unwrap(), 1.0);
}
