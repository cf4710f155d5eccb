use std::{
    sync::{atomic::AtomicBool, Arc, Mutex},
    time::Duration,
};

use super::{
    event::{AxisRange, ButtonEvent, DeviceInfo, Event, Notification, Position, Pressure},
    listener::Listener,
    source::{
        scripted::{scripted, Step},
        EventDecodeError,
    },
    state::TabletState,
    worker::{InputLoop, WorkerState, WorkerStatus},
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Default)]
struct Recorder {
    notifications: Mutex<Vec<Notification>>,
}

impl Listener for Recorder {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("recorder lock poisoned")
            .push(notification);
    }
}

struct Harness {
    state: Arc<TabletState>,
    status: Arc<WorkerStatus>,
    recorder: Arc<Recorder>,
}

/// Run the input loop on the current thread until the scripted session fails
fn run_until_failure(steps: Vec<Step>) -> Harness {
    let (tx, source) = scripted();
    for step in steps {
        tx.send(step).expect("scripted source closed");
    }
    tx.send(Step::Fail).expect("scripted source closed");

    let state = Arc::new(TabletState::new());
    let status = Arc::new(WorkerStatus::new());
    let recorder = Arc::new(Recorder::default());
    let input_loop = InputLoop::new(
        source,
        state.clone(),
        recorder.clone(),
        Arc::new(AtomicBool::new(false)),
        status.clone(),
        POLL_INTERVAL,
    );
    input_loop.run();

    Harness {
        state,
        status,
        recorder,
    }
}

fn tablet() -> DeviceInfo {
    DeviceInfo {
        path: "/dev/input/event7".to_string(),
        name: "Test Pen".to_string(),
        x: Some(AxisRange::new(0, 21600)),
        y: Some(AxisRange::new(0, 13500)),
        pressure: Some(AxisRange::new(0, 8191)),
    }
}

#[test]
fn test_motion_and_pressure_update_state() {
    let harness = run_until_failure(vec![
        Step::Event(Event::Pressure(Pressure::Normalized(0.3))),
        Step::Event(Event::Motion(Position::new(10.0, 20.0))),
        Step::Event(Event::Pressure(Pressure::Normalized(0.75))),
        Step::Event(Event::DeviceRemoved(tablet())),
    ]);

    assert_eq!(harness.state.pressure(), 0.75);
    assert_eq!(harness.state.position(), Position::new(10.0, 20.0));
    let notifications = harness.recorder.notifications.lock().unwrap();
    assert_eq!(*notifications, vec![Notification::DeviceRemoved(tablet())]);
}

#[test]
fn test_raw_pressure_is_normalized() {
    let range = AxisRange::new(0, 2047);
    let harness = run_until_failure(vec![Step::Event(Event::Pressure(Pressure::Raw {
        value: 2047,
        range,
    }))]);
    assert_eq!(harness.state.pressure(), 1.0);

    let range = AxisRange::new(-100, 100);
    let harness = run_until_failure(vec![Step::Event(Event::Pressure(Pressure::Raw {
        value: 0,
        range,
    }))]);
    assert_eq!(harness.state.pressure(), 0.5);
}

#[test]
fn test_out_of_range_pressure_is_clamped() {
    let harness = run_until_failure(vec![
        Step::Event(Event::Pressure(Pressure::Normalized(0.4))),
        Step::Event(Event::Pressure(Pressure::Normalized(1.5))),
    ]);
    assert_eq!(harness.state.pressure(), 1.0);
}

#[test]
fn test_decode_errors_are_skipped() {
    let harness = run_until_failure(vec![
        Step::Event(Event::Pressure(Pressure::Normalized(0.25))),
        Step::DecodeError(EventDecodeError::Dropped("/dev/input/event7".to_string())),
        // Degenerate range reported by the device
        Step::Event(Event::Pressure(Pressure::Raw {
            value: 10,
            range: AxisRange::new(5, 5),
        })),
        Step::Event(Event::Pressure(Pressure::Normalized(f32::NAN))),
        Step::Event(Event::Motion(Position::new(3.0, 4.0))),
    ]);

    assert_eq!(harness.state.pressure(), 0.25);
    assert_eq!(harness.state.position(), Position::new(3.0, 4.0));
}

#[test]
fn test_hotplug_and_buttons_notify_listener() {
    let button = ButtonEvent {
        device: "/dev/input/event7".to_string(),
        code: evdev::KeyCode::BTN_STYLUS.0,
        pressed: true,
    };
    let harness = run_until_failure(vec![
        Step::Event(Event::DeviceAdded(tablet())),
        Step::Event(Event::Button(button.clone())),
        Step::Event(Event::Motion(Position::new(1.0, 1.0))),
        Step::Event(Event::DeviceRemoved(tablet())),
    ]);

    let notifications = harness.recorder.notifications.lock().unwrap();
    assert_eq!(
        *notifications,
        vec![
            Notification::DeviceAdded(tablet()),
            Notification::Button(button),
            Notification::DeviceRemoved(tablet()),
        ]
    );
    // Buttons and hotplug never touch the tablet state
    assert_eq!(harness.state.pressure(), 0.0);
}

#[test]
fn test_session_failure_stops_loop_and_keeps_state() {
    let harness = run_until_failure(vec![Step::Event(Event::Pressure(
        Pressure::Normalized(0.6),
    ))]);

    assert_eq!(harness.status.get(), WorkerState::Stopped);
    assert_eq!(harness.state.pressure(), 0.6);
}
