use std::time::{Duration, Instant};

use wheelman::config::{EventBinding, PollPolicy, WheelConfig};
use wheelman::mock::{MockHandle, MockWheel, Responder};
use wheelman::wheel::{command_byte, FilterWheel, INIT_COMMAND, MAX_SLOT, MAX_SPEED};
use wheelman::Error;

fn fast_config() -> WheelConfig {
    WheelConfig {
        poll: PollPolicy {
            attempts: 100,
            interval: Duration::from_micros(50),
        },
        ..WheelConfig::default()
    }
}

fn open_wheel(config: &WheelConfig) -> (FilterWheel<MockWheel>, MockHandle) {
    let (mock, handle) = MockWheel::new();
    let wheel = FilterWheel::with_transport(mock, config).unwrap();
    (wheel, handle)
}

#[test]
fn open_sends_init_and_waits_for_ack() {
    let (wheel, handle) = open_wheel(&fast_config());

    assert_eq!(handle.written(), vec![INIT_COMMAND]);
    assert_eq!(handle.reads(), vec![2]);
    assert_eq!(wheel.position(), 0);
    assert!(wheel.is_initialized());
}

#[test]
fn slow_ack_then_move() {
    let (mock, handle) = MockWheel::new();
    handle.set_latency(5);
    let mut wheel = FilterWheel::with_transport(mock, &fast_config()).unwrap();
    assert_eq!(wheel.position(), 0);
    assert!(wheel.is_initialized());

    handle.clear();
    let state = wheel.move_to(3, 2).unwrap();

    assert_eq!(handle.written(), vec![35]);
    assert_eq!(handle.reads(), vec![2]);
    assert_eq!(state.position, 3);
    assert_eq!(wheel.position(), 3);
    assert_eq!(handle.slot(), 3);
}

#[test]
fn every_valid_move_sends_one_byte_and_reads_one_ack() {
    let config = fast_config();
    for slot in 0..=MAX_SLOT {
        for speed in 0..=MAX_SPEED {
            let (mut wheel, handle) = open_wheel(&config);
            if slot == 0 {
                wheel.move_to(1, 1).unwrap();
            }
            handle.clear();

            wheel.move_to(slot, speed).unwrap();

            assert_eq!(handle.written(), vec![slot + 16 * speed]);
            assert_eq!(handle.written(), vec![command_byte(slot, speed)]);
            assert_eq!(handle.reads(), vec![2]);
            assert_eq!(wheel.position(), slot);
        }
    }
}

#[test]
fn move_to_current_slot_sends_nothing() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    wheel.move_to(3, 1).unwrap();
    handle.clear();

    for speed in 0..=MAX_SPEED {
        wheel.move_to(3, speed).unwrap();
    }

    assert!(handle.written().is_empty());
    assert!(handle.reads().is_empty());
    assert_eq!(wheel.position(), 3);
}

#[test]
fn out_of_range_arguments_are_rejected_before_io() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    handle.clear();

    assert!(matches!(wheel.move_to(10, 1), Err(Error::InvalidArgument(_))));
    assert!(matches!(wheel.move_to(1, 8), Err(Error::InvalidArgument(_))));
    // validated even when the slot would be a no-op
    assert!(matches!(wheel.move_to(0, 8), Err(Error::InvalidArgument(_))));

    assert!(handle.written().is_empty());
    assert_eq!(wheel.position(), 0);
}

#[test]
fn toggle_alternates_between_one_and_two() {
    let (mut wheel, _handle) = open_wheel(&fast_config());

    assert_eq!(wheel.toggle().unwrap().position, 1);
    assert_eq!(wheel.toggle().unwrap().position, 2);
    assert_eq!(wheel.toggle().unwrap().position, 1);

    wheel.move_to(3, 1).unwrap();
    assert_eq!(wheel.toggle().unwrap().position, 1);

    wheel.move_to(0, 1).unwrap();
    assert_eq!(wheel.toggle().unwrap().position, 1);
}

#[test]
fn silent_device_fails_open() {
    let (mock, handle) = MockWheel::with_responder(Responder::Silent);

    let result = FilterWheel::with_transport(mock, &fast_config());

    match result {
        Err(Error::DeviceNotResponding {
            expected,
            available,
            ..
        }) => {
            assert_eq!(expected, 2);
            assert_eq!(available, 0);
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("open should fail"),
    }
    assert_eq!(handle.written(), vec![INIT_COMMAND]);
    assert_eq!(handle.released(), 1);
}

#[test]
fn silent_device_leaves_position_unchanged() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    wheel.move_to(2, 1).unwrap();
    handle.set_responder(Responder::Silent);

    let err = wheel.move_to(4, 1).unwrap_err();

    assert!(matches!(err, Error::DeviceNotResponding { .. }));
    assert_eq!(wheel.position(), 2);
}

#[test]
fn short_ack_is_not_enough() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    handle.set_responder(Responder::Short);

    match wheel.move_to(5, 1) {
        Err(Error::DeviceNotResponding { available, .. }) => assert_eq!(available, 1),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(wheel.position(), 0);
}

#[test]
fn default_poll_window_is_about_one_second() {
    let (mut wheel, handle) = open_wheel(&WheelConfig::default());
    handle.set_responder(Responder::Silent);

    let start = Instant::now();
    let err = wheel.move_to(1, 1).unwrap_err();

    assert!(matches!(err, Error::DeviceNotResponding { .. }));
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[test]
fn deferred_init_reads_on_first_move() {
    let config = WheelConfig {
        initialize_on_open: false,
        ..fast_config()
    };
    let (mut wheel, handle) = open_wheel(&config);

    assert_eq!(handle.written(), vec![INIT_COMMAND]);
    assert!(handle.reads().is_empty());
    assert!(!wheel.is_initialized());

    // had the command gone out first, four bytes would be waiting and the
    // exact-count poll would never match
    wheel.move_to(3, 1).unwrap();

    assert_eq!(handle.written(), vec![INIT_COMMAND, 19]);
    assert_eq!(handle.reads(), vec![2, 2]);
    assert!(wheel.is_initialized());
    assert_eq!(wheel.position(), 3);
}

#[test]
fn deferred_init_survives_noop_move() {
    let config = WheelConfig {
        initialize_on_open: false,
        ..fast_config()
    };
    let (mut wheel, handle) = open_wheel(&config);

    wheel.move_to(0, 1).unwrap();

    assert!(handle.reads().is_empty());
    assert!(!wheel.is_initialized());
}

#[test]
fn failed_deferred_init_keeps_wheel_uninitialized() {
    let config = WheelConfig {
        initialize_on_open: false,
        ..fast_config()
    };
    let (mock, handle) = MockWheel::with_responder(Responder::Silent);
    let mut wheel = FilterWheel::with_transport(mock, &config).unwrap();

    assert!(wheel.move_to(2, 1).is_err());
    assert!(!wheel.is_initialized());
    assert_eq!(handle.written(), vec![INIT_COMMAND]);
}

#[test]
fn close_homes_then_releases() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    wheel.move_to(5, 3).unwrap();
    handle.clear();

    wheel.close().unwrap();

    assert_eq!(handle.written(), vec![command_byte(0, 1)]);
    assert_eq!(handle.slot(), 0);
    assert_eq!(handle.released(), 1);
}

#[test]
fn close_at_home_sends_nothing() {
    let (wheel, handle) = open_wheel(&fast_config());
    handle.clear();

    wheel.close().unwrap();

    assert!(handle.written().is_empty());
    assert_eq!(handle.released(), 1);
}

#[test]
fn close_releases_even_when_homing_fails() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    wheel.move_to(5, 1).unwrap();
    handle.set_responder(Responder::Silent);

    let err = wheel.close().unwrap_err();

    assert!(matches!(err, Error::DeviceNotResponding { .. }));
    assert_eq!(handle.released(), 1);
}

#[test]
fn dropping_without_close_homes_once() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    wheel.move_to(2, 1).unwrap();
    handle.clear();

    drop(wheel);

    assert_eq!(handle.written(), vec![command_byte(0, 1)]);
    assert_eq!(handle.released(), 1);
}

#[test]
fn channel_events_select_zero_based_slot() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    handle.clear();

    let state = wheel
        .handle_configuration_event("561_AOTF", "Channel", "3")
        .unwrap();

    assert_eq!(state.position, 2);
    assert_eq!(handle.written(), vec![command_byte(2, 1)]);
}

#[test]
fn toggle_event_toggles() {
    let (mut wheel, _handle) = open_wheel(&fast_config());

    wheel
        .handle_configuration_event("561_AOTF", "Channel", "toggle")
        .unwrap();
    assert_eq!(wheel.position(), 1);
    wheel
        .handle_configuration_event("561_AOTF", "Channel", "toggle")
        .unwrap();
    assert_eq!(wheel.position(), 2);
}

#[test]
fn unrelated_events_are_ignored() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    handle.clear();

    wheel
        .handle_configuration_event("488_AOTF", "Channel", "3")
        .unwrap();
    wheel
        .handle_configuration_event("561_AOTF", "Power", "3")
        .unwrap();
    wheel
        .handle_configuration_event("561_AOTF", "Channel", "blue")
        .unwrap();

    assert!(handle.written().is_empty());
    assert_eq!(wheel.position(), 0);
}

#[test]
fn out_of_range_channels_are_rejected() {
    let (mut wheel, handle) = open_wheel(&fast_config());
    handle.clear();

    for value in ["0", "11", "-4"] {
        assert!(matches!(
            wheel.handle_configuration_event("561_AOTF", "Channel", value),
            Err(Error::InvalidArgument(_))
        ));
    }
    assert!(handle.written().is_empty());
}

#[test]
fn custom_binding_replaces_default() {
    let config = WheelConfig {
        binding: EventBinding {
            device: "Emission".to_string(),
            property: "Filter".to_string(),
        },
        ..fast_config()
    };
    let (mut wheel, _handle) = open_wheel(&config);

    wheel
        .handle_configuration_event("561_AOTF", "Channel", "4")
        .unwrap();
    assert_eq!(wheel.position(), 0);

    wheel
        .handle_configuration_event("Emission", "Filter", "4")
        .unwrap();
    assert_eq!(wheel.position(), 3);
}

#[test]
fn missing_port_is_a_connection_error() {
    let config = WheelConfig {
        port: "/dev/wheelman-does-not-exist".to_string(),
        ..fast_config()
    };

    match FilterWheel::open(&config) {
        Err(e @ Error::Connection { .. }) => {
            assert!(e.to_string().contains("powered"));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("port should not open"),
    }
}
