//! Integration tests for the Chroma session lifecycle against MockTransport.

use std::sync::Arc;
use std::time::Duration;

use glow::chroma::mock::{MockTransport, Operation, RequestRecord};
use glow::chroma::{Device, Method, SessionStatus};
use glow::color::Bgr;
use glow::error::GlowError;
use glow::matrix::ColorMatrix;

use crate::common::{connect_mock, connect_to, init_test_logging, wait_until};

fn frame(value: u32) -> ColorMatrix {
    ColorMatrix::full(Bgr(value))
}

/// A 404 on a frame push re-registers and delivers the frame on the new session.
#[test]
fn test_replay_after_404() {
    init_test_logging();
    let (mock, session) = connect_mock(None);

    session.push_frame(&frame(0x11)).unwrap();
    mock.expire_session();
    session.push_frame(&frame(0x22)).unwrap();

    assert_eq!(mock.register_count(), 2);
    assert_eq!(mock.live_session(), Some(2));
    mock.assert_contains(&Operation::Keyboard {
        session: 2,
        matrix: frame(0x22),
    });

    // The rejected attempt went to the old session and got a 404.
    let rejected: Vec<RequestRecord> = mock
        .requests()
        .into_iter()
        .filter(|r| r.status == Some(404))
        .collect();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].url.ends_with("/sessions/1/keyboard"));
}

/// A 410 is treated exactly like a 404.
#[test]
fn test_410_is_session_gone() {
    let (mock, session) = connect_mock(None);
    mock.expire_session_with(410);
    session.push_frame(&frame(1)).unwrap();
    assert_eq!(mock.register_count(), 2);
    assert_eq!(mock.last_keyboard_frame(), Some(frame(1)));
}

/// The heartbeat notices a dropped session on its own and replays the last frame.
#[test]
fn test_heartbeat_recovery_replays_last_frame() {
    init_test_logging();
    let (mock, session) = connect_mock(Some(Duration::from_millis(25)));
    session.push_frame(&frame(0xABCDEF)).unwrap();

    assert!(wait_until(|| mock.heartbeat_count() >= 1));
    mock.expire_session();

    assert!(wait_until(|| mock.register_count() == 2
        && mock.keyboard_frames().len() == 2));
    mock.assert_contains(&Operation::Keyboard {
        session: 2,
        matrix: frame(0xABCDEF),
    });
    assert_eq!(session.status(), SessionStatus::Registered);
}

/// Heartbeats are plain PUTs without a body to `<session>/heartbeat`.
#[test]
fn test_heartbeat_requests() {
    let (mock, _session) = connect_mock(Some(Duration::from_millis(20)));
    assert!(wait_until(|| mock.heartbeat_count() >= 2));
    let heartbeats: Vec<RequestRecord> = mock
        .requests()
        .into_iter()
        .filter(|r| r.url.ends_with("/heartbeat"))
        .collect();
    assert!(heartbeats.iter().all(|r| r.method == Method::Put));
    assert!(heartbeats.iter().all(|r| r.status == Some(200)));
}

/// Transport failures during heartbeat are retried on later ticks.
#[test]
fn test_heartbeat_survives_transport_errors() {
    let (mock, _session) = connect_mock(Some(Duration::from_millis(20)));
    mock.fail_next(3);
    assert!(wait_until(|| mock.heartbeat_count() >= 1));
    assert_eq!(mock.register_count(), 1);
}

/// With the service down at start-up, nothing is registered until it comes back.
#[test]
fn test_service_down_then_up() {
    let mock = Arc::new(MockTransport::new());
    mock.set_unreachable(true);
    let session = connect_to(&mock, None);
    assert_eq!(session.status(), SessionStatus::Unregistered);
    assert!(session.session_uri().is_none());

    let err = session.push_frame(&frame(7)).unwrap_err();
    assert!(matches!(err, GlowError::ServiceUnreachable { .. }), "got {err:?}");
    assert!(err.suggestion().is_some());

    mock.set_unreachable(false);
    session.push_frame(&frame(8)).unwrap();
    assert_eq!(session.status(), SessionStatus::Registered);
    assert_eq!(mock.keyboard_frames(), vec![frame(8)]);
}

/// Registration answered with an error status is reported, not retried in a loop.
#[test]
fn test_registration_refused() {
    let (mock, session) = connect_mock(None);
    mock.expire_session();
    mock.set_registration_status(Some(500));

    let err = session.push_frame(&frame(3)).unwrap_err();
    assert!(matches!(err, GlowError::HttpStatus { status: 500, .. }), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Lost);

    mock.set_registration_status(None);
    session.push_frame(&frame(4)).unwrap();
    assert_eq!(session.status(), SessionStatus::Registered);
}

/// Static colors go to every secondary device, never to the keyboard.
#[test]
fn test_static_color_all_devices() {
    let (mock, session) = connect_mock(None);
    session.push_static_color(Bgr(0x402010));
    for device in Device::SECONDARY {
        assert_eq!(mock.static_colors(device), vec![Bgr(0x402010)], "{device}");
    }
    assert!(mock.keyboard_frames().is_empty());
}

/// A device that rejects static effects does not stop the others.
#[test]
fn test_unsupported_device_is_skipped() {
    let (mock, session) = connect_mock(None);
    mock.mark_unsupported(Device::Mousepad);
    mock.mark_unsupported(Device::Keypad);

    session.push_static_color(Bgr(9));

    assert!(mock.static_colors(Device::Mousepad).is_empty());
    assert!(mock.static_colors(Device::Keypad).is_empty());
    assert_eq!(mock.static_colors(Device::Mouse), vec![Bgr(9)]);
    assert_eq!(mock.static_colors(Device::Headset), vec![Bgr(9)]);
    assert_eq!(mock.static_colors(Device::Chromalink), vec![Bgr(9)]);
    assert_eq!(mock.register_count(), 1);
}

/// clear_all turns every device off and leaves the replay frame alone.
#[test]
fn test_clear_all() {
    let (mock, session) = connect_mock(None);
    session.push_frame(&frame(5)).unwrap();
    session.clear_all();

    assert_eq!(mock.last_keyboard_frame(), Some(ColorMatrix::empty()));
    for device in Device::SECONDARY {
        assert_eq!(mock.static_colors(device), vec![Bgr::OFF], "{device}");
    }
    assert_eq!(session.last_frame(), Some(frame(5)));
}

/// close is idempotent and deletes the session exactly once.
#[test]
fn test_close_is_idempotent() {
    let (mock, session) = connect_mock(Some(Duration::from_millis(20)));
    session.close();
    session.close();
    drop(session);

    let deletes = mock
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Delete)
        .count();
    assert_eq!(deletes, 1);
    assert_eq!(mock.live_session(), None);

    // No heartbeats after close.
    let before = mock.requests().len();
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(mock.requests().len(), before);
}
