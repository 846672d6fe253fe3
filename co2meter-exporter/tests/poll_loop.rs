use std::io::{Cursor, ErrorKind, Read};
use std::time::Duration;

use co2meter_core::{DecodedFrame, RawFrame, SessionKey, encode};
use co2meter_exporter::poll::{self, Cycle};
use co2meter_exporter::{
    EnvironmentState, InvalidFramePolicy, PollConfig, PollError, PollExit, PollLoop,
};

const KEY: SessionKey = SessionKey([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);

fn config(policy: InvalidFramePolicy) -> PollConfig {
    PollConfig {
        skip_decryption: false,
        on_invalid_frame: policy,
        interval: Duration::ZERO,
    }
}

fn obfuscated(kind: u8, value: u16) -> RawFrame {
    encode(&DecodedFrame::new(kind, value), &KEY)
}

/// A frame whose decoded checksum is off by one.
fn corrupted() -> RawFrame {
    let mut frame = DecodedFrame::new(0x50, 900);
    frame.0[3] = frame.0[3].wrapping_add(1);
    encode(&frame, &KEY)
}

fn stream(frames: &[RawFrame]) -> Cursor<Vec<u8>> {
    Cursor::new(frames.iter().flat_map(|f| f.0).collect())
}

fn poll_loop<R: Read>(reader: R, state: &EnvironmentState, config: PollConfig) -> PollLoop<R> {
    PollLoop::new(reader, KEY, state.clone(), config)
}

#[test]
fn decodes_co2_frame_into_state() {
    let state = EnvironmentState::new();
    state.set_temperature(21.5);

    let mut poll = poll_loop(
        stream(&[obfuscated(0x50, 527)]),
        &state,
        config(InvalidFramePolicy::Stop),
    );

    assert_eq!(poll.poll_once().unwrap(), Cycle::Continue);
    assert_eq!(state.co2(), 527);
    assert_eq!(state.temperature(), 21.5);
}

#[test]
fn temperature_frame_touches_only_temperature() {
    let state = EnvironmentState::new();
    state.set_co2(640);

    let mut poll = poll_loop(
        stream(&[obfuscated(0x42, 4665)]),
        &state,
        config(InvalidFramePolicy::Stop),
    );

    poll.poll_once().unwrap();
    assert_eq!(state.temperature(), 18.41);
    assert_eq!(state.co2(), 640);
}

#[test]
fn unknown_kinds_leave_state_untouched() {
    let state = EnvironmentState::new();
    state.set_co2(640);
    state.set_temperature(19.0);

    let frames: Vec<RawFrame> = [0x41u8, 0x43, 0x4F, 0x51, 0x6D, 0x00]
        .iter()
        .map(|kind| obfuscated(*kind, 1234))
        .collect();
    let mut poll = poll_loop(stream(&frames), &state, config(InvalidFramePolicy::Fatal));

    for _ in 0..frames.len() {
        assert_eq!(poll.poll_once().unwrap(), Cycle::Continue);
    }
    assert_eq!(state.co2(), 640);
    assert_eq!(state.temperature(), 19.0);
}

#[test]
fn skip_decryption_reads_plain_frames_without_checks() {
    let state = EnvironmentState::new();
    let plain = RawFrame([0x50, 0x02, 0x0F, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);

    let mut poll = poll_loop(
        stream(&[plain]),
        &state,
        PollConfig {
            skip_decryption: true,
            ..config(InvalidFramePolicy::Fatal)
        },
    );

    assert_eq!(poll.poll_once().unwrap(), Cycle::Continue);
    assert_eq!(state.co2(), 527);
}

#[test]
fn stop_policy_ends_loop_and_freezes_state() {
    let state = EnvironmentState::new();
    let frames = [obfuscated(0x50, 527), corrupted(), obfuscated(0x42, 4665)];

    let exit = poll_loop(stream(&frames), &state, config(InvalidFramePolicy::Stop))
        .run()
        .unwrap();

    assert!(matches!(exit, PollExit::InvalidFrame(_)));
    assert_eq!(state.co2(), 527);
    assert_eq!(state.temperature(), 0.0);
}

#[test]
fn skip_policy_continues_with_next_frame() {
    let state = EnvironmentState::new();
    let frames = [obfuscated(0x50, 527), corrupted(), obfuscated(0x42, 4665)];

    // Runs until the stream is exhausted.
    let err = poll_loop(stream(&frames), &state, config(InvalidFramePolicy::Skip))
        .run()
        .unwrap_err();

    assert!(matches!(err, PollError::Read(ref e) if e.kind() == ErrorKind::UnexpectedEof));
    assert_eq!(state.co2(), 527);
    assert_eq!(state.temperature(), 18.41);
}

#[test]
fn fatal_policy_reports_the_frame() {
    let state = EnvironmentState::new();
    let frames = [corrupted(), obfuscated(0x50, 527)];

    let err = poll_loop(stream(&frames), &state, config(InvalidFramePolicy::Fatal))
        .run()
        .unwrap_err();

    assert!(matches!(err, PollError::InvalidFrame { .. }));
    assert_eq!(state.co2(), 0);
}

#[test]
fn wrong_key_is_caught_by_validation() {
    let state = EnvironmentState::new();
    let raw = encode(&DecodedFrame::new(0x50, 527), &SessionKey([0xA5; 8]));

    let mut poll = poll_loop(stream(&[raw]), &state, config(InvalidFramePolicy::Stop));

    assert!(matches!(poll.poll_once().unwrap(), Cycle::Stop(_)));
    assert_eq!(state.co2(), 0);
}

#[test]
fn partial_frame_is_a_read_error() {
    let state = EnvironmentState::new();
    let mut bytes: Vec<u8> = obfuscated(0x50, 527).0.to_vec();
    bytes.extend_from_slice(&[0x01, 0x02, 0x03]);

    let err = poll_loop(Cursor::new(bytes), &state, config(InvalidFramePolicy::Skip))
        .run()
        .unwrap_err();

    assert!(matches!(err, PollError::Read(ref e) if e.kind() == ErrorKind::UnexpectedEof));
    assert_eq!(state.co2(), 527);
}

#[test]
fn random_keys_round_trip_through_the_loop() {
    for _ in 0..200 {
        let key = SessionKey::generate();
        let ppm: u16 = rand::random_range(300..5000);
        let raw = encode(&DecodedFrame::new(0x50, ppm), &key);

        let state = EnvironmentState::new();
        let mut poll = PollLoop::new(
            stream(&[raw]),
            key,
            state.clone(),
            config(InvalidFramePolicy::Fatal),
        );

        poll.poll_once().unwrap();
        assert_eq!(state.co2(), ppm);
    }
}

#[tokio::test]
async fn spawned_loop_reports_its_outcome() {
    let state = EnvironmentState::new();
    let frames = [obfuscated(0x42, 4665), corrupted()];

    let rx = poll::spawn(poll_loop(
        stream(&frames),
        &state,
        config(InvalidFramePolicy::Stop),
    ))
    .unwrap();

    let outcome = rx.await.unwrap();
    assert!(matches!(outcome, Ok(PollExit::InvalidFrame(_))));
    assert_eq!(state.temperature(), 18.41);
}
