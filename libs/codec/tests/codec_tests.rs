//! # Bridge Codec Integration Tests
//!
//! Exercises the public API the way the stub and proxy use it:
//! - exact envelope byte layout
//! - request → reply lifecycle through a frame
//! - corruption detected at the frame layer

use bridge_codec::{
    ArgValue, CallResult, DecodeError, Envelope, FaultKind, Frame, ReplyCode, RequestCode,
    FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_VERSION,
};

fn le(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

#[test]
fn test_envelope_byte_layout() {
    let envelope = Envelope::request("A", "C", "op", "", &[ArgValue::Bool(false)]);
    let bytes = envelope.encode().unwrap();

    let mut expected = Vec::new();
    for s in ["A", "C", "op", ""] {
        expected.extend_from_slice(&le(s.len() as u32));
        expected.extend_from_slice(s.as_bytes());
    }
    // argTypes
    expected.extend_from_slice(&le(1));
    expected.extend_from_slice(&le(7));
    expected.extend_from_slice(b"Boolean");
    // args
    expected.extend_from_slice(&le(1));
    expected.extend_from_slice(&le(5));
    expected.extend_from_slice(b"false");
    // no result
    expected.extend_from_slice(&le(0));

    assert_eq!(bytes, expected);
}

#[test]
fn test_request_reply_lifecycle() {
    let request = Envelope::request(
        "device-a",
        "kvStoreService",
        "kvGet",
        "session-1",
        &[ArgValue::from("K")],
    );
    assert!(!request.is_reply());

    let wire = Frame::invoke(request.encode().unwrap()).encode().unwrap();
    assert_eq!(&wire[..4], &FRAME_MAGIC);
    assert_eq!(wire[4], FRAME_VERSION);

    // Server side
    let frame = Frame::decode(&wire).unwrap();
    assert_eq!(frame.request_code(), Some(RequestCode::Invoke));
    let received = Envelope::decode(&frame.body).unwrap();
    assert_eq!(received.typed_args().unwrap(), vec![ArgValue::from("K")]);

    let reply = received
        .into_reply(&CallResult::with_value(&ArgValue::from("V")))
        .unwrap();
    let reply_wire = Frame::new(ReplyCode::Invoke.into(), reply.encode().unwrap())
        .encode()
        .unwrap();

    // Client side
    let frame = Frame::decode(&reply_wire).unwrap();
    assert_eq!(frame.reply_code(), Some(ReplyCode::Invoke));
    let reply = Envelope::decode(&frame.body).unwrap();
    assert!(reply.is_reply());
    assert_eq!(reply.session, "session-1");

    let result = reply.call_result().unwrap().unwrap();
    assert!(result.is_success());
    assert_eq!(result.value().unwrap(), Some(ArgValue::from("V")));
}

#[test]
fn test_failure_result_keeps_sentinel() {
    let result = CallResult::failure(FaultKind::OperationNotFound, "Operation not found: x");
    let json = result.to_json().unwrap();
    assert!(json.contains("\"resultCode\":false"));
    assert!(json.contains("\"result\":-1"));

    let parsed = CallResult::from_json(&json).unwrap();
    assert!(!parsed.is_success());
    assert_eq!(parsed.fault().unwrap().kind, FaultKind::OperationNotFound);
}

#[test]
fn test_plain_peer_result_is_understood() {
    // A peer that only sends resultCode/result
    let ok = CallResult::from_json(r#"{"resultCode":true,"result":1}"#).unwrap();
    assert!(ok.is_success());
    assert_eq!(ok.value().unwrap(), None);

    let failed = CallResult::from_json(r#"{"resultCode":false,"result":-1}"#).unwrap();
    assert_eq!(failed.fault().unwrap().kind, FaultKind::Unknown);
}

#[test]
fn test_corrupted_frame_detected() {
    let envelope = Envelope::request("a", "c", "kvPut", "s", &[ArgValue::Int(1)]);
    let mut wire = Frame::invoke(envelope.encode().unwrap()).encode().unwrap();

    wire[FRAME_HEADER_SIZE] ^= 0x01;
    assert!(matches!(
        Frame::decode(&wire),
        Err(DecodeError::ChecksumMismatch { .. })
    ));

    let truncated = &wire[..wire.len() - 1];
    assert!(Frame::decode(truncated).is_err());
}
