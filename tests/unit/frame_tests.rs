//! Unit tests for frame decoding, encoding, and sentinel recognition.

use major_tom::protocol::frame::{CONTROLLER_TAG, GREETING};
use major_tom::protocol::{decode, encode, sentinel, Direction, Frame, Role, Sentinel};
use major_tom::AppError;

#[test]
fn controller_frame_decodes_to_instrument_direction() {
    let frame = decode(b"CTL,RUSKA,get_ht").expect("valid frame");
    assert_eq!(frame, Frame::new("RUSKA", Direction::ToInstrument, "get_ht"));
}

#[test]
fn instrument_frame_decodes_to_controller_direction() {
    let frame = decode(b"RUSKA,RUSKA,This is Major Tom to Ground Control.").expect("valid frame");
    assert_eq!(frame.role, "RUSKA");
    assert_eq!(frame.direction, Direction::ToController);
    assert_eq!(frame.payload, GREETING);
}

#[test]
fn legacy_instrument_header_is_accepted() {
    let frame = decode(b"GATAN,CTL,Evaluated Command: first_scan").expect("valid frame");
    assert_eq!(frame.role, "GATAN");
    assert_eq!(frame.direction, Direction::ToController);
}

#[test]
fn payload_keeps_embedded_commas() {
    let frame = decode(b"CTL,RUSKA,set_cl_aperture,CLApt1,2").expect("valid frame");
    assert_eq!(frame.payload, "set_cl_aperture,CLApt1,2");
}

#[test]
fn empty_payload_is_allowed() {
    let frame = decode(b"CTL,RUSKA,").expect("valid frame");
    assert_eq!(frame.payload, "");
}

#[test]
fn fewer_than_two_commas_is_malformed() {
    for line in [&b"STOP"[..], b"CTL,RUSKA", b""] {
        let err = decode(line).expect_err("must be malformed");
        assert!(matches!(err, AppError::MalformedFrame(_)), "{err}");
    }
}

#[test]
fn invalid_utf8_is_malformed() {
    let err = decode(b"CTL,RUSKA,\xff\xfe").expect_err("must be malformed");
    assert!(matches!(err, AppError::MalformedFrame(_)));
    assert!(err.to_string().contains("utf-8"));
}

#[test]
fn unrelated_header_pair_is_malformed() {
    let err = decode(b"RUSKA,GATAN,get_ht").expect_err("must be malformed");
    assert!(matches!(err, AppError::MalformedFrame(_)));
}

#[test]
fn double_controller_tag_is_malformed() {
    let err = decode(b"CTL,CTL,get_ht").expect_err("must be malformed");
    assert!(matches!(err, AppError::MalformedFrame(_)));
}

#[test]
fn encode_to_controller_repeats_role() {
    let line = encode("RUSKA", Direction::ToController, GREETING).expect("encode");
    assert_eq!(
        &line[..],
        b"RUSKA,RUSKA,This is Major Tom to Ground Control.\n"
    );
}

#[test]
fn encode_to_instrument_leads_with_controller_tag() {
    let line = encode("GATAN", Direction::ToInstrument, "STOP").expect("encode");
    assert_eq!(&line[..], format!("{CONTROLLER_TAG},GATAN,STOP\n").as_bytes());
}

#[test]
fn encode_ends_with_exactly_one_newline() {
    let line = encode("RUSKA", Direction::ToController, "").expect("encode");
    assert!(line.ends_with(b"\n"));
    assert!(!line.ends_with(b"\n\n"));
}

#[test]
fn encode_rejects_line_breaks_in_payload() {
    for payload in ["two\nlines", "carriage\rreturn"] {
        let err = encode("RUSKA", Direction::ToController, payload).expect_err("must reject");
        assert!(matches!(err, AppError::MalformedFrame(_)));
    }
}

#[test]
fn decode_reverses_encode() {
    let cases = [
        ("RUSKA", Direction::ToInstrument, "set_magnification,250000"),
        ("RUSKA", Direction::ToController, "Evaluated Command: get_ht [OK] 300000"),
        ("GATAN", Direction::ToInstrument, ""),
    ];
    for (role, direction, payload) in cases {
        let line = encode(role, direction, payload).expect("encode");
        let frame = decode(&line[..line.len() - 1]).expect("decode");
        assert_eq!(frame, Frame::new(role, direction, payload));
    }
}

#[test]
fn sentinels_match_exactly() {
    let stop = Frame::new("RUSKA", Direction::ToInstrument, "STOP");
    let terminate = Frame::new("RUSKA", Direction::ToInstrument, "TERMINATE");
    assert_eq!(sentinel(&stop), Some(Sentinel::Stop));
    assert_eq!(sentinel(&terminate), Some(Sentinel::Terminate));

    for payload in ["stop", "Terminate", "STOP ", " STOP", "STOP,now", "get_ht"] {
        let frame = Frame::new("RUSKA", Direction::ToInstrument, payload);
        assert_eq!(sentinel(&frame), None, "payload {payload:?}");
    }
}

#[test]
fn role_rejects_reserved_and_unframeable_identifiers() {
    assert!(Role::new("RUSKA").is_ok());
    for bad in ["", "CTL", "RU,SKA", "RUS KA"] {
        assert!(Role::new(bad).is_err(), "role {bad:?} must be rejected");
    }
}
