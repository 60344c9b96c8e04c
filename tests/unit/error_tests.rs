//! Unit tests for `AppError` display format.

use major_tom::AppError;

#[test]
fn display_prefixes_identify_the_category() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Io("x".into()), "io: x"),
        (AppError::MalformedFrame("x".into()), "malformed frame: x"),
        (AppError::UnknownCommand("x".into()), "unknown command: x"),
        (AppError::Handler("x".into()), "handler fault: x"),
        (AppError::Instrument("x".into()), "instrument: x"),
        (AppError::LineTooLong("x".into()), "line too long: x"),
        (AppError::Connection("x".into()), "connection: x"),
        (AppError::Bind("x".into()), "bind: x"),
        (AppError::Timeout("x".into()), "timeout: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn messages_have_no_trailing_period() {
    let err = AppError::Instrument("cannot retract the camera".into());
    assert!(!err.to_string().ends_with('.'));
}

#[test]
fn peer_resets_convert_to_connection() {
    for kind in [
        std::io::ErrorKind::ConnectionReset,
        std::io::ErrorKind::ConnectionAborted,
    ] {
        let err = AppError::from(std::io::Error::new(kind, "dropped by peer"));
        assert!(matches!(err, AppError::Connection(_)), "{kind:?}: {err:?}");
        assert!(err.to_string().contains("dropped by peer"));
    }
}

#[test]
fn other_io_errors_convert_to_io() {
    for kind in [
        std::io::ErrorKind::PermissionDenied,
        std::io::ErrorKind::InvalidData,
        std::io::ErrorKind::Other,
    ] {
        let err = AppError::from(std::io::Error::new(kind, "read failed"));
        assert!(matches!(err, AppError::Io(_)), "{kind:?}: {err:?}");
    }
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Value>("role = ").expect_err("invalid toml");
    let err = AppError::from(toml_err);
    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn implements_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&AppError::Bind("in use".into()));
}
