use std::io::Write;
use std::time::Duration;

use major_tom::config::{validate_role, ServerConfig, DEFAULT_MAX_LINE_BYTES};
use major_tom::profile::{InstrumentBackend, Profile};
use major_tom::AppError;

fn full_toml() -> &'static str {
    r#"
role = "RUSKA"
bind_address = "0.0.0.0:7101"
profile = "microscope"
instrument = "simulated"
max_line_bytes = 1024
read_timeout_seconds = 30
drain_timeout_seconds = 2
"#
}

fn minimal_toml(role: &str) -> String {
    format!(
        r#"
role = "{role}"
profile = "camera"
"#
    )
}

#[test]
fn parses_full_config() {
    let config = ServerConfig::from_toml_str(full_toml()).expect("valid config");
    assert_eq!(config.role, "RUSKA");
    assert_eq!(config.bind_address, "0.0.0.0:7101");
    assert_eq!(config.profile, Profile::Microscope);
    assert_eq!(config.instrument, InstrumentBackend::Simulated);
    assert_eq!(config.max_line_bytes, 1024);
    assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.drain_timeout(), Duration::from_secs(2));
}

#[test]
fn minimal_config_uses_defaults() {
    let config = ServerConfig::from_toml_str(&minimal_toml("EMPAD")).expect("valid config");
    assert_eq!(config.profile, Profile::Camera);
    assert_eq!(config.bind_address, "127.0.0.1:7001");
    assert_eq!(config.instrument, InstrumentBackend::Simulated);
    assert_eq!(config.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    assert_eq!(config.read_timeout(), None);
    assert_eq!(config.drain_timeout(), Duration::from_secs(5));
}

#[test]
fn missing_role_is_rejected() {
    let result = ServerConfig::from_toml_str("profile = \"microscope\"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn unknown_profile_is_rejected() {
    let result = ServerConfig::from_toml_str("role = \"RUSKA\"\nprofile = \"toaster\"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn invalid_roles_are_rejected() {
    for role in ["", "RU,SKA", "RU SKA", "CTL"] {
        let result = ServerConfig::from_toml_str(&minimal_toml(role));
        assert!(
            matches!(result, Err(AppError::Config(_))),
            "role '{role}' should be rejected"
        );
    }
    assert!(validate_role("EMPAD").is_ok());
}

#[test]
fn bind_address_may_name_a_host() {
    for address in ["localhost:7001", "instrument-pc.lab:7101", "[::1]:7001", "0.0.0.0:0"] {
        let raw = format!("role = \"RUSKA\"\nprofile = \"microscope\"\nbind_address = \"{address}\"\n");
        let config = ServerConfig::from_toml_str(&raw).expect("valid address");
        assert_eq!(config.bind_address, address);
    }
}

#[test]
fn invalid_bind_address_is_rejected() {
    for address in ["localhost", ":7001", "localhost:99999", "localhost:port", "my host:7001"] {
        let raw = format!("role = \"RUSKA\"\nprofile = \"microscope\"\nbind_address = \"{address}\"\n");
        let err = ServerConfig::from_toml_str(&raw).expect_err("bad address");
        assert!(err.to_string().contains("bind_address"), "{address}: {err}");
    }
}

#[test]
fn zero_line_limit_is_rejected() {
    let raw = "role = \"RUSKA\"\nprofile = \"microscope\"\nmax_line_bytes = 0\n";
    let err = ServerConfig::from_toml_str(raw).expect_err("zero limit");
    assert!(err.to_string().contains("max_line_bytes"), "{err}");
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(full_toml().as_bytes()).expect("write config");

    let config = ServerConfig::load_from_path(file.path()).expect("loads");
    assert_eq!(config.role, "RUSKA");
}

#[test]
fn load_from_missing_path_is_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = ServerConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn overrides_are_validated() {
    let mut config = ServerConfig::from_toml_str(&minimal_toml("EMPAD")).expect("valid config");

    config.set_role("GATAN").expect("valid role");
    assert_eq!(config.role, "GATAN");
    assert!(config.set_role("CTL").is_err());
    assert_eq!(config.role, "GATAN");

    config.set_bind_address("localhost:0").expect("valid address");
    assert_eq!(config.bind_address, "localhost:0");
    assert!(config.set_bind_address("nowhere").is_err());
    assert_eq!(config.bind_address, "localhost:0");
}
