//! Integration tests for the per-connection protocol: greeting, command
//! replies, per-line faults, and the conditions that close a session.

use std::time::Duration;

use major_tom::instrument::SimulatedInstrument;
use major_tom::server::Server;
use major_tom::AppError;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{start, start_ruska, test_config, Client, RUSKA_GREETING};

#[tokio::test]
async fn greeting_then_command_reply() {
    let server = start_ruska().await;
    let mut client = Client::connect(server.addr).await;

    assert_eq!(client.read_line().await.as_deref(), Some(RUSKA_GREETING));
    assert_eq!(
        client.request("RUSKA", "get_ht").await,
        "RUSKA,RUSKA,Evaluated Command: get_ht [OK] 300000"
    );

    client.send_line("CTL,RUSKA,STOP").await;
    client.expect_closed().await;
}

#[tokio::test]
async fn arguments_and_commas_are_echoed() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    assert_eq!(
        client.request("RUSKA", "set_cl_aperture,CLApt2,3").await,
        "RUSKA,RUSKA,Evaluated Command: set_cl_aperture,CLApt2,3 [OK] clapt1=0 clapt2=3"
    );
    assert_eq!(
        client.request("RUSKA", "get_cl_apertures").await,
        "RUSKA,RUSKA,Evaluated Command: get_cl_apertures [OK] clapt1=0 clapt2=3"
    );
}

#[tokio::test]
async fn crlf_terminated_lines_are_accepted() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    client.send_line("CTL,RUSKA,get_magnification\r").await;
    assert_eq!(
        client.read_line().await.as_deref(),
        Some("RUSKA,RUSKA,Evaluated Command: get_magnification [OK] 250000")
    );
}

#[tokio::test]
async fn unknown_command_is_answered_and_session_continues() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    assert_eq!(
        client.request("RUSKA", "warp_drive").await,
        "RUSKA,RUSKA,Evaluated Command: warp_drive [ERROR] unknown command: warp_drive"
    );
    assert!(client
        .request("RUSKA", "get_ht")
        .await
        .ends_with("[OK] 300000"));
}

#[tokio::test]
async fn wrong_arity_is_answered() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    let reply = client.request("RUSKA", "set_magnification").await;
    assert!(
        reply.starts_with("RUSKA,RUSKA,Evaluated Command: set_magnification [ERROR]"),
        "{reply}"
    );
    assert!(reply.contains("expects 1 argument"), "{reply}");
}

#[tokio::test]
async fn handler_failure_is_answered() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    let reply = client.request("RUSKA", "set_dwell_time_us,-4").await;
    assert!(reply.contains("[ERROR] handler fault:"), "{reply}");
    assert!(reply.contains("dwell time must be positive"), "{reply}");
}

#[tokio::test]
async fn malformed_line_is_answered_and_session_continues() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    client.send_line("not a frame").await;
    let reply = client.read_line().await.expect("error reply");
    assert!(
        reply.starts_with("RUSKA,RUSKA,Evaluated Command: not a frame [ERROR] malformed frame"),
        "{reply}"
    );

    assert!(client
        .request("RUSKA", "get_ht")
        .await
        .ends_with("[OK] 300000"));
}

#[tokio::test]
async fn frame_for_another_role_is_rejected() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    let reply = client.request("EMPAD", "get_ht").await;
    assert!(reply.contains("[ERROR]"), "{reply}");
    assert!(reply.contains("addressed to 'EMPAD'"), "{reply}");

    // A STOP addressed elsewhere does not close this session.
    let reply = client.request("EMPAD", "STOP").await;
    assert!(reply.contains("[ERROR]"), "{reply}");
    assert!(client
        .request("RUSKA", "get_ht")
        .await
        .ends_with("[OK] 300000"));
}

#[tokio::test]
async fn instrument_frames_from_a_controller_are_rejected() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    client.send_line("RUSKA,RUSKA,get_ht").await;
    let reply = client.read_line().await.expect("error reply");
    assert!(reply.contains("[ERROR]"), "{reply}");
}

#[tokio::test]
async fn invalid_utf8_is_answered_and_session_continues() {
    use tokio::io::AsyncWriteExt;

    let server = start_ruska().await;
    let stream = tokio::net::TcpStream::connect(server.addr)
        .await
        .expect("connect");
    let (read_half, mut writer) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);

    let mut line = String::new();
    tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line)
        .await
        .expect("greeting");

    writer
        .write_all(b"CTL,RUSKA,\xff\xfe\n")
        .await
        .expect("write");
    line.clear();
    tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line)
        .await
        .expect("reply");
    assert!(line.contains("[ERROR] malformed frame: invalid utf-8"), "{line}");

    writer.write_all(b"CTL,RUSKA,get_ht\n").await.expect("write");
    line.clear();
    tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line)
        .await
        .expect("reply");
    assert!(line.ends_with("[OK] 300000\n"), "{line}");
}

#[tokio::test]
async fn stop_closes_only_this_session() {
    let server = start_ruska().await;
    let mut first = Client::connect_greeted(server.addr, "RUSKA").await;

    first.send_line("CTL,RUSKA,STOP").await;
    first.expect_closed().await;
    assert!(!server.shutdown.is_cancelled());

    let mut second = Client::connect_greeted(server.addr, "RUSKA").await;
    assert!(second
        .request("RUSKA", "get_ht")
        .await
        .ends_with("[OK] 300000"));
}

#[tokio::test]
async fn sentinels_match_exactly() {
    let server = start_ruska().await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    for near_miss in ["stop", "STOP ", "STOP,now", "terminate"] {
        let reply = client.request("RUSKA", near_miss).await;
        assert!(reply.contains("[ERROR]"), "{near_miss}: {reply}");
    }
    assert!(!server.shutdown.is_cancelled());
}

#[tokio::test]
async fn oversized_line_closes_the_session() {
    let config = test_config("RUSKA", "microscope", "max_line_bytes = 64");
    let server = start(&config, None, Box::new(SimulatedInstrument::new())).await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    let long = format!("CTL,RUSKA,{}", "x".repeat(200));
    client.send_line(&long).await;
    client.expect_closed().await;

    // The server keeps serving other connections.
    let mut other = Client::connect_greeted(server.addr, "RUSKA").await;
    assert!(other.request("RUSKA", "get_ht").await.ends_with("[OK] 300000"));
}

#[tokio::test]
async fn idle_session_times_out() {
    let config = test_config("RUSKA", "microscope", "read_timeout_seconds = 1");
    let server = start(&config, None, Box::new(SimulatedInstrument::new())).await;
    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    client.expect_closed().await;
    assert!(!server.shutdown.is_cancelled());
}

#[tokio::test]
async fn camera_profile_serves_its_own_table() {
    let config = test_config("EMPAD", "camera", "");
    let server = start(&config, None, Box::new(SimulatedInstrument::new())).await;
    let mut client = Client::connect_greeted(server.addr, "EMPAD").await;

    assert_eq!(
        client.request("EMPAD", "ptycho_prep").await,
        "EMPAD,EMPAD,Evaluated Command: ptycho_prep [OK] camera retracted; screen Up"
    );
    assert!(client
        .request("EMPAD", "get_ht")
        .await
        .ends_with("[ERROR] unknown command: get_ht"));
}

#[tokio::test]
async fn bind_address_host_name_is_resolved() {
    let mut config = test_config("RUSKA", "microscope", "");
    config.set_bind_address("localhost:0").expect("valid address");
    let server = start(&config, None, Box::new(SimulatedInstrument::new())).await;

    let mut client = Client::connect_greeted(server.addr, "RUSKA").await;
    assert!(client.request("RUSKA", "get_ht").await.ends_with("[OK] 300000"));
}

#[tokio::test]
async fn unresolvable_bind_address_is_a_bind_error() {
    let mut config = test_config("RUSKA", "microscope", "");
    config
        .set_bind_address("no-such-host.invalid:7001")
        .expect("syntactically valid");

    let result = Server::bind(
        &config,
        Box::new(SimulatedInstrument::new()),
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Bind(_))));
}
