//! Integration tests for concurrent controllers sharing one instrument.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use major_tom::instrument::Instrument;
use major_tom::registry::Registry;
use major_tom::Result;

use super::test_helpers::{start, start_ruska, test_config, Client};

/// Facade that records any call arriving while another is still running.
struct ReentranceTracker {
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl Instrument for ReentranceTracker {
    fn ht_volts(&self) -> Result<f64> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(20));
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(120_000.0)
    }
}

fn get_ht(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.ht_volts()?.to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn facade_calls_never_overlap() {
    let overlaps = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let tracker = ReentranceTracker {
        in_flight: Arc::new(AtomicBool::new(false)),
        overlaps: Arc::clone(&overlaps),
        calls: Arc::clone(&calls),
    };

    let mut registry = Registry::new();
    registry.register("get_ht", 0, get_ht);
    let config = test_config("RUSKA", "microscope", "");
    let server = start(&config, Some(registry), Box::new(tracker)).await;

    let mut clients = Vec::new();
    for _ in 0..4 {
        let addr = server.addr;
        clients.push(tokio::spawn(async move {
            let mut client = Client::connect_greeted(addr, "RUSKA").await;
            for _ in 0..3 {
                assert_eq!(
                    client.request("RUSKA", "get_ht").await,
                    "RUSKA,RUSKA,Evaluated Command: get_ht [OK] 120000"
                );
            }
            client.send_line("CTL,RUSKA,STOP").await;
            client.expect_closed().await;
        }));
    }
    for client in clients {
        client.await.expect("client task");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 12);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sessions_are_independent() {
    let server = start_ruska().await;
    let mut first = Client::connect_greeted(server.addr, "RUSKA").await;
    let mut second = Client::connect_greeted(server.addr, "RUSKA").await;

    assert!(first
        .request("RUSKA", "set_magnification,500000")
        .await
        .ends_with("[OK] magnification 500000"));

    // State lives in the shared instrument, not the session.
    assert!(second
        .request("RUSKA", "get_magnification")
        .await
        .ends_with("[OK] 500000"));

    first.send_line("CTL,RUSKA,STOP").await;
    first.expect_closed().await;
    assert!(second
        .request("RUSKA", "get_magnification")
        .await
        .ends_with("[OK] 500000"));
}

#[tokio::test]
async fn slow_client_does_not_block_others() {
    let server = start_ruska().await;
    // Connected but silent.
    let _idle = Client::connect_greeted(server.addr, "RUSKA").await;

    let mut active = Client::connect_greeted(server.addr, "RUSKA").await;
    assert!(active
        .request("RUSKA", "get_ht")
        .await
        .ends_with("[OK] 300000"));
}
