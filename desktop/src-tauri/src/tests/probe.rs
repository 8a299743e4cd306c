use crate::server::{ProbeOutcome, ProbeSettings, ReadinessProbe};

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn fast_settings(max_attempts: u32) -> ProbeSettings {
    ProbeSettings {
        interval_ms: 10,
        connect_timeout_ms: 100,
        max_attempts,
    }
}

fn no_shutdown() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

/// An address nothing is listening on: bind an ephemeral port, then
/// drop the listener before the probe starts.
fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[tokio::test]
async fn test_ready_on_first_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let probe = ReadinessProbe::new(addr, &fast_settings(5), no_shutdown());

    assert_eq!(probe.run().await, ProbeOutcome::Ready { attempt: 0 });
}

#[tokio::test]
async fn test_exhausted_when_nothing_listens() {
    let addr = free_addr();

    let probe = ReadinessProbe::new(addr, &fast_settings(3), no_shutdown());

    assert_eq!(probe.run().await, ProbeOutcome::Exhausted { attempts: 3 });
}

#[tokio::test]
async fn test_ready_when_server_binds_late() {
    let addr = free_addr();

    let binder = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(60));
        TcpListener::bind(addr).unwrap()
    });

    let probe = ReadinessProbe::new(addr, &fast_settings(200), no_shutdown());
    let outcome = probe.run().await;

    let _listener = binder.join().unwrap();
    assert!(
        matches!(outcome, ProbeOutcome::Ready { .. }),
        "expected Ready, got {outcome:?}"
    );
}

#[tokio::test]
async fn test_cancelled_by_shutdown() {
    let addr = free_addr();

    let shutdown = Arc::new(AtomicBool::new(true));
    let probe = ReadinessProbe::new(addr, &fast_settings(100), shutdown);

    assert_eq!(probe.run().await, ProbeOutcome::Cancelled);
}
