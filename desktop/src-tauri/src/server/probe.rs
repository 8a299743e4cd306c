//! Bounded TCP readiness probe for the loopback endpoint.

use crate::server::ProbeSettings;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Terminal result of a probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A connection was accepted on the given attempt (0-based)
    Ready { attempt: u32 },
    /// Every attempt failed; the budget is spent
    Exhausted { attempts: u32 },
    /// Shutdown was requested while the loop was in flight
    Cancelled,
}

/// Repeatedly attempts a short-lived TCP connection to the server's
/// loopback endpoint. Each attempt opens a fresh client socket and
/// closes it as soon as the connect succeeds. Only "something is
/// listening" is observed, not whether the application behind the
/// socket finished initializing.
pub struct ReadinessProbe {
    addr: SocketAddr,
    interval: Duration,
    connect_timeout: Duration,
    max_attempts: u32,
    shutdown: Arc<AtomicBool>,
}

impl ReadinessProbe {
    pub fn new(addr: SocketAddr, settings: &ProbeSettings, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            addr,
            interval: Duration::from_millis(settings.interval_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            max_attempts: settings.max_attempts,
            shutdown,
        }
    }

    /// Run the loop to completion.
    ///
    /// Always terminates: by connect success, by attempt exhaustion, or
    /// by a shutdown request. A failed attempt sleeps the fixed interval
    /// before the counter advances; a successful one returns without
    /// sleeping.
    pub async fn run(&self) -> ProbeOutcome {
        let mut attempts = 0u32;

        while attempts < self.max_attempts {
            if self.shutdown.load(Ordering::SeqCst) {
                return ProbeOutcome::Cancelled;
            }

            match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr)).await {
                Ok(Ok(stream)) => {
                    drop(stream);
                    return ProbeOutcome::Ready { attempt: attempts };
                }
                Ok(Err(e)) => {
                    debug!("Probe attempt {attempts} against {} failed: {e}", self.addr);
                }
                Err(_) => {
                    debug!(
                        "Probe attempt {attempts} against {} timed out after {:?}",
                        self.addr, self.connect_timeout
                    );
                }
            }

            tokio::time::sleep(self.interval).await;
            attempts += 1;
        }

        ProbeOutcome::Exhausted { attempts }
    }
}
