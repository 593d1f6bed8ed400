//! Network availability signal shared by the scheduler and the CLI.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Publishes whether the backend is believed reachable.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(available: bool) -> Self {
        let (tx, _rx) = watch::channel(available);
        Self { tx: Arc::new(tx) }
    }

    /// Update availability. Returns true when the value changed.
    pub fn set_available(&self, available: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == available {
                false
            } else {
                *current = available;
                true
            }
        });
        if changed {
            tracing::info!(available, "Connectivity changed");
        }
        changed
    }

    pub fn is_available(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Periodically attempt a TCP connection to `target` and publish the
    /// result.
    pub fn spawn_tcp_probe(
        &self,
        target: ProbeTarget,
        interval: Duration,
        timeout: Duration,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                let reachable = target.probe(timeout).await;
                tracing::trace!(host = %target.host, port = target.port, reachable, "Connectivity probe");
                monitor.set_available(reachable);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

/// Host and port a probe connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// Derive the probe target from a backend base URL.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_string();
        let port = parsed.port_or_known_default()?;
        Some(Self { host, port })
    }

    pub async fn probe(&self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect((self.host.as_str(), self.port))).await,
            Ok(Ok(_))
        )
    }
}
