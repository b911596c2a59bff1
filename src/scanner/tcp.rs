//! TCP connect prober.
//!
//! Performs a full handshake through the operating system's socket API. No
//! elevated privileges are needed, at the cost of every probe being visible
//! to the target as a completed connection.

use crate::banner::grab_banner;
use crate::scanner::traits::{ProbeOutcome, Prober};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::trace;

/// TCP connect prober.
///
/// Sockets are created with `SO_LINGER` set to zero, so closing an open
/// connection sends a reset instead of leaving the local side in TIME_WAIT.
/// Large scans would otherwise pile up thousands of lingering descriptors.
#[derive(Debug, Clone, Default)]
pub struct TcpConnectProber {
    banner_wait: Option<Duration>,
}

impl TcpConnectProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a service banner from open ports, waiting up to `wait` for it.
    pub fn with_banners(mut self, wait: Duration) -> Self {
        self.banner_wait = Some(wait);
        self
    }

    async fn connect(&self, addr: SocketAddr, connect_timeout: Duration) -> io::Result<TcpStream> {
        let socket = new_socket(addr)?;
        match timeout(connect_timeout, socket.connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::from(io::ErrorKind::TimedOut)),
        }
    }
}

fn new_socket(addr: SocketAddr) -> io::Result<TcpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;
    socket.set_linger(Some(Duration::ZERO))?;
    Ok(TcpSocket::from_std_stream(socket.into()))
}

/// Map a failed connect to a port state.
fn classify_error(e: &io::Error) -> ProbeOutcome {
    match e.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
            ProbeOutcome::closed()
        }
        io::ErrorKind::TimedOut => ProbeOutcome::filtered(),
        _ => ProbeOutcome::error(e.to_string()),
    }
}

#[async_trait]
impl Prober for TcpConnectProber {
    fn name(&self) -> &'static str {
        "TCP Connect"
    }

    fn time_budget(&self, timeout: Duration) -> Duration {
        timeout.saturating_add(self.banner_wait.unwrap_or(Duration::ZERO))
    }

    async fn probe(&self, addr: SocketAddr, connect_timeout: Duration) -> ProbeOutcome {
        match self.connect(addr, connect_timeout).await {
            Ok(mut stream) => {
                let banner = match self.banner_wait {
                    Some(wait) => grab_banner(&mut stream, addr.port(), wait).await,
                    None => None,
                };
                ProbeOutcome::open().with_banner(banner)
            }
            Err(e) => {
                trace!(%addr, error = %e, "connect failed");
                classify_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::ProbeState;
    use tokio::net::TcpListener;

    #[test]
    fn test_classify_error() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_error(&refused).state, ProbeState::Closed);

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(classify_error(&timed_out).state, ProbeState::Filtered);

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "blocked by policy");
        assert_eq!(
            classify_error(&other).state,
            ProbeState::Error("blocked by policy".to_string())
        );
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let outcome = TcpConnectProber::new()
            .probe(addr, Duration::from_secs(2))
            .await;
        assert_eq!(outcome.state, ProbeState::Open);
        assert!(outcome.banner.is_none());
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        // Bind then drop to get a port that nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let outcome = TcpConnectProber::new()
            .probe(addr, Duration::from_secs(2))
            .await;
        assert_eq!(outcome.state, ProbeState::Closed);
    }

    #[test]
    fn test_time_budget_covers_banner_wait() {
        let timeout = Duration::from_secs(1);
        assert_eq!(TcpConnectProber::new().time_budget(timeout), timeout);
        let prober = TcpConnectProber::new().with_banners(Duration::from_millis(750));
        assert_eq!(prober.time_budget(timeout), Duration::from_millis(1750));
        assert_eq!(prober.time_budget(Duration::MAX), Duration::MAX);
    }
}
