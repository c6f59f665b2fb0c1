//! Public and local address discovery.

use std::net::IpAddr;
use std::time::Duration;

use tracing::{info, warn};

/// Address reported when public-IP discovery fails.
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// HTTP timeout for the echo request.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Discover this machine's public IP via an HTTP echo endpoint.
///
/// The endpoint is expected to answer a plain GET with the caller's address
/// as the body. Any failure falls back to [`UNKNOWN_IP`]; discovery is
/// best-effort and must not block startup on a dead network.
pub async fn discover_public_ip(url: &str) -> String {
    let client = match reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client for IP discovery");
            return UNKNOWN_IP.to_string();
        },
    };

    match client.get(url).send().await {
        Ok(response) => match response.text().await {
            Ok(body) => {
                let ip = body.trim().to_string();
                if ip.is_empty() {
                    warn!(url, "Empty public IP response");
                    return UNKNOWN_IP.to_string();
                }
                info!(public_ip = %ip, "Discovered public IP");
                ip
            },
            Err(e) => {
                warn!(url, error = %e, "Failed to read public IP response");
                UNKNOWN_IP.to_string()
            },
        },
        Err(e) => {
            warn!(url, error = %e, "Public IP discovery failed");
            UNKNOWN_IP.to_string()
        },
    }
}

/// The local address the OS routes outbound traffic through.
///
/// Connecting a UDP socket selects a source address without sending any
/// packets; the resolver address is never contacted.
#[must_use]
pub fn local_outbound_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP server answering one request with the given body.
    async fn one_shot_http(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_discovers_from_echo_endpoint() {
        let url = one_shot_http("203.0.113.7").await;
        assert_eq!(discover_public_ip(&url).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_trims_whitespace() {
        let url = one_shot_http("198.51.100.4\n").await;
        assert_eq!(discover_public_ip(&url).await, "198.51.100.4");
    }

    #[tokio::test]
    async fn test_unreachable_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ip = discover_public_ip(&format!("http://{addr}")).await;
        assert_eq!(ip, UNKNOWN_IP);
    }

    #[test]
    fn test_local_outbound_ip_not_unspecified() {
        // May be None on hosts without a route; when present it must be a
        // concrete address.
        if let Some(ip) = local_outbound_ip() {
            assert!(!ip.is_unspecified());
        }
    }
}
