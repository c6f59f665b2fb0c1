//! End-to-end tests for the gateway relay.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edgelink::gateway::{AddressPool, BackendAddr, Gateway, GatewayConfig};

fn loopback_config() -> GatewayConfig {
    GatewayConfig::new(0).with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Bind-then-drop to find a port with nothing listening on it.
async fn reserved_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Backend that records everything it receives and echoes it back.
async fn echo_backend() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    let n = match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    port
}

#[tokio::test]
async fn failover_reaches_live_backend_and_relays_byte_for_byte() {
    // Pool [A, B, C] where only C accepts connections.
    let live_port = echo_backend().await;
    let pool = AddressPool::from_entries(vec![
        BackendAddr::new("127.0.0.1", reserved_port().await),
        BackendAddr::new("127.0.0.1", reserved_port().await),
        BackendAddr::new("127.0.0.1", live_port),
    ])
    .unwrap();

    let gateway = Gateway::bind_with_pool(loopback_config(), Arc::new(pool))
        .await
        .unwrap();
    let addr = gateway.local_addr();
    let handle = gateway.spawn();

    let mut client = TcpStream::connect(addr).await.unwrap();

    // Several chunks; the echo must come back unchanged, in order.
    let chunks: [&[u8]; 3] = [b"first chunk|", b"second|", b"third and last"];
    let mut expected = Vec::new();
    for chunk in chunks {
        client.write_all(chunk).await.unwrap();
        expected.extend_from_slice(chunk);
    }

    let mut received = vec![0u8; expected.len()];
    tokio::time::timeout(Duration::from_secs(10), client.read_exact(&mut received))
        .await
        .expect("relay did not deliver in time")
        .unwrap();
    assert_eq!(received, expected);

    handle.shutdown().await;
}

#[tokio::test]
async fn exhausted_pool_closes_inbound_without_relaying() {
    // Nothing accepts; connection-refused failures are fast, so the full
    // 25-attempt walk stays quick.
    let dead_port = reserved_port().await;
    let gateway = Gateway::bind(
        loopback_config(),
        vec!["127.0.0.1".to_string()],
        dead_port,
    )
    .await
    .unwrap();
    let addr = gateway.local_addr();
    let handle = gateway.spawn();

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"never relayed").await.unwrap();

    // The inbound connection must be torn down with zero bytes delivered
    // back. Closing with unread inbound data may surface as a reset rather
    // than a clean EOF; both count as closed.
    let mut buf = [0u8; 64];
    let result = tokio::time::timeout(Duration::from_secs(30), client.read(&mut buf))
        .await
        .expect("inbound connection was not closed");
    match result {
        Ok(n) => assert_eq!(n, 0, "gateway relayed unexpected bytes"),
        Err(_) => {},
    }

    let stats = handle.stats();
    assert_eq!(stats.failed_connects, 1);

    // The gateway itself keeps serving after a per-connection failure.
    assert!(TcpStream::connect(addr).await.is_ok());

    handle.shutdown().await;
}

#[tokio::test]
async fn gateway_serves_concurrent_clients() {
    let live_port = echo_backend().await;
    let gateway = Gateway::bind(
        loopback_config(),
        vec!["127.0.0.1".to_string()],
        live_port,
    )
    .await
    .unwrap();
    let addr = gateway.local_addr();
    let handle = gateway.spawn();

    let mut tasks = Vec::new();
    for i in 0..5u8 {
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let payload = vec![i; 256];
            client.write_all(&payload).await.unwrap();

            let mut received = vec![0u8; 256];
            client.read_exact(&mut received).await.unwrap();
            assert_eq!(received, payload);
        }));
    }

    for task in tasks {
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();
    }

    let stats = handle.stats();
    assert_eq!(stats.total_accepted, 5);

    handle.shutdown().await;
}

#[tokio::test]
async fn backend_disconnect_closes_client_side() {
    // Backend accepts and immediately drops; the client must observe EOF
    // rather than a hung half-open relay.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            drop(stream);
        }
    });

    let gateway = Gateway::bind(
        loopback_config(),
        vec!["127.0.0.1".to_string()],
        backend_port,
    )
    .await
    .unwrap();
    let addr = gateway.local_addr();
    let handle = gateway.spawn();

    let mut client = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("client side was not closed after backend disconnect")
        .unwrap();
    assert_eq!(n, 0);

    handle.shutdown().await;
}
