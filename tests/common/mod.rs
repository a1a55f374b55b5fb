//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use failure_lambda::config::parse_flags;
use failure_lambda::{ConfigProvider, Configuration, Options, RollFn};

/// Serialize tests that mutate process environment variables.
#[allow(dead_code)]
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Serialize tests that touch container-scoped state (the denylist set,
/// `/tmp` fill files).
#[allow(dead_code)]
pub fn state_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// A provider that hands back a fixed configuration, bypassing backends.
pub struct FixedProvider(pub Configuration);

#[async_trait]
impl ConfigProvider for FixedProvider {
    async fn get_config(&self) -> Configuration {
        self.0.clone()
    }
}

/// Parse a raw JSON document straight into a configuration.
pub fn config_from(raw: Value) -> Configuration {
    parse_flags(&raw)
}

/// A roll source pinned to a constant value.
#[allow(dead_code)]
pub fn fixed_roll(value: f64) -> RollFn {
    Arc::new(move || value)
}

/// Options with a fixed configuration and a roll of zero (every enabled
/// flag fires).
pub fn zero_roll_options(raw: Value) -> Options {
    Options {
        config_provider: Some(Arc::new(FixedProvider(config_from(raw)))),
        dry_run: false,
        roll: Some(Arc::new(|| 0.0)),
    }
}

/// Start a programmable mock configuration backend. The closure produces the
/// response body for each request; tests count calls by capturing a counter.
#[allow(dead_code)]
pub async fn start_config_backend<F>(addr: SocketAddr, body_fn: F)
where
    F: Fn() -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let body_fn = Arc::new(body_fn);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body_fn = body_fn.clone();
                    tokio::spawn(async move {
                        // Drain the request head before responding.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let body = body_fn();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that answers every request with the given status line and
/// no body.
#[allow(dead_code)]
pub async fn start_failing_backend(addr: SocketAddr, status_line: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response = format!(
                            "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
