//! Backend selection, caching, and kill-switch behavior.
//!
//! Every test here mutates process environment variables and therefore holds
//! the shared env lock for its whole body.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::json;

use failure_lambda::{wrap, ConfigService, Context, FailureMode, HandlerError};

mod common;

const APP_VARS: [(&str, &str); 3] = [
    ("FAILURE_APPCONFIG_APPLICATION", "myapp"),
    ("FAILURE_APPCONFIG_ENVIRONMENT", "prod"),
    ("FAILURE_APPCONFIG_CONFIGURATION", "failures"),
];

fn set_hosted_env(port: u16) {
    // Start from a clean slate in case an earlier test body panicked
    // before its own teardown ran.
    clear_env();
    for (name, value) in APP_VARS {
        std::env::set_var(name, value);
    }
    std::env::set_var("AWS_APPCONFIG_EXTENSION_HTTP_PORT", port.to_string());
}

fn clear_env() {
    for (name, _) in APP_VARS {
        std::env::remove_var(name);
    }
    for name in [
        "AWS_APPCONFIG_EXTENSION_HTTP_PORT",
        "FAILURE_CACHE_TTL",
        "FAILURE_INJECTION_PARAM",
        "FAILURE_LAMBDA_DISABLED",
    ] {
        std::env::remove_var(name);
    }
}

#[tokio::test]
async fn hosted_backend_fetches_and_parses() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    common::start_config_backend(addr, || {
        json!({
            "latency": { "enabled": true, "min_latency": 5, "max_latency": 10 },
            "exception": { "enabled": false }
        })
        .to_string()
    })
    .await;

    set_hosted_env(addr.port());

    let service = ConfigService::new();
    let config = service.get_config().await;

    assert_eq!(config.len(), 2);
    assert!(config.get(FailureMode::Latency).unwrap().enabled);
    assert!(!config.get(FailureMode::Exception).unwrap().enabled);

    clear_env();
}

#[tokio::test]
async fn hosted_backend_without_explicit_ttl_fetches_every_call() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_config_backend(addr, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        json!({ "latency": { "enabled": true } }).to_string()
    })
    .await;

    set_hosted_env(addr.port());

    let service = ConfigService::new();
    service.get_config().await;
    service.get_config().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2, "hosted backend must not cache");

    clear_env();
}

#[tokio::test]
async fn explicit_ttl_caches_between_calls() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29183".parse().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_config_backend(addr, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        json!({ "latency": { "enabled": true } }).to_string()
    })
    .await;

    set_hosted_env(addr.port());
    std::env::set_var("FAILURE_CACHE_TTL", "300");

    let service = ConfigService::new();
    service.get_config().await;
    service.get_config().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second call must hit the cache");

    // An explicit eviction forces the next call back to the backend.
    service.clear_cache().await;
    service.get_config().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    clear_env();
}

#[tokio::test]
async fn ttl_zero_disables_caching() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29184".parse().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_config_backend(addr, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        json!({}).to_string()
    })
    .await;

    set_hosted_env(addr.port());
    std::env::set_var("FAILURE_CACHE_TTL", "0");

    let service = ConfigService::new();
    service.get_config().await;
    service.get_config().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    clear_env();
}

#[tokio::test]
async fn non_success_status_yields_empty_config() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29185".parse().unwrap();
    common::start_failing_backend(addr, "503 Service Unavailable").await;

    set_hosted_env(addr.port());

    let service = ConfigService::new();
    assert!(service.get_config().await.is_empty());

    clear_env();
}

#[tokio::test]
async fn unparseable_document_yields_empty_config() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29186".parse().unwrap();
    common::start_config_backend(addr, || "not json at all".to_string()).await;

    set_hosted_env(addr.port());

    let service = ConfigService::new();
    assert!(service.get_config().await.is_empty());

    clear_env();
}

#[tokio::test]
async fn unreachable_backend_yields_empty_config() {
    let _guard = common::env_lock();
    // Nothing listens here.
    set_hosted_env(29187);
    std::env::set_var("FAILURE_CACHE_TTL", "0");

    let service = ConfigService::new();
    assert!(service.get_config().await.is_empty());

    clear_env();
}

#[tokio::test]
async fn no_backend_configured_yields_empty_config() {
    let _guard = common::env_lock();
    clear_env();

    let service = ConfigService::new();
    assert!(service.get_config().await.is_empty());
}

#[tokio::test]
async fn legacy_document_yields_empty_config() {
    let _guard = common::env_lock();
    let addr: SocketAddr = "127.0.0.1:29188".parse().unwrap();
    common::start_config_backend(addr, || {
        json!({ "isEnabled": true, "failureMode": "latency" }).to_string()
    })
    .await;

    set_hosted_env(addr.port());
    std::env::set_var("FAILURE_CACHE_TTL", "0");

    let service = ConfigService::new();
    assert!(service.get_config().await.is_empty());

    clear_env();
}

#[tokio::test]
async fn kill_switch_bypasses_all_injection() {
    let _guard = common::env_lock();
    clear_env();
    std::env::set_var("FAILURE_LAMBDA_DISABLED", "true");

    let wrapped = wrap(
        |event, _ctx| async { Ok::<_, HandlerError>(event) },
        common::zero_roll_options(json!({
            "exception": { "enabled": true, "percentage": 100, "exception_msg": "no" }
        })),
    );

    let result = wrapped
        .invoke(json!({ "alive": true }), Context::default())
        .await
        .unwrap();
    assert_eq!(result, json!({ "alive": true }));

    clear_env();
}

#[tokio::test]
async fn kill_switch_requires_the_literal_true() {
    let _guard = common::env_lock();
    clear_env();
    std::env::set_var("FAILURE_LAMBDA_DISABLED", "1");

    let wrapped = wrap(
        |event, _ctx| async { Ok::<_, HandlerError>(event) },
        common::zero_roll_options(json!({
            "exception": { "enabled": true, "percentage": 100, "exception_msg": "still on" }
        })),
    );

    assert!(wrapped.invoke(json!({}), Context::default()).await.is_err());

    clear_env();
}
