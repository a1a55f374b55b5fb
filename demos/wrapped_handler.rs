use std::sync::Arc;

use serde_json::json;

use failure_lambda::config::parse_flags;
use failure_lambda::{wrap, observability, Context, HandlerError, Options};

/// Drives a wrapped handler against a fixed configuration so the injected
/// behavior is visible without a remote backend. Point the library at a real
/// one by exporting FAILURE_APPCONFIG_* or FAILURE_INJECTION_PARAM and
/// dropping the provider override below.
#[tokio::main]
async fn main() {
    observability::logging::init();

    let config = parse_flags(&json!({
        "latency": { "enabled": true, "percentage": 100, "min_latency": 100, "max_latency": 400 },
        "corruption": { "enabled": true, "percentage": 50 }
    }));

    struct Fixed(failure_lambda::Configuration);

    #[async_trait::async_trait]
    impl failure_lambda::ConfigProvider for Fixed {
        async fn get_config(&self) -> failure_lambda::Configuration {
            self.0.clone()
        }
    }

    let options = Options {
        config_provider: Some(Arc::new(Fixed(config))),
        ..Options::default()
    };

    let wrapped = wrap(
        |event, _ctx| async move {
            Ok::<_, HandlerError>(json!({
                "statusCode": 200,
                "body": format!("hello, {}", event["name"].as_str().unwrap_or("world")),
            }))
        },
        options,
    );

    for i in 0..5 {
        let ctx = Context::new(format!("local-{i}"), 0);
        match wrapped.invoke(json!({ "name": "chaos" }), ctx).await {
            Ok(result) => println!("invocation {i}: {result}"),
            Err(e) => eprintln!("invocation {i} failed: {e}"),
        }
    }
}
