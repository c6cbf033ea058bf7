//! `postbox fire` and `postbox cert`

use std::sync::Arc;
use tracing::{info, warn};

use postbox::config::Config;
use postbox::task::TaskSummary;
use postbox::transport::ReqwestTransport;
use postbox::{ClientIdentity, ProxyConfig, RequestFields, RequestSpec, TaskRunner};

use crate::cli::{CertArgs, FireArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(args: FireArgs) -> Result<(), AnyError> {
    let config = Config::load()?;
    let spec = build_spec(&args, &config)?;

    let transport = ReqwestTransport::new(config.http_config());
    let (runner, mut completions) = TaskRunner::with_completions(Arc::new(transport));

    for _ in 0..args.repeat {
        runner.submit(&spec)?;
    }

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut settled = 0;
    let mut failed = 0;

    while settled < args.repeat {
        tokio::select! {
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                if signal.is_ok() {
                    warn!("Interrupted, cancelling in-flight requests");
                    for reference_id in runner.in_flight() {
                        runner.cancel(reference_id);
                    }
                }
            }
            task = completions.recv() => {
                let Some(task) = task else { break };
                settled += 1;

                let summary = task.summary();
                if summary.error.is_some() {
                    failed += 1;
                }

                if args.json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print_summary(&summary);
                }
            }
        }
    }

    info!(fired = args.repeat, failed, "All requests settled");
    Ok(())
}

pub fn cert(args: CertArgs) -> Result<(), AnyError> {
    let identity = ClientIdentity::load(&args.file, &args.password)?;

    for alias in identity.aliases() {
        println!("{alias}");
    }

    Ok(())
}

/// Flags first, configured defaults second
fn build_spec(args: &FireArgs, config: &Config) -> Result<RequestSpec, AnyError> {
    let defaults = &config.request;

    let fields = RequestFields {
        endpoint: args.endpoint.clone(),
        payload: args.payload.clone().unwrap_or_default(),
        method: args
            .method
            .clone()
            .unwrap_or_else(|| defaults.default_method.clone()),
        content_type: args
            .content_type
            .clone()
            .unwrap_or_else(|| defaults.default_content_type.clone()),
        base64: args.base64,
        http_user: args.user.clone().unwrap_or_default(),
        http_password: args.password.clone().unwrap_or_default(),
    };

    let proxy = match &args.proxy_host {
        Some(host) => Some(ProxyConfig {
            host: Some(host.clone()),
            port: args.proxy_port.clone(),
            user: args.proxy_user.clone(),
            password: args.proxy_password.clone(),
        }),
        None => config.default_proxy(),
    };

    let identity = match (&args.cert, &args.cert_password) {
        (Some(file), Some(password)) => Some(Arc::new(ClientIdentity::load(file, password)?)),
        _ => None,
    };

    Ok(RequestSpec::from_fields(fields)
        .with_timeout(args.timeout.unwrap_or(defaults.default_timeout_secs))
        .with_proxy(proxy)
        .with_identity(identity))
}

fn print_summary(summary: &TaskSummary) {
    let elapsed = summary
        .elapsed_ms
        .map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"));

    println!(
        "#{} {} {} [{:?}] {} fired {}",
        summary.reference_id,
        summary.method,
        summary.endpoint,
        summary.state,
        elapsed,
        summary.fired_at
    );
    if !summary.headers.is_empty() {
        println!("{}", summary.headers);
    }
    println!();
    println!("{}", summary.body);
    println!();
}
