//! ads-probe — 设置文件校验与单次探测请求的命令行工具
//!
//! Usage:
//!   ads-probe check <settings.yaml>                         Validate a settings file
//!   ads-probe get <platform> <path> [--settings <file>] [--query k=v]...
//!                                                           Issue one executed GET
//!   ads-probe platforms                                     List supported platforms

use ads_lib_rust::config::{access_token_env_var, lookup_access_token, Settings};
use ads_lib_rust::platforms::{adapter_for, PLATFORM_IDS};
use ads_lib_rust::transport::HttpTransport;
use ads_lib_rust::RequestExecutor;
use anyhow::{anyhow, bail, Context};
use reqwest::Method;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "check" => cmd_check(&args[2..]),
        "get" => cmd_get(&args[2..]).await,
        "platforms" => {
            for id in PLATFORM_IDS {
                println!("{id}");
            }
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("ads-probe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = std::env::var("ADS_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!(
        r#"ads-probe — 广告平台 API 探测工具

USAGE:
    ads-probe <COMMAND> [OPTIONS]

COMMANDS:
    check <settings.yaml>       Validate a settings file and print the effective values
    get <platform> <path>       Issue one GET through the executor and print the payload
        --settings <file>       Settings file (defaults + env overrides otherwise)
        --query <key=value>     Extra query parameter, repeatable
    platforms                   List supported platform ids
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    <PLATFORM>_ACCESS_TOKEN     Access token when none is stored in the keyring
    ADS_HTTP_TIMEOUT_SECS       HTTP timeout override
    ADS_MAX_RETRIES             Attempts per call override
    ADS_LOG / RUST_LOG          Log filter (default: warn)"#
    );
}

fn cmd_check(args: &[String]) -> anyhow::Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("missing <settings.yaml>"))?;
    let settings = Settings::from_path(path).with_context(|| format!("checking {path}"))?;

    for id in settings.platforms.keys() {
        adapter_for(id, &settings.platforms[id])?;
    }

    println!("{path}: OK");
    println!(
        "  http: timeout={}s pool_max_idle_per_host={} proxy={}",
        settings.http.timeout_secs,
        settings.http.pool_max_idle_per_host,
        settings.http.proxy_url.as_deref().unwrap_or("-")
    );
    println!(
        "  retry: max_retries={} base={}ms max={}ms jitter={}",
        settings.retry.max_retries, settings.retry.base_delay_ms, settings.retry.max_delay_ms, settings.retry.jitter_factor
    );
    let mut ids: Vec<&String> = settings.platforms.keys().collect();
    ids.sort();
    for id in ids {
        let retry = settings.retry_for(id);
        println!("  platform {id}: max_retries={}", retry.max_retries);
    }
    Ok(())
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let (platform, path) = match args {
        [platform, path, ..] => (platform.as_str(), path.as_str()),
        _ => bail!("usage: ads-probe get <platform> <path>"),
    };

    let mut settings_path = None;
    let mut query: Vec<(String, String)> = Vec::new();
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--settings" => settings_path = rest.next().cloned(),
            "--query" => {
                let pair = rest.next().ok_or_else(|| anyhow!("--query needs key=value"))?;
                let (k, v) = pair.split_once('=').ok_or_else(|| anyhow!("--query needs key=value, got '{pair}'"))?;
                query.push((k.to_string(), v.to_string()));
            }
            other => bail!("unexpected argument '{other}'"),
        }
    }

    let settings = match settings_path {
        Some(p) => Settings::from_path(&p)?,
        None => Settings::from_env(),
    };
    let platform_settings = settings.platform(platform).cloned().unwrap_or_default();
    let adapter = settings.adapter_config(adapter_for(platform, &platform_settings)?)?;

    let token = lookup_access_token(platform).ok_or_else(|| {
        anyhow!(
            "no access token for '{platform}': store one in the keyring or set {}",
            access_token_env_var(platform)
        )
    })?;

    let executor = RequestExecutor::new(Arc::new(HttpTransport::new(&settings.http)?));
    let mut request = adapter.request("probe", Method::GET, path)?;
    for (k, v) in &query {
        request = request.query(k, v);
    }
    let request = adapter.authorize(request, &token);

    let response = executor.execute_json(&adapter, request).await?;
    eprintln!(
        "HTTP {} after {} attempt(s), request id {}",
        response.status, response.attempts, response.client_request_id
    );
    println!("{}", serde_json::to_string_pretty(&response.payload)?);
    Ok(())
}
