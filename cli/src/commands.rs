//! Commands wired into the `dispatch` binary.
//!
//! Each command is a thin collaborator: the parser hands it positionals and
//! resolved flags, and it returns a JSON value to print.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use command_dispatch_core::{
    CommandBuilder, CommandSchema, FlagSchema, FlagValues, HandlerResult, Parser, Token,
    ValidationError,
};
use futures_util::future::join_all;
use serde_json::{Value, json};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::DispatchConfig;

/// Upper bound on probes per `gather-info` run.
const MAX_ATTEMPTS: u64 = 100;

/// Builds the parser with every command the binary exposes.
pub fn build_parser(config: DispatchConfig) -> Result<Parser, ValidationError> {
    let config = Arc::new(config);

    Parser::builder("dispatch")
        .version(0, 1, 0)
        .command(ping())
        .command(gather_info(config.clone()))
        .command(scan_command(config.clone()))
        .command(scan_all_command(config))
        .build()
}

fn ping() -> CommandBuilder {
    CommandSchema::builder("ping")
        .with_description("A test command")
        .with_expected_args(0)
        .handler(|_, _| Ok(Some(json!("pong"))))
}

fn gather_info(config: Arc<DispatchConfig>) -> CommandBuilder {
    CommandSchema::builder("gather-info")
        .with_description("Gather info on a given host")
        .with_expected_args(2)
        .with_arg_description("Label recorded with every probe.")
        .with_arg_description("Number of connection attempts.")
        .with_flag(
            FlagSchema::new("--host")
                .with_description("The hostname to connect to")
                .with_expected_args(1)
                .with_alias("-H")
                .required(true),
        )
        .with_flag(
            FlagSchema::new("--port")
                .with_description("The port to probe")
                .with_expected_args(1)
                .with_alias("-p")
                .required(true),
        )
        .async_handler(move |positional, flags| {
            let config = config.clone();
            async move { gather(&config, positional, flags).await }
        })
}

fn scan_command(config: Arc<DispatchConfig>) -> CommandBuilder {
    CommandSchema::builder("scan")
        .with_description("Scan a host")
        .with_expected_args(1)
        .with_arg_description("The host to scan.")
        .async_handler(move |positional, _flags| {
            let config = config.clone();
            async move { scan(&config, positional).await }
        })
}

fn scan_all_command(config: Arc<DispatchConfig>) -> CommandBuilder {
    CommandSchema::builder("scan-all")
        .with_description("Scan every host in the configured inventory")
        .with_expected_args(0)
        .async_handler(move |_positional, _flags| {
            let config = config.clone();
            async move { scan_inventory(&config).await }
        })
}

async fn gather(config: &DispatchConfig, positional: Vec<Token>, flags: FlagValues) -> HandlerResult {
    let [label, attempts] = positional.as_slice() else {
        bail!("gather-info expects a label and an attempt count");
    };
    let attempts = attempts_from(attempts)?;
    let host = flags
        .first("--host")
        .context("--host was not supplied")?
        .to_string();
    let port = port_from(flags.first("--port").context("--port was not supplied")?)?;

    let mut records = Vec::new();
    for attempt in 1..=attempts {
        let started = Instant::now();
        let outcome = timeout(config.timeout(), TcpStream::connect((host.as_str(), port))).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let error = match outcome {
            Ok(Ok(_stream)) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some(format!("timed out after {}ms", config.timeout_ms)),
        };
        debug!(%host, port, attempt, reachable = error.is_none(), "probe finished");

        records.push(json!({
            "label": label.to_string(),
            "host": host,
            "port": port,
            "attempt": attempt,
            "reachable": error.is_none(),
            "latency_ms": latency_ms,
            "error": error,
            "gathered_at": Utc::now().to_rfc3339(),
        }));
    }

    Ok(Some(Value::Array(records)))
}

async fn scan(config: &DispatchConfig, positional: Vec<Token>) -> HandlerResult {
    let [host] = positional.as_slice() else {
        bail!("scan expects exactly one host");
    };
    let report = scan_host(&host.to_string(), config.timeout()).await?;
    Ok(Some(report))
}

async fn scan_inventory(config: &DispatchConfig) -> HandlerResult {
    let limit = config.timeout();
    let scans = config.inventory.iter().map(|host| async move {
        match scan_host(host, limit).await {
            Ok(report) => report,
            Err(err) => json!({ "host": host, "error": format!("{err:#}") }),
        }
    });

    let reports = join_all(scans).await;
    info!(hosts = reports.len(), "scanned inventory");
    Ok(Some(Value::Array(reports)))
}

async fn scan_host(host: &str, limit: Duration) -> Result<Value> {
    let addresses = resolve_addresses(host, limit).await?;
    debug!(%host, count = addresses.len(), "resolved host");
    Ok(json!({ "host": host, "addresses": addresses }))
}

async fn resolve_addresses(host: &str, limit: Duration) -> Result<Vec<IpAddr>> {
    let resolved = timeout(limit, lookup_host((host, 0)))
        .await
        .with_context(|| format!("Lookup of '{host}' timed out"))?
        .with_context(|| format!("Failed to resolve '{host}'"))?;

    let mut addresses: Vec<IpAddr> = resolved.map(|addr| addr.ip()).collect();
    addresses.sort();
    addresses.dedup();
    Ok(addresses)
}

fn attempts_from(token: &Token) -> Result<u64> {
    let attempts = match token {
        Token::Number(n) if n.fract() == 0.0 && *n >= 1.0 => *n as u64,
        other => bail!("attempt count must be a positive whole number, got '{other}'"),
    };
    if attempts > MAX_ATTEMPTS {
        bail!("attempt count {attempts} exceeds the limit of {MAX_ATTEMPTS}");
    }
    Ok(attempts)
}

fn port_from(token: &Token) -> Result<u16> {
    match token {
        Token::Number(n) if n.fract() == 0.0 && (1.0..=65535.0).contains(n) => Ok(*n as u16),
        other => bail!("invalid port '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use command_dispatch_core::{Outcome, Resolution};

    use super::*;

    fn parser() -> Parser {
        build_parser(DispatchConfig::default()).expect("commands should validate")
    }

    #[test]
    fn test_port_from_accepts_numbers_only() {
        assert_eq!(port_from(&Token::Number(443.0)).unwrap(), 443);
        assert!(port_from(&Token::Number(0.0)).is_err());
        assert!(port_from(&Token::Number(70000.0)).is_err());
        assert!(port_from(&Token::Number(1.5)).is_err());
        assert!(port_from(&Token::from("http")).is_err());
    }

    #[test]
    fn test_attempts_from_bounds() {
        assert_eq!(attempts_from(&Token::Number(3.0)).unwrap(), 3);
        assert!(attempts_from(&Token::Number(0.0)).is_err());
        assert!(attempts_from(&Token::Number(101.0)).is_err());
        assert!(attempts_from(&Token::from("many")).is_err());
    }

    #[test]
    fn test_gather_info_accepts_short_aliases() {
        let parser = parser();
        let tokens = Token::from_args(["gather-info", "lab", "1", "-H", "localhost", "-p", "22"]);

        let Resolution::Ready(invocation) = parser.resolve(&tokens) else {
            panic!("expected gather-info to resolve");
        };
        assert_eq!(invocation.flags.first("--host"), Some(&Token::from("localhost")));
        assert_eq!(invocation.flags.first("--port"), Some(&Token::Number(22.0)));
    }

    #[tokio::test]
    async fn test_ping_returns_pong() {
        let outcome = parser().parse(&Token::from_args(["ping"])).await.unwrap();
        assert_eq!(outcome.map(|o| o.render()), Some("pong".to_string()));
    }

    #[tokio::test]
    async fn test_gather_info_probes_local_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let tokens = Token::from_args([
            "gather-info", "local", "2", "--host", "127.0.0.1", "--port", port.as_str(),
        ]);

        let records = match parser().parse(&tokens).await.unwrap() {
            Some(Outcome::Value(Value::Array(records))) => records,
            other => panic!("expected probe records, got {other:?}"),
        };
        assert_eq!(records.len(), 2);
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record["label"], "local");
            assert_eq!(record["attempt"], idx as u64 + 1);
            assert_eq!(record["reachable"], true);
        }
    }

    #[tokio::test]
    async fn test_scan_all_with_empty_inventory() {
        let outcome = parser().parse(&Token::from_args(["scan-all"])).await.unwrap();
        assert_eq!(outcome, Some(Outcome::Value(json!([]))));
    }
}
