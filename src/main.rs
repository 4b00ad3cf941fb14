use std::io::Read;

use anyhow::{bail, Context};
use tracing::{info, warn};
use url::Url;

use zhihu_direct::browser::session::{BypassSession, SessionOptions};
use zhihu_direct::core::config::{self, ToolConfig};
use zhihu_direct::core::types::RewriteReport;
use zhihu_direct::redirect::{self, decode_redirect_target, rewrite_document};

const NAVIGATION_TIMEOUT_MS: u64 = 15_000;

const USAGE: &str = "\
zhihu-direct — outbound-link interstitial bypass for Zhihu columns

USAGE:
    zhihu-direct open <url> [--headless] [--wait-ms <n>]
        Launch a browser with the bypass engine installed and keep it open
        until Ctrl-C.

    zhihu-direct capture <url> [--html] [--wait-ms <n>]
        Headless navigate with the engine installed, wait for network idle,
        then print a verification report as JSON (or the captured HTML with
        --html).

    zhihu-direct rewrite <file|-|url> [--base-url <url>] [--html]
        Rewrite redirect anchors in static HTML read from a file, stdin, or a
        plain HTTP fetch. Prints a report as JSON (or the rewritten HTML with
        --html).

    zhihu-direct decode <value>
        Decode one redirect target value and print the destination.
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "--help" | "-h" | "help") {
        print!("{USAGE}");
        return Ok(());
    }

    let command = args.remove(0);
    let config = config::load_config();

    match command.as_str() {
        "open" => cmd_open(args, &config).await,
        "capture" => cmd_capture(args, &config).await,
        "rewrite" => cmd_rewrite(args, &config).await,
        "decode" => cmd_decode(args),
        other => {
            eprint!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }
}

async fn cmd_open(mut args: Vec<String>, config: &ToolConfig) -> anyhow::Result<()> {
    let headless = take_flag(&mut args, "--headless");
    let quiet_ms = wait_ms(&mut args, config)?;
    let url = args.first().context("open: missing <url>")?.clone();

    let options = SessionOptions {
        headless,
        ..SessionOptions::default()
    };
    let session = BypassSession::launch(config, options).await?;
    session.open(&url, quiet_ms, NAVIGATION_TIMEOUT_MS).await?;

    match session.remaining_redirect_anchors().await {
        Ok(0) => info!("✅ All redirect anchors rewritten"),
        Ok(n) => warn!("{} redirect anchors still pending (the mutation watcher will catch them)", n),
        Err(e) => warn!("Verification probe failed: {}", e),
    }

    info!("Session open — press Ctrl-C to shut down");
    wait_for_interrupt().await;
    session.shutdown().await;
    Ok(())
}

async fn cmd_capture(mut args: Vec<String>, config: &ToolConfig) -> anyhow::Result<()> {
    let print_html = take_flag(&mut args, "--html");
    let quiet_ms = wait_ms(&mut args, config)?;
    let url = args.first().context("capture: missing <url>")?.clone();

    let session = BypassSession::launch(config, SessionOptions::default()).await?;
    session.open(&url, quiet_ms, NAVIGATION_TIMEOUT_MS).await?;
    let remaining = match session.remaining_redirect_anchors().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Verification probe failed: {}", e);
            None
        }
    };
    let html = session.capture_html().await?;
    session.shutdown().await;

    if print_html {
        println!("{html}");
        return Ok(());
    }

    // The engine has already rewritten the live DOM; the native pass over the
    // capture reports whatever it left behind.
    let base = Url::parse(&url)?;
    let outcome = rewrite_document(&html, &base);
    let mut report = RewriteReport::new(url, outcome.anchors_scanned, outcome.links);
    report.remaining = remaining;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_rewrite(mut args: Vec<String>, config: &ToolConfig) -> anyhow::Result<()> {
    let print_html = take_flag(&mut args, "--html");
    let base_override = take_value(&mut args, "--base-url");
    let source = args
        .first()
        .context("rewrite: missing <file|-|url>")?
        .clone();

    let is_remote = source.starts_with("http://") || source.starts_with("https://");
    let html = if is_remote {
        zhihu_direct::fetch::fetch_html(&source, config).await?
    } else if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&source).with_context(|| format!("reading {source}"))?
    };

    let base = match &base_override {
        Some(b) => Url::parse(b).context("--base-url")?,
        None if is_remote => Url::parse(&source)?,
        None => Url::parse(redirect::MATCH_PREFIX)?,
    };

    let outcome = rewrite_document(&html, &base);
    if print_html {
        println!("{}", outcome.html);
    } else {
        let label = if source == "-" { "stdin".to_string() } else { source };
        let report = RewriteReport::new(label, outcome.anchors_scanned, outcome.links);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn cmd_decode(args: Vec<String>) -> anyhow::Result<()> {
    let value = args.first().context("decode: missing <value>")?;
    println!("{}", decode_redirect_target(value));
    Ok(())
}

fn wait_ms(args: &mut Vec<String>, config: &ToolConfig) -> anyhow::Result<u64> {
    match take_value(args, "--wait-ms") {
        Some(v) => v.parse().context("--wait-ms"),
        None => Ok(config.navigation_wait_ms()),
    }
}

fn take_flag(args: &mut Vec<String>, name: &str) -> bool {
    match args.iter().position(|a| a == name) {
        Some(idx) => {
            args.remove(idx);
            true
        }
        None => false,
    }
}

fn take_value(args: &mut Vec<String>, name: &str) -> Option<String> {
    if let Some(idx) = args.iter().position(|a| a == name) {
        args.remove(idx);
        if idx < args.len() {
            return Some(args.remove(idx));
        }
        return None;
    }
    let prefix = format!("{name}=");
    let idx = args.iter().position(|a| a.starts_with(&prefix))?;
    let value = args.remove(idx);
    Some(value[prefix.len()..].to_string())
}

async fn wait_for_interrupt() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
