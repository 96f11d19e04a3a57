mod backup;
mod calc;
mod config;
mod db;
mod ipc;
mod model;
mod report;
mod tree;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the IPC stream; logs must stay on stderr.
    let filter = std::env::var("GRADEBOARD_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cfg = config::DaemonConfig::from_env()?;

    let reporter = match report::ReportClient::new(cfg.ai.clone()) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(error = ?e, "AI report client unavailable");
            None
        }
    };
    let mut state = ipc::AppState::new(reporter);

    if let Some(ws) = cfg.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, ws) {
            tracing::error!(workspace = %ws.display(), error = ?e, "failed to open startup workspace");
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradeboardd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparsable request line");
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
