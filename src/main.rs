mod complaints;
mod config;
mod db;
mod error;
mod image;
mod ipc;
mod model;
mod session;
mod students;

use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    // stdout carries the protocol; logs go to stderr only.
    let filter = EnvFilter::try_from_env(config::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    let cfg = config::Config::from_env();
    let mut state = ipc::AppState::new(cfg);
    if let Some(ws) = state.config.workspace.clone() {
        match state.open_workspace(&ws) {
            Ok(()) => info!(workspace = %ws.display(), "workspace opened from environment"),
            Err(e) => warn!(workspace = %ws.display(), error = %format!("{e:#}"), "could not open workspace"),
        }
    }

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

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                ipc::bad_json(&e.to_string())
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
