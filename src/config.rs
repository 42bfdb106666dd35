use std::env;
use std::path::PathBuf;

pub const WORKSPACE_ENV: &str = "COMPLAINTD_WORKSPACE";
pub const SEED_ENV: &str = "COMPLAINTD_SEED";
pub const LOG_ENV: &str = "COMPLAINTD_LOG";
pub const DEFAULT_LOG_FILTER: &str = "complaintd=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Opened at start-up when set, so the UI may skip `workspace.select`.
    pub workspace: Option<PathBuf>,
    pub seed_demo_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            seed_demo_data: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(ws) = lookup(WORKSPACE_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.workspace = Some(PathBuf::from(ws.trim()));
        }
        if let Some(seed) = lookup(SEED_ENV).as_deref().and_then(parse_bool) {
            cfg.seed_demo_data = seed;
        }
        cfg
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
