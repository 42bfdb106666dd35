use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::db::{self, Db};
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Db>,
    pub session: Session,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            workspace: None,
            db: None,
            session: Session::new(),
            config,
        }
    }

    /// Switching stores ends the current session; its principal belongs to
    /// the old one.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let db = db::open_db(path, self.config.seed_demo_data)?;
        info!(workspace = %path.display(), shape = ?db.shape, "workspace opened");
        self.workspace = Some(path.to_path_buf());
        self.db = Some(db);
        self.session.logout();
        Ok(())
    }
}
