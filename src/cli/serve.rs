//! Serve command handler

use crate::config::Settings;
use crate::server::{self, AppState};
use anyhow::{Context, Result};

/// Run the HTTP service until interrupted
pub fn run(mut settings: Settings, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        settings.server.bind = bind;
    }
    let bind = settings.server.bind.clone();
    let state = AppState::from_settings(settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server::serve(state, &bind))
}
