//! Debug-config command - show the generated analyzer configs

use crate::config::Settings;
use crate::tools::ToolInvoker;
use anyhow::{Context, Result};
use console::style;

pub fn run(settings: &Settings) -> Result<()> {
    let invoker = ToolInvoker::new(settings.tools.clone());
    let configs = invoker
        .configs()
        .snapshot()
        .context("Failed to render analyzer configs")?;

    for (name, content) in configs {
        println!("{}", style(format!("# {}", name)).bold().cyan());
        println!("{}", content.trim_end());
        println!();
    }
    Ok(())
}
