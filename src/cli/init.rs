//! Init command - write an example config file

use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::path::Path;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    if Settings::init_config(path)? {
        println!(
            "{} Created {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        println!("\nEdit it to change analyzer rules, tool paths or the AI backend.");
    } else {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}
