//! Doctor command - check environment

use crate::ai::AiClient;
use crate::config::Settings;
use crate::models::ToolKind;
use crate::tools::is_tool_installed;
use anyhow::Result;
use console::style;

pub fn run(settings: &Settings) -> Result<()> {
    println!("🩺 pink-review doctor\n");

    let mut missing = 0;
    for tool in ToolKind::ALL {
        let program = settings.tools.program(tool);
        if is_tool_installed(&program) {
            println!("{} {}: {}", style("✓").green(), tool, program);
        } else {
            missing += 1;
            println!(
                "{} {}: '{}' not found on PATH (pip install {})",
                style("✗").red(),
                tool,
                program,
                tool
            );
        }
    }

    // AI is optional; templates cover every issue
    match AiClient::from_settings(&settings.ai) {
        Ok(Some(client)) => println!(
            "{} AI explanations: {} ({})",
            style("✓").green(),
            settings.ai.backend,
            client.model()
        ),
        Ok(None) => println!("○ AI explanations: disabled in config"),
        Err(e) => {
            println!("○ AI explanations: off ({})", e);
            println!("  Built-in templates will be used instead");
        }
    }

    let sessions = settings.sessions.root_dir();
    println!("○ Session directory: {}", sessions.display());
    println!("○ Profile directory: {}", settings.profiles.dir.display());

    if missing == 0 {
        println!("\n✅ All checks passed!");
        Ok(())
    } else {
        anyhow::bail!("{} analyzer(s) missing", missing)
    }
}
