//! Configuration management commands.

use tabula_core::Config;

use crate::{AppContext, ConfigAction};

pub fn handle(action: ConfigAction, ctx: &AppContext) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", ctx.config.to_toml()?);
        }
        ConfigAction::Path => {
            println!(
                "User config:    {}",
                Config::config_dir().join("config.toml").display()
            );
            println!("Project config: .tabula/config.toml");
            println!("Sessions:       {}", ctx.config.sessions_dir().display());
        }
        ConfigAction::Validate => {
            let result = ctx.config.validate();
            for issue in &result.issues {
                println!("{:?} {}: {}", issue.severity, issue.field, issue.message);
            }
            if !result.is_ok() {
                anyhow::bail!("configuration has {} error(s)", result.errors().len());
            }
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
