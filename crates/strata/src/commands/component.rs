//! Component inspection commands

use anyhow::{Context, Result};
use camino::Utf8Path;

use crate::app;
use crate::cli::{ComponentCommands, ComponentGetArgs, ComponentListArgs};
use crate::output;

pub async fn run(cmd: ComponentCommands, config: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = app::orchestrator(config)?;

    match cmd {
        ComponentCommands::Providers => {
            for name in orchestrator.provider_names() {
                println!("{}", name);
            }
            Ok(())
        }
        ComponentCommands::List(ComponentListArgs { provider, json }) => {
            let names = orchestrator
                .component_names(&provider)
                .await
                .with_context(|| format!("Failed to list {} components", provider))?;
            if json {
                return output::json(&names);
            }
            if names.is_empty() {
                output::info(&format!("No {} components", provider));
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        ComponentCommands::Get(ComponentGetArgs { provider, key }) => {
            let detail = orchestrator
                .component_detail(&provider, &key)
                .await
                .with_context(|| format!("Failed to read {} component '{}'", provider, key))?;
            output::json(&detail)
        }
    }
}
