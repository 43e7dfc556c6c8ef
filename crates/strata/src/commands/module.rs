//! Module registration commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Serialize;
use strata_core::types::{Module, NewModule};
use tabled::{settings::Style, Table, Tabled};

use crate::app;
use crate::cli::{ListArgs, ModuleAddArgs, ModuleCommands};
use crate::output;

pub async fn run(cmd: ModuleCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ModuleCommands::Add(args) => add(args, config).await,
        ModuleCommands::List(args) => list(args, config).await,
    }
}

async fn add(args: ModuleAddArgs, config: Option<&Utf8Path>) -> Result<()> {
    let spec = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("Failed to read module template {}", args.spec))?;

    let orchestrator = app::orchestrator(config)?;
    let module = orchestrator
        .install_module(NewModule::new(args.name, args.version, spec))
        .await
        .context("Failed to register module")?;

    output::success(&format!(
        "Registered module {}@{} (id {})",
        module.name, module.version, module.id
    ));
    Ok(())
}

#[derive(Tabled, Serialize)]
struct ModuleRow {
    name: String,
    version: String,
    id: u64,
    created: String,
}

impl From<&Module> for ModuleRow {
    fn from(module: &Module) -> Self {
        Self {
            name: module.name.clone(),
            version: module.version.clone(),
            id: module.id,
            created: module.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

async fn list(args: ListArgs, config: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = app::orchestrator(config)?;
    let modules = orchestrator.list_modules().await?;

    if args.json {
        return output::json(&modules);
    }
    if modules.is_empty() {
        output::info("No modules registered");
        return Ok(());
    }

    let rows: Vec<ModuleRow> = modules.iter().map(ModuleRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}
