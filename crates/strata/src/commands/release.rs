//! Release lifecycle commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use dialoguer::Confirm;
use serde::Serialize;
use strata_core::types::{FailurePolicy, ModuleRelease, ModuleSelector, ReleaseRequest};
use strata_release::{ComponentSummary, Orchestrator};
use tabled::{settings::Style, Table, Tabled};

use crate::app;
use crate::cli::{DeleteArgs, GetArgs, ListArgs, ReleaseArgs, ReleaseCommands};
use crate::output;

pub async fn run(cmd: ReleaseCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ReleaseCommands::Install(args) => apply(args, config, Action::Install).await,
        ReleaseCommands::Update(args) => apply(args, config, Action::Update).await,
        ReleaseCommands::Delete(args) => delete(args, config).await,
        ReleaseCommands::List(args) => list(args, config).await,
        ReleaseCommands::Get(args) => get(args, config).await,
    }
}

#[derive(Clone, Copy)]
enum Action {
    Install,
    Update,
}

fn failure_policy(raw: Option<&str>, action: Action) -> Result<FailurePolicy> {
    match raw {
        Some(raw) => raw
            .parse::<FailurePolicy>()
            .with_context(|| format!("Invalid --on-failure value '{}'", raw)),
        None => Ok(match action {
            Action::Install => FailurePolicy::default_for_install(),
            Action::Update => FailurePolicy::default_for_update(),
        }),
    }
}

async fn apply(args: ReleaseArgs, config: Option<&Utf8Path>, action: Action) -> Result<()> {
    let policy = failure_policy(args.on_failure.as_deref(), action)?;
    let values = match &args.values {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read values file {}", path))?,
        None => String::new(),
    };
    let selector = ModuleSelector::from_parts(args.module.as_str(), &args.version);
    let request = ReleaseRequest::new(args.name.as_str(), values);

    let orchestrator = app::orchestrator(config)?;
    let release = match action {
        Action::Install => {
            output::header(&format!("Installing {} from {}", args.name, selector));
            orchestrator
                .release_module(&selector, request, policy)
                .await
                .with_context(|| format!("Failed to install release {}", args.name))?
        }
        Action::Update => {
            output::header(&format!("Updating {} to {}", args.name, selector));
            orchestrator
                .update_module_release(&selector, request, policy)
                .await
                .with_context(|| format!("Failed to update release {}", args.name))?
        }
    };

    if args.json {
        return output::json(&release);
    }
    output::success(&format!(
        "Release {} at revision {} ({}@{})",
        release.name, release.revision, release.module_name, release.module_version
    ));
    Ok(())
}

async fn delete(args: DeleteArgs, config: Option<&Utf8Path>) -> Result<()> {
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Uninstall every component of '{}' and delete it?",
                args.name
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            output::info("Cancelled");
            return Ok(());
        }
    }

    let orchestrator = app::orchestrator(config)?;
    orchestrator
        .delete_module_release(&args.name)
        .await
        .with_context(|| format!("Failed to delete release {}", args.name))?;
    output::success(&format!("Release {} deleted", args.name));
    Ok(())
}

async fn list(args: ListArgs, config: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = app::orchestrator(config)?;
    let names = orchestrator.get_all_release_name().await?;

    if args.json {
        return output::json(&names);
    }
    if names.is_empty() {
        output::info("No releases");
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

#[derive(Serialize)]
struct ReleaseDetail {
    #[serde(flatten)]
    release: ModuleRelease,
    components: Vec<ComponentSummary>,
}

#[derive(Tabled)]
struct ComponentRow {
    provider: &'static str,
    key: String,
    revision: u32,
}

async fn get(args: GetArgs, config: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = app::orchestrator(config)?;
    let detail = detail(&orchestrator, &args.name).await?;

    if args.json {
        return output::json(&detail);
    }

    let release = &detail.release;
    output::header(&format!("Release {}", release.name));
    output::kv("Module", &format!("{}@{}", release.module_name, release.module_version));
    output::kv("Revision", &release.revision.to_string());
    output::kv("Id", &release.id.to_string());
    output::kv(
        "Created",
        &release.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    if detail.components.is_empty() {
        output::info("No components");
        return Ok(());
    }
    let rows: Vec<ComponentRow> = detail
        .components
        .iter()
        .map(|c| ComponentRow {
            provider: c.provider,
            key: c.key.clone(),
            revision: c.revision,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("\n{}", table);
    Ok(())
}

async fn detail(orchestrator: &Orchestrator, name: &str) -> Result<ReleaseDetail> {
    let release = orchestrator
        .get_release_detail(name)
        .await
        .with_context(|| format!("Failed to read release {}", name))?;
    let components = orchestrator.release_components(&release).await?;
    Ok(ReleaseDetail {
        release,
        components,
    })
}
