//! Release values to converted components
//!
//! Rendering runs entirely before the release row is written:
//!
//! 1. parse the release values and resolve `values.secret`
//! 2. execute the module template
//! 3. parse the output as a provider -> components manifest
//! 4. reject provider keys with no registered handler
//! 5. convert every raw spec with its provider
//!
//! Any failure here leaves no trace in the store or in a backing system.

use crate::context::ReleaseContext;
use strata_core::templates::TemplateContext;
use strata_core::types::{Manifest, Module, ModuleRelease};
use strata_core::Result;
use strata_providers::{ConvertedComponent, ProviderRegistry};
use strata_secrets::{parse_values, resolve_values};
use tracing::debug;

/// Render a module's template for a release and validate the provider keys
pub async fn render_manifest(
    ctx: &ReleaseContext,
    module: &Module,
    release: &ModuleRelease,
) -> Result<Manifest> {
    let mut values = parse_values(&release.values)?;
    let resolved = resolve_values(&mut values, &ctx.secrets).await?;
    if resolved > 0 {
        debug!("Resolved {} secret(s) for release {}", resolved, release.name);
    }

    let context = TemplateContext {
        module: module.name.clone(),
        version: module.version.clone(),
        release: release.name.clone(),
        values,
    };
    let rendered = ctx.renderer.render(&module.spec, &context)?;
    let manifest = Manifest::parse(&rendered)?;
    validate_providers(&manifest, &ctx.providers)?;

    debug!(
        "Rendered {} component(s) across {} provider(s) for release {}",
        manifest.component_count(),
        manifest.entries().len(),
        release.name
    );
    Ok(manifest)
}

/// Fail with `UnknownProviderHandler` on the first unregistered key
pub fn validate_providers(manifest: &Manifest, registry: &ProviderRegistry) -> Result<()> {
    for provider in manifest.providers() {
        registry.require(provider)?;
    }
    Ok(())
}

/// Convert every raw spec, in manifest order
pub fn convert_manifest(
    manifest: &Manifest,
    registry: &ProviderRegistry,
) -> Result<Vec<Box<dyn ConvertedComponent>>> {
    let mut converted = Vec::with_capacity(manifest.component_count());
    for entry in manifest.entries() {
        let handle = registry.require(&entry.provider)?;
        for raw in &entry.components {
            converted.push(handle.convert(raw)?);
        }
    }
    Ok(converted)
}
