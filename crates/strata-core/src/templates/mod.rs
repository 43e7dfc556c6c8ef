//! Module template rendering
//!
//! Uses Tera to turn a module's spec template into manifest text. The
//! template sees a fixed context:
//!
//! - `module`: module name
//! - `version`: module version
//! - `release`: release name
//! - `values`: release values with `values.secret` already resolved
//!
//! plus the string helpers in [`filters`].

mod filters;

use crate::error::{Error, Result};
use serde::Serialize;
use serde_yaml_ng::Value;
use tera::{Context, Tera};
use tracing::debug;

const TEMPLATE_NAME: &str = "module.yaml";

/// Inputs visible to a module template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub module: String,
    pub version: String,
    pub release: String,
    pub values: Value,
}

impl TemplateContext {
    fn to_tera_context(&self) -> Result<Context> {
        Context::from_serialize(self).map_err(|e| Error::template(describe(&e)))
    }
}

/// Renders module templates with the registered helper filters
#[derive(Clone)]
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter("quote", filters::quote);
        tera.register_filter("squote", filters::squote);
        tera.register_filter("indent", filters::indent);
        tera.register_filter("nindent", filters::nindent);
        tera.register_filter("to_yaml", filters::to_yaml);
        tera.register_filter("b64enc", filters::b64enc);
        tera.register_filter("b64dec", filters::b64dec);
        tera.register_filter("trunc", filters::trunc);
        Self { tera }
    }

    /// Render `template` against `context`
    pub fn render(&self, template: &str, context: &TemplateContext) -> Result<String> {
        debug!(
            "Rendering template for module {}@{} release {}",
            context.module, context.version, context.release
        );
        let mut tera = self.tera.clone();
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|e| Error::template(describe(&e)))?;
        let tera_context = context.to_tera_context()?;
        tera.render(TEMPLATE_NAME, &tera_context)
            .map_err(|e| Error::template(describe(&e)))
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tera keeps the useful detail in the source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
