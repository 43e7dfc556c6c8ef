//! Shared collaborators for release operations

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strata_core::templates::TemplateRenderer;
use strata_core::{Error, Result};
use strata_providers::ProviderRegistry;
use strata_secrets::SecretRegistry;
use strata_store::ModuleRepository;

/// Deadline for a single backing-system call when none is configured
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Everything an orchestrator needs, built once at startup
///
/// Both registries are fixed after construction and safe for concurrent
/// read-only use.
#[derive(Clone)]
pub struct ReleaseContext {
    pub repository: Arc<dyn ModuleRepository>,
    pub providers: ProviderRegistry,
    pub secrets: SecretRegistry,
    pub renderer: TemplateRenderer,
    pub dispatch_timeout: Duration,
}

impl ReleaseContext {
    pub fn new(
        repository: Arc<dyn ModuleRepository>,
        providers: ProviderRegistry,
        secrets: SecretRegistry,
    ) -> Self {
        Self {
            repository,
            providers,
            secrets,
            renderer: TemplateRenderer::new(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Run one backing-system call under the dispatch deadline
    pub(crate) async fn dispatch<T>(
        &self,
        provider: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.dispatch_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                provider: provider.to_string(),
                seconds: self.dispatch_timeout.as_secs(),
            }),
        }
    }
}
