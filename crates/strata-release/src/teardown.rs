//! Best-effort compensating teardown
//!
//! Runs after a failed install or update when the failure policy asks for
//! cleanup. Every error is swallowed so as much as possible is reclaimed, but
//! each one is logged and collected in the returned [`TeardownReport`].

use crate::context::ReleaseContext;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a compensating teardown
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeardownReport {
    pub release: String,
    /// Backing resources deleted
    pub uninstalled: usize,
    /// Local component records deleted
    pub removed: usize,
    pub release_deleted: bool,
    pub errors: Vec<String>,
}

impl TeardownReport {
    /// True when everything was reclaimed
    pub fn is_clean(&self) -> bool {
        self.release_deleted && self.errors.is_empty()
    }

    fn fail(&mut self, message: String) {
        warn!("Teardown of release {}: {}", self.release, message);
        self.errors.push(message);
    }
}

/// Re-resolve `name` and delete everything it owns, ignoring errors
pub async fn force_delete(ctx: &ReleaseContext, name: &str) -> TeardownReport {
    let mut report = TeardownReport {
        release: name.to_string(),
        ..Default::default()
    };

    let release = match ctx.repository.get_module_release(name).await {
        Ok(release) => release,
        Err(e) => {
            report.fail(format!("cannot resolve release: {}", e));
            return report;
        }
    };

    for handle in ctx.providers.iter() {
        let owned = match handle.owned_by(release.id).await {
            Ok(owned) => owned,
            Err(e) => {
                report.fail(format!("cannot list {} components: {}", handle.name(), e));
                continue;
            }
        };

        for component in owned {
            match ctx.dispatch(component.provider(), component.uninstall()).await {
                Ok(()) => report.uninstalled += 1,
                Err(e) => report.fail(format!(
                    "uninstall {} '{}': {}",
                    component.provider(),
                    component.key(),
                    e
                )),
            }
            match component.forget().await {
                Ok(()) => report.removed += 1,
                Err(e) => report.fail(format!(
                    "remove {} '{}': {}",
                    component.provider(),
                    component.key(),
                    e
                )),
            }
        }
    }

    match ctx.repository.delete_module_release(&release).await {
        Ok(()) => report.release_deleted = true,
        Err(e) => report.fail(format!("delete release row: {}", e)),
    }

    if report.is_clean() {
        info!(
            "Compensating teardown of release {} removed {} component(s)",
            name, report.removed
        );
    } else {
        warn!(
            "Compensating teardown of release {} finished with {} error(s); {} uninstalled, {} removed",
            name,
            report.errors.len(),
            report.uninstalled,
            report.removed
        );
    }
    report
}
