//! Turns a registry snapshot into the flat list of failing checks.

use tracing::{debug, warn};

use pagewatch_client::RegistryClient;
use pagewatch_core::HealthCheck;

/// Collect every non-passing check across all registered services.
///
/// Services are visited in registry order and each service's checks keep
/// the order the registry returned. A failed registry call is logged and
/// counts as an empty result; it never aborts the collection.
pub async fn collect_failing_checks<R>(registry: &R) -> Vec<HealthCheck>
where
    R: RegistryClient + ?Sized,
{
    let services = match registry.list_services().await {
        Ok(services) => services,
        Err(e) => {
            warn!(error = %e, "failed to list services");
            return Vec::new();
        }
    };

    let mut total = 0;
    let mut failing = Vec::new();
    for service in services.names() {
        match registry.list_checks(service).await {
            Ok(checks) => {
                total += checks.len();
                failing.extend(checks.into_iter().filter(|check| !check.is_passing()));
            }
            Err(e) => {
                warn!(%service, error = %e, "failed to list checks");
            }
        }
    }

    debug!(
        services = services.len(),
        checks = total,
        failing = failing.len(),
        "registry snapshot collected"
    );
    failing
}
