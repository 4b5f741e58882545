// Jaskier Shared Pattern — registry
//! Service catalog plus the two-phase boot sequence: independent services
//! register synchronously, dependent ones wait on `InfraInitManager`
//! before joining the registry.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::{mpsc, RwLock};

use crate::infra_manager::InfraInitManager;
use crate::state::AppState;

const DEPENDENCY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A user-authored module with its own routes. `enabled` MAY go false at
/// runtime if a required adapter never became available — the route set
/// attached at registration time stays fixed, but callers check `enabled`
/// before trusting the service is live.
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;
    fn enabled(&self) -> bool;
    fn endpoints(&self) -> Vec<String>;
    fn register_routes(&self, router: Router<AppState>) -> Router<AppState>;
}

/// A constructor plus an explicit dependency contract, preferred over
/// reflection-driven discovery: a service with dependency `d` is not
/// constructed until `IsInitialized(d)` holds.
pub struct ServiceDefinition {
    pub name: &'static str,
    pub dependencies: Vec<&'static str>,
    pub constructor: Box<dyn Fn() -> Arc<dyn Service> + Send + Sync>,
}

/// Catalog of constructed services. Read-heavy (status builds, endpoint
/// listings) outweighs writes (boot time only), but both share one lock
/// since the write volume is low regardless.
/// Joins a service's own (unprefixed) endpoint paths with the mount
/// prefix it's actually nested under, e.g. `/api/v1` + `db_explorer` +
/// `/tables` → `/api/v1/db_explorer/tables`. Status/catalog surfaces must
/// report the path a client can actually reach, not the bare route
/// fragment the service itself declares.
pub fn prefixed_endpoints(prefix: &str, svc: &dyn Service) -> Vec<String> {
    svc.endpoints()
        .into_iter()
        .map(|endpoint| format!("{prefix}/{}{endpoint}", svc.name()))
        .collect()
}

pub struct Registry {
    services: RwLock<Vec<Arc<dyn Service>>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { services: RwLock::new(Vec::new()) })
    }

    pub async fn register(&self, svc: Arc<dyn Service>) {
        self.services.write().await.push(svc);
    }

    pub async fn get_services(&self) -> Vec<Arc<dyn Service>> {
        self.services.read().await.clone()
    }

    /// Mounts every currently-registered *enabled* service's routes under
    /// `prefix`. Disabled services keep their catalog entry but contribute
    /// no routes.
    pub async fn boot(&self, prefix: &str, mut router: Router<AppState>) -> Router<AppState> {
        let services = self.services.read().await;
        for svc in services.iter().filter(|s| s.enabled()) {
            let nested = svc.register_routes(Router::new());
            router = router.nest(&format!("{prefix}/{}", svc.name()), nested);
        }
        router
    }

    pub async fn boot_service(
        &self,
        prefix: &str,
        svc: &Arc<dyn Service>,
        mut router: Router<AppState>,
    ) -> Router<AppState> {
        if svc.enabled() {
            let nested = svc.register_routes(Router::new());
            router = router.nest(&format!("{prefix}/{}", svc.name()), nested);
        }
        router
    }
}

/// Holds everything needed to construct and register every known service.
/// `RegisterAllServices` is its one public method; the registrar itself
/// does not survive past boot.
pub struct Registrar {
    definitions: Vec<ServiceDefinition>,
    infra: Arc<InfraInitManager>,
}

impl Registrar {
    pub fn new(definitions: Vec<ServiceDefinition>, infra: Arc<InfraInitManager>) -> Self {
        Self { definitions, infra }
    }

    /// Partitions definitions into independent (no deps, or deps already
    /// vacuous) and dependent; boots independents synchronously, then
    /// fans out a waiter task per dependent and joins all of them before
    /// returning. Only after this returns does the caller enumerate
    /// `registry.get_services()` to build the monitoring service list —
    /// that ordering is what guarantees monitoring sees the complete set.
    pub async fn register_all_services(
        self,
        registry: Arc<Registry>,
        root_prefix: &str,
    ) -> Router<AppState> {
        let mut router = Router::new();

        let (independent, dependent): (Vec<_>, Vec<_>) =
            self.definitions.into_iter().partition(|d| d.dependencies.is_empty());

        for def in independent {
            let svc = (def.constructor)();
            registry.register(svc).await;
        }
        router = registry.boot(root_prefix, router).await;

        if dependent.is_empty() {
            return router;
        }

        let (tx, mut rx) = mpsc::channel::<Arc<dyn Service>>(dependent.len());
        let pending = dependent.len();

        for def in dependent {
            let infra = Arc::clone(&self.infra);
            let registry = Arc::clone(&registry);
            let tx = tx.clone();
            let deps = def.dependencies.clone();
            let constructor = def.constructor;

            tokio::spawn(async move {
                loop {
                    let all_ready =
                        futures_util::future::join_all(deps.iter().map(|d| infra.is_terminal(d)))
                            .await
                            .into_iter()
                            .all(|terminal| terminal);
                    if all_ready {
                        break;
                    }
                    tokio::time::sleep(DEPENDENCY_POLL_INTERVAL).await;
                }
                let svc = (constructor)();
                registry.register(Arc::clone(&svc)).await;
                let _ = tx.send(svc).await;
            });
        }
        drop(tx);

        // Nest routes only for the dependent services as they complete —
        // independents were already nested above, so re-nesting the full
        // catalog here would register duplicate paths.
        for _ in 0..pending {
            if let Some(svc) = rx.recv().await {
                router = registry.boot_service(root_prefix, &svc, router).await;
            }
        }

        router
    }
}
