// Jaskier Shared Pattern — services
//! Demo services exercising the registry's two independent/dependent
//! boot paths: `system_probe` needs nothing and boots in phase 1;
//! `db_explorer` declares a Postgres dependency and boots in phase 2,
//! only once Postgres is terminal (success or failure).

pub mod db_explorer;
pub mod system_probe;

use std::sync::Arc;

use crate::infra_manager::AdapterHandles;
use crate::registry::ServiceDefinition;

/// Builds the catalog of `ServiceDefinition`s handed to the `Registrar`.
/// Adding a new service means adding one entry here plus its module.
pub fn definitions(handles: Arc<AdapterHandles>) -> Vec<ServiceDefinition> {
    vec![
        ServiceDefinition {
            name: "system_probe",
            dependencies: vec![],
            constructor: {
                Box::new(move || Arc::new(system_probe::SystemProbeService::new()) as Arc<dyn crate::registry::Service>)
            },
        },
        ServiceDefinition {
            name: "db_explorer",
            dependencies: vec!["postgres"],
            constructor: {
                let handles = Arc::clone(&handles);
                Box::new(move || {
                    Arc::new(db_explorer::DbExplorerService::new(handles.postgres.clone()))
                        as Arc<dyn crate::registry::Service>
                })
            },
        },
    ]
}
