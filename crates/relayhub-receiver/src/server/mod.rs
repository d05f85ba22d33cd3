//! HTTP surface of the agent receiver.
//!
//! Thin axum handlers over the registry, task store, activation coordinator
//! and certificate flows. Relay-facing routes act with local knowledge
//! only; routes carrying a site user's bearer credential consult the site.

mod activation;
mod api_error;
mod bearer;
mod health;
mod monitoring;
mod relays;
mod tasks;

#[cfg(test)]
mod activation_tests;
#[cfg(test)]
mod test_helpers;

use axum::Router;
use axum::routing::{get, patch, post};

use crate::activation::{ActivationCoordinator, ConfigSnapshotResolver};
use crate::certs::RegistrationService;
use crate::lifecycle::RelayLifecycle;
use crate::monitoring::MonitoringForwarder;
use crate::tasks::TaskStore;

pub use api_error::{ApiError, ErrorBody};

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: RelayLifecycle,
    pub tasks: TaskStore,
    pub coordinator: ActivationCoordinator,
    pub registration: RegistrationService,
    pub forwarder: MonitoringForwarder,
    pub snapshots: ConfigSnapshotResolver,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/relays", post(relays::register_relay))
        .route("/relays/activate-config", post(activation::activate_config))
        .route("/relays/{relay_id}/csr", post(relays::refresh_cert))
        .route("/relays/{relay_id}/status", get(relays::get_status))
        .route(
            "/relays/{relay_id}/tasks",
            get(tasks::get_tasks).post(tasks::push_task),
        )
        .route(
            "/relays/{relay_id}/tasks/{task_id}",
            patch(tasks::update_task),
        )
        .route(
            "/relays/{relay_id}/monitoring",
            post(monitoring::forward_monitoring_data),
        )
        .with_state(state)
}
