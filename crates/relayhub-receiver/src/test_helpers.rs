//! Shared test helpers for receiver test modules.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use relayhub_crypto::{CaBundle, IssuedCertificate};
use tempfile::TempDir;

use crate::activation::{ActivationCoordinator, ConfigSnapshotResolver};
use crate::auth::UserAuth;
use crate::certs::{LocalCa, RegistrationService};
use crate::lifecycle::RelayLifecycle;
use crate::monitoring::{MonitoringForwarder, MonitoringSink, SinkError, Submission};
use crate::registry::{Relay, RelayRegistry};
use crate::site::InMemorySiteDirectory;
use crate::storage::ReceiverDatabase;
use crate::tasks::TaskStore;
use crate::types::{RelayId, Task};

/// Credential accepted by the in-memory site.
pub const SITE_TOKEN: &str = "site-user-token";

pub fn user() -> UserAuth {
    UserAuth::new(SITE_TOKEN)
}

pub async fn test_db() -> (ReceiverDatabase, RelayRegistry) {
    let db = ReceiverDatabase::open_in_memory().await.unwrap();
    let registry = RelayRegistry::new(db.clone());
    (db, registry)
}

pub async fn test_registry() -> RelayRegistry {
    test_db().await.1
}

/// Certificate metadata without real certificate material.
pub fn issued_cert(fingerprint: &str) -> IssuedCertificate {
    IssuedCertificate {
        cert_pem: String::new(),
        root_cert_pem: String::new(),
        fingerprint: fingerprint.to_string(),
        serial_number: "01".to_string(),
    }
}

/// Register `id` directly in the local registry.
pub async fn register_relay(registry: &RelayRegistry, id: &str) -> Relay {
    registry
        .register(&RelayId::from(id), id, &issued_cert(&format!("fp-{id}")))
        .await
        .unwrap()
}

/// Build a PEM CSR the way a relay does on first start.
pub fn relay_csr(cn: Option<&str>) -> String {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = DistinguishedName::new();
    if let Some(cn) = cn {
        params.distinguished_name.push(DnType::CommonName, cn);
    }
    params.serialize_request(&key).unwrap().pem().unwrap()
}

/// Sink that keeps every submission in memory.
#[derive(Default)]
pub struct RecordingSink {
    submissions: Mutex<Vec<Submission>>,
}

impl RecordingSink {
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MonitoringSink for RecordingSink {
    async fn submit(&self, submission: &Submission) -> Result<(), SinkError> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission.clone());
        Ok(())
    }
}

/// Every receiver service wired to an in-memory database, an in-memory
/// site, a freshly generated CA and a temporary config root.
pub struct Fixture {
    pub config_root: TempDir,
    pub snapshots: ConfigSnapshotResolver,
    pub db: ReceiverDatabase,
    pub site: Arc<InMemorySiteDirectory>,
    pub sink: Arc<RecordingSink>,
    pub lifecycle: RelayLifecycle,
    pub tasks: TaskStore,
    pub coordinator: ActivationCoordinator,
    pub registration: RegistrationService,
    pub forwarder: MonitoringForwarder,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_remote_site(false).await
    }

    pub async fn with_remote_site(is_remote_site: bool) -> Self {
        let (db, registry) = test_db().await;
        let site = Arc::new(InMemorySiteDirectory::new(SITE_TOKEN));
        let sink = Arc::new(RecordingSink::default());
        let ca = LocalCa::new(CaBundle::generate("RelayHub Test").unwrap());
        let config_root = tempfile::tempdir().unwrap();
        let snapshots = ConfigSnapshotResolver::new(config_root.path());

        let lifecycle = RelayLifecycle::new(registry.clone(), site.clone());
        let tasks = TaskStore::new(db.clone(), registry.clone());
        let coordinator =
            ActivationCoordinator::new(lifecycle.clone(), tasks.clone(), snapshots.clone());
        let registration =
            RegistrationService::new(lifecycle.clone(), Arc::new(ca), is_remote_site);
        let forwarder = MonitoringForwarder::new(registry, sink.clone());

        Self {
            config_root,
            snapshots,
            db,
            site,
            sink,
            lifecycle,
            tasks,
            coordinator,
            registration,
            forwarder,
        }
    }

    /// Register relays through the regular registration flow, which also
    /// configures them on the site, and activate the site changes.
    pub async fn add_relays(&self, ids: &[&str]) {
        for id in ids {
            let relay_id = RelayId::from(*id);
            self.registration
                .register_relay(&user(), &relay_id, id, &relay_csr(Some(id)))
                .await
                .unwrap();
        }
        self.site.activate_changes();
    }

    /// Render a `relay.conf` for each relay under `serial`, without making
    /// the serial active.
    pub fn render_config(&self, serial: &str, relays: &[&str]) {
        let serial_dir = self.config_root.path().join(serial);
        std::fs::create_dir_all(&serial_dir).unwrap();
        for relay in relays {
            let relay_dir = serial_dir.join(relay);
            std::fs::create_dir_all(&relay_dir).unwrap();
            std::fs::write(
                relay_dir.join("relay.conf"),
                format!("relay = {relay}\nserial = {serial}\n"),
            )
            .unwrap();
        }
    }

    /// Render `serial` and make it the active snapshot.
    pub fn write_snapshot(&self, serial: &str, relays: &[&str]) {
        self.render_config(serial, relays);
        std::fs::write(self.config_root.path().join("active_serial"), serial).unwrap();
    }

    /// Remove a relay on the site without activating the removal.
    pub fn delete_on_site(&self, id: &str) {
        self.site.delete_relay(&RelayId::from(id));
    }

    /// All tasks stored for `id`, whatever the relay's state.
    pub async fn stored_tasks(&self, id: &str) -> Vec<Task> {
        self.db
            .list_tasks(id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|row| Task::try_from(row).unwrap())
            .collect()
    }
}
