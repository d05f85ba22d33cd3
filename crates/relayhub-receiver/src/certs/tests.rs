//! Registration and certificate refresh tests.

#![allow(clippy::unwrap_used)]

use relayhub_core::encoding::base64_encode;
use relayhub_crypto::common_name_of_certificate;

use crate::auth::{Auth, UserAuth};
use crate::error::RelayError;
use crate::monitoring::MonitoringData;
use crate::site::SiteRelayDirectory;
use crate::test_helpers::{Fixture, relay_csr, user};
use crate::types::{RelayId, RelayState, ResultType, Serial, TaskSpec};

#[tokio::test]
async fn register_returns_certificates_for_the_relay() {
    let fx = Fixture::new().await;
    let id = RelayId::from("r1");

    let bundle = fx
        .registration
        .register_relay(&user(), &id, "berlin", &relay_csr(Some("r1")))
        .await
        .unwrap();

    assert_eq!(
        common_name_of_certificate(&bundle.client_cert)
            .unwrap()
            .as_deref(),
        Some("r1")
    );
    assert!(bundle.root_cert.contains("BEGIN CERTIFICATE"));

    let relay = fx.lifecycle.registry().find(&id).await.unwrap().unwrap();
    assert_eq!(relay.state, RelayState::Active);
    assert_eq!(relay.alias, "berlin");
}

#[tokio::test]
async fn second_registration_is_already_registered() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;

    let err = fx
        .registration
        .register_relay(&user(), &RelayId::from("r1"), "again", &relay_csr(None))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::AlreadyRegistered(_)));

    // The first certificate is the only one on record.
    let fingerprints = fx
        .lifecycle
        .registry()
        .certificate_fingerprints(&RelayId::from("r1"))
        .await
        .unwrap();
    assert_eq!(fingerprints.len(), 1);
}

#[tokio::test]
async fn pending_deletion_relay_cannot_register_again() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;
    fx.delete_on_site("r1");

    let err = fx
        .registration
        .register_relay(&user(), &RelayId::from("r1"), "again", &relay_csr(None))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::AlreadyRegistered(_)));
}

#[tokio::test]
async fn remote_site_refuses_without_side_effects() {
    let fx = Fixture::with_remote_site(true).await;
    let id = RelayId::from("r1");

    let err = fx
        .registration
        .register_relay(&user(), &id, "x", &relay_csr(Some("r1")))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::RemoteSite));
    assert!(fx.lifecycle.registry().find(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn unauthenticated_registration_writes_nothing() {
    let fx = Fixture::new().await;
    let id = RelayId::from("r1");

    let err = fx
        .registration
        .register_relay(&UserAuth::new("forged"), &id, "x", &relay_csr(Some("r1")))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Unauthorized));
    assert!(fx.lifecycle.registry().find(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn bad_csr_leaves_no_orphan_relay() {
    let fx = Fixture::new().await;
    let id = RelayId::from("r1");

    for csr in ["garbage".to_string(), relay_csr(Some("someone-else"))] {
        let err = fx
            .registration
            .register_relay(&user(), &id, "x", &csr)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::CsrInvalid(_)));
    }
    assert!(fx.lifecycle.registry().find(&id).await.unwrap().is_none());

    // The id is still free.
    fx.registration
        .register_relay(&user(), &id, "x", &relay_csr(Some("r1")))
        .await
        .unwrap();
}

#[tokio::test]
async fn refresh_issues_a_new_certificate() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;
    let id = RelayId::from("r1");

    let bundle = fx
        .registration
        .refresh_cert(&id, &relay_csr(Some("r1")))
        .await
        .unwrap();
    assert_eq!(
        common_name_of_certificate(&bundle.client_cert)
            .unwrap()
            .as_deref(),
        Some("r1")
    );

    let fingerprints = fx
        .lifecycle
        .registry()
        .certificate_fingerprints(&id)
        .await
        .unwrap();
    assert_eq!(fingerprints.len(), 2);
}

#[tokio::test]
async fn refresh_for_unknown_or_deleted_relay_is_not_found() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;
    fx.delete_on_site("r1");
    fx.site.activate_changes();
    fx.lifecycle.reconcile(&user()).await.unwrap();

    for id in ["r1", "never-registered"] {
        let err = fx
            .registration
            .refresh_cert(&RelayId::from(id), &relay_csr(Some(id)))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::RelayNotFound(_)));
    }
}

#[tokio::test]
async fn refresh_with_malformed_csr_is_csr_invalid() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;

    let err = fx
        .registration
        .refresh_cert(&RelayId::from("r1"), "garbage")
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::CsrInvalid(_)));
}

/// A relay removed on the site but not yet activated keeps working for
/// everything that only needs local knowledge.
#[tokio::test]
async fn pending_deletion_relay_stays_operable() {
    let fx = Fixture::new().await;
    fx.add_relays(&["r1"]).await;
    let id = RelayId::from("r1");
    let task = fx
        .tasks
        .push_task(
            &id,
            TaskSpec::FetchAdHoc {
                payload: "inventory".into(),
            },
        )
        .await
        .unwrap();

    fx.delete_on_site("r1");
    fx.lifecycle.reconcile(&user()).await.unwrap();
    let relay = fx.lifecycle.registry().find(&id).await.unwrap().unwrap();
    assert_eq!(relay.state, RelayState::PendingDeletion);

    assert_eq!(fx.tasks.get_tasks(&id, None).await.unwrap().len(), 1);
    fx.tasks
        .update_task(&id, &task.id, ResultType::Ok, "done")
        .await
        .unwrap();
    fx.registration
        .refresh_cert(&id, &relay_csr(Some("r1")))
        .await
        .unwrap();
    fx.forwarder
        .forward(
            &id,
            MonitoringData {
                serial: Serial::new("1"),
                host: "web01".into(),
                service: "CPU".into(),
                timestamp: 0,
                payload: base64_encode(b"data"),
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.sink.submissions().len(), 1);
}

#[tokio::test]
async fn registration_configures_the_relay_on_the_site() {
    let fx = Fixture::new().await;
    let id = RelayId::from("fresh");

    fx.registration
        .register_relay(&user(), &id, "hamburg", &relay_csr(Some("fresh")))
        .await
        .unwrap();
    assert!(fx.site.list_relays(&user()).await.unwrap().contains(&id));

    // Reconciling against the site must not take the new relay for a
    // deleted one, before or after the site activates its changes.
    fx.lifecycle.reconcile(&user()).await.unwrap();
    fx.site.activate_changes();
    fx.lifecycle.reconcile(&user()).await.unwrap();

    assert_eq!(
        fx.lifecycle
            .get_relay_state(&Auth::User(user()), &id)
            .await
            .unwrap(),
        RelayState::Active
    );
}
